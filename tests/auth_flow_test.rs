mod common;

use axum::http::{header, Method, StatusCode};
use common::{response_json, TestApp, TEST_PASSWORD};
use laundry_api::auth::Role;
use serde_json::json;

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let app = TestApp::new().await;

    let first = app.register("maria", "customer").await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let body = response_json(first).await;
    assert_eq!(body["data"]["account"]["username"], "maria");
    assert_eq!(body["data"]["redirect_to"], "/auth/login");
    assert!(body["data"]["account"].get("password_hash").is_none());

    let second = app.register("maria", "staff").await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body = response_json(second).await;
    assert_eq!(body["message"], "Username already exists");

    let accounts = app.state.services.accounts.list().await.unwrap();
    assert_eq!(accounts.iter().filter(|a| a.username == "maria").count(), 1);
}

#[tokio::test]
async fn mismatched_passwords_are_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/auth/register",
            Some(json!({
                "username": "pedro",
                "password": TEST_PASSWORD,
                "confirm_password": "something-else",
                "role": "customer",
            })),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["message"], "Passwords do not match");
    assert!(app
        .state
        .services
        .accounts
        .find_by_username("pedro")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn admin_role_cannot_be_self_registered() {
    let app = TestApp::new().await;

    let response = app.register("sneaky", "admin").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.register("typo", "manager").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn short_username_and_password_are_rejected() {
    let app = TestApp::new().await;

    let response = app.register("ab", "customer").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::POST,
            "/auth/register",
            Some(json!({
                "username": "shortpw",
                "password": "1234",
                "confirm_password": "1234",
                "role": "customer",
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stored_password_is_hashed() {
    let app = TestApp::new().await;
    app.register("hashcheck", "customer").await;

    let account = app
        .state
        .services
        .accounts
        .find_by_username("hashcheck")
        .await
        .unwrap()
        .expect("account stored");
    assert_ne!(account.password_hash, TEST_PASSWORD);
    assert!(account.password_hash.starts_with("$argon2"));
}

#[tokio::test]
async fn bad_credentials_get_one_generic_message() {
    let app = TestApp::new().await;
    app.register("ana", "customer").await;

    let wrong_password = app.login("ana", "not-the-password").await;
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    let wrong_password = response_json(wrong_password).await;

    let unknown_user = app.login("nobody", TEST_PASSWORD).await;
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    let unknown_user = response_json(unknown_user).await;

    assert_eq!(wrong_password["message"], "Invalid username or password");
    assert_eq!(wrong_password["message"], unknown_user["message"]);
}

#[tokio::test]
async fn login_points_each_role_to_its_dashboard() {
    let app = TestApp::new().await;
    app.register("cust", "customer").await;
    app.register("crew", "staff").await;

    for (username, password, expected) in [
        ("cust", TEST_PASSWORD, "/dashboard/customer"),
        ("crew", TEST_PASSWORD, "/dashboard/staff"),
        (
            "admin",
            laundry_api::config::DEV_DEFAULT_ADMIN_PASSWORD,
            "/dashboard/admin",
        ),
    ] {
        let response = app.login(username, password).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["data"]["redirect_to"], expected);
        assert_eq!(body["data"]["token_type"], "Bearer");
    }
}

#[tokio::test]
async fn logout_revokes_the_session() {
    let app = TestApp::new().await;
    let token = app.token_for("leaving", Role::Customer).await;

    let before = app
        .request(Method::GET, "/dashboard/customer", None, Some(&token))
        .await;
    assert_eq!(before.status(), StatusCode::OK);

    let logout = app
        .request(Method::POST, "/auth/logout", None, Some(&token))
        .await;
    assert_eq!(logout.status(), StatusCode::OK);

    let after = app
        .request(Method::GET, "/dashboard/customer", None, Some(&token))
        .await;
    assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response_json(after).await["redirect_to"], "/auth/login");
}

#[tokio::test]
async fn home_redirects_by_session() {
    let app = TestApp::new().await;

    let anonymous = app.request(Method::GET, "/", None, None).await;
    assert!(anonymous.status().is_redirection());
    assert_eq!(anonymous.headers()[header::LOCATION], "/auth/login");

    let token = app.token_for("homebody", Role::Staff).await;
    let signed_in = app.request(Method::GET, "/", None, Some(&token)).await;
    assert!(signed_in.status().is_redirection());
    assert_eq!(signed_in.headers()[header::LOCATION], "/dashboard/staff");
}

#[tokio::test]
async fn public_pages_are_open() {
    let app = TestApp::new().await;

    for uri in ["/about", "/services", "/auth/login", "/health", "/status"] {
        let response = app.request(Method::GET, uri, None, None).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }

    let catalog = response_json(app.request(Method::GET, "/services", None, None).await).await;
    assert_eq!(catalog["data"]["currency"], "PHP");
    assert_eq!(catalog["data"]["services"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/dashboard/admin", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let header_id = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .expect("request id header");

    let body = response_json(response).await;
    assert_eq!(body["request_id"], header_id.as_str());
}
