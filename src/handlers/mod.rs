//! HTTP handlers. Role checks happen in the router's gate layers; handlers
//! only see callers that already passed them.

pub mod accounts;
pub mod admin;
pub mod auth;
pub mod catalog;
pub mod dashboards;
pub mod orders;
pub mod pages;

pub use crate::AppState;
