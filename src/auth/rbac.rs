/*!
 * # Role-Based Access Control (RBAC) Module
 *
 * Every account holds exactly one role. Routes declare the set of roles
 * allowed through, and the gate compares the role carried by the session
 * token against that set.
 */

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    Customer,
    Staff,
    Admin,
}

impl Role {
    /// Roles an anonymous visitor may pick at registration.
    pub const SELF_REGISTERABLE: [Role; 2] = [Role::Customer, Role::Staff];

    /// Dashboard path for this role
    pub fn dashboard_path(self) -> &'static str {
        match self {
            Role::Customer => "/dashboard/customer",
            Role::Staff => "/dashboard/staff",
            Role::Admin => "/dashboard/admin",
        }
    }

    pub fn is_self_registerable(self) -> bool {
        Self::SELF_REGISTERABLE.contains(&self)
    }
}

/// Roles allowed to change an order's status.
pub const ORDER_STATUS_EDITORS: &[Role] = &[Role::Staff, Role::Admin];
