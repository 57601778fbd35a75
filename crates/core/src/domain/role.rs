use serde::{Deserialize, Serialize};

use crate::domain::ids::{HomebaseId, RoleId, UserId};

pub const SUPER_ADMIN_ROLE: &str = "Super Admin";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRole {
    pub user_id: UserId,
    pub role_id: RoleId,
    pub homebase_id: Option<HomebaseId>,
}

/// A role together with the homebase it was granted for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignment {
    pub role: Role,
    pub homebase_id: Option<HomebaseId>,
}
