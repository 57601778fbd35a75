use serde::{Deserialize, Serialize};

use crate::domain::ids::{DepartmentId, HomebaseId, UserId};
use crate::domain::EntityStatus;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    pub head_id: Option<UserId>,
    pub homebase_id: Option<HomebaseId>,
    pub status: EntityStatus,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewDepartment {
    pub name: String,
    pub head_id: UserId,
    pub homebase_id: Option<HomebaseId>,
}

/// Selector accepted by the delete endpoint: either a numeric id or a name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DepartmentSelector {
    Id(DepartmentId),
    Name(String),
}
