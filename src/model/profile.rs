use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::backend::{BackendError, Row, decode_row};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Profile {
    pub user_id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub position: String,
    pub avatar_url: Option<String>,
}

impl TryFrom<Row> for Profile {
    type Error = BackendError;

    fn try_from(row: Row) -> Result<Self, Self::Error> {
        decode_row("profiles", row)
    }
}

/// Partial profile edit. Only the present fields are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.department.is_none()
            && self.position.is_none()
            && self.avatar_url.is_none()
    }
}
