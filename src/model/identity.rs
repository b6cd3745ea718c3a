use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::backend::AuthUser;
use crate::model::role::Role;

/// The signed-in user as seen by the views. Lives only as long as the session context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub department: Option<String>,
    pub position: Option<String>,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&AuthUser> for Identity {
    fn from(user: &AuthUser) -> Self {
        let meta = &user.metadata;
        let name = meta
            .display_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| user.email.split('@').next().unwrap_or_default().to_string());

        Identity {
            id: user.id.clone(),
            email: user.email.clone(),
            name,
            role: Role::from_metadata(meta.role.as_deref()),
            department: meta.department.clone(),
            position: meta.position.clone(),
        }
    }
}
