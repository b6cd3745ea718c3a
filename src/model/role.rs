use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    /// Parses the role stored in account metadata. Anything unknown is a plain user.
    pub fn from_metadata(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse::<Role>().ok())
            .unwrap_or_default()
    }

    /// Landing path after sign-in, also the target of a role mismatch redirect.
    pub fn home_path(&self) -> &'static str {
        match self {
            Role::Admin => "/admin/dashboard",
            Role::User => "/dashboard",
        }
    }

    /// Admins satisfy every role requirement.
    pub fn satisfies(&self, required: Role) -> bool {
        *self == Role::Admin || *self == required
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_metadata_role_falls_back_to_user() {
        assert_eq!(Role::from_metadata(Some("admin")), Role::Admin);
        assert_eq!(Role::from_metadata(Some("superuser")), Role::User);
        assert_eq!(Role::from_metadata(None), Role::User);
    }

    #[test]
    fn admin_satisfies_any_requirement() {
        assert!(Role::Admin.satisfies(Role::User));
        assert!(Role::Admin.satisfies(Role::Admin));
        assert!(!Role::User.satisfies(Role::Admin));
    }
}
