use crate::model::role::Role;
use crate::session::store::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    /// Session still settling: render a neutral state, never redirect.
    Pending,
    RedirectToLogin,
    /// Signed in but lacking the role; go to the identity's home page.
    RedirectToDefault(&'static str),
}

pub fn decide(state: &SessionState, required: Option<Role>) -> GateDecision {
    if state.loading {
        return GateDecision::Pending;
    }
    let Some(identity) = &state.identity else {
        return GateDecision::RedirectToLogin;
    };
    match required {
        Some(role) if !identity.role.satisfies(role) => {
            GateDecision::RedirectToDefault(identity.role.home_path())
        }
        _ => GateDecision::Allow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::identity::Identity;

    fn state(role: Option<Role>, loading: bool) -> SessionState {
        SessionState {
            identity: role.map(|role| Identity {
                id: "u1".into(),
                email: "u1@x.com".into(),
                name: "u1".into(),
                role,
                department: None,
                position: None,
            }),
            loading,
        }
    }

    #[test]
    fn loading_is_pending_whatever_the_identity() {
        for role in [None, Some(Role::User), Some(Role::Admin)] {
            for required in [None, Some(Role::Admin)] {
                assert_eq!(decide(&state(role, true), required), GateDecision::Pending);
            }
        }
    }

    #[test]
    fn anonymous_goes_to_login() {
        assert_eq!(decide(&state(None, false), None), GateDecision::RedirectToLogin);
        assert_eq!(
            decide(&state(None, false), Some(Role::Admin)),
            GateDecision::RedirectToLogin
        );
    }

    #[test]
    fn user_is_sent_home_from_admin_pages() {
        let user = state(Some(Role::User), false);
        assert_eq!(decide(&user, None), GateDecision::Allow);
        assert_eq!(decide(&user, Some(Role::User)), GateDecision::Allow);
        assert_eq!(
            decide(&user, Some(Role::Admin)),
            GateDecision::RedirectToDefault("/dashboard")
        );
    }

    #[test]
    fn admin_reaches_everything() {
        let admin = state(Some(Role::Admin), false);
        for required in [None, Some(Role::User), Some(Role::Admin)] {
            assert_eq!(decide(&admin, required), GateDecision::Allow);
        }
    }
}
