use crate::auth::session::SessionUser;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Allowed,
    Denied,
}

impl Authorization {
    /// Turns a denial into the 401 response path.
    pub fn require(self) -> Result<(), AppError> {
        match self {
            Authorization::Allowed => Ok(()),
            Authorization::Denied => Err(AppError::Unauthorized),
        }
    }
}

/// The only access check for per-user resources.
///
/// Allowed iff a session identity exists and it refers to `target_user_id`.
/// Whether that user still exists is not checked here.
pub fn authorize(identity: Option<&SessionUser>, target_user_id: i64) -> Authorization {
    match identity {
        Some(user) if user.id == target_user_id => Authorization::Allowed,
        _ => Authorization::Denied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64) -> SessionUser {
        SessionUser {
            id,
            email: "a@b.com".to_string(),
            user_name: "Al".to_string(),
        }
    }

    #[test]
    fn test_anonymous_is_denied() {
        assert_eq!(authorize(None, 1), Authorization::Denied);
    }

    #[test]
    fn test_other_user_is_denied() {
        assert_eq!(authorize(Some(&user(2)), 1), Authorization::Denied);
    }

    #[test]
    fn test_owner_is_allowed() {
        assert_eq!(authorize(Some(&user(1)), 1), Authorization::Allowed);
    }

    #[test]
    fn test_denied_maps_to_unauthorized() {
        assert!(matches!(
            Authorization::Denied.require(),
            Err(AppError::Unauthorized)
        ));
        assert!(Authorization::Allowed.require().is_ok());
    }
}
