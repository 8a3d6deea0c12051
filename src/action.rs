//! Verifiable action types.

use crate::error::VerifyError;

/// Action a verification link confirms.
///
/// The action doubles as the route segment in the emailed link and as
/// part of the storage key, so unrelated flows sharing the verification
/// table can never collide. Free-form strings from the outside are
/// validated through [`VerifyAction::from_route`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerifyAction {
    /// Account/email verification.
    EmailVerify,
    /// Password reset confirmation.
    PasswordReset,
}

impl VerifyAction {
    /// Route segment and storage tag for this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmailVerify => "verify",
            Self::PasswordReset => "reset-password",
        }
    }

    /// Parse a route segment back into an action.
    ///
    /// Returns `None` for unknown tags; the `TryFrom<&str>` impl wraps
    /// this for boundary code that wants the error directly.
    pub fn from_route(route: &str) -> Option<Self> {
        match route {
            "verify" => Some(Self::EmailVerify),
            "reset-password" => Some(Self::PasswordReset),
            _ => None,
        }
    }
}

impl TryFrom<&str> for VerifyAction {
    type Error = VerifyError;

    fn try_from(route: &str) -> Result<Self, Self::Error> {
        Self::from_route(route).ok_or_else(|| VerifyError::UnknownAction(route.to_string()))
    }
}

impl std::fmt::Display for VerifyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_round_trip() {
        for action in [VerifyAction::EmailVerify, VerifyAction::PasswordReset] {
            assert_eq!(VerifyAction::from_route(action.as_str()), Some(action));
        }
    }

    #[test]
    fn test_unknown_route_rejected() {
        assert_eq!(VerifyAction::from_route("delete-account"), None);
        assert_eq!(VerifyAction::from_route(""), None);
    }

    #[test]
    fn test_try_from_names_the_rejected_route() {
        assert_eq!(
            VerifyAction::try_from("verify").unwrap(),
            VerifyAction::EmailVerify
        );
        assert!(matches!(
            VerifyAction::try_from("delete-account"),
            Err(VerifyError::UnknownAction(route)) if route == "delete-account"
        ));
    }
}
