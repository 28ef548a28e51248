use gs_quota::User;
use serde::Serialize;

/// Explicit session context passed through every orchestration call.
///
/// Created anonymous, replaced by a signed-in session on login and dropped
/// back to anonymous on logout. Updates hand back a new value instead of
/// mutating in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "user", rename_all = "snake_case")]
pub enum Session {
    #[default]
    Anonymous,
    SignedIn(User),
}

impl Session {
    pub fn from_user(user: Option<User>) -> Self {
        match user {
            Some(u) => Session::SignedIn(u),
            None => Session::Anonymous,
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Session::SignedIn(u) => Some(u),
            Session::Anonymous => None,
        }
    }

    pub fn into_user(self) -> Option<User> {
        match self {
            Session::SignedIn(u) => Some(u),
            Session::Anonymous => None,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self, Session::SignedIn(_))
    }

    pub fn logout(self) -> Session {
        if let Session::SignedIn(user) = &self {
            tracing::info!("Signing out {}", user.email);
        }
        Session::Anonymous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_anonymous() {
        let s = Session::default();
        assert!(!s.is_signed_in());
        assert!(s.user().is_none());
    }

    #[test]
    fn from_user_roundtrip() {
        let user = User::new("N", "n@example.com");
        let s = Session::from_user(Some(user.clone()));
        assert_eq!(s.user(), Some(&user));
        assert_eq!(s.into_user(), Some(user));
        assert_eq!(Session::from_user(None), Session::Anonymous);
    }

    #[test]
    fn logout_discards_user() {
        let s = Session::SignedIn(User::new("N", "n@example.com"));
        assert_eq!(s.logout(), Session::Anonymous);
    }
}
