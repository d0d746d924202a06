//! Identity provider boundary.

use tokio::sync::watch;

use corkboard_common::User;

use crate::errors::{BoardError, BoardResult};

pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Option<User>;

    /// Receiver that observes every sign-in and sign-out.
    fn subscribe(&self) -> watch::Receiver<Option<User>>;

    fn sign_out(&self);
}

/// Id of the signed-in user, or `Unauthenticated`.
pub fn require_user(identity: &dyn IdentityProvider) -> BoardResult<String> {
    identity
        .current_user()
        .map(|user| user.id)
        .filter(|id| !id.is_empty())
        .ok_or(BoardError::Unauthenticated)
}

/// In-process identity backed by a watch channel.
pub struct StaticIdentity {
    tx: watch::Sender<Option<User>>,
}

impl StaticIdentity {
    pub fn signed_in(user: User) -> Self {
        Self {
            tx: watch::Sender::new(Some(user)),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            tx: watch::Sender::new(None),
        }
    }

    /// Signed-in identity with only an id, for CLI and tests.
    pub fn for_user_id(user_id: &str) -> Self {
        Self::signed_in(User {
            id: user_id.to_string(),
            display_name: user_id.to_string(),
            email: None,
            photo_url: None,
        })
    }

    pub fn sign_in(&self, user: User) {
        self.tx.send_replace(Some(user));
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<User> {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.tx.subscribe()
    }

    fn sign_out(&self) {
        self.tx.send_replace(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_user() {
        let identity = StaticIdentity::for_user_id("U1");
        assert_eq!(require_user(&identity).unwrap(), "U1");

        identity.sign_out();
        assert!(matches!(
            require_user(&identity),
            Err(BoardError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_subscribers_see_sign_out() {
        let identity = StaticIdentity::for_user_id("U1");
        let mut rx = identity.subscribe();
        assert!(rx.borrow_and_update().is_some());

        identity.sign_out();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
    }

    #[test]
    fn test_sign_in_replaces_user() {
        let identity = StaticIdentity::signed_out();
        assert!(identity.current_user().is_none());
        identity.sign_in(User {
            id: "U2".into(),
            display_name: "Dana".into(),
            email: Some("dana@example.com".into()),
            photo_url: None,
        });
        assert_eq!(identity.current_user().unwrap().id, "U2");
    }
}
