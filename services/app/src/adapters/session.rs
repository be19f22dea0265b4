//! services/app/src/adapters/session.rs
//!
//! Session change broadcasting shared by the identity provider adapters.

use futures::stream;
use learnlingo_core::domain::UserIdentity;
use learnlingo_core::ports::SessionStream;
use tokio::sync::watch;

/// Latest-value channel of the provider's session. Subscribers always get the
/// current value first; intermediate values may be skipped, never reordered.
#[derive(Debug)]
pub struct SessionChannel {
    tx: watch::Sender<Option<UserIdentity>>,
}

impl Default for SessionChannel {
    fn default() -> Self {
        Self::new(None)
    }
}

impl SessionChannel {
    pub fn new(initial: Option<UserIdentity>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn current(&self) -> Option<UserIdentity> {
        self.tx.borrow().clone()
    }

    pub fn publish(&self, session: Option<UserIdentity>) {
        self.tx.send_replace(session);
    }

    /// Clears the session only if `user_id` is still the one signed in.
    pub fn expire(&self, user_id: &str) -> bool {
        self.tx.send_if_modified(|current| {
            if current.as_ref().is_some_and(|u| u.user_id == user_id) {
                *current = None;
                true
            } else {
                false
            }
        })
    }

    pub fn stream(&self) -> SessionStream {
        let rx = self.tx.subscribe();
        Box::pin(stream::unfold((rx, true), |(mut rx, first)| async move {
            if !first && rx.changed().await.is_err() {
                return None;
            }
            let session = rx.borrow_and_update().clone();
            Some((session, (rx, false)))
        }))
    }
}
