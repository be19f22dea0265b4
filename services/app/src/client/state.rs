//! services/app/src/client/state.rs
//!
//! The application state container: session, favorites and boot phase in one
//! value, changed only through `Action`s applied by a pure reducer.

use learnlingo_core::domain::{TutorId, UserIdentity};
use learnlingo_core::ports::LocalStorage;
use tokio::sync::watch;
use tracing::info;

use crate::client::favorites;

//=========================================================================================
// State
//=========================================================================================

/// Whether persisted state has been loaded yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootPhase {
    Loading,
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthState {
    pub session: Option<UserIdentity>,
    /// Set once the identity provider has reported for the first time.
    pub initialized: bool,
    /// A login/signup call is in flight.
    pub loading: bool,
    /// Message from the last failed login/signup.
    pub error: Option<String>,
    /// Bumped on every provider notification. A local login result that
    /// started before the latest notification is not applied.
    pub provider_epoch: u64,
}

impl AuthState {
    pub fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }

    /// True only when the provider has confirmed there is no session.
    pub fn is_known_signed_out(&self) -> bool {
        self.initialized && self.session.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub boot: BootPhase,
    pub auth: AuthState,
    /// Favorite tutor ids in the order they were added.
    pub favorites: Vec<TutorId>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            boot: BootPhase::Loading,
            auth: AuthState::default(),
            favorites: Vec::new(),
        }
    }
}

//=========================================================================================
// Actions and Reducer
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Persisted favorites loaded; ends the boot phase.
    Rehydrated(Vec<TutorId>),
    AuthStarted,
    AuthSucceeded {
        identity: UserIdentity,
        /// `provider_epoch` observed when the call started.
        started_at_epoch: u64,
    },
    AuthFailed(String),
    LoggedOut,
    /// Pushed by the identity provider. Always authoritative.
    SessionChanged(Option<UserIdentity>),
    FavoriteAdded(TutorId),
    FavoriteRemoved(TutorId),
    FavoriteToggled(TutorId),
    FavoritesCleared,
}

/// Computes the next state. Never performs I/O.
pub fn reduce(state: &AppState, action: Action) -> AppState {
    let mut next = state.clone();
    match action {
        Action::Rehydrated(ids) => {
            next.favorites = dedup(ids);
            next.boot = BootPhase::Ready;
        }
        Action::AuthStarted => {
            next.auth.loading = true;
            next.auth.error = None;
        }
        Action::AuthSucceeded {
            identity,
            started_at_epoch,
        } => {
            next.auth.loading = false;
            if started_at_epoch == state.auth.provider_epoch {
                next.auth.session = Some(identity);
            }
        }
        Action::AuthFailed(message) => {
            next.auth.loading = false;
            next.auth.error = Some(message);
        }
        Action::LoggedOut => {
            next.auth.session = None;
            next.auth.loading = false;
        }
        Action::SessionChanged(session) => {
            next.auth.session = session;
            next.auth.initialized = true;
            next.auth.provider_epoch = state.auth.provider_epoch + 1;
        }
        Action::FavoriteAdded(id) => {
            if !next.favorites.contains(&id) {
                next.favorites.push(id);
            }
        }
        Action::FavoriteRemoved(id) => next.favorites.retain(|f| f != &id),
        Action::FavoriteToggled(id) => {
            if next.favorites.contains(&id) {
                next.favorites.retain(|f| f != &id);
            } else {
                next.favorites.push(id);
            }
        }
        Action::FavoritesCleared => next.favorites.clear(),
    }
    next
}

fn dedup(ids: Vec<TutorId>) -> Vec<TutorId> {
    let mut out: Vec<TutorId> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

//=========================================================================================
// Store
//=========================================================================================

/// Holds the current `AppState` and notifies subscribers after every dispatch.
///
/// Shared by constructor injection (`Arc<AppStore>`); there is no global instance.
#[derive(Debug)]
pub struct AppStore {
    tx: watch::Sender<AppState>,
}

impl Default for AppStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AppStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AppState::default());
        Self { tx }
    }

    pub fn state(&self) -> AppState {
        self.tx.borrow().clone()
    }

    /// Applies `action` and returns the resulting state.
    pub fn dispatch(&self, action: Action) -> AppState {
        let mut after = None;
        self.tx.send_modify(|state| {
            let next = reduce(state, action);
            after = Some(next.clone());
            *state = next;
        });
        after.unwrap_or_else(|| self.state())
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.tx.subscribe()
    }

    /// Loads persisted favorites and moves the store to `BootPhase::Ready`.
    pub async fn boot(&self, storage: &dyn LocalStorage) -> AppState {
        let ids = favorites::load_persisted(storage).await;
        info!(count = ids.len(), "Rehydrated favorites from local storage.");
        self.dispatch(Action::Rehydrated(ids))
    }

    /// Resolves once persisted state is loaded.
    pub async fn ready(&self) {
        let mut rx = self.subscribe();
        let _ = rx.wait_for(|s| s.boot == BootPhase::Ready).await;
    }
}
