//! services/app/src/client/context.rs
//!
//! Wires the client components together over a set of adapters.

use learnlingo_core::domain::{Tutor, TutorId};
use learnlingo_core::filter::FilterCriteria;
use learnlingo_core::ports::{CatalogStore, IdentityProvider, LocalStorage, PortResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

use crate::client::auth_gate::AuthGate;
use crate::client::booking::BookingService;
use crate::client::favorites::FavoritesStore;
use crate::client::listing::ListingController;
use crate::client::routes::{self, Route, RouteDecision};
use crate::client::state::AppStore;
use crate::config::{Config, FetchPolicy};
use crate::error::AppError;

/// Result of clicking the heart on a tutor card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoriteClick {
    /// Nobody is signed in; the login dialog should open. Nothing changed.
    LoginRequired,
    Toggled { id: TutorId, is_favorite: bool },
}

/// Client settings taken from the configuration.
#[derive(Debug, Clone, Copy)]
pub struct ClientSettings {
    pub policy: FetchPolicy,
    pub page_size: usize,
    pub booking_latency: Duration,
}

impl From<&Config> for ClientSettings {
    fn from(config: &Config) -> Self {
        Self {
            policy: config.fetch_policy,
            page_size: config.page_size,
            booking_latency: config.booking_latency,
        }
    }
}

/// Everything the front end talks to, created once at startup.
pub struct ClientContext {
    pub store: Arc<AppStore>,
    pub auth: AuthGate,
    pub favorites: FavoritesStore,
    pub booking: BookingService,
    catalog: Arc<dyn CatalogStore>,
    settings: ClientSettings,
    listener: JoinHandle<()>,
}

impl ClientContext {
    /// Rehydrates persisted state, then starts listening to the identity
    /// provider.
    pub async fn boot(
        settings: ClientSettings,
        catalog: Arc<dyn CatalogStore>,
        identity: Arc<dyn IdentityProvider>,
        storage: Arc<dyn LocalStorage>,
    ) -> Self {
        let store = Arc::new(AppStore::new());
        store.boot(storage.as_ref()).await;

        let auth = AuthGate::new(store.clone(), identity);
        let listener = auth.attach_listener();
        let favorites = FavoritesStore::new(store.clone(), storage);
        let booking = BookingService::new(store.clone(), settings.booking_latency);
        info!("Client booted.");

        Self {
            store,
            auth,
            favorites,
            booking,
            catalog,
            settings,
            listener,
        }
    }

    pub fn catalog(&self) -> Arc<dyn CatalogStore> {
        self.catalog.clone()
    }

    /// A fresh listing for the `/teachers` view.
    pub fn listing(&self, criteria: FilterCriteria) -> ListingController {
        ListingController::new(
            self.catalog.clone(),
            self.settings.policy,
            self.settings.page_size,
            criteria,
        )
    }

    pub fn navigate(&self, path: &str) -> RouteDecision {
        routes::resolve(Route::parse(path), &self.store.state())
    }

    /// Heart button: asks for a login instead of mutating when signed out.
    pub async fn click_favorite(&self, id: &str) -> Result<FavoriteClick, AppError> {
        match self.favorites.toggle(id).await {
            Ok(is_favorite) => Ok(FavoriteClick::Toggled {
                id: id.to_string(),
                is_favorite,
            }),
            Err(AppError::Unauthenticated) => Ok(FavoriteClick::LoginRequired),
            Err(e) => Err(e),
        }
    }

    /// Tutors behind the `/favorites` view.
    pub async fn favorite_tutors(&self) -> PortResult<Vec<Tutor>> {
        self.favorites.resolve(self.catalog.as_ref()).await
    }
}

impl Drop for ClientContext {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
