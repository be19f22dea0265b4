//! services/app/src/client/favorites.rs
//!
//! The favorites store: membership changes go through the `AppStore` and are
//! written to local storage right after each mutation.

use learnlingo_core::domain::{Tutor, TutorId};
use learnlingo_core::ports::{CatalogStore, LocalStorage, PortError, PortResult};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::client::state::{Action, AppStore};
use crate::error::AppError;

/// Local storage key holding the JSON list of favorite ids.
pub const FAVORITES_KEY: &str = "favorites";

/// Reads the persisted favorites. Missing or unreadable data is an empty list.
pub async fn load_persisted(storage: &dyn LocalStorage) -> Vec<TutorId> {
    let raw = match storage.get_item(FAVORITES_KEY).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            error!("Failed to read favorites from local storage: {:?}", e);
            return Vec::new();
        }
    };
    match serde_json::from_str::<Vec<TutorId>>(&raw) {
        Ok(ids) => ids,
        Err(e) => {
            warn!("Ignoring unreadable favorites in local storage: {}", e);
            Vec::new()
        }
    }
}

/// Writes the full list, or removes the key when the list is empty.
pub async fn persist(storage: &dyn LocalStorage, ids: &[TutorId]) -> PortResult<()> {
    if ids.is_empty() {
        return storage.remove_item(FAVORITES_KEY).await;
    }
    let raw = serde_json::to_string(ids)
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
    storage.set_item(FAVORITES_KEY, &raw).await
}

#[derive(Clone)]
pub struct FavoritesStore {
    store: Arc<AppStore>,
    storage: Arc<dyn LocalStorage>,
}

impl FavoritesStore {
    pub fn new(store: Arc<AppStore>, storage: Arc<dyn LocalStorage>) -> Self {
        Self { store, storage }
    }

    pub fn is_member(&self, id: &str) -> bool {
        self.store.state().favorites.iter().any(|f| f == id)
    }

    pub fn ids(&self) -> Vec<TutorId> {
        self.store.state().favorites
    }

    /// Flips membership of `id` and returns whether it is now a favorite.
    ///
    /// Rejected with `AppError::Unauthenticated` when nobody is signed in; in
    /// that case nothing is changed.
    pub async fn toggle(&self, id: &str) -> Result<bool, AppError> {
        self.require_session()?;
        let state = self.store.dispatch(Action::FavoriteToggled(id.to_string()));
        self.write_through(&state.favorites).await;
        Ok(state.favorites.iter().any(|f| f == id))
    }

    pub async fn add(&self, id: &str) -> Result<(), AppError> {
        self.require_session()?;
        if self.is_member(id) {
            return Ok(());
        }
        let state = self.store.dispatch(Action::FavoriteAdded(id.to_string()));
        self.write_through(&state.favorites).await;
        Ok(())
    }

    pub async fn remove(&self, id: &str) -> Result<(), AppError> {
        self.require_session()?;
        if !self.is_member(id) {
            return Ok(());
        }
        let state = self.store.dispatch(Action::FavoriteRemoved(id.to_string()));
        self.write_through(&state.favorites).await;
        Ok(())
    }

    pub async fn clear(&self) {
        let state = self.store.dispatch(Action::FavoritesCleared);
        self.write_through(&state.favorites).await;
    }

    /// The favorite tutors that still exist in the catalog, in catalog order.
    pub async fn resolve(&self, catalog: &dyn CatalogStore) -> PortResult<Vec<Tutor>> {
        let ids = self.ids();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let all = catalog.fetch_all().await?;
        Ok(all.into_iter().filter(|t| ids.contains(&t.id)).collect())
    }

    fn require_session(&self) -> Result<(), AppError> {
        if self.store.state().auth.is_signed_in() {
            Ok(())
        } else {
            Err(AppError::Unauthenticated)
        }
    }

    // The in-memory set stays authoritative if the write fails.
    async fn write_through(&self, ids: &[TutorId]) {
        match persist(self.storage.as_ref(), ids).await {
            Ok(()) => debug!(count = ids.len(), "Persisted favorites."),
            Err(e) => error!("Failed to persist favorites: {:?}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStorage;
    use learnlingo_core::domain::UserIdentity;

    fn signed_in_store() -> Arc<AppStore> {
        let store = Arc::new(AppStore::new());
        store.dispatch(Action::SessionChanged(Some(UserIdentity {
            user_id: "u1".into(),
            email: "u1@example.com".into(),
            expires_at: None,
        })));
        store
    }

    #[tokio::test]
    async fn toggle_requires_a_session() {
        let storage = Arc::new(InMemoryStorage::new());
        let store = Arc::new(AppStore::new());
        let favorites = FavoritesStore::new(store.clone(), storage.clone());

        let err = favorites.toggle("teacher_1").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
        assert!(store.state().favorites.is_empty());
        assert_eq!(storage.get_item(FAVORITES_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn toggle_persists_and_removes_key_when_empty() {
        let storage = Arc::new(InMemoryStorage::new());
        let favorites = FavoritesStore::new(signed_in_store(), storage.clone());

        assert!(favorites.toggle("teacher_1").await.unwrap());
        assert!(favorites.is_member("teacher_1"));
        assert_eq!(
            storage.get_item(FAVORITES_KEY).await.unwrap().as_deref(),
            Some(r#"["teacher_1"]"#)
        );

        assert!(!favorites.toggle("teacher_1").await.unwrap());
        assert!(!favorites.is_member("teacher_1"));
        assert_eq!(storage.get_item(FAVORITES_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn add_and_remove_keep_order() {
        let storage = Arc::new(InMemoryStorage::new());
        let favorites = FavoritesStore::new(signed_in_store(), storage.clone());
        favorites.add("b").await.unwrap();
        favorites.add("a").await.unwrap();
        favorites.add("b").await.unwrap();
        assert_eq!(favorites.ids(), vec!["b".to_string(), "a".to_string()]);
        favorites.remove("missing").await.unwrap();
        favorites.remove("b").await.unwrap();
        assert_eq!(
            storage.get_item(FAVORITES_KEY).await.unwrap().as_deref(),
            Some(r#"["a"]"#)
        );
    }

    #[tokio::test]
    async fn corrupt_storage_loads_as_empty() {
        let storage = InMemoryStorage::new();
        storage.set_item(FAVORITES_KEY, "{not json").await.unwrap();
        assert!(load_persisted(&storage).await.is_empty());
    }
}
