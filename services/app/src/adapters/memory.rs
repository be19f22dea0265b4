//! services/app/src/adapters/memory.rs
//!
//! In-process implementations of every port. Used by the tests and for local
//! runs without a hosted backend.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use learnlingo_core::catalog::{page_from_overfetch, range_after, sort_by_key};
use learnlingo_core::domain::{CatalogPage, Tutor, UserIdentity};
use learnlingo_core::ports::{
    CatalogStore, IdentityProvider, LocalStorage, PortError, PortResult, SessionStream,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::adapters::session::SessionChannel;

//=========================================================================================
// Catalog
//=========================================================================================

/// Catalog held in memory, kept in key order.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    tutors: Mutex<Vec<Tutor>>,
    unavailable: AtomicBool,
    latency: Mutex<Duration>,
    fetch_all_calls: AtomicUsize,
    fetch_page_calls: AtomicUsize,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tutors(mut tutors: Vec<Tutor>) -> Self {
        sort_by_key(&mut tutors);
        Self {
            tutors: Mutex::new(tutors),
            ..Self::default()
        }
    }

    /// Makes every call fail with `RemoteUnavailable` until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delay applied before every read.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap_or_else(|e| e.into_inner()) = latency;
    }

    pub fn fetch_all_calls(&self) -> usize {
        self.fetch_all_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_page_calls(&self) -> usize {
        self.fetch_page_calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<Tutor> {
        self.tutors.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    async fn simulate_network(&self) -> PortResult<()> {
        let latency = *self.latency.lock().unwrap_or_else(|e| e.into_inner());
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PortError::RemoteUnavailable("in-memory catalog is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn fetch_all(&self) -> PortResult<Vec<Tutor>> {
        self.fetch_all_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_network().await?;
        Ok(self.snapshot())
    }

    async fn fetch_page(&self, page_size: usize, cursor: Option<&str>) -> PortResult<CatalogPage> {
        if page_size == 0 {
            return Err(PortError::InvalidArgument("page size must be positive".to_string()));
        }
        self.fetch_page_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_network().await?;
        let tutors = self.snapshot();
        let fetched: Vec<Tutor> = range_after(&tutors, cursor, page_size + 1).cloned().collect();
        Ok(page_from_overfetch(fetched, page_size))
    }

    async fn replace_all(&self, mut entries: Vec<Tutor>) -> PortResult<()> {
        self.simulate_network().await?;
        sort_by_key(&mut entries);
        *self.tutors.lock().unwrap_or_else(|e| e.into_inner()) = entries;
        Ok(())
    }
}

//=========================================================================================
// Identity
//=========================================================================================

struct Account {
    user_id: String,
    password_hash: String,
}

/// Email/password accounts kept in memory, passwords hashed with Argon2.
#[derive(Default)]
pub struct InMemoryIdentityProvider {
    accounts: Mutex<HashMap<String, Account>>,
    session: SessionChannel,
    logout_fails: AtomicBool,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates a session change made outside this client, such as a sign-in
    /// in another tab or a revoked token.
    pub fn push_session(&self, session: Option<UserIdentity>) {
        self.session.publish(session);
    }

    pub fn set_logout_fails(&self, fails: bool) {
        self.logout_fails.store(fails, Ordering::SeqCst);
    }

    fn identity(user_id: &str, email: &str) -> UserIdentity {
        UserIdentity {
            user_id: user_id.to_string(),
            email: email.to_string(),
            expires_at: None,
        }
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn login(&self, email: &str, password: &str) -> PortResult<UserIdentity> {
        let key = email.to_lowercase();
        let (user_id, stored_hash) = {
            let accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
            let account = accounts.get(&key).ok_or(PortError::InvalidCredentials)?;
            (account.user_id.clone(), account.password_hash.clone())
        };

        let parsed_hash =
            PasswordHash::new(&stored_hash).map_err(|e| PortError::Unexpected(e.to_string()))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| PortError::InvalidCredentials)?;

        let identity = Self::identity(&user_id, &key);
        self.session.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn signup(&self, email: &str, password: &str) -> PortResult<UserIdentity> {
        if password.chars().count() < 6 {
            return Err(PortError::WeakPassword(
                "Password should be at least 6 characters".to_string(),
            ));
        }
        let key = email.to_lowercase();
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .to_string();

        let user_id = {
            let mut accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
            if accounts.contains_key(&key) {
                return Err(PortError::EmailInUse);
            }
            let user_id = Uuid::new_v4().to_string();
            accounts.insert(
                key.clone(),
                Account {
                    user_id: user_id.clone(),
                    password_hash,
                },
            );
            user_id
        };

        let identity = Self::identity(&user_id, &key);
        self.session.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn logout(&self) -> PortResult<()> {
        if self.logout_fails.load(Ordering::SeqCst) {
            return Err(PortError::RemoteUnavailable("logout endpoint unreachable".to_string()));
        }
        self.session.publish(None);
        Ok(())
    }

    fn subscribe(&self) -> SessionStream {
        self.session.stream()
    }
}

//=========================================================================================
// Local Storage
//=========================================================================================

#[derive(Debug, Default)]
pub struct InMemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalStorage for InMemoryStorage {
    async fn get_item(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.items.lock().unwrap_or_else(|e| e.into_inner()).get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> PortResult<()> {
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> PortResult<()> {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).remove(key);
        Ok(())
    }
}
