//! crates/learnlingo_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the client's core logic.
//! These traits are the boundary to the hosted catalog, the identity provider
//! and local durable storage, so the core never depends on a concrete backend.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::domain::{CatalogPage, Tutor, UserIdentity};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PortError {
    /// Network or backend failure. Always recoverable by retrying.
    #[error("Remote service unavailable: {0}")]
    RemoteUnavailable(String),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("This email is already registered")]
    EmailInUse,
    #[error("Password is too weak: {0}")]
    WeakPassword(String),
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Session changes pushed by the identity provider. `None` means signed out.
pub type SessionStream = Pin<Box<dyn Stream<Item = Option<UserIdentity>> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Every entry in key order.
    async fn fetch_all(&self) -> PortResult<Vec<Tutor>>;

    /// Up to `page_size` entries strictly after `cursor` in key order.
    ///
    /// Implementations request `page_size + 1` entries and build the page with
    /// [`crate::catalog::page_from_overfetch`].
    async fn fetch_page(&self, page_size: usize, cursor: Option<&str>) -> PortResult<CatalogPage>;

    /// Overwrites the whole catalog. Only used by the seed tool.
    async fn replace_all(&self, entries: Vec<Tutor>) -> PortResult<()>;
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> PortResult<UserIdentity>;

    async fn signup(&self, email: &str, password: &str) -> PortResult<UserIdentity>;

    async fn logout(&self) -> PortResult<()>;

    /// Stream of session changes. The first item is the provider's current
    /// view of the session.
    fn subscribe(&self) -> SessionStream;
}

/// String-keyed durable storage, the equivalent of a browser's local storage.
#[async_trait]
pub trait LocalStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> PortResult<Option<String>>;

    async fn set_item(&self, key: &str, value: &str) -> PortResult<()>;

    async fn remove_item(&self, key: &str) -> PortResult<()>;
}
