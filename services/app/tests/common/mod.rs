//! Shared fixtures for the client integration tests.

#![allow(dead_code)]

use app_lib::{
    adapters::{InMemoryCatalog, InMemoryIdentityProvider, InMemoryStorage},
    client::{ClientContext, ClientSettings, Credentials},
    config::FetchPolicy,
};
use learnlingo_core::Tutor;
use std::sync::Arc;
use std::time::Duration;

pub const EMAIL: &str = "student@example.com";
pub const PASSWORD: &str = "secret-pass";

pub fn tutor(id: &str, languages: &[&str], price: f64) -> Tutor {
    Tutor {
        id: id.to_string(),
        name: format!("Name{id}"),
        surname: format!("Surname{id}"),
        avatar_url: String::new(),
        languages: languages.iter().map(|s| s.to_string()).collect(),
        levels: vec!["A1 Beginner".to_string()],
        price_per_hour: price,
        lessons_done: 100,
        rating: 4.5,
        lesson_info: String::new(),
        conditions: Vec::new(),
        experience: String::new(),
        reviews: Vec::new(),
    }
}

/// Ten tutors keyed "1" through "10".
pub fn ten_tutors() -> Vec<Tutor> {
    (1..=10).map(|i| tutor(&i.to_string(), &["English"], 25.0)).collect()
}

pub fn credentials() -> Credentials {
    Credentials::new(EMAIL, PASSWORD)
}

pub struct Harness {
    pub catalog: Arc<InMemoryCatalog>,
    pub identity: Arc<InMemoryIdentityProvider>,
    pub storage: Arc<InMemoryStorage>,
    pub ctx: ClientContext,
}

impl Harness {
    pub async fn new(tutors: Vec<Tutor>) -> Self {
        Self::with_storage(tutors, Arc::new(InMemoryStorage::new())).await
    }

    pub async fn with_storage(tutors: Vec<Tutor>, storage: Arc<InMemoryStorage>) -> Self {
        let catalog = Arc::new(InMemoryCatalog::with_tutors(tutors));
        let identity = Arc::new(InMemoryIdentityProvider::new());
        let settings = ClientSettings {
            policy: FetchPolicy::CursorPaged,
            page_size: 4,
            booking_latency: Duration::ZERO,
        };
        let ctx = ClientContext::boot(settings, catalog.clone(), identity.clone(), storage.clone()).await;
        ctx.auth.initialized().await;
        Self {
            catalog,
            identity,
            storage,
            ctx,
        }
    }

    /// Creates the account, which also signs it in.
    pub async fn sign_up(&self) {
        self.ctx.auth.signup(&credentials()).await.unwrap();
    }

    /// Waits until the store reflects `predicate`, failing after a second.
    pub async fn wait_for_state<F>(&self, predicate: F)
    where
        F: Fn(&app_lib::client::AppState) -> bool,
    {
        let mut rx = self.ctx.store.subscribe();
        tokio::time::timeout(Duration::from_secs(1), rx.wait_for(|s| predicate(s)))
            .await
            .expect("state change in time")
            .expect("store alive");
    }
}
