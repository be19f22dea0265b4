//! services/app/src/adapters/firebase_auth.rs
//!
//! This module contains the identity adapter, the concrete implementation of the
//! `IdentityProvider` port backed by the Firebase Identity Toolkit REST API.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use learnlingo_core::domain::UserIdentity;
use learnlingo_core::ports::{IdentityProvider, PortError, PortResult, SessionStream};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::adapters::session::SessionChannel;

pub const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    /// Lifetime of the issued token in seconds, sent as a string.
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Maps an Identity Toolkit error code onto the port's error taxonomy.
///
/// Codes may carry a detail suffix, as in `WEAK_PASSWORD : Password should be
/// at least 6 characters`.
pub fn map_error_message(message: &str) -> PortError {
    let (code, detail) = match message.split_once(':') {
        Some((code, detail)) => (code.trim(), detail.trim()),
        None => (message.trim(), ""),
    };
    match code {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS"
        | "INVALID_EMAIL" => PortError::InvalidCredentials,
        "EMAIL_EXISTS" => PortError::EmailInUse,
        "WEAK_PASSWORD" => PortError::WeakPassword(if detail.is_empty() {
            "Password should be at least 6 characters".to_string()
        } else {
            detail.to_string()
        }),
        "USER_DISABLED" | "OPERATION_NOT_ALLOWED" => PortError::Unexpected(message.to_string()),
        _ => PortError::RemoteUnavailable(message.to_string()),
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An identity adapter that implements the `IdentityProvider` port.
pub struct FirebaseAuthAdapter {
    client: Client,
    api_key: String,
    base_url: String,
    session: Arc<SessionChannel>,
    expiry_task: Mutex<Option<JoinHandle<()>>>,
}

impl FirebaseAuthAdapter {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, IDENTITY_TOOLKIT_URL)
    }

    /// Points the adapter at another endpoint, such as the auth emulator.
    pub fn with_base_url(
        client: Client,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: Arc::new(SessionChannel::default()),
            expiry_task: Mutex::new(None),
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/accounts:{}", self.base_url, method)
    }

    async fn password_call(&self, method: &str, email: &str, password: &str) -> PortResult<UserIdentity> {
        let response = self
            .client
            .post(self.endpoint(method))
            .query(&[("key", self.api_key.as_str())])
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|e| PortError::RemoteUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let err = match serde_json::from_str::<ErrorEnvelope>(&raw) {
                Ok(envelope) => map_error_message(&envelope.error.message),
                Err(_) => PortError::RemoteUnavailable(format!("{} {}", status, raw)),
            };
            warn!("Identity Toolkit {} rejected: {:?}", method, err);
            return Err(err);
        }

        let body: PasswordResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let lifetime = body
            .expires_in
            .as_deref()
            .and_then(|s| s.parse::<i64>().ok())
            .filter(|secs| *secs > 0);

        let identity = UserIdentity {
            user_id: body.local_id,
            email: if body.email.is_empty() {
                email.to_string()
            } else {
                body.email
            },
            expires_at: lifetime.map(|secs| Utc::now() + ChronoDuration::seconds(secs)),
        };
        self.start_session(identity.clone(), lifetime);
        Ok(identity)
    }

    /// Publishes the session and schedules its expiry notification.
    fn start_session(&self, identity: UserIdentity, lifetime_secs: Option<i64>) {
        let user_id = identity.user_id.clone();
        self.session.publish(Some(identity));

        let task = lifetime_secs.and_then(|secs| u64::try_from(secs).ok()).map(|secs| {
            let session = self.session.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(secs)).await;
                if session.expire(&user_id) {
                    info!(user_id = %user_id, "Session token expired.");
                }
            })
        });
        self.replace_expiry_task(task);
    }

    fn replace_expiry_task(&self, task: Option<JoinHandle<()>>) {
        let mut slot = self.expiry_task.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        *slot = task;
    }
}

impl Drop for FirebaseAuthAdapter {
    fn drop(&mut self) {
        self.replace_expiry_task(None);
    }
}

//=========================================================================================
// `IdentityProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdentityProvider for FirebaseAuthAdapter {
    async fn login(&self, email: &str, password: &str) -> PortResult<UserIdentity> {
        let identity = self.password_call("signInWithPassword", email, password).await?;
        info!(user_id = %identity.user_id, "Signed in.");
        Ok(identity)
    }

    async fn signup(&self, email: &str, password: &str) -> PortResult<UserIdentity> {
        let identity = self.password_call("signUp", email, password).await.map_err(|e| {
            error!("Error during signup: {:?}", e);
            e
        })?;
        info!(user_id = %identity.user_id, "Account created.");
        Ok(identity)
    }

    /// ID tokens are stateless; signing out drops the local session.
    async fn logout(&self) -> PortResult<()> {
        self.replace_expiry_task(None);
        self.session.publish(None);
        Ok(())
    }

    fn subscribe(&self) -> SessionStream {
        self.session.stream()
    }
}
