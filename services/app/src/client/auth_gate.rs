//! services/app/src/client/auth_gate.rs
//!
//! Tracks the signed-in identity and runs login, signup and logout against the
//! identity provider.
//!
//! The provider is the source of truth: every session change it pushes is
//! applied as-is, replacing whatever the gate set locally.

use futures::StreamExt;
use learnlingo_core::domain::UserIdentity;
use learnlingo_core::ports::{IdentityProvider, PortResult};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::client::state::{Action, AppStore, AuthState};
use crate::client::validation::{require_email, ValidationErrors, MIN_PASSWORD_LEN};
use crate::error::AppError;

//=========================================================================================
// Credentials
//=========================================================================================

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Checks the fields both auth forms require before anything is sent.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_email(&mut errors, &self.email);
        if self.password.is_empty() {
            errors.add("password", "Password is required");
        } else if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.add(
                "password",
                format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
            );
        }
        errors.into_result()
    }
}

//=========================================================================================
// The Gate
//=========================================================================================

#[derive(Clone)]
pub struct AuthGate {
    store: Arc<AppStore>,
    provider: Arc<dyn IdentityProvider>,
}

impl AuthGate {
    pub fn new(store: Arc<AppStore>, provider: Arc<dyn IdentityProvider>) -> Self {
        Self { store, provider }
    }

    /// Starts applying provider notifications to the store.
    ///
    /// Until the first notification is applied the auth state stays
    /// uninitialized.
    pub fn attach_listener(&self) -> JoinHandle<()> {
        let store = self.store.clone();
        let mut changes = self.provider.subscribe();
        tokio::spawn(async move {
            while let Some(session) = changes.next().await {
                match &session {
                    Some(user) => info!("Identity provider reports user {}", user.user_id),
                    None => info!("Identity provider reports no session."),
                }
                store.dispatch(Action::SessionChanged(session));
            }
            warn!("Identity provider notification stream ended.");
        })
    }

    pub fn auth_state(&self) -> AuthState {
        self.store.state().auth
    }

    pub fn current_user(&self) -> Option<UserIdentity> {
        self.store.state().auth.session
    }

    pub fn is_initialized(&self) -> bool {
        self.store.state().auth.initialized
    }

    /// Resolves once the provider has reported for the first time.
    pub async fn initialized(&self) -> AuthState {
        let mut rx = self.store.subscribe();
        rx.wait_for(|s| s.auth.initialized)
            .await
            .map(|state| state.auth.clone())
            .unwrap_or_else(|_| self.auth_state())
    }

    /// The signed-in user, or `Unauthenticated`.
    pub fn require_user(&self) -> Result<UserIdentity, AppError> {
        self.current_user().ok_or(AppError::Unauthenticated)
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<UserIdentity, AppError> {
        credentials.validate()?;
        let epoch = self.begin();
        let result = self
            .provider
            .login(credentials.email.trim(), &credentials.password)
            .await;
        self.finish(result, epoch, "login")
    }

    pub async fn signup(&self, credentials: &Credentials) -> Result<UserIdentity, AppError> {
        credentials.validate()?;
        let epoch = self.begin();
        let result = self
            .provider
            .signup(credentials.email.trim(), &credentials.password)
            .await;
        self.finish(result, epoch, "signup")
    }

    /// Clears the local session even when the provider call fails.
    pub async fn logout(&self) {
        if let Err(e) = self.provider.logout().await {
            warn!("Identity provider logout failed, clearing local session anyway: {:?}", e);
        }
        self.store.dispatch(Action::LoggedOut);
        info!("Logged out.");
    }

    fn begin(&self) -> u64 {
        self.store.dispatch(Action::AuthStarted).auth.provider_epoch
    }

    fn finish(
        &self,
        result: PortResult<UserIdentity>,
        epoch: u64,
        what: &str,
    ) -> Result<UserIdentity, AppError> {
        match result {
            Ok(identity) => {
                info!("{} succeeded for user {}", what, identity.user_id);
                let state = self.store.dispatch(Action::AuthSucceeded {
                    identity: identity.clone(),
                    started_at_epoch: epoch,
                });
                // A provider notification that landed meanwhile wins.
                match state.auth.session {
                    Some(session) if session.user_id == identity.user_id => Ok(identity),
                    Some(session) => {
                        warn!(
                            "{} result for {} superseded by provider session {}",
                            what, identity.user_id, session.user_id
                        );
                        Ok(session)
                    }
                    None => {
                        warn!("{} result for {} superseded by a sign-out", what, identity.user_id);
                        Err(AppError::Unauthenticated)
                    }
                }
            }
            Err(e) => {
                error!("{} failed: {:?}", what, e);
                let err = AppError::from(e);
                self.store.dispatch(Action::AuthFailed(err.user_message()));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use learnlingo_core::ports::SessionStream;

    /// Provider whose session is revoked while a login is still in flight.
    struct RevokedDuringLogin {
        store: Arc<AppStore>,
    }

    #[async_trait]
    impl IdentityProvider for RevokedDuringLogin {
        async fn login(&self, email: &str, _password: &str) -> PortResult<UserIdentity> {
            self.store.dispatch(Action::SessionChanged(None));
            Ok(UserIdentity {
                user_id: "u1".to_string(),
                email: email.to_string(),
                expires_at: None,
            })
        }

        async fn signup(&self, email: &str, password: &str) -> PortResult<UserIdentity> {
            self.login(email, password).await
        }

        async fn logout(&self) -> PortResult<()> {
            Ok(())
        }

        fn subscribe(&self) -> SessionStream {
            Box::pin(futures::stream::empty())
        }
    }

    #[tokio::test]
    async fn login_overtaken_by_provider_sign_out_is_not_reported_as_success() {
        let store = Arc::new(AppStore::new());
        let provider = Arc::new(RevokedDuringLogin {
            store: store.clone(),
        });
        let gate = AuthGate::new(store.clone(), provider);

        let err = gate
            .login(&Credentials::new("a@b.io", "secret"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
        assert!(gate.current_user().is_none());
        assert!(!gate.auth_state().loading);
    }

    #[tokio::test]
    async fn initialized_waits_for_first_provider_report() {
        let store = Arc::new(AppStore::new());
        let provider = Arc::new(RevokedDuringLogin {
            store: store.clone(),
        });
        let gate = AuthGate::new(store.clone(), provider);
        assert!(!gate.is_initialized());

        let report = async {
            tokio::task::yield_now().await;
            store.dispatch(Action::SessionChanged(Some(UserIdentity {
                user_id: "u1".to_string(),
                email: "a@b.io".to_string(),
                expires_at: None,
            })));
        };
        let (state, _) = tokio::join!(gate.initialized(), report);
        assert!(state.initialized);
        assert_eq!(state.session.map(|s| s.user_id).as_deref(), Some("u1"));

        // Already initialized: resolves straight away.
        assert!(gate.initialized().await.initialized);
    }

    #[test]
    fn credentials_need_valid_email_and_long_password() {
        let errors = Credentials::new("nope", "123").validate().unwrap_err();
        assert_eq!(errors.get("email"), Some("Invalid email"));
        assert_eq!(errors.get("password"), Some("Password must be at least 6 characters"));

        let errors = Credentials::new("", "").validate().unwrap_err();
        assert_eq!(errors.get("email"), Some("Email is required"));
        assert_eq!(errors.get("password"), Some("Password is required"));

        assert!(Credentials::new("a@b.io", "secret").validate().is_ok());
    }
}
