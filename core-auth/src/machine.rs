//! # Authorization State Machine
//!
//! Orchestrates [`CredentialStore`], [`TokenValidator`], and
//! [`AuthExchanger`] into one coherent per-service authorization lifecycle
//! and exposes a live status to presentation layers.
//!
//! ## Lifecycle
//!
//! ```text
//! Unknown ──check──> Checking ──┬──> Authorized
//!                               ├──> Unauthorized ("No token found" / "Token invalid")
//!                               └──> Error ("Check failed", token retained)
//!
//! Unauthorized ──submit_direct──> Checking ──> Authorized | Unauthorized(reason)
//! Unauthorized ──submit_oauth───> Checking ──(full navigation leaves the core)
//!
//! <inbound callback> ──resume──> Checking ──> Authorized | Unauthorized
//! ```
//!
//! `Authorized` is not terminal: a later check can revert a service to
//! `Unauthorized`. No state is terminal; the machine re-enters checking and
//! credential collection indefinitely across user interaction.
//!
//! ## Concurrency
//!
//! At most one check or exchange is in flight per service; a duplicate
//! request is rejected with `OperationInProgress` so hosts can disable the
//! controls that would start one. Services evolve independently; their key
//! spaces never overlap.
//!
//! ## Error recovery
//!
//! Expected authorization outcomes (token missing, token invalid, exchange
//! rejected, CSRF mismatch, backend unreachable) are recovered here and
//! surfaced as a status plus events; the returned `Result` only errs on
//! host-level faults (storage, unsupported service, duplicate operation).
//! Token mutation and the accompanying status transition both complete
//! before a method returns.

use crate::error::{AuthError, Result};
use crate::exchange::AuthExchanger;
use crate::store::CredentialStore;
use crate::types::{
    AuthorizationStatus, DirectCredentials, OAuthCredentials, RedirectCallback, Service,
    StatusKind,
};
use crate::validator::TokenValidator;
use bridge_traits::Navigator;
use chrono::{DateTime, Utc};
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

const MSG_AUTHORIZED: &str = "Authorized";
const MSG_NO_TOKEN: &str = "No token found";
const MSG_TOKEN_INVALID: &str = "Token invalid";
const MSG_CHECK_FAILED: &str = "Check failed";
const MSG_CSRF_REJECTED: &str = "Invalid state parameter. Possible CSRF attack.";

/// Per-service authorization lifecycle orchestrator.
pub struct AuthorizationStateMachine {
    store: CredentialStore,
    validator: TokenValidator,
    exchanger: AuthExchanger,
    navigator: Arc<dyn Navigator>,
    event_bus: EventBus,
    statuses: Arc<RwLock<HashMap<Service, AuthorizationStatus>>>,
    in_flight: Arc<Mutex<HashSet<Service>>>,
}

impl AuthorizationStateMachine {
    /// Create a new state machine over the given components.
    ///
    /// Every service starts at `Unknown`/"Not checked"; status is never
    /// persisted and is recomputed each session.
    pub fn new(
        store: CredentialStore,
        validator: TokenValidator,
        exchanger: AuthExchanger,
        navigator: Arc<dyn Navigator>,
        event_bus: EventBus,
    ) -> Self {
        let statuses = Service::ALL
            .iter()
            .map(|service| (*service, AuthorizationStatus::unknown()))
            .collect();

        Self {
            store,
            validator,
            exchanger,
            navigator,
            event_bus,
            statuses: Arc::new(RwLock::new(statuses)),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Current status of one service.
    pub async fn status(&self, service: Service) -> AuthorizationStatus {
        self.statuses
            .read()
            .await
            .get(&service)
            .cloned()
            .unwrap_or_default()
    }

    /// Status snapshot of every known service, in display order.
    pub async fn statuses(&self) -> Vec<(Service, AuthorizationStatus)> {
        let statuses = self.statuses.read().await;
        Service::ALL
            .iter()
            .map(|service| {
                (
                    *service,
                    statuses.get(service).cloned().unwrap_or_default(),
                )
            })
            .collect()
    }

    /// Entry point on load.
    ///
    /// When the inbound query carries a pending OAuth callback (both `code`
    /// and `state` present), the redirect round-trip is resumed; otherwise a
    /// normal token check runs.
    #[instrument(skip(self, inbound_query), fields(service = %service))]
    pub async fn initialize(
        &self,
        service: Service,
        inbound_query: Option<&str>,
    ) -> Result<AuthorizationStatus> {
        if let Some(callback) = inbound_query.and_then(RedirectCallback::from_query) {
            info!("Inbound OAuth callback detected, resuming redirect flow");
            return self.resume(service, &callback).await;
        }
        self.check(service).await
    }

    /// Check whether the service's stored token is still accepted.
    ///
    /// - no stored token: `Unauthorized`/"No token found"
    /// - token accepted: `Authorized`
    /// - token rejected: the token is cleared, then `Unauthorized`/"Token invalid"
    /// - backend unreachable: `Error`/"Check failed", token retained
    #[instrument(skip(self), fields(service = %service))]
    pub async fn check(&self, service: Service) -> Result<AuthorizationStatus> {
        self.ensure_supported(service)?;
        let _guard = self.begin_operation(service)?;

        self.set_status(
            service,
            AuthorizationStatus::new(StatusKind::Checking, "Checking token"),
        )
        .await;
        self.emit(AuthEvent::CheckStarted {
            service: service.as_str().to_string(),
        });

        let token = match self.store.token(service).await {
            Ok(token) => token,
            Err(e) => {
                self.operation_failed(service, MSG_CHECK_FAILED, true).await;
                return Err(e);
            }
        };

        let Some(token) = token else {
            info!("No token stored, credentials required");
            return Ok(self.needs_credentials(service, MSG_NO_TOKEN).await);
        };

        match self.validator.check(service, &token).await {
            Ok(()) => Ok(self.authorized(service, None).await),
            Err(AuthError::Unauthorized) => {
                info!("Stored token rejected, clearing it");
                if let Err(e) = self.store.clear_token(service).await {
                    self.operation_failed(service, MSG_CHECK_FAILED, true).await;
                    return Err(e);
                }
                Ok(self.needs_credentials(service, MSG_TOKEN_INVALID).await)
            }
            Err(AuthError::Network(reason)) => {
                // Unreachable is not invalid: the token stays in place and
                // the user may retry or re-enter credentials.
                warn!(reason = %reason, "Token check could not reach the backend");
                Ok(self.operation_failed(service, MSG_CHECK_FAILED, true).await)
            }
            Err(other) => {
                self.operation_failed(service, MSG_CHECK_FAILED, true).await;
                Err(other)
            }
        }
    }

    /// Exchange direct credentials for a token and store it.
    ///
    /// On success the service becomes `Authorized`; on a rejected exchange it
    /// returns to `Unauthorized` carrying the backend's reason so the form
    /// can stay populated for correction.
    #[instrument(skip(self, credentials), fields(service = %service))]
    pub async fn submit_direct(
        &self,
        service: Service,
        credentials: &DirectCredentials,
    ) -> Result<AuthorizationStatus> {
        self.ensure_supported(service)?;
        let _guard = self.begin_operation(service)?;

        self.set_status(
            service,
            AuthorizationStatus::new(StatusKind::Checking, "Authenticating"),
        )
        .await;

        match self.exchanger.exchange_direct(service, credentials).await {
            Ok(grant) => {
                if let Err(e) = self.store.set_token(service, &grant.token).await {
                    self.operation_failed(service, "Authentication failed", false)
                        .await;
                    return Err(e);
                }
                Ok(self.authorized(service, grant.expires_at).await)
            }
            Err(AuthError::AuthFailed { reason }) => {
                Ok(self.needs_credentials(service, &reason).await)
            }
            Err(other) => {
                self.operation_failed(service, "Authentication failed", false)
                    .await;
                Err(other)
            }
        }
    }

    /// Start the OAuth redirect leg: open a session, build the authorization
    /// URL, and hand it to the navigator.
    ///
    /// A successful navigation leaves the current execution context; no
    /// further state-machine steps run until the remote redirect returns and
    /// [`initialize`](Self::initialize) detects the callback.
    ///
    /// Returns the authorization URL that was navigated to.
    #[instrument(skip(self, credentials), fields(service = %service))]
    pub async fn submit_oauth(
        &self,
        service: Service,
        credentials: &OAuthCredentials,
    ) -> Result<url::Url> {
        self.ensure_supported(service)?;
        let _guard = self.begin_operation(service)?;

        let nonce = self.store.begin_oauth_session(service, credentials).await?;

        let redirect_url = match self.exchanger.build_redirect_url(credentials, &nonce) {
            Ok(url) => url,
            Err(e) => {
                if let Err(abort) = self.store.abort_oauth_session(service).await {
                    warn!(error = %abort, "Failed to discard OAuth session");
                }
                self.needs_credentials(service, "Invalid instance domain")
                    .await;
                return Err(e);
            }
        };

        self.set_status(
            service,
            AuthorizationStatus::new(
                StatusKind::Checking,
                format!("Redirecting to {}", credentials.instance_domain),
            ),
        )
        .await;
        self.emit(AuthEvent::RedirectStarted {
            service: service.as_str().to_string(),
        });

        if let Err(e) = self.navigator.navigate_to(redirect_url.as_str()).await {
            if let Err(abort) = self.store.abort_oauth_session(service).await {
                warn!(error = %abort, "Failed to discard OAuth session");
            }
            self.operation_failed(service, "Redirect failed", true).await;
            return Err(AuthError::Navigation(e.to_string()));
        }

        info!("OAuth redirect started");
        Ok(redirect_url)
    }

    /// Resume the OAuth round-trip from an inbound redirect callback.
    ///
    /// The presented state must exactly match the pending session's nonce;
    /// otherwise the callback is rejected as a possible CSRF attack, the
    /// session is discarded, and no exchange call is made.
    #[instrument(skip(self, callback), fields(service = %service))]
    pub async fn resume(
        &self,
        service: Service,
        callback: &RedirectCallback,
    ) -> Result<AuthorizationStatus> {
        self.ensure_supported(service)?;
        let _guard = self.begin_operation(service)?;

        self.set_status(
            service,
            AuthorizationStatus::new(StatusKind::Checking, "Completing authorization"),
        )
        .await;

        let credentials = match self
            .store
            .consume_oauth_session(service, &callback.state)
            .await
        {
            Ok(credentials) => credentials,
            Err(AuthError::CsrfMismatch) => {
                // The rejected nonce is spent either way.
                warn!("Callback state did not match the pending session");
                if let Err(abort) = self.store.abort_oauth_session(service).await {
                    warn!(error = %abort, "Failed to discard OAuth session");
                }
                self.emit(AuthEvent::AuthError {
                    service: service.as_str().to_string(),
                    message: MSG_CSRF_REJECTED.to_string(),
                    recoverable: false,
                });
                return Ok(self.needs_credentials(service, MSG_CSRF_REJECTED).await);
            }
            Err(other) => {
                self.operation_failed(service, "Authorization failed", false)
                    .await;
                return Err(other);
            }
        };

        match self
            .exchanger
            .exchange_code(service, &callback.code, &callback.state, &credentials)
            .await
        {
            Ok(grant) => {
                if let Err(e) = self.store.set_token(service, &grant.token).await {
                    self.operation_failed(service, "Authorization failed", false)
                        .await;
                    return Err(e);
                }
                // Scrub code/state from the visible address so a reload does
                // not replay the callback.
                if let Err(e) = self.navigator.clear_inbound_params().await {
                    warn!(error = %e, "Failed to clear inbound redirect parameters");
                }
                Ok(self.authorized(service, grant.expires_at).await)
            }
            Err(AuthError::AuthFailed { reason }) => {
                Ok(self.needs_credentials(service, &reason).await)
            }
            Err(other) => {
                self.operation_failed(service, "Authorization failed", false)
                    .await;
                Err(other)
            }
        }
    }

    fn ensure_supported(&self, service: Service) -> Result<()> {
        if service.is_supported() {
            Ok(())
        } else {
            Err(AuthError::ServiceNotImplemented(service))
        }
    }

    fn begin_operation(&self, service: Service) -> Result<OperationGuard> {
        let mut in_flight = self
            .in_flight
            .lock()
            .map_err(|_| AuthError::Storage("in-flight registry poisoned".to_string()))?;
        if !in_flight.insert(service) {
            warn!(
                service = service.as_str(),
                "Rejected duplicate in-flight authorization operation"
            );
            return Err(AuthError::OperationInProgress(service));
        }
        Ok(OperationGuard {
            service,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    async fn set_status(
        &self,
        service: Service,
        status: AuthorizationStatus,
    ) -> AuthorizationStatus {
        {
            let mut statuses = self.statuses.write().await;
            statuses.insert(service, status.clone());
        }
        self.emit(AuthEvent::StatusChanged {
            service: service.as_str().to_string(),
            kind: status.kind.as_str().to_string(),
            message: status.message.clone(),
        });
        status
    }

    async fn authorized(
        &self,
        service: Service,
        expires_at: Option<DateTime<Utc>>,
    ) -> AuthorizationStatus {
        self.emit(AuthEvent::Authorized {
            service: service.as_str().to_string(),
            expires_at: expires_at.map(|t| t.timestamp()),
        });
        self.set_status(
            service,
            AuthorizationStatus::new(StatusKind::Authorized, MSG_AUTHORIZED),
        )
        .await
    }

    async fn needs_credentials(&self, service: Service, reason: &str) -> AuthorizationStatus {
        self.emit(AuthEvent::CredentialsRequired {
            service: service.as_str().to_string(),
            reason: reason.to_string(),
        });
        self.set_status(
            service,
            AuthorizationStatus::new(StatusKind::Unauthorized, reason),
        )
        .await
    }

    async fn operation_failed(
        &self,
        service: Service,
        message: &str,
        recoverable: bool,
    ) -> AuthorizationStatus {
        self.emit(AuthEvent::AuthError {
            service: service.as_str().to_string(),
            message: message.to_string(),
            recoverable,
        });
        self.set_status(
            service,
            AuthorizationStatus::new(StatusKind::Error, message),
        )
        .await
    }

    fn emit(&self, event: AuthEvent) {
        self.event_bus.emit(CoreEvent::Auth(event)).ok();
    }
}

/// Releases a service's in-flight slot when an operation ends, however it
/// ends.
struct OperationGuard {
    service: Service,
    in_flight: Arc<Mutex<HashSet<Service>>>,
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.remove(&self.service);
        }
    }
}
