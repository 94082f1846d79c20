//! Credential Storage
//!
//! This module persists issued access tokens and in-flight OAuth session
//! artifacts through the host's storage bridges: tokens in the durable store
//! (they survive restarts), pending OAuth state in the session store (it must
//! not outlive the session that started the redirect).
//!
//! ## Security
//!
//! - Token and nonce values are never logged
//! - The CSRF state nonce is random, unguessable, and single-use
//! - A corrupted pending session is deleted, never partially consumed
//!
//! ## Key layout
//!
//! - durable `"<service>_token"` — the bearer token
//! - session `"<service>_oauth_state"` — the pending state nonce
//! - session `"<service>_oauth_credentials"` — the pending credentials (JSON)

use crate::error::{AuthError, Result};
use crate::types::{OAuthCredentials, Service, Token};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bridge_traits::storage::{DurableStore, SessionStore};
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Storage façade for tokens and pending OAuth sessions.
///
/// All side effects are confined to the two storage bridges; this type never
/// touches the network.
#[derive(Clone)]
pub struct CredentialStore {
    durable: Arc<dyn DurableStore>,
    session: Arc<dyn SessionStore>,
}

impl CredentialStore {
    /// Create a new credential store over the host's storage bridges.
    pub fn new(durable: Arc<dyn DurableStore>, session: Arc<dyn SessionStore>) -> Self {
        debug!("Initializing CredentialStore");
        Self { durable, session }
    }

    /// Retrieve the stored token for a service, if any.
    pub async fn token(&self, service: Service) -> Result<Option<Token>> {
        let value = self
            .durable
            .get(&token_key(service))
            .await
            .map_err(storage_error)?;
        Ok(value.map(Token::new))
    }

    /// Store a token for a service, overwriting any previous token.
    ///
    /// Subsequent [`token`](Self::token) calls return this value until it is
    /// explicitly cleared.
    pub async fn set_token(&self, service: Service, token: &Token) -> Result<()> {
        self.durable
            .set(&token_key(service), token.as_str())
            .await
            .map_err(storage_error)?;
        info!(service = service.as_str(), "Token stored");
        Ok(())
    }

    /// Delete the stored token for a service. Idempotent.
    pub async fn clear_token(&self, service: Service) -> Result<()> {
        self.durable
            .delete(&token_key(service))
            .await
            .map_err(storage_error)?;
        info!(service = service.as_str(), "Token cleared");
        Ok(())
    }

    /// Begin an OAuth session: generate a fresh state nonce and persist it
    /// together with the credentials for the redirect round-trip.
    ///
    /// The nonce never collides with a nonce currently pending for the same
    /// service, so a stale callback cannot match a new session.
    pub async fn begin_oauth_session(
        &self,
        service: Service,
        credentials: &OAuthCredentials,
    ) -> Result<String> {
        let pending = self
            .session
            .get(&state_key(service))
            .await
            .map_err(storage_error)?;

        let mut nonce = generate_nonce();
        while pending.as_deref() == Some(nonce.as_str()) {
            nonce = generate_nonce();
        }

        let serialized = serde_json::to_string(credentials)
            .map_err(|e| AuthError::Storage(format!("Failed to serialize credentials: {}", e)))?;

        // Credentials first: a stored nonce marks the session as complete.
        self.session
            .set(&credentials_key(service), &serialized)
            .await
            .map_err(storage_error)?;
        self.session
            .set(&state_key(service), &nonce)
            .await
            .map_err(storage_error)?;

        info!(service = service.as_str(), "OAuth session started");
        Ok(nonce)
    }

    /// Consume the pending OAuth session for a service.
    ///
    /// On an exact nonce match, deletes the session and returns the pending
    /// credentials. On absence or mismatch, fails with `CsrfMismatch` without
    /// mutating state; discarding the rejected session is the caller's
    /// decision ([`abort_oauth_session`](Self::abort_oauth_session)).
    pub async fn consume_oauth_session(
        &self,
        service: Service,
        presented_nonce: &str,
    ) -> Result<OAuthCredentials> {
        let stored = self
            .session
            .get(&state_key(service))
            .await
            .map_err(storage_error)?;

        match stored {
            Some(nonce) if nonce == presented_nonce => {}
            _ => {
                warn!(
                    service = service.as_str(),
                    "OAuth state mismatch - possible CSRF attack"
                );
                return Err(AuthError::CsrfMismatch);
            }
        }

        let serialized = self
            .session
            .get(&credentials_key(service))
            .await
            .map_err(storage_error)?;

        let Some(serialized) = serialized else {
            // Half a session is no session. Clean up the dangling nonce.
            warn!(
                service = service.as_str(),
                "Pending OAuth session has no credentials, discarding"
            );
            self.abort_oauth_session(service).await?;
            return Err(AuthError::Storage(
                "Pending OAuth session is missing credentials".to_string(),
            ));
        };

        let credentials: OAuthCredentials = match serde_json::from_str(&serialized) {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!(
                    service = service.as_str(),
                    error = %e,
                    "Pending OAuth credentials are corrupted, discarding"
                );
                self.abort_oauth_session(service).await?;
                return Err(AuthError::Storage(format!(
                    "Pending OAuth credentials are corrupted: {}",
                    e
                )));
            }
        };

        self.session
            .delete(&state_key(service))
            .await
            .map_err(storage_error)?;
        self.session
            .delete(&credentials_key(service))
            .await
            .map_err(storage_error)?;

        info!(service = service.as_str(), "OAuth session consumed");
        Ok(credentials)
    }

    /// Discard any pending OAuth session for a service. Idempotent.
    ///
    /// Used after a CSRF rejection so the rejected nonce is single-use.
    pub async fn abort_oauth_session(&self, service: Service) -> Result<()> {
        self.session
            .delete(&state_key(service))
            .await
            .map_err(storage_error)?;
        self.session
            .delete(&credentials_key(service))
            .await
            .map_err(storage_error)?;
        debug!(service = service.as_str(), "OAuth session discarded");
        Ok(())
    }

    /// Whether an OAuth session is currently pending for a service.
    pub async fn has_pending_oauth_session(&self, service: Service) -> Result<bool> {
        self.session
            .contains(&state_key(service))
            .await
            .map_err(storage_error)
    }
}

fn token_key(service: Service) -> String {
    format!("{}_token", service.as_str())
}

fn state_key(service: Service) -> String {
    format!("{}_oauth_state", service.as_str())
}

fn credentials_key(service: Service) -> String {
    format!("{}_oauth_credentials", service.as_str())
}

fn storage_error(e: bridge_traits::BridgeError) -> AuthError {
    AuthError::Storage(e.to_string())
}

/// Generate a random, unguessable, URL-safe state nonce.
fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    /// In-memory store used for both storage bridges in tests.
    #[derive(Clone, Default)]
    struct MemoryStore {
        entries: Arc<Mutex<HashMap<String, String>>>,
    }

    #[async_trait]
    impl DurableStore for MemoryStore {
        async fn set(&self, key: &str, value: &str) -> BridgeResult<()> {
            self.entries
                .lock()
                .await
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn get(&self, key: &str) -> BridgeResult<Option<String>> {
            Ok(self.entries.lock().await.get(key).cloned())
        }

        async fn delete(&self, key: &str) -> BridgeResult<()> {
            self.entries.lock().await.remove(key);
            Ok(())
        }
    }

    #[async_trait]
    impl SessionStore for MemoryStore {
        async fn set(&self, key: &str, value: &str) -> BridgeResult<()> {
            self.entries
                .lock()
                .await
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn get(&self, key: &str) -> BridgeResult<Option<String>> {
            Ok(self.entries.lock().await.get(key).cloned())
        }

        async fn delete(&self, key: &str) -> BridgeResult<()> {
            self.entries.lock().await.remove(key);
            Ok(())
        }
    }

    fn store() -> CredentialStore {
        CredentialStore::new(
            Arc::new(MemoryStore::default()),
            Arc::new(MemoryStore::default()),
        )
    }

    fn oauth_credentials() -> OAuthCredentials {
        OAuthCredentials {
            instance_domain: "mastodon.social".to_string(),
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            redirect_uri: "http://localhost:5173/".to_string(),
        }
    }

    #[tokio::test]
    async fn test_token_round_trip() {
        let store = store();

        assert!(store.token(Service::Mastodon).await.unwrap().is_none());

        store
            .set_token(Service::Mastodon, &Token::new("abc123"))
            .await
            .unwrap();
        let token = store.token(Service::Mastodon).await.unwrap().unwrap();
        assert_eq!(token.as_str(), "abc123");
    }

    #[tokio::test]
    async fn test_set_token_overwrites() {
        let store = store();

        store
            .set_token(Service::Mastodon, &Token::new("first"))
            .await
            .unwrap();
        store
            .set_token(Service::Mastodon, &Token::new("second"))
            .await
            .unwrap();

        let token = store.token(Service::Mastodon).await.unwrap().unwrap();
        assert_eq!(token.as_str(), "second");
    }

    #[tokio::test]
    async fn test_clear_token_is_idempotent() {
        let store = store();

        store
            .set_token(Service::Mastodon, &Token::new("abc123"))
            .await
            .unwrap();
        store.clear_token(Service::Mastodon).await.unwrap();
        assert!(store.token(Service::Mastodon).await.unwrap().is_none());

        // Second clear succeeds and leaves the terminal absent state.
        store.clear_token(Service::Mastodon).await.unwrap();
        assert!(store.token(Service::Mastodon).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tokens_are_per_service() {
        let store = store();

        store
            .set_token(Service::Mastodon, &Token::new("mastodon-token"))
            .await
            .unwrap();

        assert!(store.token(Service::Twitter).await.unwrap().is_none());
        assert!(store.token(Service::Facebook).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oauth_session_round_trip() {
        let store = store();
        let credentials = oauth_credentials();

        let nonce = store
            .begin_oauth_session(Service::Mastodon, &credentials)
            .await
            .unwrap();
        assert!(!nonce.is_empty());
        assert!(store
            .has_pending_oauth_session(Service::Mastodon)
            .await
            .unwrap());

        let recovered = store
            .consume_oauth_session(Service::Mastodon, &nonce)
            .await
            .unwrap();
        assert_eq!(recovered, credentials);

        // Consumed exactly once: the session is gone.
        assert!(!store
            .has_pending_oauth_session(Service::Mastodon)
            .await
            .unwrap());
        let replay = store.consume_oauth_session(Service::Mastodon, &nonce).await;
        assert!(matches!(replay, Err(AuthError::CsrfMismatch)));
    }

    #[tokio::test]
    async fn test_consume_with_wrong_nonce_fails_without_mutating() {
        let store = store();
        let credentials = oauth_credentials();

        store
            .set_token(Service::Mastodon, &Token::new("existing"))
            .await
            .unwrap();
        let nonce = store
            .begin_oauth_session(Service::Mastodon, &credentials)
            .await
            .unwrap();

        let result = store.consume_oauth_session(Service::Mastodon, "forged").await;
        assert!(matches!(result, Err(AuthError::CsrfMismatch)));

        // Neither the token nor the pending session was touched.
        let token = store.token(Service::Mastodon).await.unwrap().unwrap();
        assert_eq!(token.as_str(), "existing");
        assert!(store
            .has_pending_oauth_session(Service::Mastodon)
            .await
            .unwrap());

        // The real nonce still works afterwards.
        let recovered = store
            .consume_oauth_session(Service::Mastodon, &nonce)
            .await
            .unwrap();
        assert_eq!(recovered, credentials);
    }

    #[tokio::test]
    async fn test_consume_without_session_fails() {
        let store = store();

        let result = store.consume_oauth_session(Service::Mastodon, "xyz").await;
        assert!(matches!(result, Err(AuthError::CsrfMismatch)));
    }

    #[tokio::test]
    async fn test_abort_oauth_session_is_idempotent() {
        let store = store();
        let credentials = oauth_credentials();

        store
            .begin_oauth_session(Service::Mastodon, &credentials)
            .await
            .unwrap();
        store.abort_oauth_session(Service::Mastodon).await.unwrap();
        assert!(!store
            .has_pending_oauth_session(Service::Mastodon)
            .await
            .unwrap());

        store.abort_oauth_session(Service::Mastodon).await.unwrap();
    }

    #[tokio::test]
    async fn test_new_session_replaces_pending_nonce() {
        let store = store();
        let credentials = oauth_credentials();

        let first = store
            .begin_oauth_session(Service::Mastodon, &credentials)
            .await
            .unwrap();
        let second = store
            .begin_oauth_session(Service::Mastodon, &credentials)
            .await
            .unwrap();

        assert_ne!(first, second);

        // Only the most recent nonce is accepted.
        let stale = store.consume_oauth_session(Service::Mastodon, &first).await;
        assert!(matches!(stale, Err(AuthError::CsrfMismatch)));
        assert!(store
            .consume_oauth_session(Service::Mastodon, &second)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_nonce_generation_is_unique() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            assert!(seen.insert(generate_nonce()));
        }
    }

    #[tokio::test]
    async fn test_corrupted_session_credentials_are_discarded() {
        let session = Arc::new(MemoryStore::default());
        let store = CredentialStore::new(Arc::new(MemoryStore::default()), session.clone());

        SessionStore::set(session.as_ref(), "mastodon_oauth_state", "xyz")
            .await
            .unwrap();
        SessionStore::set(
            session.as_ref(),
            "mastodon_oauth_credentials",
            "not valid json",
        )
        .await
        .unwrap();

        let result = store.consume_oauth_session(Service::Mastodon, "xyz").await;
        assert!(matches!(result, Err(AuthError::Storage(_))));

        // The corrupted session was cleaned up.
        assert!(!store
            .has_pending_oauth_session(Service::Mastodon)
            .await
            .unwrap());
    }
}
