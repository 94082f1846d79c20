//! Token Validation
//!
//! Confirms a held token is still accepted by the remote API via the
//! observatory backend's introspection endpoint. One read-only request, three
//! outcomes: accepted, rejected, or unreachable. Rejection and
//! unreachability are deliberately distinct errors: absence of confirmation
//! is not proof of invalidity, so only a rejection may trigger token cleanup
//! by the caller.

use crate::error::{AuthError, Result};
use crate::types::{Service, Token};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

/// Validates tokens against the observatory backend.
pub struct TokenValidator {
    http_client: Arc<dyn HttpClient>,
    backend_base_url: Url,
    request_timeout: Duration,
}

impl TokenValidator {
    /// Create a new validator.
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        backend_base_url: Url,
        request_timeout: Duration,
    ) -> Self {
        Self {
            http_client,
            backend_base_url,
            request_timeout,
        }
    }

    /// Check whether the remote API still accepts `token`.
    ///
    /// Issues a single `GET /auth/<service>/check?token=...` request.
    ///
    /// # Errors
    ///
    /// - `ServiceNotImplemented` - no introspection endpoint exists for the
    ///   service; no network call is made
    /// - `Unauthorized` - the backend answered non-2xx; the token is no
    ///   longer good
    /// - `Network` - transport failure or timeout; the token's validity is
    ///   unsettled
    #[instrument(skip(self, token), fields(service = %service))]
    pub async fn check(&self, service: Service, token: &Token) -> Result<()> {
        if !service.is_supported() {
            return Err(AuthError::ServiceNotImplemented(service));
        }

        let mut url = self
            .backend_base_url
            .join(&format!("auth/{}/check", service.as_str()))
            .map_err(|e| AuthError::InvalidUrl(e.to_string()))?;
        url.query_pairs_mut().append_pair("token", token.as_str());

        debug!("Checking token against backend");

        let request = HttpRequest::new(HttpMethod::Get, url.as_str()).timeout(self.request_timeout);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if response.is_success() {
            debug!("Token accepted");
            Ok(())
        } else {
            warn!(status = response.status, "Token rejected by backend");
            Err(AuthError::Unauthorized)
        }
    }
}
