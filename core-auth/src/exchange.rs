//! Credential Exchange
//!
//! Turns credentials into tokens. Two strategies, selected by which
//! credential shape the caller holds:
//!
//! - **Direct**: one request carrying instance URL, email, and password to
//!   the backend's authorize endpoint.
//! - **Authorization-code**: a redirect to the instance's authorization
//!   endpoint (built here, navigated by the caller), then one request
//!   exchanging the returned code at the backend's callback endpoint.
//!
//! Every failed exchange is reported as `AuthFailed` carrying the backend's
//! `detail` message when one was supplied; stored tokens are never touched
//! from here.

use crate::error::{AuthError, Result};
use crate::types::{DirectCredentials, OAuthCredentials, Service, Token, TokenGrant};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

const GENERIC_FAILURE: &str = "Authentication failed";

/// Performs credential and authorization-code exchanges against the
/// observatory backend.
pub struct AuthExchanger {
    http_client: Arc<dyn HttpClient>,
    backend_base_url: Url,
    request_timeout: Duration,
}

impl AuthExchanger {
    /// Create a new exchanger.
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

    /// Exchange direct credentials for a token.
    ///
    /// Issues a single `POST /auth/<service>/authorize` request with the
    /// credentials as JSON body.
    ///
    /// # Errors
    ///
    /// - `ServiceNotImplemented` - no exchange endpoint exists for the service
    /// - `AuthFailed` - the backend rejected the credentials, the response
    ///   was unreadable, or the backend was unreachable
    #[instrument(skip(self, credentials), fields(service = %service))]
    pub async fn exchange_direct(
        &self,
        service: Service,
        credentials: &DirectCredentials,
    ) -> Result<TokenGrant> {
        let url = self.endpoint(service, "authorize")?;

        debug!("Exchanging direct credentials for a token");

        let request = HttpRequest::new(HttpMethod::Post, url.as_str())
            .json(credentials)
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .timeout(self.request_timeout);

        let response = match self.http_client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Direct exchange could not reach the backend");
                return Err(AuthError::AuthFailed {
                    reason: "Could not reach the authorization service".to_string(),
                });
            }
        };

        Self::parse_grant(response)
    }

    /// Build the authorization endpoint URL for the OAuth redirect leg.
    ///
    /// Deterministically constructs
    /// `https://<instance_domain>/oauth/authorize` with query parameters
    /// `client_id`, `redirect_uri`, `response_type=code`, `scope=read`, and
    /// `state`, all values URL-escaped. Pure function: no side effects, no
    /// network call. Navigating to the URL is the caller's responsibility.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` when the instance domain does not form a valid
    /// HTTPS URL.
    pub fn build_redirect_url(
        &self,
        credentials: &OAuthCredentials,
        state_nonce: &str,
    ) -> Result<Url> {
        let domain = credentials.instance_domain.trim().trim_end_matches('/');
        let domain = domain
            .strip_prefix("https://")
            .or_else(|| domain.strip_prefix("http://"))
            .unwrap_or(domain);

        let mut url = Url::parse(&format!("https://{}/oauth/authorize", domain))
            .map_err(|e| AuthError::InvalidUrl(format!("instance domain '{}': {}", domain, e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", &credentials.client_id)
            .append_pair("redirect_uri", &credentials.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", "read")
            .append_pair("state", state_nonce);

        Ok(url)
    }

    /// Exchange an authorization code for a token.
    ///
    /// Issues a single `POST /auth/<service>/callback` request carrying the
    /// code, the state, and the OAuth credentials recovered from the pending
    /// session.
    ///
    /// # Errors
    ///
    /// Same conditions as [`exchange_direct`](Self::exchange_direct).
    #[instrument(skip(self, code, state, credentials), fields(service = %service))]
    pub async fn exchange_code(
        &self,
        service: Service,
        code: &str,
        state: &str,
        credentials: &OAuthCredentials,
    ) -> Result<TokenGrant> {
        let url = self.endpoint(service, "callback")?;

        #[derive(Serialize)]
        struct CallbackExchangeRequest<'a> {
            code: &'a str,
            state: &'a str,
            credentials: &'a OAuthCredentials,
        }

        debug!("Exchanging authorization code for a token");

        let body = CallbackExchangeRequest {
            code,
            state,
            credentials,
        };
        let request = HttpRequest::new(HttpMethod::Post, url.as_str())
            .json(&body)
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .timeout(self.request_timeout);

        let response = match self.http_client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Code exchange could not reach the backend");
                return Err(AuthError::AuthFailed {
                    reason: "Could not reach the authorization service".to_string(),
                });
            }
        };

        Self::parse_grant(response)
    }

    fn endpoint(&self, service: Service, leg: &str) -> Result<Url> {
        if !service.is_supported() {
            return Err(AuthError::ServiceNotImplemented(service));
        }
        self.backend_base_url
            .join(&format!("auth/{}/{}", service.as_str(), leg))
            .map_err(|e| AuthError::InvalidUrl(e.to_string()))
    }

    fn parse_grant(response: HttpResponse) -> Result<TokenGrant> {
        if !response.is_success() {
            let reason = response
                .json::<ErrorDetail>()
                .map(|d| d.detail)
                .unwrap_or_else(|_| GENERIC_FAILURE.to_string());
            warn!(status = response.status, "Exchange rejected by backend");
            return Err(AuthError::AuthFailed { reason });
        }

        let grant: TokenGrantResponse = response.json().map_err(|e| {
            warn!(error = %e, "Exchange response could not be parsed");
            AuthError::AuthFailed {
                reason: "Authorization service returned an unreadable response".to_string(),
            }
        })?;

        info!(
            has_expiry = grant.expires_at.is_some(),
            "Exchange succeeded"
        );

        Ok(TokenGrant {
            token: Token::new(grant.token),
            expires_at: grant.expires_at,
        })
    }
}

/// Token response from the backend's exchange endpoints.
#[derive(Debug, Deserialize)]
struct TokenGrantResponse {
    token: String,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

/// Failure response body from the backend.
#[derive(Debug, Deserialize)]
struct ErrorDetail {
    detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bytes::Bytes;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct ScriptedHttpClient {
        responses: Mutex<Vec<BridgeResult<HttpResponse>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedHttpClient {
        fn with_json(status: u16, body: &str) -> Self {
            let client = Self::default();
            client.responses.try_lock().unwrap().push(Ok(HttpResponse {
                status,
                headers: HashMap::new(),
                body: Bytes::from(body.to_string()),
            }));
            client
        }

        fn with_transport_failure() -> Self {
            let client = Self::default();
            client
                .responses
                .try_lock()
                .unwrap()
                .push(Err(BridgeError::OperationFailed(
                    "connection reset".to_string(),
                )));
            client
        }

        async fn last_request(&self) -> HttpRequest {
            self.requests.lock().await.last().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpClient for ScriptedHttpClient {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
            self.requests.lock().await.push(request);
            let mut responses = self.responses.lock().await;
            if responses.is_empty() {
                return Err(BridgeError::OperationFailed(
                    "no scripted response left".to_string(),
                ));
            }
            responses.remove(0)
        }
    }

    fn exchanger(client: Arc<ScriptedHttpClient>) -> AuthExchanger {
        AuthExchanger::new(
            client,
            Url::parse("http://localhost:8000").unwrap(),
            Duration::from_secs(10),
        )
    }

    fn direct_credentials() -> DirectCredentials {
        DirectCredentials {
            api_base_url: "https://mastodon.social".to_string(),
            user_email: "user@example.com".to_string(),
            user_pass: "hunter2".to_string(),
        }
    }

    fn oauth_credentials() -> OAuthCredentials {
        OAuthCredentials {
            instance_domain: "mastodon.social".to_string(),
            client_id: "client id".to_string(),
            client_secret: "client-secret".to_string(),
            redirect_uri: "http://localhost:5173/callback".to_string(),
        }
    }

    #[tokio::test]
    async fn test_exchange_direct_success() {
        let client = Arc::new(ScriptedHttpClient::with_json(
            200,
            r#"{"token": "abc123", "expires_at": "2026-09-05T12:00:00Z"}"#,
        ));
        let exchanger = exchanger(client.clone());

        let grant = exchanger
            .exchange_direct(Service::Mastodon, &direct_credentials())
            .await
            .unwrap();
        assert_eq!(grant.token.as_str(), "abc123");
        assert!(grant.expires_at.is_some());

        let request = client.last_request().await;
        assert_eq!(request.url, "http://localhost:8000/auth/mastodon/authorize");
        let body = String::from_utf8(request.body.unwrap().to_vec()).unwrap();
        assert!(body.contains("\"api_base_url\":\"https://mastodon.social\""));
        assert!(body.contains("\"user_email\":\"user@example.com\""));
        assert!(body.contains("\"user_pass\":\"hunter2\""));
    }

    #[tokio::test]
    async fn test_exchange_direct_without_expiry() {
        let client = Arc::new(ScriptedHttpClient::with_json(200, r#"{"token": "abc123"}"#));
        let exchanger = exchanger(client);

        let grant = exchanger
            .exchange_direct(Service::Mastodon, &direct_credentials())
            .await
            .unwrap();
        assert_eq!(grant.token.as_str(), "abc123");
        assert!(grant.expires_at.is_none());
    }

    #[tokio::test]
    async fn test_exchange_direct_carries_server_detail() {
        let client = Arc::new(ScriptedHttpClient::with_json(
            401,
            r#"{"detail": "Failed to authenticate with Mastodon: bad password"}"#,
        ));
        let exchanger = exchanger(client);

        let result = exchanger
            .exchange_direct(Service::Mastodon, &direct_credentials())
            .await;
        match result {
            Err(AuthError::AuthFailed { reason }) => {
                assert!(reason.contains("bad password"));
            }
            other => panic!("Expected AuthFailed, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_exchange_direct_generic_reason_without_detail() {
        let client = Arc::new(ScriptedHttpClient::with_json(500, "gateway exploded"));
        let exchanger = exchanger(client);

        let result = exchanger
            .exchange_direct(Service::Mastodon, &direct_credentials())
            .await;
        match result {
            Err(AuthError::AuthFailed { reason }) => {
                assert_eq!(reason, GENERIC_FAILURE);
            }
            other => panic!("Expected AuthFailed, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_exchange_direct_transport_failure_is_auth_failed() {
        let client = Arc::new(ScriptedHttpClient::with_transport_failure());
        let exchanger = exchanger(client);

        let result = exchanger
            .exchange_direct(Service::Mastodon, &direct_credentials())
            .await;
        assert!(matches!(result, Err(AuthError::AuthFailed { .. })));
    }

    #[tokio::test]
    async fn test_exchange_direct_unsupported_service() {
        let client = Arc::new(ScriptedHttpClient::default());
        let exchanger = exchanger(client.clone());

        let result = exchanger
            .exchange_direct(Service::Facebook, &direct_credentials())
            .await;
        assert!(matches!(
            result,
            Err(AuthError::ServiceNotImplemented(Service::Facebook))
        ));
        assert!(client.requests.lock().await.is_empty());
    }

    #[test]
    fn test_build_redirect_url() {
        let client = Arc::new(ScriptedHttpClient::default());
        let exchanger = exchanger(client);

        let url = exchanger
            .build_redirect_url(&oauth_credentials(), "xyz")
            .unwrap();

        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("mastodon.social"));
        assert_eq!(url.path(), "/oauth/authorize");

        let query = url.query().unwrap();
        assert!(query.contains("client_id=client+id") || query.contains("client_id=client%20id"));
        assert!(query.contains("redirect_uri=http%3A%2F%2Flocalhost%3A5173%2Fcallback"));
        assert!(query.contains("response_type=code"));
        assert!(query.contains("scope=read"));
        assert!(query.contains("state=xyz"));
    }

    #[test]
    fn test_build_redirect_url_is_deterministic() {
        let client = Arc::new(ScriptedHttpClient::default());
        let exchanger = exchanger(client);
        let credentials = oauth_credentials();

        let first = exchanger.build_redirect_url(&credentials, "xyz").unwrap();
        let second = exchanger.build_redirect_url(&credentials, "xyz").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_build_redirect_url_tolerates_scheme_prefix() {
        let client = Arc::new(ScriptedHttpClient::default());
        let exchanger = exchanger(client);

        let mut credentials = oauth_credentials();
        credentials.instance_domain = "https://mastodon.social/".to_string();

        let url = exchanger.build_redirect_url(&credentials, "xyz").unwrap();
        assert_eq!(url.host_str(), Some("mastodon.social"));
        assert_eq!(url.path(), "/oauth/authorize");
    }

    #[test]
    fn test_build_redirect_url_rejects_empty_domain() {
        let client = Arc::new(ScriptedHttpClient::default());
        let exchanger = exchanger(client);

        let mut credentials = oauth_credentials();
        credentials.instance_domain = "".to_string();

        let result = exchanger.build_redirect_url(&credentials, "xyz");
        assert!(matches!(result, Err(AuthError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_exchange_code_success() {
        let client = Arc::new(ScriptedHttpClient::with_json(200, r#"{"token": "tok9"}"#));
        let exchanger = exchanger(client.clone());

        let grant = exchanger
            .exchange_code(Service::Mastodon, "c1", "xyz", &oauth_credentials())
            .await
            .unwrap();
        assert_eq!(grant.token.as_str(), "tok9");

        let request = client.last_request().await;
        assert_eq!(request.url, "http://localhost:8000/auth/mastodon/callback");
        let body: serde_json::Value =
            serde_json::from_slice(&request.body.unwrap()).unwrap();
        assert_eq!(body["code"], "c1");
        assert_eq!(body["state"], "xyz");
        assert_eq!(body["credentials"]["instance_domain"], "mastodon.social");
        assert_eq!(body["credentials"]["client_id"], "client id");
    }

    #[tokio::test]
    async fn test_exchange_code_carries_server_detail() {
        let client = Arc::new(ScriptedHttpClient::with_json(
            400,
            r#"{"detail": "Authorization code expired"}"#,
        ));
        let exchanger = exchanger(client);

        let result = exchanger
            .exchange_code(Service::Mastodon, "c1", "xyz", &oauth_credentials())
            .await;
        match result {
            Err(AuthError::AuthFailed { reason }) => {
                assert_eq!(reason, "Authorization code expired");
            }
            other => panic!("Expected AuthFailed, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_unreadable_success_body_is_auth_failed() {
        let client = Arc::new(ScriptedHttpClient::with_json(200, "not json"));
        let exchanger = exchanger(client);

        let result = exchanger
            .exchange_direct(Service::Mastodon, &direct_credentials())
            .await;
        assert!(matches!(result, Err(AuthError::AuthFailed { .. })));
    }
}
