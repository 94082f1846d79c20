use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Crawlable social-media services.
///
/// Only Mastodon authorization is implemented; Twitter and Facebook are
/// reserved variants whose status never leaves "Not checked".
///
/// # Examples
///
/// ```
/// use core_auth::Service;
///
/// assert!(Service::Mastodon.is_supported());
/// assert!(!Service::Twitter.is_supported());
/// assert_eq!(Service::Mastodon.as_str(), "mastodon");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Service {
    /// A Mastodon instance (the only implemented service)
    Mastodon,
    /// Reserved, not implemented
    Twitter,
    /// Reserved, not implemented
    Facebook,
}

impl Service {
    /// All known services, in display order.
    pub const ALL: [Service; 3] = [Service::Mastodon, Service::Twitter, Service::Facebook];

    /// Get the human-readable display name for this service.
    pub fn display_name(&self) -> &'static str {
        match self {
            Service::Mastodon => "Mastodon",
            Service::Twitter => "Twitter",
            Service::Facebook => "Facebook",
        }
    }

    /// Get the service identifier string.
    ///
    /// Used in backend endpoint paths and storage keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Mastodon => "mastodon",
            Service::Twitter => "twitter",
            Service::Facebook => "facebook",
        }
    }

    /// Parse a service from a string identifier.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_auth::Service;
    ///
    /// assert_eq!(Service::parse("mastodon"), Some(Service::Mastodon));
    /// assert_eq!(Service::parse("invalid"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mastodon" => Some(Service::Mastodon),
            "twitter" => Some(Service::Twitter),
            "facebook" => Some(Service::Facebook),
            _ => None,
        }
    }

    /// Whether an authorization flow exists for this service.
    pub fn is_supported(&self) -> bool {
        matches!(self, Service::Mastodon)
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Opaque bearer token issued by the observatory backend.
///
/// # Security
///
/// The `Debug` implementation redacts the value; tokens must never reach the
/// log stream.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// Wrap an opaque token string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the token value for use in a request.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token").field(&"[REDACTED]").finish()
    }
}

/// Credentials for the direct (username/password) exchange.
///
/// Consumed once per submit; never persisted. Field names are the backend's
/// wire names.
#[derive(Clone, Serialize)]
pub struct DirectCredentials {
    /// Base URL of the user's instance (e.g. `https://mastodon.social`)
    pub api_base_url: String,
    /// Account email
    pub user_email: String,
    /// Account password
    pub user_pass: String,
}

impl fmt::Debug for DirectCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectCredentials")
            .field("api_base_url", &self.api_base_url)
            .field("user_email", &self.user_email)
            .field("user_pass", &"[REDACTED]")
            .finish()
    }
}

/// Registered-application credentials for the OAuth redirect flow.
///
/// Persisted transiently in the session store for the duration of one
/// redirect round-trip, then deleted.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthCredentials {
    /// Domain of the user's instance (e.g. `mastodon.social`)
    pub instance_domain: String,
    /// OAuth client ID of the registered application
    pub client_id: String,
    /// OAuth client secret of the registered application
    pub client_secret: String,
    /// Redirect URI the instance sends the authorization code back to
    pub redirect_uri: String,
}

impl fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("instance_domain", &self.instance_domain)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// A token issued by an exchange, with the expiry the backend reported.
///
/// The token is the primary signal; the expiry only feeds events and logs.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    /// The issued bearer token
    pub token: Token,
    /// Expiry reported by the backend, if any
    pub expires_at: Option<DateTime<Utc>>,
}

/// Status kind of a service's authorization, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusKind {
    /// Not checked yet
    Unknown,
    /// A check or exchange is in flight
    Checking,
    /// The held token is accepted by the remote API
    Authorized,
    /// Credentials are required (no token, token invalid, exchange rejected)
    Unauthorized,
    /// The last operation failed without settling the token's validity
    Error,
}

impl StatusKind {
    /// Get the status kind identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::Unknown => "unknown",
            StatusKind::Checking => "checking",
            StatusKind::Authorized => "authorized",
            StatusKind::Unauthorized => "unauthorized",
            StatusKind::Error => "error",
        }
    }

    /// Pure mapping from status kind to the presentation indicator.
    pub fn indicator(&self) -> Indicator {
        match self {
            StatusKind::Unknown | StatusKind::Checking => Indicator::Neutral,
            StatusKind::Authorized => Indicator::Success,
            StatusKind::Unauthorized | StatusKind::Error => Indicator::Failure,
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Color-coded indicator tag for status displays.
///
/// Presentation only; carries no state-machine logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Indicator {
    /// Nothing known yet (grey)
    Neutral,
    /// Authorized (green)
    Success,
    /// Anything that needs attention (red)
    Failure,
}

/// A service's displayed authorization status.
///
/// Never persisted; recomputed each session by the state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationStatus {
    /// Status kind
    pub kind: StatusKind,
    /// Human-readable status message
    pub message: String,
}

impl AuthorizationStatus {
    /// Build a status.
    pub fn new(kind: StatusKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The initial status of every service.
    pub fn unknown() -> Self {
        Self::new(StatusKind::Unknown, "Not checked")
    }

    /// Whether the service currently holds an accepted token.
    pub fn is_authorized(&self) -> bool {
        self.kind == StatusKind::Authorized
    }

    /// The indicator for this status.
    pub fn indicator(&self) -> Indicator {
        self.kind.indicator()
    }
}

impl Default for AuthorizationStatus {
    fn default() -> Self {
        Self::unknown()
    }
}

/// OAuth callback parameters extracted from an inbound query string.
#[derive(Debug, Clone, PartialEq)]
pub struct RedirectCallback {
    /// The authorization code issued by the instance
    pub code: String,
    /// The state nonce echoed back by the instance
    pub state: String,
}

impl RedirectCallback {
    /// Detect a pending OAuth callback in a query string.
    ///
    /// Returns `Some` only when both `code` and `state` are present and
    /// non-empty. Other parameters are ignored; a leading `?` is accepted.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_auth::RedirectCallback;
    ///
    /// let callback = RedirectCallback::from_query("?code=c1&state=xyz").unwrap();
    /// assert_eq!(callback.code, "c1");
    /// assert_eq!(callback.state, "xyz");
    ///
    /// assert!(RedirectCallback::from_query("tab=authorization").is_none());
    /// ```
    pub fn from_query(query: &str) -> Option<Self> {
        #[derive(Deserialize)]
        struct RawParams {
            code: Option<String>,
            state: Option<String>,
        }

        let trimmed = query.strip_prefix('?').unwrap_or(query);
        let raw: RawParams = serde_urlencoded::from_str(trimmed).ok()?;

        match (raw.code, raw.state) {
            (Some(code), Some(state)) if !code.is_empty() && !state.is_empty() => {
                Some(Self { code, state })
            }
            _ => None,
        }
    }
}
