//! # Core Configuration Module
//!
//! Provides configuration management for the observatory core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! [`CoreConfig`] instance holding the bridge handles and settings the core
//! needs. It enforces fail-fast validation so a missing host capability is
//! reported at startup with an actionable message, not at first use.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - calls against the observatory backend
//! - `DurableStore` - token persistence across restarts
//! - `SessionStore` - in-flight OAuth artifact persistence
//! - `Navigator` - the OAuth redirect leg
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .backend_base_url("http://localhost:8000")
//!     .http_client(Arc::new(MyHttpClient))
//!     .durable_store(Arc::new(MyDurableStore))
//!     .session_store(Arc::new(MySessionStore))
//!     .navigator(Arc::new(MyNavigator))
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{DurableStore, HttpClient, Navigator, SessionStore};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default observatory backend address (the development backend).
pub const DEFAULT_BACKEND_BASE_URL: &str = "http://localhost:8000";

/// Default timeout applied to every remote call. Expiry is reported to the
/// caller as a transport failure, never as token invalidity.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default event bus buffer capacity.
pub const DEFAULT_EVENT_BUFFER: usize = 128;

/// Core configuration for the observatory core.
///
/// Use [`CoreConfig::builder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Base URL of the observatory backend.
    pub backend_base_url: Url,

    /// Timeout applied to each remote call.
    pub request_timeout: Duration,

    /// Event bus buffer capacity.
    pub event_buffer: usize,

    /// HTTP client bridge.
    pub http_client: Arc<dyn HttpClient>,

    /// Durable storage bridge (tokens).
    pub durable_store: Arc<dyn DurableStore>,

    /// Session-scoped storage bridge (pending OAuth artifacts).
    pub session_store: Arc<dyn SessionStore>,

    /// Navigation bridge (OAuth redirect leg).
    pub navigator: Arc<dyn Navigator>,
}

impl CoreConfig {
    /// Start building a configuration.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    backend_base_url: Option<String>,
    request_timeout: Option<Duration>,
    event_buffer: Option<usize>,
    http_client: Option<Arc<dyn HttpClient>>,
    durable_store: Option<Arc<dyn DurableStore>>,
    session_store: Option<Arc<dyn SessionStore>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl CoreConfigBuilder {
    /// Set the observatory backend base URL.
    pub fn backend_base_url(mut self, url: impl Into<String>) -> Self {
        self.backend_base_url = Some(url.into());
        self
    }

    /// Set the per-request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the event bus buffer capacity.
    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = Some(capacity);
        self
    }

    /// Provide the HTTP client bridge.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Provide the durable storage bridge.
    pub fn durable_store(mut self, store: Arc<dyn DurableStore>) -> Self {
        self.durable_store = Some(store);
        self
    }

    /// Provide the session-scoped storage bridge.
    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    /// Provide the navigation bridge.
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::CapabilityMissing` when a required bridge handle was
    /// not provided, and `Error::Config` when the backend base URL does not
    /// parse.
    pub fn build(self) -> Result<CoreConfig> {
        let base = self
            .backend_base_url
            .unwrap_or_else(|| DEFAULT_BACKEND_BASE_URL.to_string());
        let backend_base_url = Url::parse(&base)
            .map_err(|e| Error::Config(format!("Invalid backend base URL '{}': {}", base, e)))?;

        let http_client = self.http_client.ok_or_else(|| Error::CapabilityMissing {
            capability: "HttpClient".to_string(),
            message: "No HTTP client implementation provided. \
                      Desktop: enable the desktop-shims feature or inject \
                      bridge_desktop::ReqwestHttpClient."
                .to_string(),
        })?;

        let durable_store = self.durable_store.ok_or_else(|| Error::CapabilityMissing {
            capability: "DurableStore".to_string(),
            message: "No durable store implementation provided. \
                      Desktop: inject bridge_desktop::SqliteDurableStore. \
                      Tests: inject an in-memory store."
                .to_string(),
        })?;

        let session_store = self.session_store.ok_or_else(|| Error::CapabilityMissing {
            capability: "SessionStore".to_string(),
            message: "No session store implementation provided. \
                      Desktop: inject bridge_desktop::MemorySessionStore."
                .to_string(),
        })?;

        let navigator = self.navigator.ok_or_else(|| Error::CapabilityMissing {
            capability: "Navigator".to_string(),
            message: "No navigator implementation provided. \
                      Desktop: inject bridge_desktop::ConsoleNavigator."
                .to_string(),
        })?;

        Ok(CoreConfig {
            backend_base_url,
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            event_buffer: self.event_buffer.unwrap_or(DEFAULT_EVENT_BUFFER),
            http_client,
            durable_store,
            session_store,
            navigator,
        })
    }
}
