//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, storage,
//! navigation) into the authorization core. Desktop apps typically enable
//! the `desktop-shims` feature (which depends on `bridge-desktop`) and call
//! [`CoreService::with_desktop_defaults`]; other hosts assemble a
//! [`CoreConfig`](core_runtime::config::CoreConfig) from their own adapters.

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use core_auth::{AuthExchanger, AuthorizationStateMachine, CredentialStore, TokenValidator};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus};
use tokio::sync::broadcast;

#[cfg(feature = "desktop-shims")]
use std::path::PathBuf;

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    authorization: Arc<AuthorizationStateMachine>,
    event_bus: EventBus,
}

impl CoreService {
    /// Create a new service from a validated configuration.
    pub fn new(config: CoreConfig) -> Self {
        let event_bus = EventBus::new(config.event_buffer);

        let store = CredentialStore::new(
            Arc::clone(&config.durable_store),
            Arc::clone(&config.session_store),
        );
        let validator = TokenValidator::new(
            Arc::clone(&config.http_client),
            config.backend_base_url.clone(),
            config.request_timeout,
        );
        let exchanger = AuthExchanger::new(
            Arc::clone(&config.http_client),
            config.backend_base_url.clone(),
            config.request_timeout,
        );

        let authorization = Arc::new(AuthorizationStateMachine::new(
            store,
            validator,
            exchanger,
            Arc::clone(&config.navigator),
            event_bus.clone(),
        ));

        Self {
            authorization,
            event_bus,
        }
    }

    /// Bootstrap a service with the desktop bridge adapters.
    ///
    /// Tokens are persisted in a SQLite database at `db_path`; OAuth redirect
    /// URLs are surfaced through the console navigator.
    #[cfg(feature = "desktop-shims")]
    pub async fn with_desktop_defaults(
        db_path: PathBuf,
        backend_base_url: impl Into<String>,
    ) -> Result<Self> {
        tracing::info!(path = ?db_path, "Bootstrapping core service with desktop bridges");

        let durable_store = bridge_desktop::SqliteDurableStore::new(db_path)
            .await
            .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;

        let config = CoreConfig::builder()
            .backend_base_url(backend_base_url)
            .http_client(Arc::new(bridge_desktop::ReqwestHttpClient::new()))
            .durable_store(Arc::new(durable_store))
            .session_store(Arc::new(bridge_desktop::MemorySessionStore::new()))
            .navigator(Arc::new(bridge_desktop::ConsoleNavigator::new()))
            .build()?;

        Ok(Self::new(config))
    }

    /// Access the per-service authorization state machine.
    pub fn authorization(&self) -> Arc<AuthorizationStateMachine> {
        Arc::clone(&self.authorization)
    }

    /// Access the event bus feeding status displays.
    pub fn events(&self) -> EventBus {
        self.event_bus.clone()
    }

    /// Subscribe to core events.
    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.event_bus.subscribe()
    }
}
