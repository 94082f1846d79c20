//! # Event Bus System
//!
//! Provides an event-driven architecture for the observatory core using
//! `tokio::sync::broadcast`. The authorization state machine emits typed
//! events here; presentation layers subscribe to keep status indicators live
//! without polling.
//!
//! ## Usage
//!
//! ### Publishing Events
//!
//! ```rust
//! use core_runtime::events::{EventBus, CoreEvent, AuthEvent};
//!
//! # let event_bus = EventBus::new(100);
//! let event = CoreEvent::Auth(AuthEvent::Authorized {
//!     service: "mastodon".to_string(),
//!     expires_at: None,
//! });
//!
//! event_bus.emit(event).ok();
//! ```
//!
//! ### Subscribing to Events
//!
//! ```rust
//! use core_runtime::events::{EventBus, CoreEvent};
//! use tokio::sync::broadcast::error::RecvError;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! tokio::spawn(async move {
//!     loop {
//!         match stream.recv().await {
//!             Ok(event) => println!("Received: {:?}", event),
//!             Err(RecvError::Lagged(n)) => eprintln!("Missed {} events", n),
//!             Err(RecvError::Closed) => break,
//!         }
//!     }
//! });
//! # }
//! ```
//!
//! ## Error Handling
//!
//! `tokio::sync::broadcast` produces two receive errors:
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events. Non-fatal;
//!   the subscriber can continue receiving new events.
//! - **`RecvError::Closed`**: all senders dropped. Treat as shutdown.
//!
//! Emitting to a bus with no subscribers is not an error worth surfacing;
//! callers conventionally write `event_bus.emit(event).ok()`.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Severity classification for events, used by hosts to prioritize display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSeverity {
    Info,
    Warning,
    Error,
}

/// Top-level event type for the observatory core.
///
/// Additional domains (crawl progress, parameter changes) hang off this enum
/// as they are built; authorization is the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CoreEvent {
    /// Authorization lifecycle events.
    Auth(AuthEvent),
}

impl CoreEvent {
    /// Classify the event's severity.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Auth(AuthEvent::AuthError { .. }) => EventSeverity::Error,
            CoreEvent::Auth(AuthEvent::CredentialsRequired { .. }) => EventSeverity::Warning,
            CoreEvent::Auth(_) => EventSeverity::Info,
        }
    }
}

/// Authorization lifecycle events.
///
/// Services are identified by their lower-case identifier string (e.g.
/// `"mastodon"`) so this crate stays independent of the domain types in
/// `core-auth`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AuthEvent {
    /// A token check against the remote API has started.
    CheckStarted {
        /// The service being checked.
        service: String,
    },
    /// The service holds a token the remote API accepts.
    Authorized {
        /// The authorized service.
        service: String,
        /// Token expiry reported by the backend, if any (Unix epoch seconds).
        expires_at: Option<i64>,
    },
    /// The service needs credentials before it can crawl.
    CredentialsRequired {
        /// The affected service.
        service: String,
        /// Why credentials are needed (no token, token invalid, exchange
        /// rejected).
        reason: String,
    },
    /// An OAuth redirect to the remote instance has been initiated. No
    /// further auth events fire for this service until the callback returns.
    RedirectStarted {
        /// The service being authorized.
        service: String,
    },
    /// A service's displayed status changed.
    StatusChanged {
        /// The affected service.
        service: String,
        /// Status kind identifier (`unknown`, `checking`, `authorized`,
        /// `unauthorized`, `error`).
        kind: String,
        /// Human-readable status message.
        message: String,
    },
    /// An authorization error occurred.
    AuthError {
        /// The affected service.
        service: String,
        /// Human-readable error message.
        message: String,
        /// Whether the error is retry-worthy (e.g. a transport failure).
        recoverable: bool,
    },
}

impl AuthEvent {
    /// Short human-readable description of the event kind.
    pub fn description(&self) -> &'static str {
        match self {
            AuthEvent::CheckStarted { .. } => "Token check started",
            AuthEvent::Authorized { .. } => "Service authorized",
            AuthEvent::CredentialsRequired { .. } => "Credentials required",
            AuthEvent::RedirectStarted { .. } => "OAuth redirect started",
            AuthEvent::StatusChanged { .. } => "Status changed",
            AuthEvent::AuthError { .. } => "Authorization error",
        }
    }
}

/// Central broadcast channel for core events.
///
/// Cloning the bus is cheap; all clones share the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    ///
    /// Slow subscribers that fall more than `capacity` events behind receive
    /// `RecvError::Lagged` and skip ahead.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all current subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are none. Having no subscribers is a normal condition.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, broadcast::error::SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Create a new subscription to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_and_receive() {
        let bus = EventBus::new(16);
        let mut receiver = bus.subscribe();

        let event = CoreEvent::Auth(AuthEvent::CheckStarted {
            service: "mastodon".to_string(),
        });
        bus.emit(event.clone()).unwrap();

        let received = receiver.recv().await.unwrap();
        assert_eq!(received, event);
    }

    #[tokio::test]
    async fn test_emit_without_subscribers() {
        let bus = EventBus::new(16);

        let result = bus.emit(CoreEvent::Auth(AuthEvent::CheckStarted {
            service: "mastodon".to_string(),
        }));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new(16);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(CoreEvent::Auth(AuthEvent::RedirectStarted {
            service: "mastodon".to_string(),
        }))
        .unwrap();

        assert!(first.try_recv().is_ok());
        assert!(second.try_recv().is_ok());
    }

    #[test]
    fn test_severity_classification() {
        let error = CoreEvent::Auth(AuthEvent::AuthError {
            service: "mastodon".to_string(),
            message: "boom".to_string(),
            recoverable: true,
        });
        assert_eq!(error.severity(), EventSeverity::Error);

        let warning = CoreEvent::Auth(AuthEvent::CredentialsRequired {
            service: "mastodon".to_string(),
            reason: "No token found".to_string(),
        });
        assert_eq!(warning.severity(), EventSeverity::Warning);

        let info = CoreEvent::Auth(AuthEvent::Authorized {
            service: "mastodon".to_string(),
            expires_at: None,
        });
        assert_eq!(info.severity(), EventSeverity::Info);
    }

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::Auth(AuthEvent::StatusChanged {
            service: "mastodon".to_string(),
            kind: "authorized".to_string(),
            message: "Authorized".to_string(),
        });

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deserialized);
    }
}
