//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the observatory core and
//! platform-specific implementations. Each trait represents a capability the
//! core requires but that must be provided differently per host (desktop
//! daemon, browser shell, test harness).
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations against the
//!   observatory backend
//!
//! ### Storage
//! - [`DurableStore`](storage::DurableStore) - Key-value persistence that
//!   survives restart (holds issued access tokens)
//! - [`SessionStore`](storage::SessionStore) - Key-value persistence scoped to
//!   a single session (holds in-flight OAuth artifacts)
//!
//! ### Navigation
//! - [`Navigator`](navigation::Navigator) - Full-page navigation capability
//!   used for the OAuth redirect leg
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Platform implementations should convert their native errors to
//! `BridgeError` and provide actionable messages.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent
//! usage across async tasks.

pub mod error;
pub mod http;
pub mod navigation;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use navigation::Navigator;
pub use storage::{DurableStore, SessionStore};
