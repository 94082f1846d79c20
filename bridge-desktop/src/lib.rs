//! # Desktop Bridge Implementations
//!
//! Concrete bridge adapters for desktop hosts:
//! - [`ReqwestHttpClient`] - HTTP via `reqwest` with retry and backoff
//! - [`SqliteDurableStore`] - durable key-value storage via SQLite
//! - [`MemorySessionStore`] - process-lifetime session storage
//! - [`ConsoleNavigator`] - surfaces OAuth redirect URLs to the operator

pub mod http;
pub mod navigation;
pub mod storage;

pub use http::ReqwestHttpClient;
pub use navigation::ConsoleNavigator;
pub use storage::{MemorySessionStore, SqliteDurableStore};
