//! # Authorization Module
//!
//! Per-service delegated-access authorization for social-media crawlers.
//!
//! ## Overview
//!
//! This crate owns the authorization lifecycle for each crawlable service:
//! acquiring an access token through a direct credential exchange or a
//! three-legged OAuth redirect flow with CSRF protection, validating a held
//! token against the remote API, persisting it across restarts, and exposing
//! a live per-service authorization status.
//!
//! ## Features
//!
//! - Direct credential exchange (instance URL + email + password)
//! - OAuth authorization-code flow with single-use CSRF state nonces
//! - Token validation and invalidation against the observatory backend
//! - Status surface for presentation layers, fed by the event bus

pub mod error;
pub mod exchange;
pub mod machine;
pub mod store;
pub mod types;
pub mod validator;

pub use error::{AuthError, Result};
pub use exchange::AuthExchanger;
pub use machine::AuthorizationStateMachine;
pub use store::CredentialStore;
pub use types::{
    AuthorizationStatus, DirectCredentials, Indicator, OAuthCredentials, RedirectCallback,
    Service, StatusKind, Token, TokenGrant,
};
pub use validator::TokenValidator;
