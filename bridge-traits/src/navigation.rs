//! Navigation Abstraction
//!
//! The OAuth redirect leg requires a full-page navigation that leaves the
//! core's execution context entirely: control only returns when the remote
//! authorization server redirects back. That side effect is outside the state
//! machine's control flow, so it is modeled as a host capability the machine
//! invokes, and resumption is a fresh initialization path driven by the
//! inbound callback parameters.

use async_trait::async_trait;

use crate::error::Result;

/// Full-page navigation capability.
///
/// Hosts map this onto their navigation primitive:
/// - Browser: `window.location.assign`
/// - Desktop: opening the system browser, or surfacing the URL to the operator
/// - Tests: recording the URL
#[async_trait]
pub trait Navigator: Send + Sync {
    /// Navigate the user agent to `url`.
    ///
    /// The caller must assume no further code runs in the current flow after
    /// a successful navigation.
    async fn navigate_to(&self, url: &str) -> Result<()>;

    /// Remove OAuth callback parameters (`code`, `state`) from the visible
    /// address, so a reload does not replay the callback.
    ///
    /// Hosts without an address bar can leave the default no-op.
    async fn clear_inbound_params(&self) -> Result<()> {
        Ok(())
    }
}
