//! Navigation Implementation
//!
//! A desktop daemon has no address bar to redirect, so the navigator
//! surfaces the authorization URL to the operator (log line plus an
//! accessor) and treats the navigation as done. The callback then arrives
//! out-of-band and is fed to the state machine as an inbound query.

use async_trait::async_trait;
use bridge_traits::{error::Result, navigation::Navigator};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Navigator that surfaces URLs to the operator instead of navigating.
#[derive(Clone, Default)]
pub struct ConsoleNavigator {
    last_navigation: Arc<Mutex<Option<String>>>,
}

impl ConsoleNavigator {
    /// Create a new console navigator.
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently requested navigation target, if any.
    pub async fn last_navigation(&self) -> Option<String> {
        self.last_navigation.lock().await.clone()
    }
}

#[async_trait]
impl Navigator for ConsoleNavigator {
    async fn navigate_to(&self, url: &str) -> Result<()> {
        info!(url = url, "Open this URL in a browser to continue authorization");
        *self.last_navigation.lock().await = Some(url.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_navigation_is_recorded() {
        let navigator = ConsoleNavigator::new();
        assert!(navigator.last_navigation().await.is_none());

        navigator
            .navigate_to("https://mastodon.social/oauth/authorize?state=xyz")
            .await
            .unwrap();

        let last = navigator.last_navigation().await.unwrap();
        assert!(last.starts_with("https://mastodon.social/oauth/authorize"));
    }

    #[tokio::test]
    async fn test_clear_inbound_params_is_noop() {
        let navigator = ConsoleNavigator::new();
        navigator.clear_inbound_params().await.unwrap();
    }
}
