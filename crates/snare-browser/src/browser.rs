//! Browser lifecycle management using Chrome DevTools Protocol

use crate::error::{BrowserError, Result};
use headless_chrome::{Browser, LaunchOptions, Tab};
use snare_core::fail_open::fail_open;
use snare_core::BrowserConfig;
use std::sync::Arc;
use tracing::{debug, info};

/// Launched Chromium with DevTools opened for every tab
pub struct BrowserSession {
    /// Underlying browser instance (kept alive for tab lifetime)
    #[allow(dead_code)]
    browser: Browser,
    /// Page the inspector is attached to
    page: Arc<Tab>,
    /// Configuration
    config: BrowserConfig,
}

impl BrowserSession {
    /// Launch Chromium with `--auto-open-devtools-for-tabs` and open a page
    ///
    /// # Example
    /// ```no_run
    /// use snare_browser::browser::BrowserSession;
    /// use snare_core::BrowserConfig;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let session = BrowserSession::open(BrowserConfig::default()).await.unwrap();
    ///     session.navigate_detached("https://example.com");
    ///     session.close().await.unwrap();
    /// }
    /// ```
    pub async fn open(config: BrowserConfig) -> Result<Self> {
        info!(
            "Launching browser with DevTools (port: {}, size: {}x{})",
            config.port, config.window_width, config.window_height
        );

        let launch_options = launch_options(&config)?;

        let browser = Browser::new(launch_options)
            .map_err(|e| BrowserError::Browser(format!("Failed to launch browser: {}", e)))?;

        let page = browser
            .new_tab()
            .map_err(|e| BrowserError::Browser(format!("Failed to create tab: {}", e)))?;

        info!("Browser launched successfully");

        Ok(Self {
            browser,
            page,
            config,
        })
    }

    /// Start navigating the page without waiting for it
    ///
    /// Failures are logged and swallowed: the operation triggered in the
    /// inspector may itself be what finishes the navigation.
    pub fn navigate_detached(&self, url: &str) {
        debug!("Navigating to {} (detached)", url);

        let page = Arc::clone(&self.page);
        let url = url.to_string();
        tokio::spawn(async move {
            fail_open("page navigation", || async move {
                let target = url.clone();
                tokio::task::spawn_blocking(move || {
                    page.navigate_to(&target).map(|_| ()).map_err(|e| {
                        BrowserError::Browser(format!("Failed to navigate to {}: {}", target, e))
                    })
                })
                .await
                .map_err(|e| BrowserError::Browser(format!("Navigation task failed: {}", e)))?
            })
            .await;
        });
    }

    /// Remote debugging port the browser listens on
    pub fn port(&self) -> u16 {
        self.config.port
    }

    /// Close the page, then the browser
    pub async fn close(self) -> Result<()> {
        info!("Closing browser session");

        self.page
            .close(true)
            .map_err(|e| BrowserError::Browser(format!("Failed to close page: {}", e)))?;

        // Browser process is killed when dropped
        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        debug!("BrowserSession dropped, browser will be cleaned up");
    }
}

/// Translate [`BrowserConfig`] into launch options
fn launch_options(config: &BrowserConfig) -> Result<LaunchOptions<'static>> {
    LaunchOptions::default_builder()
        .headless(config.headless)
        .devtools(true)
        .port(Some(config.port))
        .window_size(Some((config.window_width, config.window_height)))
        .idle_browser_timeout(config.idle_timeout())
        .path(config.chrome_path.clone())
        .build()
        .map_err(|e| BrowserError::Browser(format!("Invalid launch options: {}", e)))
}
