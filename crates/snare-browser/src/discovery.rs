//! Inspector target discovery over the DevTools HTTP endpoint

use crate::error::{BrowserError, Result};
use serde::{Deserialize, Serialize};
use snare_core::fail_open::retry_linear;
use std::time::Duration;
use tracing::{debug, info};

/// Pause after the first failed poll; grows linearly
const DISCOVERY_STEP: Duration = Duration::from_millis(100);

/// One entry of `GET /json/list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDescriptor {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// Omitted by Chromium while another client is attached
    #[serde(default)]
    pub web_socket_debugger_url: Option<String>,
}

impl TargetDescriptor {
    /// True for DevTools front-end windows
    pub fn is_inspector(&self) -> bool {
        self.url.contains("devtools")
    }

    /// WebSocket endpoint, derived from the id when Chromium did not list one
    pub fn ws_url(&self, port: u16) -> String {
        self.web_socket_debugger_url
            .clone()
            .unwrap_or_else(|| format!("ws://127.0.0.1:{}/devtools/page/{}", port, self.id))
    }
}

/// Pick the `index`-th inspector target in listing order
pub fn select_inspector(targets: &[TargetDescriptor], index: usize) -> Result<TargetDescriptor> {
    let inspectors: Vec<&TargetDescriptor> = targets.iter().filter(|t| t.is_inspector()).collect();
    inspectors.get(index).map(|t| (*t).clone()).ok_or_else(|| {
        BrowserError::InspectorNotFound(format!(
            "wanted inspector #{} but {} of {} targets are inspectors",
            index,
            inspectors.len(),
            targets.len()
        ))
    })
}

/// Fetch the current target list
pub async fn list_targets(port: u16) -> Result<Vec<TargetDescriptor>> {
    let url = format!("http://127.0.0.1:{}/json/list", port);
    debug!("Listing targets at {}", url);

    let response = reqwest::get(&url)
        .await
        .map_err(|e| BrowserError::Transport(format!("Failed to list targets: {}", e)))?;
    response
        .json::<Vec<TargetDescriptor>>()
        .await
        .map_err(|e| BrowserError::Protocol(format!("Malformed target list: {}", e)))
}

/// Poll the target list until the wanted inspector shows up
pub async fn find_inspector(port: u16, index: usize, attempts: usize) -> Result<TargetDescriptor> {
    let found = retry_linear(
        "inspector discovery",
        || async move {
            let targets = list_targets(port).await?;
            select_inspector(&targets, index)
        },
        attempts,
        DISCOVERY_STEP,
    )
    .await;

    match found {
        Ok(target) => {
            info!("Found inspector target {} ({})", target.id, target.url);
            Ok(target)
        }
        Err(BrowserError::InspectorNotFound(detail)) => Err(BrowserError::InspectorNotFound(
            format!("port {}: {}", port, detail),
        )),
        Err(e) => Err(BrowserError::InspectorNotFound(format!(
            "no inspector #{} on port {}: {}",
            index, port, e
        ))),
    }
}
