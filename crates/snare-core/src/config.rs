//! Configuration management for snare
//!
//! This module provides the configuration loaded from `.snare/config.toml`:
//! how the browser is launched, where the remote UI objects live, how the
//! trigger retries, and where the captured report goes.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::Result;

/// Environment variable naming the Chromium executable
pub const CHROME_PATH_ENV: &str = "CHROME_PATH";

/// Top-level snare configuration
///
/// Loaded from `.snare/config.toml` under a base directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnareConfig {
    /// Browser launch and target discovery
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Addresses of the remote UI objects
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Trigger retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Capture ordering and output
    #[serde(default)]
    pub capture: CaptureConfig,
}

/// Configuration for browser launch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Chromium executable (falls back to `CHROME_PATH`, then auto-detection)
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    /// Remote debugging port used for target discovery
    #[serde(default = "default_port")]
    pub port: u16,

    /// Run headless. DevTools windows only exist in headful mode.
    #[serde(default)]
    pub headless: bool,

    /// Browser window width
    #[serde(default = "default_window_width")]
    pub window_width: u32,

    /// Browser window height
    #[serde(default = "default_window_height")]
    pub window_height: u32,

    /// Seconds the browser may stay silent before it is considered dead
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Which of the DevTools targets to attach to
    #[serde(default = "default_inspector_index")]
    pub inspector_index: usize,

    /// How many times to poll for the DevTools targets to appear
    #[serde(default = "default_discovery_attempts")]
    pub discovery_attempts: usize,
}

/// Locations of the remote objects the trigger and the sniffer touch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// View id passed to `UI.ViewManager.instance().showView`
    #[serde(default = "default_view_id")]
    pub view_id: String,

    /// Path to the panel object hosting the start control
    #[serde(default = "default_panel_path")]
    pub panel_path: String,

    /// CSS selector of the start control inside the panel
    #[serde(default = "default_button_selector")]
    pub button_selector: String,

    /// Path to the object whose method is sniffed
    #[serde(default = "default_receiver_path")]
    pub receiver_path: String,

    /// Name of the sniffed method
    #[serde(default = "default_method_name")]
    pub method_name: String,

    /// Positional argument of the sniffed call that is captured
    #[serde(default)]
    pub capture_index: usize,
}

/// Retry policy for the trigger loop
///
/// All bounds default to unset, which retries forever without delay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Give up after this many submissions
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// Give up after this many seconds
    #[serde(default)]
    pub deadline_secs: Option<u64>,

    /// Pause between submissions
    #[serde(default)]
    pub delay_ms: u64,
}

/// When the sniffer is installed relative to the trigger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArmOrder {
    /// Trigger first, then install and await in one submission
    #[default]
    AfterTrigger,
    /// Install into a remote slot, trigger, then await the slot
    BeforeTrigger,
}

impl std::fmt::Display for ArmOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AfterTrigger => write!(f, "after-trigger"),
            Self::BeforeTrigger => write!(f, "before-trigger"),
        }
    }
}

impl std::str::FromStr for ArmOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "after-trigger" | "after" => Ok(Self::AfterTrigger),
            "before-trigger" | "before" => Ok(Self::BeforeTrigger),
            _ => Err(format!("Invalid arm order: {}", s)),
        }
    }
}

/// Capture ordering and output location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default)]
    pub arm_order: ArmOrder,

    /// Global property holding the armed promise in `before-trigger` mode
    #[serde(default = "default_slot_name")]
    pub slot_name: String,

    /// Where the captured report is written
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
}

// Default value providers
fn default_port() -> u16 {
    9222
}

fn default_window_width() -> u32 {
    1350
}

fn default_window_height() -> u32 {
    940
}

fn default_idle_timeout_secs() -> u64 {
    600
}

fn default_inspector_index() -> usize {
    1
}

fn default_discovery_attempts() -> usize {
    10
}

fn default_view_id() -> String {
    "lighthouse".to_string()
}

fn default_panel_path() -> String {
    "UI.panels.lighthouse".to_string()
}

fn default_button_selector() -> String {
    "button".to_string()
}

fn default_receiver_path() -> String {
    "UI.panels.lighthouse.__proto__".to_string()
}

fn default_method_name() -> String {
    "_buildReportUI".to_string()
}

fn default_slot_name() -> String {
    "__snareCapture".to_string()
}

fn default_output_path() -> PathBuf {
    PathBuf::from("latest-run/lhr.json")
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            port: default_port(),
            headless: false,
            window_width: default_window_width(),
            window_height: default_window_height(),
            idle_timeout_secs: default_idle_timeout_secs(),
            inspector_index: default_inspector_index(),
            discovery_attempts: default_discovery_attempts(),
        }
    }
}

impl BrowserConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            view_id: default_view_id(),
            panel_path: default_panel_path(),
            button_selector: default_button_selector(),
            receiver_path: default_receiver_path(),
            method_name: default_method_name(),
            capture_index: 0,
        }
    }
}

impl RetryConfig {
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// True when neither an attempt cap nor a deadline is set
    pub fn is_unbounded(&self) -> bool {
        self.max_attempts.is_none() && self.deadline_secs.is_none()
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            arm_order: ArmOrder::default(),
            slot_name: default_slot_name(),
            output_path: default_output_path(),
        }
    }
}

impl SnareConfig {
    /// Load configuration from `.snare/config.toml` or use defaults
    pub fn load_or_default(base_dir: &Path) -> Result<Self> {
        let config_path = base_dir.join(".snare/config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Ok(toml::from_str(&content).map_err(|e| {
                crate::SnareError::Config(format!("Failed to parse config file: {}", e))
            })?)
        } else {
            Ok(Self::default())
        }
    }

    /// Write default configuration to `.snare/config.toml`
    pub fn write_default(base_dir: &Path) -> Result<PathBuf> {
        let config_dir = base_dir.join(".snare");
        std::fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join("config.toml");
        let config = Self::default();
        let content = toml::to_string_pretty(&config).map_err(|e| {
            crate::SnareError::Config(format!("Failed to serialize config: {}", e))
        })?;
        std::fs::write(&config_path, content)?;
        Ok(config_path)
    }

    /// Apply `CHROME_PATH` from the process environment
    pub fn with_env_overrides(self) -> Self {
        let chrome_path = std::env::var(CHROME_PATH_ENV).ok();
        self.with_chrome_path_override(chrome_path)
    }

    /// Prefer an explicit executable over the configured one; blank values are ignored
    pub fn with_chrome_path_override(mut self, chrome_path: Option<String>) -> Self {
        if let Some(path) = chrome_path.filter(|p| !p.trim().is_empty()) {
            self.browser.chrome_path = Some(PathBuf::from(path));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = SnareConfig::default();
        assert_eq!(config.browser.port, 9222);
        assert_eq!(config.browser.inspector_index, 1);
        assert!(!config.browser.headless);
        assert_eq!(config.remote.method_name, "_buildReportUI");
        assert_eq!(config.remote.receiver_path, "UI.panels.lighthouse.__proto__");
        assert_eq!(config.remote.capture_index, 0);
        assert!(config.retry.is_unbounded());
        assert_eq!(config.retry.delay(), Duration::ZERO);
        assert_eq!(config.capture.arm_order, ArmOrder::AfterTrigger);
        assert_eq!(config.capture.output_path, PathBuf::from("latest-run/lhr.json"));
    }

    #[test]
    fn test_load_missing_config_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = SnareConfig::load_or_default(temp.path()).unwrap();
        assert_eq!(config.remote.view_id, "lighthouse");
    }

    #[test]
    fn test_write_then_load_default() {
        let temp = TempDir::new().unwrap();
        let path = SnareConfig::write_default(temp.path()).unwrap();
        assert!(path.ends_with(".snare/config.toml"));

        let loaded = SnareConfig::load_or_default(temp.path()).unwrap();
        assert_eq!(loaded.browser.port, 9222);
        assert_eq!(loaded.capture.slot_name, "__snareCapture");
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".snare")).unwrap();
        std::fs::write(
            temp.path().join(".snare/config.toml"),
            r#"
[remote]
method_name = "emit"
receiver_path = "window.reporter"

[retry]
max_attempts = 50
delay_ms = 100

[capture]
arm_order = "before-trigger"
"#,
        )
        .unwrap();

        let config = SnareConfig::load_or_default(temp.path()).unwrap();
        assert_eq!(config.remote.method_name, "emit");
        assert_eq!(config.remote.receiver_path, "window.reporter");
        assert_eq!(config.remote.view_id, "lighthouse");
        assert_eq!(config.retry.max_attempts, Some(50));
        assert_eq!(config.retry.delay(), Duration::from_millis(100));
        assert!(!config.retry.is_unbounded());
        assert_eq!(config.capture.arm_order, ArmOrder::BeforeTrigger);
        assert_eq!(config.browser.inspector_index, 1);
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".snare")).unwrap();
        std::fs::write(temp.path().join(".snare/config.toml"), "[browser]\nport = \"x\"").unwrap();

        let err = SnareConfig::load_or_default(temp.path()).unwrap_err();
        assert!(matches!(err, crate::SnareError::Config(_)));
    }

    #[test]
    fn test_chrome_path_override() {
        let config = SnareConfig::default().with_chrome_path_override(Some("/opt/chrome".into()));
        assert_eq!(config.browser.chrome_path, Some(PathBuf::from("/opt/chrome")));

        let config = SnareConfig::default().with_chrome_path_override(Some("  ".into()));
        assert!(config.browser.chrome_path.is_none());
    }

    #[test]
    fn test_arm_order_parse() {
        assert_eq!("before".parse::<ArmOrder>().unwrap(), ArmOrder::BeforeTrigger);
        assert_eq!("After-Trigger".parse::<ArmOrder>().unwrap(), ArmOrder::AfterTrigger);
        assert!("sideways".parse::<ArmOrder>().is_err());
        assert_eq!(ArmOrder::BeforeTrigger.to_string(), "before-trigger");
    }
}
