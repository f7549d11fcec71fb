//! DevTools inspector control and report capture for snare
//!
//! This crate drives a DevTools front-end over the Chrome DevTools Protocol
//! (CDP): it clicks the start control of a panel until the UI accepts the
//! click, sniffs the method the panel calls with its finished report, and
//! hands that report to a sink.
//!
//! # Example
//!
//! ```no_run
//! use snare_browser::handoff::JsonFileSink;
//! use snare_browser::runner::run;
//! use snare_core::SnareConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SnareConfig::default().with_env_overrides();
//!     let sink = JsonFileSink::new(&config.capture.output_path);
//!
//!     let outcome = run("https://example.com", &config, &sink).await?;
//!     println!("Trigger took {} attempt(s)", outcome.trigger.attempts);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Requirements
//!
//! - Chrome or Chromium installed (or `CHROME_PATH` set)
//! - A display: DevTools windows are not created in headless mode
//!
//! # Architecture
//!
//! - [`channel`]: the command channel trait and a scripted mock
//! - [`cdp`]: WebSocket CDP client implementing the channel
//! - [`browser`]: Chromium lifecycle
//! - [`discovery`]: finding the inspector target
//! - [`script`]: remote script templates
//! - [`trigger`]: retrying start-operation submission
//! - [`sniffer`]: one-shot method interception
//! - [`handoff`]: result validation and persistence
//! - [`runner`]: the full capture flow

pub mod browser;
pub mod cdp;
pub mod channel;
pub mod discovery;
pub mod error;
pub mod handoff;
pub mod runner;
pub mod script;
pub mod sniffer;
pub mod trigger;

// Re-export commonly used types
pub use browser::BrowserSession;
pub use cdp::CdpClient;
pub use channel::{CommandChannel, MockChannel, MockReply};
pub use discovery::{find_inspector, select_inspector, TargetDescriptor};
pub use error::{BrowserError, Result};
pub use handoff::{extract_captured, hand_off, JsonFileSink, MemorySink, ReportSink};
pub use runner::{capture_and_persist, run, CaptureOutcome};
pub use script::{ScriptTemplate, Slot, SnifferTarget};
pub use sniffer::Sniffer;
pub use trigger::{Trigger, TriggerOutcome};
