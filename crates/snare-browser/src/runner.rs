//! End-to-end capture run
//!
//! [`capture_and_persist`] is the protocol over any [`CommandChannel`]; [`run`]
//! wraps it with the browser lifecycle.

use crate::browser::BrowserSession;
use crate::cdp::CdpClient;
use crate::channel::CommandChannel;
use crate::discovery::find_inspector;
use crate::error::Result;
use crate::handoff::{hand_off, ReportSink};
use crate::sniffer::Sniffer;
use crate::trigger::{Trigger, TriggerOutcome};
use serde_json::Value;
use snare_core::fail_open::fail_open;
use snare_core::{ArmOrder, SnareConfig};
use std::future::Future;
use tracing::{info, warn};

/// What a successful capture produced
#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    pub report: Value,
    pub trigger: TriggerOutcome,
}

/// Trigger the remote operation, capture the sniffed report and persist it
///
/// With [`ArmOrder::AfterTrigger`] the sniffer is installed after the trigger
/// succeeds, relying on the operation being slower than one round trip.
/// With [`ArmOrder::BeforeTrigger`] it is installed first and awaited after.
/// Any failure returns before `sink` is touched.
pub async fn capture_and_persist<C: CommandChannel + ?Sized>(
    channel: &C,
    config: &SnareConfig,
    sink: &dyn ReportSink,
) -> Result<CaptureOutcome> {
    let trigger = Trigger::from_config(&config.remote, &config.retry)?;
    let sniffer = Sniffer::from_config(&config.remote);
    let slot = config.capture.slot_name.as_str();

    if config.retry.is_unbounded() {
        info!("Trigger retries are unbounded; bound the run externally");
    }

    let (trigger, response) = match config.capture.arm_order {
        ArmOrder::AfterTrigger => {
            let outcome = trigger.fire(channel).await?;
            let response = sniffer.install_and_await(channel).await?;
            (outcome, response)
        }
        ArmOrder::BeforeTrigger => {
            sniffer.arm(channel, slot).await?;
            let outcome = trigger.fire(channel).await?;
            let response = sniffer.await_armed(channel, slot).await?;
            (outcome, response)
        }
    };

    let report = hand_off(response, sink).await?;
    info!("Captured report after {} trigger attempt(s)", trigger.attempts);
    Ok(CaptureOutcome { report, trigger })
}

/// Launch the browser, capture one report from the inspector, persist it
pub async fn run(url: &str, config: &SnareConfig, sink: &dyn ReportSink) -> Result<CaptureOutcome> {
    let session = BrowserSession::open(config.browser.clone()).await?;

    let result = capture_in_session(&session, url, config, sink).await;
    close_after(result, || session.close()).await
}

async fn capture_in_session(
    session: &BrowserSession,
    url: &str,
    config: &SnareConfig,
    sink: &dyn ReportSink,
) -> Result<CaptureOutcome> {
    let inspector = find_inspector(
        session.port(),
        config.browser.inspector_index,
        config.browser.discovery_attempts,
    )
    .await?;

    let client = CdpClient::connect(&inspector.ws_url(session.port())).await?;
    client.enable().await?;

    // Loading must not block the trigger
    session.navigate_detached(url);

    capture_and_persist(&client, config, sink).await
}

/// Run `close` whether or not `result` is an error, then return `result`
async fn close_after<T, F, Fut>(result: Result<T>, close: F) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    if let Err(e) = &result {
        warn!("Capture failed, tearing down browser: {}", e);
    }
    fail_open("browser close", close).await;
    result
}
