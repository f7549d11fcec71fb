//! Interception listener
//!
//! Installs a one-shot override on a remote method, lets the first call
//! through unchanged, restores the original and resolves a promise with the
//! captured argument. The awaited response is returned as is; validating it
//! is the job of [`crate::handoff`]. Two submission shapes are supported:
//!
//! - [`Sniffer::install_and_await`] installs and awaits in one evaluation
//! - [`Sniffer::arm`] then [`Sniffer::await_armed`] install first and await later

use crate::channel::CommandChannel;
use crate::error::{BrowserError, Result};
use crate::handoff::classify_exception;
use crate::script::{arm_expression, await_armed_expression, sniff_expression, SnifferTarget};
use snare_core::{EvaluateOptions, EvaluationResponse, RemoteConfig, RemoteExpression};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct Sniffer {
    target: SnifferTarget,
}

impl Sniffer {
    pub fn new(target: SnifferTarget) -> Self {
        Self { target }
    }

    pub fn from_config(remote: &RemoteConfig) -> Self {
        Self::new(SnifferTarget::from_config(remote))
    }

    /// Install the override and wait for the sniffed call
    pub async fn install_and_await<C: CommandChannel + ?Sized>(
        &self,
        channel: &C,
    ) -> Result<EvaluationResponse> {
        let expression = sniff_expression(&self.target)?;
        info!(
            "Waiting for {}.{} to be called",
            self.target.receiver_path, self.target.method_name
        );

        self.submit_awaited(channel, &expression).await
    }

    /// Install the override now and park its promise in `globalThis[slot]`
    pub async fn arm<C: CommandChannel + ?Sized>(&self, channel: &C, slot: &str) -> Result<()> {
        let expression = arm_expression(&self.target, slot)?;
        let response = channel
            .send_command(&expression, EvaluateOptions::plain())
            .await?;

        if let Some(message) = response.exception_message() {
            return Err(classify_exception(&message));
        }

        debug!(
            "Sniffer armed on {}.{} (slot {})",
            self.target.receiver_path, self.target.method_name, slot
        );
        Ok(())
    }

    /// Wait for the promise parked by [`Sniffer::arm`]
    pub async fn await_armed<C: CommandChannel + ?Sized>(
        &self,
        channel: &C,
        slot: &str,
    ) -> Result<EvaluationResponse> {
        let expression = await_armed_expression(slot)?;
        info!(
            "Waiting for armed {}.{} to be called",
            self.target.receiver_path, self.target.method_name
        );

        self.submit_awaited(channel, &expression).await
    }

    async fn submit_awaited<C: CommandChannel + ?Sized>(
        &self,
        channel: &C,
        expression: &RemoteExpression,
    ) -> Result<EvaluationResponse> {
        channel
            .send_command(expression, EvaluateOptions::awaited_by_value())
            .await
            .map_err(|e| match e {
                BrowserError::Transport(msg) => {
                    BrowserError::Transport(format!("Capture submission failed: {}", msg))
                }
                other => other,
            })
    }
}
