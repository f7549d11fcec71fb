//! Retrying trigger
//!
//! Submits the start expression until one submission comes back without an
//! exception. A rejected submission and a thrown exception both mean "not
//! ready yet". Because the expression throws before clicking while the
//! control is disabled, only the final clean submission clicks.

use crate::channel::CommandChannel;
use crate::error::{BrowserError, Result};
use crate::script::start_expression;
use snare_core::{EvaluateOptions, RemoteConfig, RemoteExpression, RetryConfig};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Outcome of a successful trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerOutcome {
    /// Submissions made, including the successful one
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Start-operation expression plus the policy it is retried under
#[derive(Debug, Clone)]
pub struct Trigger {
    expression: RemoteExpression,
    policy: RetryConfig,
}

impl Trigger {
    pub fn new(expression: RemoteExpression, policy: RetryConfig) -> Self {
        Self { expression, policy }
    }

    pub fn from_config(remote: &RemoteConfig, policy: &RetryConfig) -> Result<Self> {
        Ok(Self::new(start_expression(remote)?, policy.clone()))
    }

    /// Submit until the remote accepts the click
    pub async fn fire<C: CommandChannel + ?Sized>(&self, channel: &C) -> Result<TriggerOutcome> {
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            attempts = attempts.saturating_add(1);

            match channel
                .send_command(&self.expression, EvaluateOptions::plain())
                .await
            {
                Ok(response) if !response.is_exception() => {
                    let outcome = TriggerOutcome {
                        attempts,
                        elapsed: started.elapsed(),
                    };
                    info!(
                        "Operation started after {} attempt(s) in {:?}",
                        outcome.attempts, outcome.elapsed
                    );
                    return Ok(outcome);
                }
                Ok(response) => debug!(
                    "Trigger attempt {} not ready: {}",
                    attempts,
                    response.exception_message().unwrap_or_default()
                ),
                Err(e) => debug!("Trigger attempt {} rejected: {}", attempts, e),
            }

            if let Some(max) = self.policy.max_attempts {
                if attempts >= max {
                    return Err(self.timeout(attempts, started));
                }
            }
            if let Some(deadline) = self.policy.deadline() {
                if started.elapsed() >= deadline {
                    return Err(self.timeout(attempts, started));
                }
            }

            let delay = self.policy.delay();
            if delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(delay).await;
            }
        }
    }

    fn timeout(&self, attempts: u32, started: Instant) -> BrowserError {
        BrowserError::TriggerTimeout {
            attempts,
            elapsed: started.elapsed(),
        }
    }
}
