//! Result validation and handoff to persistence

use crate::error::{BrowserError, Result};
use crate::script::{MISSING_METHOD_MARKER, OVERRIDE_FAILURE_MARKER};
use async_trait::async_trait;
use serde_json::Value;
use snare_core::EvaluationResponse;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

/// Destination for a captured report
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn persist(&self, report: &Value) -> Result<()>;
}

/// Writes the report as compact JSON to a file, creating parent directories
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ReportSink for JsonFileSink {
    async fn persist(&self, report: &Value) -> Result<()> {
        let body = serde_json::to_string(report)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, &body).await?;

        info!("Report written to {} ({} bytes)", self.path.display(), body.len());
        Ok(())
    }
}

/// Keeps every persisted report in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    reports: Mutex<Vec<Value>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Value> {
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl ReportSink for MemorySink {
    async fn persist(&self, report: &Value) -> Result<()> {
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(report.clone());
        Ok(())
    }
}

/// Map a remote exception message onto the error kind of the stage that threw
pub fn classify_exception(message: &str) -> BrowserError {
    if message.contains(MISSING_METHOD_MARKER) {
        BrowserError::SnifferConfig(message.to_string())
    } else if message.contains(OVERRIDE_FAILURE_MARKER) {
        BrowserError::OverrideFailed(message.to_string())
    } else {
        BrowserError::RemoteException(message.to_string())
    }
}

/// Pull the captured value out of the awaited evaluation
///
/// Fails on an exception and on a response that carries no value at all.
pub fn extract_captured(response: EvaluationResponse) -> Result<Value> {
    if let Some(message) = response.exception_message() {
        return Err(classify_exception(&message));
    }

    let kind = response
        .result
        .as_ref()
        .and_then(|r| r.kind.clone())
        .unwrap_or_else(|| "missing".to_string());

    match response.result.and_then(|r| r.value) {
        Some(value) => Ok(value),
        None => Err(BrowserError::EmptyResult(format!(
            "evaluation returned no value (result type: {})",
            kind
        ))),
    }
}

/// Validate the awaited response and hand the value to `sink` unchanged
///
/// Nothing reaches the sink unless validation succeeds.
pub async fn hand_off(response: EvaluationResponse, sink: &dyn ReportSink) -> Result<Value> {
    let report = extract_captured(response)?;
    sink.persist(&report).await?;
    Ok(report)
}
