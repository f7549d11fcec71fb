//! Command channel abstraction
//!
//! A command channel evaluates a [`RemoteExpression`] inside the inspector's
//! execution context. The CDP client is the real implementation;
//! [`MockChannel`] replays scripted replies for tests.

use async_trait::async_trait;
use snare_core::{EvaluateOptions, EvaluationResponse, RemoteExpression, Result, SnareError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Trait for evaluating expressions remotely (allows mocking in tests)
#[async_trait]
pub trait CommandChannel: Send + Sync {
    /// Enable the runtime domain. Called once before any command.
    async fn enable(&self) -> Result<()>;

    /// Evaluate an expression in the remote context.
    ///
    /// `Err` means the submission itself was rejected; an expression that
    /// threw comes back as `Ok` with `exception_details` set.
    async fn send_command(
        &self,
        expression: &RemoteExpression,
        options: EvaluateOptions,
    ) -> Result<EvaluationResponse>;
}

/// A scripted reply for [`MockChannel`]
#[derive(Debug, Clone)]
pub enum MockReply {
    Response(EvaluationResponse),
    Reject(String),
}

/// Mock command channel for testing
///
/// Replies are consumed in order. Once they run out, the fallback reply (if
/// any) is repeated; otherwise the submission is rejected.
#[derive(Debug, Default)]
pub struct MockChannel {
    replies: Mutex<VecDeque<MockReply>>,
    fallback: Option<MockReply>,
    submissions: Mutex<Vec<(RemoteExpression, EvaluateOptions)>>,
    enable_calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, response: EvaluationResponse) -> Self {
        lock(&self.replies).push_back(MockReply::Response(response));
        self
    }

    pub fn with_rejection(self, message: &str) -> Self {
        lock(&self.replies).push_back(MockReply::Reject(message.to_string()));
        self
    }

    /// Queue `count` copies of the same response
    pub fn with_repeated(self, response: EvaluationResponse, count: usize) -> Self {
        {
            let mut replies = lock(&self.replies);
            for _ in 0..count {
                replies.push_back(MockReply::Response(response.clone()));
            }
        }
        self
    }

    pub fn with_fallback(mut self, reply: MockReply) -> Self {
        self.fallback = Some(reply);
        self
    }

    /// Everything submitted so far, in order
    pub fn submissions(&self) -> Vec<(RemoteExpression, EvaluateOptions)> {
        lock(&self.submissions).clone()
    }

    pub fn submission_count(&self) -> usize {
        lock(&self.submissions).len()
    }

    pub fn enable_calls(&self) -> usize {
        self.enable_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommandChannel for MockChannel {
    async fn enable(&self) -> Result<()> {
        self.enable_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send_command(
        &self,
        expression: &RemoteExpression,
        options: EvaluateOptions,
    ) -> Result<EvaluationResponse> {
        lock(&self.submissions).push((expression.clone(), options));

        let reply = lock(&self.replies).pop_front().or_else(|| self.fallback.clone());
        match reply {
            Some(MockReply::Response(response)) => Ok(response),
            Some(MockReply::Reject(message)) => Err(SnareError::Transport(message)),
            None => Err(SnareError::Transport("No scripted reply left".to_string())),
        }
    }
}
