//! # snare-core
//!
//! Core types for snare, a tool that drives a DevTools inspector over the
//! Chrome DevTools Protocol, starts a long-running operation inside it, and
//! captures the report that operation produces.
//!
//! ## Core Paradigm
//!
//! - The remote process is never modified ahead of time; everything happens
//!   through evaluated expressions
//! - A result is observed by sniffing a method call, not by polling
//! - One report per run; any fatal error aborts the run before output is written

pub mod config;
mod error;
pub mod fail_open;
mod types;

pub use config::{
    ArmOrder, BrowserConfig, CaptureConfig, RemoteConfig, RetryConfig, SnareConfig,
    CHROME_PATH_ENV,
};
pub use error::{Result, SnareError};
pub use types::*;
