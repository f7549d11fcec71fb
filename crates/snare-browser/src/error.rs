//! Browser-side error types - re-exports the unified SnareError from snare-core
//!
//! Errors raised here map onto the stages of a capture run:
//! - Transport / Protocol / Cdp - the DevTools socket
//! - Browser / InspectorNotFound - launching Chromium and finding the inspector
//! - TriggerTimeout - a bounded trigger policy ran out
//! - SnifferConfig / OverrideFailed / RemoteException / EmptyResult - capture and handoff
//!
//! Error messages should name the stage that failed.

pub use snare_core::{Result, SnareError};

pub type BrowserError = SnareError;
