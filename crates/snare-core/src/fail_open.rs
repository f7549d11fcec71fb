//! Helpers for steps that must not abort a capture run on their own
//!
//! Page navigation and browser teardown can fail without the captured report
//! being affected; [`fail_open`] logs and carries on. Target discovery races
//! the browser start-up; [`retry_linear`] polls it with a growing pause.
//!
//! Never use these for sniffer installation, result handoff or persistence.
//! Failures there are fatal.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::Result;

/// Run `f`, logging a failure instead of returning it
///
/// ```no_run
/// use snare_core::fail_open::fail_open;
/// use snare_core::Result;
///
/// async fn close_page() -> Result<()> {
///     Ok(())
/// }
///
/// async fn example() {
///     // None if closing failed
///     let closed = fail_open("page close", || close_page()).await;
/// }
/// ```
pub async fn fail_open<F, Fut, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match f().await {
        Ok(val) => Some(val),
        Err(e) => {
            warn!("{} failed (fail-open): {}", operation_name, e);
            None
        }
    }
}

/// Call `f` up to `attempts` times, pausing `step * n` after the n-th failure
///
/// Returns the first success or the last error. Zero attempts is treated as one.
///
/// ```no_run
/// use snare_core::fail_open::retry_linear;
/// use snare_core::Result;
/// use std::time::Duration;
///
/// async fn list_targets() -> Result<Vec<String>> {
///     Ok(vec!["devtools://devtools/bundled/devtools_app.html".to_string()])
/// }
///
/// async fn example() -> Result<Vec<String>> {
///     // Pauses 100ms, then 200ms between the three attempts
///     retry_linear("target discovery", || list_targets(), 3, Duration::from_millis(100)).await
/// }
/// ```
pub async fn retry_linear<F, Fut, T>(
    operation_name: &str,
    mut f: F,
    attempts: usize,
    step: Duration,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;

    loop {
        match f().await {
            Ok(val) => return Ok(val),
            Err(e) if attempt >= attempts => {
                warn!("{} gave up after {} attempts: {}", operation_name, attempts, e);
                return Err(e);
            }
            Err(e) => {
                debug!(
                    "{} failed (attempt {}/{}): {}",
                    operation_name, attempt, attempts, e
                );
                tokio::time::sleep(step * attempt as u32).await;
                attempt += 1;
            }
        }
    }
}
