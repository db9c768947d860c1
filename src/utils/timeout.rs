//! Timeout constants and async wrappers.

use crate::error::{ProtocolError, Result};
use std::future::Future;
use std::time::Duration;

/// Default timeout for connection establishment and single operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for awaiting a peer's negotiation response.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Grace period for connections to drain during server shutdown.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Run a future with a deadline, mapping expiry to `ProtocolError::Timeout`.
///
/// # Errors
/// Returns `ProtocolError::Timeout` when the deadline elapses.
pub async fn with_timeout<F: Future>(duration: Duration, future: F) -> Result<F::Output> {
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| ProtocolError::Timeout)
}
