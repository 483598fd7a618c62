//! Outbound Connection Abstraction
//!
//! The hub only needs to push opaque text payloads and close a peer.
//! Implementations must serialize their own writes.

use async_trait::async_trait;
use thiserror::Error;

/// A live peer the hub can write to
#[async_trait]
pub trait Connection: Send + Sync {
    /// Write one payload. Concurrent calls on the same connection must not interleave.
    async fn send(&self, payload: &str) -> Result<(), ConnectionError>;

    /// Close the underlying transport. Errors are swallowed.
    async fn close(&self);
}

/// Errors raised by a single outbound write
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Connection closed")]
    Closed,

    #[error("Transport error: {0}")]
    Transport(String),
}
