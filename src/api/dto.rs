//! Data Transfer Objects
//!
//! Response types for the HTTP endpoints.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Static acknowledgment returned by `GET /`
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub message: String,
}

/// Full health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: healthy, unhealthy
    pub status: String,
    /// Application version
    pub version: String,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// When the server started
    pub started_at: DateTime<Utc>,
    /// Live WebSocket connections
    pub connections: usize,
    /// Samples currently held in the rolling window
    pub window_samples: usize,
    /// Broadcasts dropped because the hub queue was full
    pub dropped_broadcasts: u64,
}
