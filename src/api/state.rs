//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;

use crate::config::ServerConfig;
use crate::emotion::{Aggregator, EmotionService};
use crate::websocket::ConnectionHub;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Ingest pipeline shared by every connection task
    pub ingest: Arc<EmotionService>,
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Monotonic start time for uptime tracking
    pub start_time: Instant,
    /// Wall-clock start time reported by /health
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create a new AppState around an already-running hub and aggregator
    pub fn new(aggregator: Arc<Aggregator>, hub: ConnectionHub, config: ServerConfig) -> Self {
        Self {
            ingest: Arc::new(EmotionService::new(aggregator, hub)),
            config: Arc::new(config),
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }

    pub fn hub(&self) -> &ConnectionHub {
        self.ingest.hub()
    }

    pub fn aggregator(&self) -> &Arc<Aggregator> {
        self.ingest.aggregator()
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Current WebSocket members, read from the hub's gauge
    pub fn ws_connection_count(&self) -> usize {
        self.hub().member_count()
    }
}
