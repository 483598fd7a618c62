//! # Emotion Stream
//!
//! Real-time relay for per-frame facial-emotion readings. Browser clients
//! stream readings over WebSocket; every reading is classified, kept in a
//! rolling window, and mirrored to all connected viewers. A periodic
//! evaluator raises alerts when one emotion dominates the stream.
//!
//! ## Modules
//!
//! - [`emotion`]: Classifier, decoder, rolling-window aggregator, ingest pipeline
//! - [`websocket`]: Connection hub and WebSocket handler
//! - [`api`]: HTTP server with Axum
//! - [`config`]: TOML + environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use emotion_stream::emotion::{Aggregator, AggregatorConfig, EmotionSample};
//!
//! #[tokio::main]
//! async fn main() {
//!     let aggregator = Aggregator::new(AggregatorConfig::default());
//!
//!     let sample = aggregator
//!         .add_sample(EmotionSample::new(0.0, 0.97).emotion("angry", 0.9).emotion("sad", 0.1))
//!         .await;
//!     assert_eq!(sample.dominant, "angry");
//!
//!     if let Some(alert) = aggregator.evaluate().await {
//!         println!("{}: {}", alert.level, alert.message);
//!     }
//! }
//! ```

pub mod api;
pub mod config;
pub mod emotion;
pub mod websocket;

pub use emotion::{
    classify, Aggregator, AggregatorConfig, AlertLevel, AlertMessage, AlertRule, DecodeError,
    Decoder, Dominant, EmotionSample, EmotionService, JsonDecoder,
};

pub use websocket::{
    websocket_handler, Connection, ConnectionError, ConnectionHub, ConnectionId, HubConfig,
    HubError, OutboundMessage,
};

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{
    AggregatorSettings, Config, ConfigError, HubSettings, LoggingConfig, ServerConfig,
};
