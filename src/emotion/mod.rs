//! Emotion Stream Core
//!
//! Turns raw per-frame readings into classified samples and watches the
//! recent stream for sustained emotional states.
//!
//! - **types**: Data structures (EmotionSample, AlertMessage, AlertRule)
//! - **classifier**: Dominant-emotion selection
//! - **decoder**: Inbound payload parsing
//! - **aggregator**: Rolling window + periodic alert evaluator
//! - **service**: Per-message ingest pipeline
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! Ingest Path:
//!   bytes → Decoder → classify → Aggregator::add_sample → ConnectionHub::broadcast
//!
//! Alert Path (every check interval):
//!   Aggregator::evaluate → AlertMessage → ConnectionHub::broadcast
//! ```

pub mod aggregator;
pub mod classifier;
pub mod decoder;
pub mod error;
pub mod service;
pub mod types;

pub use aggregator::{Aggregator, AggregatorConfig};
pub use classifier::{classify, Dominant};
pub use decoder::{Decoder, JsonDecoder};
pub use error::DecodeError;
pub use service::EmotionService;
pub use types::{default_rules, AlertKind, AlertLevel, AlertMessage, AlertRule, EmotionSample};
