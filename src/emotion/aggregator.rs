//! Rolling Window Aggregator
//!
//! Keeps the last `keep_duration` of classified samples and periodically
//! checks whether one emotion has dominated the stream for at least
//! `sustain_duration`.
//!
//! # Window
//!
//! ```text
//!   oldest ──────────────────────────────── newest
//!   │◄──────────── keep_duration ───────────►│
//! ```
//!
//! Samples are kept in timestamp order. After every `add_sample`, each
//! retained sample satisfies `timestamp >= newest - keep_duration`.
//!
//! # Evaluation
//!
//! The window and the evaluator share one mutex. A tick evaluates whatever
//! samples were added before it took the lock; samples added while it holds
//! the lock are seen on the next tick. The lock is released before the alert
//! is broadcast. Alerts are not debounced: a condition that keeps holding
//! fires on every tick.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::types::{default_rules, AlertMessage, AlertRule, EmotionSample};
use crate::websocket::{ConnectionHub, OutboundMessage};

/// Aggregator tuning
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Maximum age of a retained sample relative to the newest one
    pub keep_duration: Duration,
    /// Evaluator tick period
    pub check_interval: Duration,
    /// Minimum window span before any rule is considered
    pub sustain_duration: Duration,
    /// Samples whose dominant score is below this are ignored by the rules
    pub min_confidence: f64,
    /// Checked in order; the first match wins
    pub rules: Vec<AlertRule>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            keep_duration: Duration::from_secs(10),
            check_interval: Duration::from_secs(1),
            sustain_duration: Duration::from_secs(5),
            min_confidence: 0.4,
            rules: default_rules(),
        }
    }
}

fn as_millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Owns the rolling window of recent samples
pub struct Aggregator {
    window: Mutex<VecDeque<EmotionSample>>,
    config: AggregatorConfig,
}

impl Aggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            window: Mutex::new(VecDeque::new()),
            config,
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Classify a sample, prune expired entries and append it.
    ///
    /// Returns the classified sample. A sample older than the current tail is
    /// inserted at its ordered position; if it is already older than the
    /// window allows it is pruned immediately.
    pub async fn add_sample(&self, sample: EmotionSample) -> EmotionSample {
        let sample = sample.classified();
        let keep = as_millis(self.config.keep_duration);

        let mut window = self.window.lock().await;
        let position = window.partition_point(|s| s.timestamp <= sample.timestamp);
        window.insert(position, sample.clone());

        if let Some(newest) = window.back().map(|s| s.timestamp) {
            let cutoff = newest - keep;
            while window.front().is_some_and(|s| s.timestamp < cutoff) {
                window.pop_front();
            }
        }

        sample
    }

    /// Run one evaluation over the current window
    pub async fn evaluate(&self) -> Option<AlertMessage> {
        let window = self.window.lock().await;
        evaluate_window(&window, &self.config)
    }

    /// Number of samples currently retained
    pub async fn len(&self) -> usize {
        self.window.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.window.lock().await.is_empty()
    }

    /// Copy of the window, oldest first
    pub async fn snapshot(&self) -> Vec<EmotionSample> {
        self.window.lock().await.iter().cloned().collect()
    }

    /// Spawn the periodic evaluator.
    ///
    /// Every `check_interval` the window is evaluated and any alert is
    /// broadcast through `hub`. The task runs until aborted.
    pub fn spawn_evaluator(self: Arc<Self>, hub: ConnectionHub) -> JoinHandle<()> {
        let period = self.config.check_interval.max(Duration::from_millis(1));

        tracing::info!(
            interval_ms = period.as_millis() as u64,
            sustain_ms = self.config.sustain_duration.as_millis() as u64,
            rules = self.config.rules.len(),
            "Starting emotion evaluator"
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            // Skip the first immediate tick
            ticker.tick().await;

            loop {
                ticker.tick().await;

                if let Some(alert) = self.evaluate().await {
                    publish_alert(&hub, alert);
                }
            }
        })
    }
}

fn publish_alert(hub: &ConnectionHub, alert: AlertMessage) {
    let level = alert.level;
    match OutboundMessage::from(alert).to_payload() {
        Ok(payload) => {
            tracing::info!(alert_level = %level, "Sustained emotion alert");
            hub.broadcast(payload);
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize alert, dropping it");
        }
    }
}

/// Pure evaluation of a window against the configured rules
pub(crate) fn evaluate_window(
    window: &VecDeque<EmotionSample>,
    config: &AggregatorConfig,
) -> Option<AlertMessage> {
    let (oldest, newest) = (window.front()?, window.back()?);
    if newest.timestamp - oldest.timestamp < as_millis(config.sustain_duration) {
        return None;
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut qualifying = 0usize;
    for sample in window.iter().filter(|s| s.dominant_score >= config.min_confidence) {
        *counts.entry(sample.dominant.as_str()).or_default() += 1;
        qualifying += 1;
    }
    if qualifying == 0 {
        return None;
    }

    config.rules.iter().find_map(|rule| {
        let hits = counts.get(rule.label.as_str()).copied().unwrap_or(0);
        let ratio = hits as f64 / qualifying as f64;
        (ratio >= rule.threshold).then(|| AlertMessage::new(rule.level, rule.message.clone()))
    })
}
