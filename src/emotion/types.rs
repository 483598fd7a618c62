//! Core data types for the emotion stream
//!
//! Defines the fundamental structures:
//! - `EmotionSample`: A single classified reading from a client
//! - `AlertMessage`: An out-of-band notice about a sustained state
//! - `AlertRule`: One label/threshold pair the evaluator checks

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::classifier::classify;

/// A single facial-emotion reading
///
/// `dominant` and `dominant_score` are derived from `emotions` by
/// [`EmotionSample::classified`] and are empty/zero until then.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionSample {
    /// Client clock, milliseconds
    pub timestamp: f64,
    /// Face detection confidence (0.0 - 1.0)
    pub confidence: f64,
    /// Label → score
    pub emotions: BTreeMap<String, f64>,
    /// Label with the highest score
    pub dominant: String,
    /// Score of the dominant label
    pub dominant_score: f64,
}

impl EmotionSample {
    /// Create an unclassified sample with no emotion scores
    pub fn new(timestamp: f64, confidence: f64) -> Self {
        Self {
            timestamp,
            confidence,
            emotions: BTreeMap::new(),
            dominant: String::new(),
            dominant_score: 0.0,
        }
    }

    /// Add an emotion score (builder pattern)
    pub fn emotion(mut self, label: impl Into<String>, score: f64) -> Self {
        self.emotions.insert(label.into(), score);
        self
    }

    /// Attach the dominant label and score
    pub fn classified(mut self) -> Self {
        let dominant = classify(&self.emotions);
        self.dominant = dominant.label;
        self.dominant_score = dominant.score;
        self
    }
}

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Warning,
    Info,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertLevel::Warning => write!(f, "warning"),
            AlertLevel::Info => write!(f, "info"),
        }
    }
}

/// Type marker carried in every alert payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Alert,
}

/// Alert pushed to every viewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertMessage {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub level: AlertLevel,
    pub message: String,
}

impl AlertMessage {
    pub fn new(level: AlertLevel, message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Alert,
            level,
            message: message.into(),
        }
    }
}

/// Fires when at least `threshold` of the qualifying samples in the window
/// have `label` as their dominant emotion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub label: String,
    pub threshold: f64,
    pub level: AlertLevel,
    pub message: String,
}

impl AlertRule {
    pub fn new(
        label: impl Into<String>,
        threshold: f64,
        level: AlertLevel,
        message: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            threshold,
            level,
            message: message.into(),
        }
    }
}

/// Built-in rules, highest priority first
pub fn default_rules() -> Vec<AlertRule> {
    vec![
        AlertRule::new(
            "angry",
            0.8,
            AlertLevel::Warning,
            "Anger has stayed high for a sustained period",
        ),
        AlertRule::new(
            "sad",
            0.7,
            AlertLevel::Info,
            "Sadness has persisted for a sustained period",
        ),
        AlertRule::new(
            "neutral",
            0.9,
            AlertLevel::Info,
            "Expression has remained neutral for a sustained period",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_builder_and_classify() {
        let sample = EmotionSample::new(1000.0, 0.95)
            .emotion("angry", 0.9)
            .emotion("sad", 0.1)
            .classified();

        assert_eq!(sample.dominant, "angry");
        assert_eq!(sample.dominant_score, 0.9);
        assert_eq!(sample.emotions.len(), 2);
    }

    #[test]
    fn test_sample_serializes_reading_shape() {
        let sample = EmotionSample::new(1500.0, 0.8)
            .emotion("happy", 0.7)
            .classified();
        let json = serde_json::to_value(&sample).unwrap();

        assert_eq!(json["timestamp"], 1500.0);
        assert_eq!(json["confidence"], 0.8);
        assert_eq!(json["emotions"]["happy"], 0.7);
        assert_eq!(json["dominant"], "happy");
        assert_eq!(json["dominant_score"], 0.7);
        assert!(json.get("type").is_none());
    }

    #[test]
    fn test_alert_serialization() {
        let alert = AlertMessage::new(AlertLevel::Warning, "too angry");
        let json = serde_json::to_string(&alert).unwrap();

        assert_eq!(
            json,
            r#"{"type":"alert","level":"warning","message":"too angry"}"#
        );
    }

    #[test]
    fn test_default_rules_priority() {
        let rules = default_rules();
        let labels: Vec<_> = rules.iter().map(|r| r.label.as_str()).collect();

        assert_eq!(labels, vec!["angry", "sad", "neutral"]);
        assert_eq!(rules[0].level, AlertLevel::Warning);
        assert_eq!(rules[1].threshold, 0.7);
        assert_eq!(rules[2].level, AlertLevel::Info);
    }
}
