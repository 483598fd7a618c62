//! Inbound Reading Decoder
//!
//! Parses the JSON frames browsers send:
//!
//! ```json
//! { "timestamp": 1234.5, "confidence": 0.97, "emotions": { "happy": 0.8, "sad": 0.1 } }
//! ```
//!
//! Missing or `null` fields fall back to zero values. Unknown fields,
//! including any client-supplied `dominant`, are ignored.

use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

use super::error::DecodeError;
use super::types::EmotionSample;

/// Turns an inbound payload into an unclassified sample
pub trait Decoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<EmotionSample, DecodeError>;
}

/// Decoder for the JSON wire format
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDecoder;

#[derive(Debug, Deserialize)]
struct InboundReading {
    #[serde(default, deserialize_with = "null_as_default")]
    timestamp: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    confidence: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    emotions: BTreeMap<String, f64>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Decoder for JsonDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<EmotionSample, DecodeError> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        if !value.is_object() {
            return Err(DecodeError::NotAnObject);
        }

        let reading = InboundReading::deserialize(value)?;
        if reading.emotions.keys().any(|label| label.is_empty()) {
            return Err(DecodeError::EmptyLabel);
        }

        let mut sample = EmotionSample::new(reading.timestamp, reading.confidence);
        sample.emotions = reading.emotions;
        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(input: &str) -> Result<EmotionSample, DecodeError> {
        JsonDecoder.decode(input.as_bytes())
    }

    #[test]
    fn test_decode_full_reading() {
        let sample = decode(
            r#"{"timestamp": 1699000000123, "confidence": 0.97, "emotions": {"happy": 0.8, "sad": 0.1}}"#,
        )
        .unwrap();

        assert_eq!(sample.timestamp, 1699000000123.0);
        assert_eq!(sample.confidence, 0.97);
        assert_eq!(sample.emotions["happy"], 0.8);
        assert_eq!(sample.emotions["sad"], 0.1);
        assert_eq!(sample.dominant, "");
    }

    #[test]
    fn test_missing_fields_default_to_zero() {
        let sample = decode("{}").unwrap();
        assert_eq!(sample.timestamp, 0.0);
        assert_eq!(sample.confidence, 0.0);
        assert!(sample.emotions.is_empty());

        let sample = decode(r#"{"timestamp": null, "emotions": null}"#).unwrap();
        assert_eq!(sample.timestamp, 0.0);
        assert!(sample.emotions.is_empty());
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let sample = decode(
            r#"{"timestamp": 10, "dominant": 42, "extra": [1,2,3], "emotions": {"angry": 0.6}}"#,
        )
        .unwrap();
        assert_eq!(sample.timestamp, 10.0);
        assert_eq!(sample.dominant, "");
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(decode("not json"), Err(DecodeError::Json(_))));
        assert!(matches!(decode(r#"{"timestamp": "soon"}"#), Err(DecodeError::Json(_))));
        assert!(matches!(
            decode(r#"{"emotions": {"angry": "very"}}"#),
            Err(DecodeError::Json(_))
        ));
        assert!(matches!(decode("[1, 2, 3]"), Err(DecodeError::NotAnObject)));
        assert!(matches!(decode(r#"{"emotions": {"": 0.5}}"#), Err(DecodeError::EmptyLabel)));
    }
}
