//! Emotion pipeline error types

use thiserror::Error;

/// Errors produced while decoding an inbound reading
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Payload is not JSON, or a field has the wrong type
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload is valid JSON but not an object
    #[error("Reading must be a JSON object")]
    NotAnObject,

    /// An emotion label was the empty string
    #[error("Emotion labels must be non-empty")]
    EmptyLabel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            DecodeError::NotAnObject.to_string(),
            "Reading must be a JSON object"
        );
        assert_eq!(
            DecodeError::EmptyLabel.to_string(),
            "Emotion labels must be non-empty"
        );
    }
}
