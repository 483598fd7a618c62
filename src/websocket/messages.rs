//! WebSocket Message Types
//!
//! Outbound frames sent to every viewer. Readings are mirrored as-is with
//! their dominant emotion attached; alerts carry `"type": "alert"`.

use serde::Serialize;

use crate::emotion::{AlertMessage, EmotionSample};

/// Messages sent from server to clients
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    /// A classified reading
    Reading(EmotionSample),
    /// A sustained-state alert
    Alert(AlertMessage),
}

impl OutboundMessage {
    /// Encode as a text frame payload
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<EmotionSample> for OutboundMessage {
    fn from(sample: EmotionSample) -> Self {
        OutboundMessage::Reading(sample)
    }
}

impl From<AlertMessage> for OutboundMessage {
    fn from(alert: AlertMessage) -> Self {
        OutboundMessage::Alert(alert)
    }
}
