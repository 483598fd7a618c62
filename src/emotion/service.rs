//! Ingest Service
//!
//! The per-message pipeline every connection task runs:
//! decode → classify → aggregate → mirror to all viewers.

use std::sync::Arc;

use super::aggregator::Aggregator;
use super::decoder::{Decoder, JsonDecoder};
use super::error::DecodeError;
use super::types::EmotionSample;
use crate::websocket::{ConnectionHub, OutboundMessage};

/// Processes inbound readings against the shared aggregator and hub
pub struct EmotionService {
    decoder: Arc<dyn Decoder>,
    aggregator: Arc<Aggregator>,
    hub: ConnectionHub,
}

impl EmotionService {
    /// Service using the JSON wire format
    pub fn new(aggregator: Arc<Aggregator>, hub: ConnectionHub) -> Self {
        Self::with_decoder(Arc::new(JsonDecoder), aggregator, hub)
    }

    pub fn with_decoder(
        decoder: Arc<dyn Decoder>,
        aggregator: Arc<Aggregator>,
        hub: ConnectionHub,
    ) -> Self {
        Self {
            decoder,
            aggregator,
            hub,
        }
    }

    /// Handle one inbound payload.
    ///
    /// On a decode error nothing is aggregated or broadcast. If the mirrored
    /// reading cannot be encoded it is still kept in the window.
    pub async fn process(&self, bytes: &[u8]) -> Result<EmotionSample, DecodeError> {
        let sample = self.decoder.decode(bytes)?;
        let sample = self.aggregator.add_sample(sample).await;

        match OutboundMessage::Reading(sample.clone()).to_payload() {
            Ok(payload) => self.hub.broadcast(payload),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize reading");
            }
        }

        tracing::trace!(
            timestamp = sample.timestamp,
            dominant = %sample.dominant,
            score = sample.dominant_score,
            "Reading ingested"
        );

        Ok(sample)
    }

    pub fn aggregator(&self) -> &Arc<Aggregator> {
        &self.aggregator
    }

    pub fn hub(&self) -> &ConnectionHub {
        &self.hub
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::AggregatorConfig;
    use crate::websocket::{HubConfig, MockConnection};

    async fn setup() -> (EmotionService, tokio::sync::mpsc::UnboundedReceiver<String>) {
        let hub = ConnectionHub::new(HubConfig::default());
        let (viewer, rx) = MockConnection::new();
        hub.register(viewer).await.unwrap();
        let aggregator = Arc::new(Aggregator::new(AggregatorConfig::default()));
        (EmotionService::new(aggregator, hub), rx)
    }

    #[tokio::test]
    async fn test_process_mirrors_reading() {
        let (service, mut rx) = setup().await;

        let sample = service
            .process(br#"{"timestamp": 100, "confidence": 0.9, "emotions": {"angry": 0.9, "sad": 0.1}}"#)
            .await
            .unwrap();
        assert_eq!(sample.dominant, "angry");
        assert_eq!(service.aggregator().len().await, 1);

        service.hub().connection_count().await;
        let payload = rx.try_recv().unwrap();
        let json: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(json["timestamp"], 100.0);
        assert_eq!(json["dominant"], "angry");
        assert_eq!(json["dominant_score"], 0.9);
    }

    #[tokio::test]
    async fn test_malformed_input_changes_nothing() {
        let (service, mut rx) = setup().await;
        let angry = br#"{"timestamp": 0, "emotions": {"angry": 0.9}}"#;
        let later = br#"{"timestamp": 6000, "emotions": {"angry": 0.9}}"#;
        service.process(angry).await.unwrap();
        service.process(later).await.unwrap();
        let before = service.aggregator().snapshot().await;
        let alert_before = service.aggregator().evaluate().await;

        assert!(service.process(b"garbage").await.is_err());
        assert!(service.process(br#"{"timestamp": "now"}"#).await.is_err());
        assert!(service.process(br#"{"emotions": {"sad": [1]}}"#).await.is_err());

        assert_eq!(service.aggregator().snapshot().await, before);
        assert_eq!(service.aggregator().evaluate().await, alert_before);

        // Only the two valid readings were mirrored
        service.hub().connection_count().await;
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());

        // Later valid input still flows
        assert!(service.process(br#"{"timestamp": 6100}"#).await.is_ok());
    }
}
