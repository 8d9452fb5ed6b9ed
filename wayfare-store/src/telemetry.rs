use tracing::info;
use wayfare_shared::models::events::{
    BookingCancelledEvent, BookingConfirmedEvent, CommitCompensatedEvent,
};

/// Emits booking lifecycle events as JSON log lines. Downstream consumers
/// tail these instead of a message broker.
pub struct BookingTelemetry;

impl BookingTelemetry {
    pub fn new() -> Self {
        Self
    }

    pub async fn log_booking_confirmed(&self, event: BookingConfirmedEvent) -> Result<(), String> {
        self.publish("booking_confirmed", &event).await
    }

    pub async fn log_booking_cancelled(&self, event: BookingCancelledEvent) -> Result<(), String> {
        self.publish("booking_cancelled", &event).await
    }

    pub async fn log_commit_compensated(
        &self,
        event: CommitCompensatedEvent,
    ) -> Result<(), String> {
        self.publish("commit_compensated", &event).await
    }

    async fn publish<T: serde::Serialize>(
        &self,
        event_type: &str,
        payload: &T,
    ) -> Result<(), String> {
        let json = serde_json::to_string(payload).map_err(|e| e.to_string())?;
        info!("{} {}", event_type, json);
        Ok(())
    }
}

impl Default for BookingTelemetry {
    fn default() -> Self {
        Self::new()
    }
}
