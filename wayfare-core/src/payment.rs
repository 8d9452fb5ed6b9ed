use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use wayfare_shared::pii::Masked;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorizationStatus {
    Authorized,
    Reversed,
}

/// How the traveler wants to pay, as captured by the booking flow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentMethod {
    pub method: String,            // e.g. CARD, BANK_TRANSFER
    pub reference: Option<String>, // gateway-specific token or voucher code
}

/// Payer details forwarded to the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payer {
    pub name: String,
    pub email: Masked<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentAuthorization {
    pub id: String, // Provider's token (e.g. auth_1a2b)
    pub booking_ref: Uuid,
    pub amount: i64,
    pub currency: String,
    pub status: AuthorizationStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment declined: {0}")]
    Declined(String),

    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("Reversal failed for {authorization_id}: {reason}")]
    ReversalFailed {
        authorization_id: String,
        reason: String,
    },
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Authorize a charge for the final booking total
    async fn authorize(
        &self,
        booking_ref: Uuid,
        amount: i64,
        currency: &str,
        method: &PaymentMethod,
        payer: &Payer,
    ) -> Result<PaymentAuthorization, PaymentError>;

    /// Best-effort reversal of a previous authorization
    async fn reverse(&self, authorization_id: &str) -> Result<(), PaymentError>;
}
