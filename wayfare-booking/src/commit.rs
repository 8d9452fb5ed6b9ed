use crate::model::Booking;
use crate::repository::BookingRepository;
use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use wayfare_catalog::ledger::{CapacityLedger, LedgerError};
use wayfare_catalog::schedule::Schedule;
use wayfare_catalog::tour::TourTemplate;
use wayfare_core::payment::{
    AuthorizationStatus, PaymentAuthorization, PaymentError, PaymentGateway, Payer,
};
use wayfare_pricing::model::PricingModel;
use wayfare_pricing::selections::Selections;
use wayfare_pricing::validator::{ConstraintValidator, Violation};

#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error("Selections failed validation")]
    Rejected(Vec<Violation>),

    #[error(transparent)]
    Capacity(#[from] LedgerError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("Failed to persist booking: {0}")]
    Persistence(String),
}

/// Unless disarmed, the reservation is given back when the guard leaves
/// scope, so an aborted commit can never strand slots.
struct HoldGuard<'a> {
    ledger: &'a CapacityLedger,
    token_id: Uuid,
    armed: bool,
}

impl<'a> HoldGuard<'a> {
    fn new(ledger: &'a CapacityLedger, token_id: Uuid) -> Self {
        Self {
            ledger,
            token_id,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for HoldGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(err) = self.ledger.release(self.token_id) {
                tracing::error!("Failed to release reservation {}: {}", self.token_id, err);
            }
        }
    }
}

/// Turns a finished set of selections into a confirmed booking:
/// validate, hold capacity, take payment, persist. Every failure after the
/// hold compensates what already happened.
pub struct BookingCommitService {
    ledger: Arc<CapacityLedger>,
    gateway: Arc<dyn PaymentGateway>,
    repository: Arc<dyn BookingRepository>,
    pricing: PricingModel,
    reservation_hold: Duration,
}

impl BookingCommitService {
    pub fn new(
        ledger: Arc<CapacityLedger>,
        gateway: Arc<dyn PaymentGateway>,
        repository: Arc<dyn BookingRepository>,
        pricing: PricingModel,
        reservation_hold: Duration,
    ) -> Self {
        Self {
            ledger,
            gateway,
            repository,
            pricing,
            reservation_hold,
        }
    }

    pub async fn commit(
        &self,
        template: &TourTemplate,
        schedule: &Schedule,
        selections: Selections,
    ) -> Result<Booking, CommitError> {
        // 1. Validate against a fresh capacity snapshot
        let mut schedule = schedule.clone();
        self.ledger.refresh(&mut schedule);
        let violations = ConstraintValidator::validate(template, &schedule, &selections);
        if !violations.is_empty() {
            return Err(CommitError::Rejected(violations));
        }

        // Validation has already established both are present
        let (Some(contact), Some(method)) =
            (selections.contact.clone(), selections.payment_method.clone())
        else {
            return Err(CommitError::Rejected(vec![Violation::PaymentMethodMissing]));
        };

        // 2. Price the final selections
        let breakdown = self.pricing.compute(template, &schedule, &selections);

        // 3. Hold capacity before any money moves
        let token = self
            .ledger
            .reserve(schedule.id, selections.slots_needed(), self.reservation_hold)?;
        let guard = HoldGuard::new(&self.ledger, token.id);

        // 4. Authorize payment for the full total
        let booking_id = Uuid::new_v4();
        let payer = Payer {
            name: contact.name.clone(),
            email: contact.email.clone(),
        };
        let authorization = self
            .gateway
            .authorize(
                booking_id,
                breakdown.total,
                &breakdown.currency,
                &method,
                &payer,
            )
            .await?;

        // 5. Seal the hold. It may have expired while the gateway was slow.
        if let Err(err) = self.ledger.confirm(token.id) {
            self.reverse_best_effort(&authorization).await;
            return Err(CommitError::Capacity(err));
        }

        // 6. Persist the booking record
        let booking = Booking::new(
            booking_id,
            template.id,
            schedule.id,
            selections,
            breakdown,
            token.slots,
            token.id,
            authorization.id.clone(),
        );
        if let Err(err) = self.repository.create(&booking).await {
            tracing::error!("Failed to persist booking {}: {}", booking.id, err);
            self.reverse_best_effort(&authorization).await;
            return Err(CommitError::Persistence(err.to_string()));
        }

        // 7. The slots now belong to the booking
        guard.disarm();
        Ok(booking)
    }

    async fn reverse_best_effort(&self, authorization: &PaymentAuthorization) {
        if let Err(err) = self.gateway.reverse(&authorization.id).await {
            // Needs manual reconciliation: the money may still be captured
            tracing::error!("Payment reversal failed for {}: {}", authorization.id, err);
        }
    }
}

pub struct MockPaymentGateway {
    authorized: Mutex<Vec<PaymentAuthorization>>,
    reversed: Mutex<Vec<String>>,
    fail_reversals: AtomicBool,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self {
            authorized: Mutex::new(Vec::new()),
            reversed: Mutex::new(Vec::new()),
            fail_reversals: AtomicBool::new(false),
        }
    }

    pub fn authorized_count(&self) -> usize {
        self.authorized
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn reversed_ids(&self) -> Vec<String> {
        self.reversed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn fail_reversals(&self) {
        self.fail_reversals.store(true, Ordering::SeqCst);
    }
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn authorize(
        &self,
        booking_ref: Uuid,
        amount: i64,
        currency: &str,
        method: &wayfare_core::payment::PaymentMethod,
        _payer: &Payer,
    ) -> Result<PaymentAuthorization, PaymentError> {
        // Triggers for testing failure paths
        if method.reference.as_deref() == Some("fail-auth") {
            return Err(PaymentError::Declined("card declined by issuer".to_string()));
        }
        if method.reference.as_deref() == Some("fail-circuit") {
            return Err(PaymentError::GatewayUnavailable(
                "Simulated Payment Gateway Failure".to_string(),
            ));
        }

        let authorization = PaymentAuthorization {
            id: format!("mock_auth_{}", booking_ref.simple()),
            booking_ref,
            amount,
            currency: currency.to_string(),
            status: AuthorizationStatus::Authorized,
            created_at: Utc::now(),
        };
        self.authorized
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(authorization.clone());
        Ok(authorization)
    }

    async fn reverse(&self, authorization_id: &str) -> Result<(), PaymentError> {
        if self.fail_reversals.load(Ordering::SeqCst) {
            return Err(PaymentError::ReversalFailed {
                authorization_id: authorization_id.to_string(),
                reason: "simulated reversal outage".to_string(),
            });
        }
        self.reversed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(authorization_id.to_string());
        Ok(())
    }
}
