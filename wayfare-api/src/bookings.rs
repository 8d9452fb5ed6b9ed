use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;
use wayfare_booking::commit::CommitError;
use wayfare_booking::model::{Booking, BookingStatus};
use wayfare_catalog::ledger::LedgerError;
use wayfare_catalog::tour::TransportLegKind;
use wayfare_core::payment::PaymentMethod;
use wayfare_pricing::model::PriceBreakdown;
use wayfare_pricing::selections::{ContactInfo, MealOptOut, RoomTierChoice, Selections};
use wayfare_shared::models::events::{
    BookingCancelledEvent, BookingConfirmedEvent, CommitCompensatedEvent,
};

use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub tour_id: Uuid,
    pub schedule_id: Uuid,
    pub party_size: i32,
    #[serde(default)]
    pub room_tier: RoomTierChoice,
    #[serde(default)]
    pub meal_opt_outs: BTreeSet<MealOptOut>,
    #[serde(default)]
    pub transport_opt_outs: BTreeSet<TransportLegKind>,
    pub contact: ContactInfo,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub tour_id: Uuid,
    pub schedule_id: Uuid,
    pub status: BookingStatus,
    pub reserved_slots: i32,
    pub selections: Selections,
    pub breakdown: PriceBreakdown,
    pub created_at: DateTime<Utc>,
}

impl From<&Booking> for BookingResponse {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id,
            tour_id: booking.tour_id,
            schedule_id: booking.schedule_id,
            status: booking.status,
            reserved_slots: booking.reserved_slots,
            selections: booking.selections.clone(),
            breakdown: booking.breakdown.clone(),
            created_at: booking.created_at,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
        .route("/v1/bookings/{id}/complete", post(complete_booking))
}

/// Record a commit attempt that had to unwind after holding capacity
pub(crate) async fn log_compensation(
    state: &AppState,
    schedule_id: Uuid,
    slots: i32,
    err: &CommitError,
) {
    let unwound = matches!(
        err,
        CommitError::Payment(_)
            | CommitError::Persistence(_)
            | CommitError::Capacity(LedgerError::HoldExpired(_))
    );
    if !unwound {
        return;
    }

    let payment_reversed = matches!(
        err,
        CommitError::Persistence(_) | CommitError::Capacity(LedgerError::HoldExpired(_))
    );
    let _ = state
        .telemetry
        .log_commit_compensated(CommitCompensatedEvent {
            schedule_id,
            released_slots: slots,
            payment_reversed,
            reason: err.to_string(),
            timestamp: Utc::now().timestamp(),
        })
        .await;
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/bookings
/// Commit a booking in one call, without a wizard session
pub async fn create_booking(
    State(state): State<AppState>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Json<BookingResponse>, ApiError> {
    if req.party_size < 1 {
        return Err(ApiError::BadRequest(
            "Party size must be at least 1".to_string(),
        ));
    }

    // 1. Load the tour and departure
    let template = state
        .catalog
        .get_tour(req.tour_id)
        .await
        .map_err(anyhow::Error::from_boxed)?
        .filter(|t| t.is_active)
        .ok_or_else(|| ApiError::NotFound(format!("Tour not found: {}", req.tour_id)))?;

    let schedule = state
        .catalog
        .get_schedule(req.schedule_id)
        .await
        .map_err(anyhow::Error::from_boxed)?
        .ok_or_else(|| ApiError::NotFound(format!("Schedule not found: {}", req.schedule_id)))?;

    if schedule.tour_id != template.id {
        return Err(ApiError::BadRequest(
            "Schedule does not belong to this tour".to_string(),
        ));
    }
    state.ledger.register(&schedule);

    // 2. Assemble the draft selections
    let mut selections = Selections::new();
    selections.schedule_id = Some(schedule.id);
    selections.party_size = req.party_size;
    selections.room_tier = req.room_tier;
    selections.meal_opt_outs = req.meal_opt_outs;
    selections.transport_opt_outs = req.transport_opt_outs;
    selections.contact = Some(req.contact);
    selections.payment_method = Some(req.payment_method);

    // 3. Validate, hold capacity, take payment, persist
    let slots = selections.slots_needed();
    let booking = match state.commit.commit(&template, &schedule, selections).await {
        Ok(booking) => booking,
        Err(err) => {
            log_compensation(&state, schedule.id, slots, &err).await;
            return Err(ApiError::from_commit(err));
        }
    };

    // 4. Log Telemetry
    let _ = state
        .telemetry
        .log_booking_confirmed(BookingConfirmedEvent {
            booking_id: booking.id,
            schedule_id: booking.schedule_id,
            party_size: booking.selections.party_size,
            reserved_slots: booking.reserved_slots,
            total: booking.breakdown.total,
            currency: booking.breakdown.currency.clone(),
            timestamp: Utc::now().timestamp(),
        })
        .await;

    Ok(Json(BookingResponse::from(&booking)))
}

/// GET /v1/bookings/{id}
/// Retrieve one booking
pub async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking = state
        .bookings
        .get(booking_id)
        .await
        .map_err(anyhow::Error::from_boxed)?
        .ok_or_else(|| ApiError::NotFound(format!("Booking not found: {}", booking_id)))?;

    Ok(Json(BookingResponse::from(&booking)))
}

/// POST /v1/bookings/{id}/cancel
/// Cancel a confirmed booking and free its slots. Safe to repeat.
pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, ApiError> {
    // 1. Fetch the booking
    let mut booking = state
        .bookings
        .get(booking_id)
        .await
        .map_err(anyhow::Error::from_boxed)?
        .ok_or_else(|| ApiError::NotFound(format!("Booking not found: {}", booking_id)))?;

    // 2. Guard the transition
    match booking.status {
        BookingStatus::Cancelled => return Ok(Json(BookingResponse::from(&booking))),
        BookingStatus::Completed => {
            return Err(ApiError::Conflict(
                "Completed bookings cannot be cancelled".to_string(),
            ))
        }
        BookingStatus::Confirmed => {}
    }

    // 3. Give the slots back
    if let Err(err) = state.ledger.release(booking.reservation_id) {
        tracing::warn!(
            "Could not release reservation {}: {}",
            booking.reservation_id,
            err
        );
    }

    // 4. Persist the new status
    state
        .bookings
        .update_status(booking.id, BookingStatus::Cancelled)
        .await
        .map_err(anyhow::Error::from_boxed)?;
    booking.status = BookingStatus::Cancelled;

    // 5. Log Telemetry
    let _ = state
        .telemetry
        .log_booking_cancelled(BookingCancelledEvent {
            booking_id: booking.id,
            schedule_id: booking.schedule_id,
            released_slots: booking.reserved_slots,
            timestamp: Utc::now().timestamp(),
        })
        .await;

    Ok(Json(BookingResponse::from(&booking)))
}

/// POST /v1/bookings/{id}/complete
/// Mark a booking completed once the tour has run. The slots stay consumed.
pub async fn complete_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, ApiError> {
    let mut booking = state
        .bookings
        .get(booking_id)
        .await
        .map_err(anyhow::Error::from_boxed)?
        .ok_or_else(|| ApiError::NotFound(format!("Booking not found: {}", booking_id)))?;

    match booking.status {
        BookingStatus::Completed => return Ok(Json(BookingResponse::from(&booking))),
        BookingStatus::Cancelled => {
            return Err(ApiError::Conflict(
                "Cancelled bookings cannot be completed".to_string(),
            ))
        }
        BookingStatus::Confirmed => {}
    }

    state
        .bookings
        .update_status(booking.id, BookingStatus::Completed)
        .await
        .map_err(anyhow::Error::from_boxed)?;
    booking.status = BookingStatus::Completed;

    Ok(Json(BookingResponse::from(&booking)))
}
