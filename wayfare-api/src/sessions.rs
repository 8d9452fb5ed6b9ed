use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wayfare_booking::model::Booking;
use wayfare_booking::wizard::{WizardManager, WizardSession, WizardStep};
use wayfare_catalog::schedule::Schedule;
use wayfare_catalog::tour::{MealSession, TourTemplate, TransportLegKind};
use wayfare_core::payment::PaymentMethod;
use wayfare_pricing::model::PriceBreakdown;
use wayfare_pricing::selections::{ContactInfo, RoomTierChoice, Selections};
use wayfare_shared::models::events::BookingConfirmedEvent;

use crate::bookings::{log_compensation, BookingResponse};
use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub tour_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SelectScheduleRequest {
    pub schedule_id: Uuid,
    pub party_size: i32,
}

#[derive(Debug, Deserialize)]
pub struct ToggleMealRequest {
    pub day: u32,
    pub session: MealSession,
}

#[derive(Debug, Deserialize)]
pub struct ToggleTransportRequest {
    pub leg: TransportLegKind,
}

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct PaymentMethodRequest {
    pub method: String,
    pub reference: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: Uuid,
    pub tour_id: Uuid,
    pub step: WizardStep,
    pub selections: Selections,
    pub breakdown: Option<PriceBreakdown>,
    pub booking_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<&WizardSession> for SessionResponse {
    fn from(session: &WizardSession) -> Self {
        Self {
            id: session.id,
            tour_id: session.tour_id,
            step: session.step,
            selections: session.selections.clone(),
            breakdown: session.breakdown.clone(),
            booking_id: session.booking_id,
            created_at: session.created_at,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/sessions", post(create_session))
        .route("/v1/sessions/{id}", get(get_session))
        .route("/v1/sessions/{id}", delete(abandon_session))
        .route("/v1/sessions/{id}/schedule", post(select_schedule))
        .route("/v1/sessions/{id}/advance", post(advance_session))
        .route("/v1/sessions/{id}/back", post(step_back))
        .route("/v1/sessions/{id}/room", post(set_room_tier))
        .route("/v1/sessions/{id}/meals/toggle", post(toggle_meal))
        .route("/v1/sessions/{id}/transport/toggle", post(toggle_transport))
        .route("/v1/sessions/{id}/contact", post(set_contact))
        .route("/v1/sessions/{id}/payment-method", post(set_payment_method))
        .route("/v1/sessions/{id}/commit", post(commit_session))
}

// ============================================================================
// Helpers
// ============================================================================

fn respond(wizards: &WizardManager, session_id: &Uuid) -> Result<Json<SessionResponse>, ApiError> {
    let session = wizards
        .get_session(session_id)
        .map_err(ApiError::from_wizard)?;
    Ok(Json(SessionResponse::from(session)))
}

/// Snapshot a live session. Abandoned sessions are gone, not conflicting.
async fn snapshot(state: &AppState, session_id: &Uuid) -> Result<WizardSession, ApiError> {
    let wizards = state.wizards.read().await;
    let session = wizards
        .get_session(session_id)
        .map_err(ApiError::from_wizard)?;
    if session.step == WizardStep::Abandoned {
        return Err(ApiError::Gone(format!("Session abandoned: {}", session_id)));
    }
    Ok(session.clone())
}

/// Resolve the session's tour and departure, with live capacity counts
async fn load_context(
    state: &AppState,
    session: &WizardSession,
) -> Result<(TourTemplate, Schedule), ApiError> {
    let template = state
        .catalog
        .get_tour(session.tour_id)
        .await
        .map_err(anyhow::Error::from_boxed)?
        .filter(|t| t.is_active)
        .ok_or_else(|| ApiError::NotFound(format!("Tour not found: {}", session.tour_id)))?;

    let schedule_id = session
        .selections
        .schedule_id
        .ok_or_else(|| ApiError::BadRequest("No schedule selected".to_string()))?;

    let mut schedule = state
        .catalog
        .get_schedule(schedule_id)
        .await
        .map_err(anyhow::Error::from_boxed)?
        .ok_or_else(|| ApiError::NotFound(format!("Schedule not found: {}", schedule_id)))?;

    state.ledger.register(&schedule);
    state.ledger.refresh(&mut schedule);

    Ok((template, schedule))
}

/// Price, hold and persist one claimed session. Any error here leaves the
/// commit claim for the caller to drop.
async fn run_commit(state: &AppState, session: &WizardSession) -> Result<Booking, ApiError> {
    let (template, schedule) = load_context(state, session).await?;

    let slots = session.selections.slots_needed();
    match state
        .commit
        .commit(&template, &schedule, session.selections.clone())
        .await
    {
        Ok(booking) => Ok(booking),
        Err(err) => {
            log_compensation(state, schedule.id, slots, &err).await;
            Err(ApiError::from_commit(err))
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/sessions
/// Open a booking wizard for one tour
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    state
        .catalog
        .get_tour(req.tour_id)
        .await
        .map_err(anyhow::Error::from_boxed)?
        .filter(|t| t.is_active)
        .ok_or_else(|| ApiError::NotFound(format!("Tour not found: {}", req.tour_id)))?;

    let session = state.wizards.write().await.create_session(req.tour_id);
    Ok(Json(SessionResponse::from(&session)))
}

/// GET /v1/sessions/{id}
/// Current step, selections and price of one session
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let wizards = state.wizards.read().await;
    respond(&wizards, &session_id)
}

/// DELETE /v1/sessions/{id}
/// Abandon the wizard. Safe to repeat.
pub async fn abandon_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let mut wizards = state.wizards.write().await;
    let step = wizards
        .get_session(&session_id)
        .map_err(ApiError::from_wizard)?
        .step;

    if step != WizardStep::Abandoned {
        wizards.abandon(&session_id).map_err(ApiError::from_wizard)?;
    }
    respond(&wizards, &session_id)
}

/// POST /v1/sessions/{id}/schedule
/// Pick a departure date and party size
pub async fn select_schedule(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<SelectScheduleRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = snapshot(&state, &session_id).await?;

    let schedule = state
        .catalog
        .get_schedule(req.schedule_id)
        .await
        .map_err(anyhow::Error::from_boxed)?
        .ok_or_else(|| ApiError::NotFound(format!("Schedule not found: {}", req.schedule_id)))?;

    if schedule.tour_id != session.tour_id {
        return Err(ApiError::BadRequest(
            "Schedule does not belong to this tour".to_string(),
        ));
    }

    let mut wizards = state.wizards.write().await;
    wizards
        .select_schedule(&session_id, &schedule, req.party_size)
        .map_err(ApiError::from_wizard)?;
    respond(&wizards, &session_id)
}

/// POST /v1/sessions/{id}/advance
/// Move the wizard to its next step
pub async fn advance_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = snapshot(&state, &session_id).await?;
    let (template, schedule) = load_context(&state, &session).await?;

    let mut wizards = state.wizards.write().await;
    match session.step {
        WizardStep::SelectingSchedule => wizards
            .begin_customizing(&session_id, &template, &schedule)
            .map_err(ApiError::from_wizard)?,
        WizardStep::Customizing => wizards
            .begin_confirming(&session_id, &template, &schedule)
            .map_err(ApiError::from_wizard)?,
        other => {
            return Err(ApiError::Conflict(format!(
                "Cannot advance from step {:?}",
                other
            )))
        }
    };
    respond(&wizards, &session_id)
}

/// POST /v1/sessions/{id}/back
/// Step back without losing any selections
pub async fn step_back(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    snapshot(&state, &session_id).await?;

    let mut wizards = state.wizards.write().await;
    wizards
        .step_back(&session_id)
        .map_err(ApiError::from_wizard)?;
    respond(&wizards, &session_id)
}

/// POST /v1/sessions/{id}/room
/// Choose the room tier for the whole party
pub async fn set_room_tier(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(choice): Json<RoomTierChoice>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = snapshot(&state, &session_id).await?;
    let (template, schedule) = load_context(&state, &session).await?;

    let mut wizards = state.wizards.write().await;
    wizards
        .set_room_tier(&session_id, &template, &schedule, choice)
        .map_err(ApiError::from_wizard)?;
    respond(&wizards, &session_id)
}

/// POST /v1/sessions/{id}/meals/toggle
/// Opt out of one included meal slot, or opt back in
pub async fn toggle_meal(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<ToggleMealRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = snapshot(&state, &session_id).await?;
    let (template, schedule) = load_context(&state, &session).await?;

    let mut wizards = state.wizards.write().await;
    wizards
        .toggle_meal(&session_id, &template, &schedule, req.day, req.session)
        .map_err(ApiError::from_wizard)?;
    respond(&wizards, &session_id)
}

/// POST /v1/sessions/{id}/transport/toggle
/// Opt out of one included transport leg, or opt back in
pub async fn toggle_transport(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<ToggleTransportRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = snapshot(&state, &session_id).await?;
    let (template, schedule) = load_context(&state, &session).await?;

    let mut wizards = state.wizards.write().await;
    wizards
        .toggle_transport(&session_id, &template, &schedule, req.leg)
        .map_err(ApiError::from_wizard)?;
    respond(&wizards, &session_id)
}

/// POST /v1/sessions/{id}/contact
/// Set who is booking
pub async fn set_contact(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<ContactRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    snapshot(&state, &session_id).await?;

    let contact = ContactInfo {
        name: req.name,
        email: req.email.into(),
        phone: req.phone.into(),
    };

    let mut wizards = state.wizards.write().await;
    wizards
        .set_contact(&session_id, contact)
        .map_err(ApiError::from_wizard)?;
    respond(&wizards, &session_id)
}

/// POST /v1/sessions/{id}/payment-method
/// Set how the traveler wants to pay
pub async fn set_payment_method(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<PaymentMethodRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    snapshot(&state, &session_id).await?;

    let method = PaymentMethod {
        method: req.method,
        reference: req.reference,
    };

    let mut wizards = state.wizards.write().await;
    wizards
        .set_payment_method(&session_id, method)
        .map_err(ApiError::from_wizard)?;
    respond(&wizards, &session_id)
}

/// POST /v1/sessions/{id}/commit
/// Turn the confirmed selections into a booking
pub async fn commit_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, ApiError> {
    // 1. Claim the session for this commit. The claim checks the step and
    //    refuses a second commit until this one settles.
    snapshot(&state, &session_id).await?;
    let session = state
        .wizards
        .write()
        .await
        .begin_commit(&session_id)
        .map_err(ApiError::from_wizard)?;

    // 2. Validate, hold capacity, take payment, persist
    let booking = match run_commit(&state, &session).await {
        Ok(booking) => booking,
        Err(err) => {
            state.wizards.write().await.abort_commit(&session_id);
            return Err(err);
        }
    };

    // 3. Seal the session
    if let Err(err) = state
        .wizards
        .write()
        .await
        .mark_committed(&session_id, booking.id)
    {
        tracing::warn!(
            "Booking {} committed but session {} could not be updated: {}",
            booking.id,
            session_id,
            err
        );
    }

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
