use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;
use wayfare_catalog::schedule::Schedule;
use wayfare_catalog::tour::TourTemplate;

use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub id: Uuid,
    pub tour_id: Uuid,
    pub departure_date: NaiveDate,
    pub return_date: NaiveDate,
    pub slots_available: i32,
}

impl ScheduleResponse {
    fn build(schedule: &Schedule, live_slots: Option<i32>) -> Self {
        Self {
            id: schedule.id,
            tour_id: schedule.tour_id,
            departure_date: schedule.departure_date,
            return_date: schedule.return_date,
            slots_available: live_slots.unwrap_or_else(|| schedule.slots_available()),
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/tours/{id}", get(get_tour))
        .route("/v1/tours/{id}/schedules", get(list_schedules))
        .route("/v1/schedules/{id}", get(get_schedule))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /v1/tours/{id}
/// Retrieve one bookable tour template
pub async fn get_tour(
    State(state): State<AppState>,
    Path(tour_id): Path<Uuid>,
) -> Result<Json<TourTemplate>, ApiError> {
    let tour = state
        .catalog
        .get_tour(tour_id)
        .await
        .map_err(anyhow::Error::from_boxed)?
        .filter(|t| t.is_active)
        .ok_or_else(|| ApiError::NotFound(format!("Tour not found: {}", tour_id)))?;

    Ok(Json(tour))
}

/// GET /v1/tours/{id}/schedules
/// Upcoming departures that still have room
pub async fn list_schedules(
    State(state): State<AppState>,
    Path(tour_id): Path<Uuid>,
) -> Result<Json<Vec<ScheduleResponse>>, ApiError> {
    state
        .catalog
        .get_tour(tour_id)
        .await
        .map_err(anyhow::Error::from_boxed)?
        .filter(|t| t.is_active)
        .ok_or_else(|| ApiError::NotFound(format!("Tour not found: {}", tour_id)))?;

    let today = Utc::now().date_naive();
    let schedules = state
        .catalog
        .list_schedules(tour_id)
        .await
        .map_err(anyhow::Error::from_boxed)?;

    let open: Vec<ScheduleResponse> = schedules
        .iter()
        .filter(|s| s.departs_after(today))
        .map(|s| {
            state.ledger.register(s);
            ScheduleResponse::build(s, state.ledger.slots_available(s.id))
        })
        .filter(|r| r.slots_available > 0)
        .collect();

    Ok(Json(open))
}

/// GET /v1/schedules/{id}
/// Live availability for one departure
pub async fn get_schedule(
    State(state): State<AppState>,
    Path(schedule_id): Path<Uuid>,
) -> Result<Json<ScheduleResponse>, ApiError> {
    let schedule = state
        .catalog
        .get_schedule(schedule_id)
        .await
        .map_err(anyhow::Error::from_boxed)?
        .ok_or_else(|| ApiError::NotFound(format!("Schedule not found: {}", schedule_id)))?;

    state.ledger.register(&schedule);
    Ok(Json(ScheduleResponse::build(
        &schedule,
        state.ledger.slots_available(schedule.id),
    )))
}
