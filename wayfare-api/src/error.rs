use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use wayfare_booking::commit::CommitError;
use wayfare_booking::wizard::WizardError;
use wayfare_catalog::ledger::LedgerError;
use wayfare_core::payment::PaymentError;
use wayfare_pricing::validator::Violation;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Validation(Vec<Violation>),
    PaymentRequired(String),
    NotFound(String),
    Conflict(String),
    Gone(String),
    BadGateway(String),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::Validation(violations) => {
                let details: Vec<_> = violations
                    .iter()
                    .map(|v| {
                        json!({
                            "violation": v,
                            "message": v.to_string(),
                        })
                    })
                    .collect();
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    json!({
                        "error": "Selections failed validation",
                        "violations": details,
                    }),
                )
            }
            ApiError::PaymentRequired(msg) => (StatusCode::PAYMENT_REQUIRED, json!({ "error": msg })),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            ApiError::Gone(msg) => (StatusCode::GONE, json!({ "error": msg })),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, json!({ "error": msg })),
            ApiError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
            ApiError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl ApiError {
    // WizardError and CommitError implement std::error::Error, so dedicated
    // From impls would collide with the blanket anyhow conversion below.
    pub fn from_wizard(err: WizardError) -> Self {
        match err {
            WizardError::NotFound(_) => ApiError::NotFound(err.to_string()),
            WizardError::InvalidTransition { .. } | WizardError::NotAllowed { .. } => {
                ApiError::Conflict(err.to_string())
            }
            WizardError::InvalidPartySize | WizardError::NoSchedule => {
                ApiError::BadRequest(err.to_string())
            }
            WizardError::Rejected(violations) => ApiError::Validation(violations),
        }
    }

    pub fn from_commit(err: CommitError) -> Self {
        match err {
            CommitError::Rejected(violations) => ApiError::Validation(violations),
            CommitError::Capacity(LedgerError::ScheduleNotFound(_)) => {
                ApiError::NotFound(err.to_string())
            }
            CommitError::Capacity(_) => ApiError::Conflict(err.to_string()),
            CommitError::Payment(PaymentError::Declined(_)) => {
                ApiError::PaymentRequired(err.to_string())
            }
            CommitError::Payment(PaymentError::GatewayUnavailable(_)) => {
                ApiError::BadGateway(err.to_string())
            }
            CommitError::Payment(PaymentError::ReversalFailed { .. }) => {
                ApiError::InternalServerError(err.to_string())
            }
            CommitError::Persistence(msg) => ApiError::InternalServerError(msg),
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Anyhow(err.into())
    }
}
