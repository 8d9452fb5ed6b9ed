use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wayfare_pricing::model::PriceBreakdown;
use wayfare_pricing::selections::Selections;

/// Booking lifecycle states
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Completed => "COMPLETED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CONFIRMED" => Some(BookingStatus::Confirmed),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            "COMPLETED" => Some(BookingStatus::Completed),
            _ => None,
        }
    }
}

/// Immutable snapshot of what was bought, created exactly once per
/// successful commit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub tour_id: Uuid,
    pub schedule_id: Uuid,
    pub selections: Selections,
    pub breakdown: PriceBreakdown,
    pub reserved_slots: i32,
    pub reservation_id: Uuid,
    pub payment_authorization_id: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        id: Uuid,
        tour_id: Uuid,
        schedule_id: Uuid,
        selections: Selections,
        breakdown: PriceBreakdown,
        reserved_slots: i32,
        reservation_id: Uuid,
        payment_authorization_id: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            tour_id,
            schedule_id,
            selections,
            breakdown,
            reserved_slots,
            reservation_id,
            payment_authorization_id,
            status: BookingStatus::Confirmed,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_strings() {
        for status in [
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
            BookingStatus::Completed,
        ] {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::parse("REFUNDED"), None);
    }
}
