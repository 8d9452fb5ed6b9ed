use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Meal sessions within a tour day
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MealSession {
    Morning,
    Noon,
    Evening,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportLegKind {
    Outbound,
    Return,
}

/// One included meal in the tour's plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MealSlot {
    pub day: u32, // 1-based tour day
    pub session: MealSession,
    pub price_per_person: i64,
}

/// One included transport segment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportLeg {
    pub kind: TransportLegKind,
    pub description: String,
    pub price_per_person: i64,
}

/// Nightly room upgrade offered by the operator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomUpgradeTier {
    pub id: String,
    pub name: String,
    /// Difference to the standard nightly rate, per room per night
    pub upgrade_delta_per_room_per_night: i64,
}

/// Lodging component of a template. The quoted per-person base price
/// already folds in a standard room shared by two.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomTemplate {
    pub standard_price_per_night: i64,
    pub upgrade_tiers: Vec<RoomUpgradeTier>,
    /// Nightly price for a 4-person room, when the operator offers one
    pub quad_price_per_night: Option<i64>,
}

/// Immutable catalog entry describing one operated tour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TourTemplate {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub base_price_per_person: i64,
    pub duration_nights: i32,
    pub room: RoomTemplate,
    pub meal_plan: Vec<MealSlot>,
    pub transport_legs: Vec<TransportLeg>,
    pub is_active: bool,
    pub metadata: serde_json::Value,
}

impl TourTemplate {
    pub fn find_upgrade(&self, tier_id: &str) -> Option<&RoomUpgradeTier> {
        self.room.upgrade_tiers.iter().find(|t| t.id == tier_id)
    }

    pub fn meal_slot(&self, day: u32, session: MealSession) -> Option<&MealSlot> {
        self.meal_plan
            .iter()
            .find(|s| s.day == day && s.session == session)
    }

    pub fn transport_leg(&self, kind: TransportLegKind) -> Option<&TransportLeg> {
        self.transport_legs.iter().find(|l| l.kind == kind)
    }

    pub fn offers_quad_room(&self) -> bool {
        self.room.quad_price_per_night.is_some()
    }
}
