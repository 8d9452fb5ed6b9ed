use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;
use wayfare_catalog::tour::{MealSession, TransportLegKind};
use wayfare_core::payment::PaymentMethod;
use wayfare_shared::pii::Masked;

/// Room choice for the whole party
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomTierChoice {
    /// Standard double rooms as quoted
    Standard,
    /// A named nightly upgrade from the template
    Upgrade { tier_id: String },
    /// Mix of 4-person and standard rooms, for parties of four or more
    QuadSplit,
}

impl Default for RoomTierChoice {
    fn default() -> Self {
        Self::Standard
    }
}

/// Key of one meal slot a traveler opted out of
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct MealOptOut {
    pub day: u32,
    pub session: MealSession,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactInfo {
    pub name: String,
    pub email: Masked<String>,
    pub phone: Masked<String>,
}

impl ContactInfo {
    /// Fields still missing before the booking can be submitted
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.email.0.trim().is_empty() {
            missing.push("email");
        }
        if self.phone.0.trim().is_empty() {
            missing.push("phone");
        }
        missing
    }
}

/// The traveler's in-progress booking draft
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selections {
    pub schedule_id: Option<Uuid>,
    pub party_size: i32,
    pub room_tier: RoomTierChoice,
    pub meal_opt_outs: BTreeSet<MealOptOut>,
    pub transport_opt_outs: BTreeSet<TransportLegKind>,
    pub contact: Option<ContactInfo>,
    pub payment_method: Option<PaymentMethod>,
}

impl Selections {
    pub fn new() -> Self {
        Self {
            schedule_id: None,
            party_size: 1,
            room_tier: RoomTierChoice::Standard,
            meal_opt_outs: BTreeSet::new(),
            transport_opt_outs: BTreeSet::new(),
            contact: None,
            payment_method: None,
        }
    }

    pub fn rooms_needed(&self) -> i32 {
        rooms_needed_for(self.party_size)
    }

    /// A room consumes two slots regardless of how many people sleep in it
    pub fn slots_needed(&self) -> i32 {
        self.rooms_needed() * 2
    }

    /// Returns true when the slot is opted out after the toggle
    pub fn toggle_meal_opt_out(&mut self, day: u32, session: MealSession) -> bool {
        let key = MealOptOut { day, session };
        if !self.meal_opt_outs.remove(&key) {
            self.meal_opt_outs.insert(key);
            return true;
        }
        false
    }

    /// Returns true when the leg is opted out after the toggle
    pub fn toggle_transport_opt_out(&mut self, kind: TransportLegKind) -> bool {
        if !self.transport_opt_outs.remove(&kind) {
            self.transport_opt_outs.insert(kind);
            return true;
        }
        false
    }
}

impl Default for Selections {
    fn default() -> Self {
        Self::new()
    }
}

/// Two travelers share a room; a lone remainder still takes a whole room.
/// Party sizes below one count as one, and the top of the range saturates.
pub fn rooms_needed_for(party_size: i32) -> i32 {
    party_size.max(1).saturating_add(1) / 2
}
