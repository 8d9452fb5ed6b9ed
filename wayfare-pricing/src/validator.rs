use serde::Serialize;
use wayfare_catalog::schedule::Schedule;
use wayfare_catalog::tour::TourTemplate;

use crate::selections::{RoomTierChoice, Selections};

/// One independently checkable reason a draft cannot proceed
#[derive(Debug, Clone, Serialize, PartialEq, Eq, thiserror::Error)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Violation {
    #[error("Not enough capacity left: requested {requested}, available {available}")]
    InsufficientCapacity { requested: i32, available: i32 },

    #[error("Meal and transport opt-outs cannot be combined")]
    OptOutConflict,

    #[error("Contact field is required: {field}")]
    IncompleteContact { field: String },

    #[error("No payment method selected")]
    PaymentMethodMissing,

    #[error("Room selection not available: {detail}")]
    RoomTierUnavailable { detail: String },
}

/// Cross-field rules gating wizard transitions. Each rule stands on its own;
/// `validate` returns every violation it finds, never just the first.
pub struct ConstraintValidator;

impl ConstraintValidator {
    /// Capacity gate used when entering customization. Expects a schedule
    /// whose reserved count is fresh.
    pub fn check_capacity(schedule: &Schedule, selections: &Selections) -> Option<Violation> {
        let available = schedule.slots_available();
        // A party larger than the whole departure can never fit, whatever
        // the current reservation count says.
        if selections.party_size > schedule.capacity_total {
            return Some(Violation::InsufficientCapacity {
                requested: selections.slots_needed(),
                available,
            });
        }
        let requested = selections.slots_needed();
        if requested > available {
            return Some(Violation::InsufficientCapacity {
                requested,
                available,
            });
        }
        None
    }

    /// Full rule set gating submission
    pub fn validate(
        template: &TourTemplate,
        schedule: &Schedule,
        selections: &Selections,
    ) -> Vec<Violation> {
        let mut violations = Vec::new();

        if let Some(v) = Self::check_capacity(schedule, selections) {
            violations.push(v);
        }

        // Operator rule: a booking may drop meals or transport legs, never
        // both. Kept in this one spot so it can be lifted if the rule falls.
        if !selections.meal_opt_outs.is_empty() && !selections.transport_opt_outs.is_empty() {
            violations.push(Violation::OptOutConflict);
        }

        match &selections.contact {
            Some(contact) => {
                for field in contact.missing_fields() {
                    violations.push(Violation::IncompleteContact {
                        field: field.to_string(),
                    });
                }
            }
            None => {
                for field in ["name", "email", "phone"] {
                    violations.push(Violation::IncompleteContact {
                        field: field.to_string(),
                    });
                }
            }
        }

        let has_payment = selections
            .payment_method
            .as_ref()
            .map(|m| !m.method.trim().is_empty())
            .unwrap_or(false);
        if !has_payment {
            violations.push(Violation::PaymentMethodMissing);
        }

        match &selections.room_tier {
            RoomTierChoice::Standard => {}
            RoomTierChoice::Upgrade { tier_id } => {
                if template.find_upgrade(tier_id).is_none() {
                    violations.push(Violation::RoomTierUnavailable {
                        detail: format!("unknown upgrade tier: {}", tier_id),
                    });
                }
            }
            RoomTierChoice::QuadSplit => {
                if selections.party_size < 4 {
                    violations.push(Violation::RoomTierUnavailable {
                        detail: "quad split needs a party of at least 4".to_string(),
                    });
                } else if !template.offers_quad_room() {
                    violations.push(Violation::RoomTierUnavailable {
                        detail: "no 4-person room on this tour".to_string(),
                    });
                }
            }
        }

        violations
    }
}
