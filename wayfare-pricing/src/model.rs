use serde::{Deserialize, Serialize};
use wayfare_catalog::schedule::Schedule;
use wayfare_catalog::tour::TourTemplate;

use crate::selections::{rooms_needed_for, RoomTierChoice, Selections};

/// Itemized price derived from a template plus the traveler's selections.
/// Deductions are negative, the fee applies to the signed subtotal and the
/// final total never goes below zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceBreakdown {
    pub base: i64,
    pub room_delta: i64,
    pub meal_deduction: i64,
    pub transport_deduction: i64,
    pub service_fee: i64,
    pub total: i64,
    pub currency: String,
}

impl PriceBreakdown {
    pub fn subtotal(&self) -> i64 {
        self.base + self.room_delta + self.meal_deduction + self.transport_deduction
    }
}

/// Deterministic pricing over (template, schedule, selections). Tolerant of
/// stale selections: opt-outs naming unknown slots or legs contribute nothing
/// and an unknown upgrade tier prices as standard.
#[derive(Debug, Clone)]
pub struct PricingModel {
    service_fee_bps: u32,
    currency: String,
}

impl PricingModel {
    pub fn new(service_fee_bps: u32, currency: impl Into<String>) -> Self {
        Self {
            service_fee_bps,
            currency: currency.into(),
        }
    }

    pub fn compute(
        &self,
        template: &TourTemplate,
        schedule: &Schedule,
        selections: &Selections,
    ) -> PriceBreakdown {
        debug_assert_eq!(schedule.tour_id, template.id);

        let party = i64::from(selections.party_size);
        let nights = i64::from(template.duration_nights);
        let rooms = i64::from(rooms_needed_for(selections.party_size));
        let standard_night = template.room.standard_price_per_night;

        // 1. The quoted per-person price is for a 2-person reference unit
        //    with a standard room folded in. Back the room out, then charge
        //    lodging per room actually needed.
        let non_room_per_person =
            (template.base_price_per_person * 2 - standard_night * nights) / 2;
        let base = non_room_per_person * party + standard_night * rooms * nights;

        // 2. Room tier delta against the standard baseline
        let room_delta = match &selections.room_tier {
            RoomTierChoice::Standard => 0,
            RoomTierChoice::Upgrade { tier_id } => {
                let delta = template
                    .find_upgrade(tier_id)
                    .map(|t| t.upgrade_delta_per_room_per_night)
                    .unwrap_or(0);
                delta * rooms * nights
            }
            RoomTierChoice::QuadSplit => match template.room.quad_price_per_night {
                Some(quad_night) => {
                    let num_quad = party / 4;
                    let remainder = party % 4;
                    let num_standard = if remainder > 0 { (remainder + 1) / 2 } else { 0 };

                    let split_cost =
                        (quad_night * num_quad + standard_night * num_standard) * nights;
                    split_cost - standard_night * rooms * nights
                }
                None => 0,
            },
        };

        // 3. Meal opt-outs refund the per-person slot price for the party
        let meal_deduction: i64 = -selections
            .meal_opt_outs
            .iter()
            .filter_map(|o| template.meal_slot(o.day, o.session))
            .map(|slot| slot.price_per_person * party)
            .sum::<i64>();

        // 4. Transport opt-outs likewise
        let transport_deduction: i64 = -selections
            .transport_opt_outs
            .iter()
            .filter_map(|kind| template.transport_leg(*kind))
            .map(|leg| leg.price_per_person * party)
            .sum::<i64>();

        // 5. Service fee on the signed subtotal, total clamped at zero
        let subtotal = base + room_delta + meal_deduction + transport_deduction;
        let service_fee = self.fee_on(subtotal);
        let total = (subtotal + service_fee).max(0);

        PriceBreakdown {
            base,
            room_delta,
            meal_deduction,
            transport_deduction,
            service_fee,
            total,
            currency: self.currency.clone(),
        }
    }

    fn fee_on(&self, subtotal: i64) -> i64 {
        let scaled = subtotal as i128 * self.service_fee_bps as i128;
        ((scaled + 5_000) / 10_000) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selections::MealOptOut;
    use chrono::NaiveDate;
    use uuid::Uuid;
    use wayfare_catalog::tour::{
        MealSession, MealSlot, RoomTemplate, RoomUpgradeTier, TransportLeg, TransportLegKind,
    };

    fn template() -> TourTemplate {
        TourTemplate {
            id: Uuid::new_v4(),
            name: "Flores Overland".to_string(),
            description: None,
            base_price_per_person: 1_000_000,
            duration_nights: 4,
            room: RoomTemplate {
                standard_price_per_night: 200_000,
                upgrade_tiers: vec![RoomUpgradeTier {
                    id: "deluxe".to_string(),
                    name: "Deluxe Sea View".to_string(),
                    upgrade_delta_per_room_per_night: 150_000,
                }],
                quad_price_per_night: Some(350_000),
            },
            meal_plan: vec![
                MealSlot {
                    day: 1,
                    session: MealSession::Evening,
                    price_per_person: 80_000,
                },
                MealSlot {
                    day: 2,
                    session: MealSession::Noon,
                    price_per_person: 70_000,
                },
                MealSlot {
                    day: 3,
                    session: MealSession::Morning,
                    price_per_person: 50_000,
                },
            ],
            transport_legs: vec![
                TransportLeg {
                    kind: TransportLegKind::Outbound,
                    description: "Charter bus from the meeting point".to_string(),
                    price_per_person: 150_000,
                },
                TransportLeg {
                    kind: TransportLegKind::Return,
                    description: "Charter bus back".to_string(),
                    price_per_person: 150_000,
                },
            ],
            is_active: true,
            metadata: serde_json::json!({}),
        }
    }

    fn schedule_for(template: &TourTemplate) -> Schedule {
        Schedule {
            id: Uuid::new_v4(),
            tour_id: template.id,
            departure_date: NaiveDate::from_ymd_opt(2026, 10, 5).unwrap(),
            return_date: NaiveDate::from_ymd_opt(2026, 10, 9).unwrap(),
            capacity_total: 20,
            capacity_reserved: 0,
        }
    }

    fn model() -> PricingModel {
        PricingModel::new(1_000, "IDR")
    }

    #[test]
    fn test_base_price_for_two_with_standard_room() {
        let template = template();
        let schedule = schedule_for(&template);
        let mut selections = Selections::new();
        selections.schedule_id = Some(schedule.id);
        selections.party_size = 2;

        let breakdown = model().compute(&template, &schedule, &selections);

        assert_eq!(breakdown.base, 2_000_000);
        assert_eq!(breakdown.room_delta, 0);
        assert_eq!(breakdown.meal_deduction, 0);
        assert_eq!(breakdown.transport_deduction, 0);
        assert_eq!(breakdown.service_fee, 200_000);
        assert_eq!(breakdown.total, 2_200_000);
    }

    #[test]
    fn test_upgrade_delta_scales_per_room() {
        let template = template();
        let schedule = schedule_for(&template);
        let mut selections = Selections::new();
        selections.schedule_id = Some(schedule.id);
        selections.party_size = 4;
        selections.room_tier = RoomTierChoice::Upgrade {
            tier_id: "deluxe".to_string(),
        };

        let breakdown = model().compute(&template, &schedule, &selections);

        // 2 rooms x 4 nights x 150,000
        assert_eq!(breakdown.room_delta, 1_200_000);
        assert_eq!(breakdown.base, 4_000_000);
        assert_eq!(breakdown.service_fee, 520_000);
        assert_eq!(breakdown.total, 5_720_000);
    }

    #[test]
    fn test_meal_opt_out_deducts_for_whole_party() {
        let template = template();
        let schedule = schedule_for(&template);
        let mut selections = Selections::new();
        selections.schedule_id = Some(schedule.id);
        selections.party_size = 3;

        let full = model().compute(&template, &schedule, &selections);

        selections.toggle_meal_opt_out(1, MealSession::Evening);
        let reduced = model().compute(&template, &schedule, &selections);

        assert_eq!(reduced.meal_deduction, -240_000);
        // Deduction plus its share of the 10% fee
        assert_eq!(full.total - reduced.total, 264_000);
    }

    #[test]
    fn test_quad_split_can_undercut_standard_rooms() {
        let template = template();
        let schedule = schedule_for(&template);
        let mut selections = Selections::new();
        selections.schedule_id = Some(schedule.id);
        selections.party_size = 5;
        selections.room_tier = RoomTierChoice::QuadSplit;

        let breakdown = model().compute(&template, &schedule, &selections);

        // One quad (350,000) plus one standard (200,000) over 4 nights,
        // against a 3-standard-room baseline
        assert_eq!(breakdown.room_delta, -200_000);
    }

    #[test]
    fn test_quad_split_without_quad_price_falls_back_to_standard() {
        let mut template = template();
        template.room.quad_price_per_night = None;
        let schedule = schedule_for(&template);
        let mut selections = Selections::new();
        selections.schedule_id = Some(schedule.id);
        selections.party_size = 4;
        selections.room_tier = RoomTierChoice::QuadSplit;

        let breakdown = model().compute(&template, &schedule, &selections);
        assert_eq!(breakdown.room_delta, 0);
    }

    #[test]
    fn test_unknown_opt_out_keys_contribute_nothing() {
        let template = template();
        let schedule = schedule_for(&template);
        let mut selections = Selections::new();
        selections.schedule_id = Some(schedule.id);
        selections.party_size = 2;
        selections.meal_opt_outs.insert(MealOptOut {
            day: 9,
            session: MealSession::Noon,
        });

        let breakdown = model().compute(&template, &schedule, &selections);
        assert_eq!(breakdown.meal_deduction, 0);
        assert_eq!(breakdown.total, 2_200_000);
    }

    #[test]
    fn test_unknown_upgrade_tier_prices_as_standard() {
        let template = template();
        let schedule = schedule_for(&template);
        let mut selections = Selections::new();
        selections.schedule_id = Some(schedule.id);
        selections.party_size = 2;
        selections.room_tier = RoomTierChoice::Upgrade {
            tier_id: "penthouse".to_string(),
        };

        let breakdown = model().compute(&template, &schedule, &selections);
        assert_eq!(breakdown.room_delta, 0);
    }

    #[test]
    fn test_compute_is_deterministic() {
        let template = template();
        let schedule = schedule_for(&template);
        let mut selections = Selections::new();
        selections.schedule_id = Some(schedule.id);
        selections.party_size = 3;
        selections.toggle_meal_opt_out(2, MealSession::Noon);

        let first = model().compute(&template, &schedule, &selections);
        let second = model().compute(&template, &schedule, &selections);
        assert_eq!(first, second);
    }

    #[test]
    fn test_total_never_goes_negative() {
        let mut template = template();
        template.base_price_per_person = 100;
        template.duration_nights = 1;
        template.room.standard_price_per_night = 100;
        template.meal_plan = vec![MealSlot {
            day: 1,
            session: MealSession::Evening,
            price_per_person: 10_000,
        }];
        let schedule = schedule_for(&template);

        let mut selections = Selections::new();
        selections.schedule_id = Some(schedule.id);
        selections.party_size = 2;
        selections.toggle_meal_opt_out(1, MealSession::Evening);

        let breakdown = model().compute(&template, &schedule, &selections);
        assert!(breakdown.subtotal() < 0);
        assert_eq!(breakdown.total, 0);
    }

    #[test]
    fn test_service_fee_rounds_half_up() {
        // 10% of 1,234,565 is 123,456.5: the half rounds up
        let model = model();
        assert_eq!(model.fee_on(1_234_565), 123_457);
        assert_eq!(model.fee_on(1_234_564), 123_456);
        assert_eq!(model.fee_on(1_234_566), 123_457);

        // Fractional basis points land between integers too
        let fractional = PricingModel::new(125, "IDR");
        assert_eq!(fractional.fee_on(10_040), 126); // 125.5
        assert_eq!(fractional.fee_on(10_039), 125); // 125.4875
    }
}
