use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use wayfare_catalog::schedule::Schedule;
use wayfare_catalog::tour::{MealSession, TourTemplate, TransportLegKind};
use wayfare_core::payment::PaymentMethod;
use wayfare_pricing::model::{PriceBreakdown, PricingModel};
use wayfare_pricing::selections::{ContactInfo, RoomTierChoice, Selections};
use wayfare_pricing::validator::{ConstraintValidator, Violation};

/// Steps of the booking wizard
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WizardStep {
    SelectingSchedule,
    Customizing,
    Confirming,
    Committed,
    Abandoned,
}

impl WizardStep {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WizardStep::Committed | WizardStep::Abandoned)
    }
}

/// One traveler's in-progress booking. The draft selections are owned by the
/// session for its whole life, so stepping back never loses what was already
/// entered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardSession {
    pub id: Uuid,
    pub tour_id: Uuid,
    pub step: WizardStep,
    pub selections: Selections,
    pub breakdown: Option<PriceBreakdown>,
    pub booking_id: Option<Uuid>,
    #[serde(skip)]
    pub committing: bool,
    pub created_at: DateTime<Utc>,
    pub touched_at: DateTime<Utc>,
}

/// Holds every live wizard session and drives their transitions
pub struct WizardManager {
    sessions: HashMap<Uuid, WizardSession>,
    pricing: PricingModel,
    idle_timeout: Duration,
}

impl WizardManager {
    pub fn new(pricing: PricingModel, idle_timeout: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            pricing,
            idle_timeout,
        }
    }

    pub fn create_session(&mut self, tour_id: Uuid) -> WizardSession {
        let now = Utc::now();
        let session = WizardSession {
            id: Uuid::new_v4(),
            tour_id,
            step: WizardStep::SelectingSchedule,
            selections: Selections::new(),
            breakdown: None,
            booking_id: None,
            committing: false,
            created_at: now,
            touched_at: now,
        };
        self.sessions.insert(session.id, session.clone());
        session
    }

    pub fn get_session(&self, session_id: &Uuid) -> Result<&WizardSession, WizardError> {
        self.sessions
            .get(session_id)
            .ok_or_else(|| WizardError::NotFound(session_id.to_string()))
    }

    /// Step 1: pick a departure and party size. Allowed while the session
    /// is still selecting, including after stepping back.
    pub fn select_schedule(
        &mut self,
        session_id: &Uuid,
        schedule: &Schedule,
        party_size: i32,
    ) -> Result<(), WizardError> {
        let session = self.get_session_mut(session_id)?;

        if session.step != WizardStep::SelectingSchedule {
            return Err(WizardError::NotAllowed {
                step: format!("{:?}", session.step),
                action: "select schedule".to_string(),
            });
        }
        if party_size < 1 {
            return Err(WizardError::InvalidPartySize);
        }

        session.selections.schedule_id = Some(schedule.id);
        session.selections.party_size = party_size;
        session.touched_at = Utc::now();
        Ok(())
    }

    /// Transition: SelectingSchedule → Customizing, gated by capacity
    pub fn begin_customizing(
        &mut self,
        session_id: &Uuid,
        template: &TourTemplate,
        schedule: &Schedule,
    ) -> Result<PriceBreakdown, WizardError> {
        let pricing = self.pricing.clone();
        let session = self.get_session_mut(session_id)?;

        if session.step != WizardStep::SelectingSchedule {
            return Err(WizardError::InvalidTransition {
                from: format!("{:?}", session.step),
                to: "CUSTOMIZING".to_string(),
            });
        }
        if session.selections.schedule_id != Some(schedule.id) {
            return Err(WizardError::NoSchedule);
        }

        if let Some(violation) = ConstraintValidator::check_capacity(schedule, &session.selections)
        {
            return Err(WizardError::Rejected(vec![violation]));
        }

        session.step = WizardStep::Customizing;
        let breakdown = pricing.compute(template, schedule, &session.selections);
        session.breakdown = Some(breakdown.clone());
        session.touched_at = Utc::now();
        Ok(breakdown)
    }

    /// Toggle one meal slot opt-out and reprice
    pub fn toggle_meal(
        &mut self,
        session_id: &Uuid,
        template: &TourTemplate,
        schedule: &Schedule,
        day: u32,
        meal_session: MealSession,
    ) -> Result<PriceBreakdown, WizardError> {
        let pricing = self.pricing.clone();
        let session = self.customizing_session_mut(session_id, "toggle meal opt-out")?;

        session.selections.toggle_meal_opt_out(day, meal_session);
        Ok(Self::reprice(&pricing, session, template, schedule))
    }

    /// Toggle one transport leg opt-out and reprice
    pub fn toggle_transport(
        &mut self,
        session_id: &Uuid,
        template: &TourTemplate,
        schedule: &Schedule,
        kind: TransportLegKind,
    ) -> Result<PriceBreakdown, WizardError> {
        let pricing = self.pricing.clone();
        let session = self.customizing_session_mut(session_id, "toggle transport opt-out")?;

        session.selections.toggle_transport_opt_out(kind);
        Ok(Self::reprice(&pricing, session, template, schedule))
    }

    /// Change the room tier and reprice
    pub fn set_room_tier(
        &mut self,
        session_id: &Uuid,
        template: &TourTemplate,
        schedule: &Schedule,
        choice: RoomTierChoice,
    ) -> Result<PriceBreakdown, WizardError> {
        let pricing = self.pricing.clone();
        let session = self.customizing_session_mut(session_id, "set room tier")?;

        session.selections.room_tier = choice;
        Ok(Self::reprice(&pricing, session, template, schedule))
    }

    /// Contact details may be entered while customizing or confirming
    pub fn set_contact(
        &mut self,
        session_id: &Uuid,
        contact: ContactInfo,
    ) -> Result<(), WizardError> {
        let session = self.get_session_mut(session_id)?;
        if !matches!(
            session.step,
            WizardStep::Customizing | WizardStep::Confirming
        ) {
            return Err(WizardError::NotAllowed {
                step: format!("{:?}", session.step),
                action: "set contact".to_string(),
            });
        }

        session.selections.contact = Some(contact);
        session.touched_at = Utc::now();
        Ok(())
    }

    /// Payment method may be entered while customizing or confirming
    pub fn set_payment_method(
        &mut self,
        session_id: &Uuid,
        method: PaymentMethod,
    ) -> Result<(), WizardError> {
        let session = self.get_session_mut(session_id)?;
        if !matches!(
            session.step,
            WizardStep::Customizing | WizardStep::Confirming
        ) {
            return Err(WizardError::NotAllowed {
                step: format!("{:?}", session.step),
                action: "set payment method".to_string(),
            });
        }

        session.selections.payment_method = Some(method);
        session.touched_at = Utc::now();
        Ok(())
    }

    /// Transition: Customizing → Confirming. Free; the review price is
    /// recomputed one more time on the way in.
    pub fn begin_confirming(
        &mut self,
        session_id: &Uuid,
        template: &TourTemplate,
        schedule: &Schedule,
    ) -> Result<PriceBreakdown, WizardError> {
        let pricing = self.pricing.clone();
        let session = self.get_session_mut(session_id)?;

        if session.step != WizardStep::Customizing {
            return Err(WizardError::InvalidTransition {
                from: format!("{:?}", session.step),
                to: "CONFIRMING".to_string(),
            });
        }

        session.step = WizardStep::Confirming;
        Ok(Self::reprice(&pricing, session, template, schedule))
    }

    /// Step back one step. Selections stay exactly as they were.
    pub fn step_back(&mut self, session_id: &Uuid) -> Result<WizardStep, WizardError> {
        let session = self.get_session_mut(session_id)?;

        let target = match session.step {
            WizardStep::Confirming => WizardStep::Customizing,
            WizardStep::Customizing => WizardStep::SelectingSchedule,
            other => {
                return Err(WizardError::InvalidTransition {
                    from: format!("{:?}", other),
                    to: "BACK".to_string(),
                })
            }
        };

        session.step = target;
        session.touched_at = Utc::now();
        Ok(target)
    }

    /// Claim the session for a commit attempt. Only one commit may be in
    /// flight at a time; the claim is dropped by `abort_commit` or
    /// `mark_committed`.
    pub fn begin_commit(&mut self, session_id: &Uuid) -> Result<WizardSession, WizardError> {
        let session = self.get_session_mut(session_id)?;

        if session.step != WizardStep::Confirming {
            return Err(WizardError::InvalidTransition {
                from: format!("{:?}", session.step),
                to: "COMMITTED".to_string(),
            });
        }
        if session.committing {
            return Err(WizardError::NotAllowed {
                step: format!("{:?}", session.step),
                action: "start a second commit".to_string(),
            });
        }

        session.committing = true;
        session.touched_at = Utc::now();
        Ok(session.clone())
    }

    /// Drop the commit claim after a failed attempt
    pub fn abort_commit(&mut self, session_id: &Uuid) {
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.committing = false;
            session.touched_at = Utc::now();
        }
    }

    /// Transition: Confirming → Committed, after the commit service has
    /// produced a booking
    pub fn mark_committed(
        &mut self,
        session_id: &Uuid,
        booking_id: Uuid,
    ) -> Result<(), WizardError> {
        let session = self.get_session_mut(session_id)?;

        if session.step != WizardStep::Confirming {
            return Err(WizardError::InvalidTransition {
                from: format!("{:?}", session.step),
                to: "COMMITTED".to_string(),
            });
        }

        session.step = WizardStep::Committed;
        session.committing = false;
        session.booking_id = Some(booking_id);
        session.touched_at = Utc::now();
        Ok(())
    }

    /// Any non-terminal step → Abandoned. Sessions hold no capacity, so
    /// there is nothing else to undo.
    pub fn abandon(&mut self, session_id: &Uuid) -> Result<(), WizardError> {
        let session = self.get_session_mut(session_id)?;

        if session.step.is_terminal() {
            return Err(WizardError::InvalidTransition {
                from: format!("{:?}", session.step),
                to: "ABANDONED".to_string(),
            });
        }

        session.step = WizardStep::Abandoned;
        session.touched_at = Utc::now();
        Ok(())
    }

    /// Mark sessions idle past the timeout as abandoned and evict terminal
    /// sessions idle past it. Returns how many were newly abandoned.
    pub fn sweep_idle(&mut self) -> usize {
        let now = Utc::now();
        let mut swept = 0;

        // Terminal sessions stay readable for one idle window, then go
        self.sessions
            .retain(|_, s| !(s.step.is_terminal() && s.touched_at + self.idle_timeout <= now));

        for session in self.sessions.values_mut() {
            if !session.step.is_terminal() && session.touched_at + self.idle_timeout <= now {
                session.step = WizardStep::Abandoned;
                session.touched_at = now;
                swept += 1;
            }
        }

        swept
    }

    pub fn active_count(&self) -> usize {
        self.sessions
            .values()
            .filter(|s| !s.step.is_terminal())
            .count()
    }

    fn reprice(
        pricing: &PricingModel,
        session: &mut WizardSession,
        template: &TourTemplate,
        schedule: &Schedule,
    ) -> PriceBreakdown {
        let breakdown = pricing.compute(template, schedule, &session.selections);
        session.breakdown = Some(breakdown.clone());
        session.touched_at = Utc::now();
        breakdown
    }

    fn customizing_session_mut(
        &mut self,
        session_id: &Uuid,
        action: &str,
    ) -> Result<&mut WizardSession, WizardError> {
        let session = self.get_session_mut(session_id)?;
        if session.step != WizardStep::Customizing {
            return Err(WizardError::NotAllowed {
                step: format!("{:?}", session.step),
                action: action.to_string(),
            });
        }
        Ok(session)
    }

    fn get_session_mut(&mut self, session_id: &Uuid) -> Result<&mut WizardSession, WizardError> {
        self.sessions
            .get_mut(session_id)
            .ok_or_else(|| WizardError::NotFound(session_id.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Cannot {action} in step {step}")]
    NotAllowed { step: String, action: String },

    #[error("Party size must be at least 1")]
    InvalidPartySize,

    #[error("No schedule selected")]
    NoSchedule,

    #[error("Selections failed validation")]
    Rejected(Vec<Violation>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wayfare_catalog::tour::{MealSlot, RoomTemplate, RoomUpgradeTier, TransportLeg};
    use wayfare_shared::pii::Masked;

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
            meal_plan: vec![MealSlot {
                day: 1,
                session: MealSession::Evening,
                price_per_person: 80_000,
            }],
            transport_legs: vec![TransportLeg {
                kind: TransportLegKind::Outbound,
                description: "Charter bus".to_string(),
                price_per_person: 150_000,
            }],
            is_active: true,
            metadata: serde_json::json!({}),
        }
    }

    fn schedule(template: &TourTemplate, available: i32) -> Schedule {
        Schedule {
            id: Uuid::new_v4(),
            tour_id: template.id,
            departure_date: NaiveDate::from_ymd_opt(2026, 10, 5).unwrap(),
            return_date: NaiveDate::from_ymd_opt(2026, 10, 9).unwrap(),
            capacity_total: 20,
            capacity_reserved: 20 - available,
        }
    }

    fn manager() -> WizardManager {
        WizardManager::new(PricingModel::new(1_000, "IDR"), Duration::minutes(30))
    }

    fn contact() -> ContactInfo {
        ContactInfo {
            name: "Ayu Lestari".to_string(),
            email: Masked("ayu@example.com".to_string()),
            phone: Masked("+62-811-555-0101".to_string()),
        }
    }

    #[test]
    fn test_full_wizard_walk() {
        let template = template();
        let schedule = schedule(&template, 10);
        let mut manager = manager();

        let session = manager.create_session(template.id);
        let id = session.id;
        assert_eq!(session.step, WizardStep::SelectingSchedule);

        manager.select_schedule(&id, &schedule, 2).unwrap();
        let breakdown = manager.begin_customizing(&id, &template, &schedule).unwrap();
        assert_eq!(breakdown.total, 2_200_000);

        let breakdown = manager
            .toggle_meal(&id, &template, &schedule, 1, MealSession::Evening)
            .unwrap();
        assert_eq!(breakdown.meal_deduction, -160_000);

        manager.set_contact(&id, contact()).unwrap();
        manager
            .set_payment_method(
                &id,
                PaymentMethod {
                    method: "CARD".to_string(),
                    reference: None,
                },
            )
            .unwrap();

        manager.begin_confirming(&id, &template, &schedule).unwrap();
        assert_eq!(
            manager.get_session(&id).unwrap().step,
            WizardStep::Confirming
        );

        let booking_id = Uuid::new_v4();
        manager.mark_committed(&id, booking_id).unwrap();
        let session = manager.get_session(&id).unwrap();
        assert_eq!(session.step, WizardStep::Committed);
        assert_eq!(session.booking_id, Some(booking_id));
    }

    #[test]
    fn test_capacity_gates_entry_into_customizing() {
        let template = template();
        let schedule = schedule(&template, 1);
        let mut manager = manager();

        let id = manager.create_session(template.id).id;
        manager.select_schedule(&id, &schedule, 1).unwrap();

        // One traveler still needs a whole room, i.e. two slots
        let result = manager.begin_customizing(&id, &template, &schedule);
        assert!(matches!(result, Err(WizardError::Rejected(_))));
        assert_eq!(
            manager.get_session(&id).unwrap().step,
            WizardStep::SelectingSchedule
        );
    }

    #[test]
    fn test_stepping_back_preserves_selections() {
        let template = template();
        let schedule = schedule(&template, 10);
        let mut manager = manager();

        let id = manager.create_session(template.id).id;
        manager.select_schedule(&id, &schedule, 3).unwrap();
        manager.begin_customizing(&id, &template, &schedule).unwrap();
        manager
            .toggle_meal(&id, &template, &schedule, 1, MealSession::Evening)
            .unwrap();
        manager.set_contact(&id, contact()).unwrap();
        manager.begin_confirming(&id, &template, &schedule).unwrap();

        assert_eq!(manager.step_back(&id).unwrap(), WizardStep::Customizing);
        assert_eq!(
            manager.step_back(&id).unwrap(),
            WizardStep::SelectingSchedule
        );

        let session = manager.get_session(&id).unwrap();
        assert_eq!(session.selections.party_size, 3);
        assert_eq!(session.selections.meal_opt_outs.len(), 1);
        assert!(session.selections.contact.is_some());
    }

    #[test]
    fn test_invalid_transitions_are_rejected() {
        let template = template();
        let schedule = schedule(&template, 10);
        let mut manager = manager();

        let id = manager.create_session(template.id).id;

        // Cannot confirm before customizing
        assert!(matches!(
            manager.begin_confirming(&id, &template, &schedule),
            Err(WizardError::InvalidTransition { .. })
        ));

        // Cannot toggle options while still selecting a schedule
        assert!(matches!(
            manager.toggle_meal(&id, &template, &schedule, 1, MealSession::Evening),
            Err(WizardError::NotAllowed { .. })
        ));

        // Cannot step back from the first step
        assert!(matches!(
            manager.step_back(&id),
            Err(WizardError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_abandon_is_terminal() {
        let template = template();
        let mut manager = manager();

        let id = manager.create_session(template.id).id;
        manager.abandon(&id).unwrap();
        assert_eq!(manager.get_session(&id).unwrap().step, WizardStep::Abandoned);

        assert!(matches!(
            manager.abandon(&id),
            Err(WizardError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_idle_sessions_are_swept() {
        let template = template();
        let mut manager =
            WizardManager::new(PricingModel::new(1_000, "IDR"), Duration::seconds(-1));

        let id = manager.create_session(template.id).id;
        assert_eq!(manager.sweep_idle(), 1);
        assert_eq!(manager.get_session(&id).unwrap().step, WizardStep::Abandoned);

        // Terminal sessions are not swept twice
        assert_eq!(manager.sweep_idle(), 0);
    }

    #[test]
    fn test_terminal_sessions_are_evicted_after_retention() {
        let template = template();
        let mut manager =
            WizardManager::new(PricingModel::new(1_000, "IDR"), Duration::seconds(-1));

        let id = manager.create_session(template.id).id;
        manager.abandon(&id).unwrap();
        assert!(manager.get_session(&id).is_ok());

        // Past the retention window the session is gone entirely
        assert_eq!(manager.sweep_idle(), 0);
        assert!(matches!(
            manager.get_session(&id),
            Err(WizardError::NotFound(_))
        ));
    }

    #[test]
    fn test_commit_claim_is_exclusive() {
        let template = template();
        let schedule = schedule(&template, 10);
        let mut manager = manager();

        let id = manager.create_session(template.id).id;
        manager.select_schedule(&id, &schedule, 2).unwrap();
        manager.begin_customizing(&id, &template, &schedule).unwrap();
        manager.begin_confirming(&id, &template, &schedule).unwrap();

        let claimed = manager.begin_commit(&id).unwrap();
        assert_eq!(claimed.step, WizardStep::Confirming);

        // A second submit while the first is in flight is refused
        assert!(matches!(
            manager.begin_commit(&id),
            Err(WizardError::NotAllowed { .. })
        ));

        // A failed attempt frees the claim for a retry
        manager.abort_commit(&id);
        manager.begin_commit(&id).unwrap();

        manager.mark_committed(&id, Uuid::new_v4()).unwrap();
        assert!(matches!(
            manager.begin_commit(&id),
            Err(WizardError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_party_size_must_be_positive() {
        let template = template();
        let schedule = schedule(&template, 10);
        let mut manager = manager();

        let id = manager.create_session(template.id).id;
        assert!(matches!(
            manager.select_schedule(&id, &schedule, 0),
            Err(WizardError::InvalidPartySize)
        ));
    }
}
