use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

use crate::schedule::Schedule;

/// Authoritative capacity record for one schedule. The reserved counter is
/// only ever moved through the compare-and-swap loop in `reserve` and the
/// matching decrements in `release`/`sweep_expired`.
#[derive(Debug)]
struct SchedulePool {
    capacity_total: i32,
    reserved: AtomicI32,
}

/// Handle for a provisional capacity hold
#[derive(Debug, Clone)]
pub struct ReservationToken {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub slots: i32,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HoldState {
    Held,
    Committed,
    Released,
}

#[derive(Debug)]
struct ReservationRecord {
    schedule_id: Uuid,
    slots: i32,
    state: HoldState,
    expires_at: DateTime<Utc>,
}

/// Tracks remaining bookable slots per schedule
pub struct CapacityLedger {
    pools: RwLock<HashMap<Uuid, Arc<SchedulePool>>>,
    reservations: Mutex<HashMap<Uuid, ReservationRecord>>,
}

impl CapacityLedger {
    pub fn new() -> Self {
        Self {
            pools: RwLock::new(HashMap::new()),
            reservations: Mutex::new(HashMap::new()),
        }
    }

    /// Register a schedule's capacity. An already registered schedule keeps
    /// its live counters.
    pub fn register(&self, schedule: &Schedule) {
        let mut pools = self.pools.write().unwrap_or_else(|e| e.into_inner());
        pools.entry(schedule.id).or_insert_with(|| {
            Arc::new(SchedulePool {
                capacity_total: schedule.capacity_total,
                reserved: AtomicI32::new(schedule.capacity_reserved),
            })
        });
    }

    pub fn slots_available(&self, schedule_id: Uuid) -> Option<i32> {
        let pools = self.pools.read().unwrap_or_else(|e| e.into_inner());
        pools
            .get(&schedule_id)
            .map(|pool| pool.capacity_total - pool.reserved.load(Ordering::Acquire))
    }

    /// Overwrite a schedule snapshot's reserved count with the live value
    pub fn refresh(&self, schedule: &mut Schedule) {
        let pools = self.pools.read().unwrap_or_else(|e| e.into_inner());
        if let Some(pool) = pools.get(&schedule.id) {
            schedule.capacity_reserved = pool.reserved.load(Ordering::Acquire);
        }
    }

    /// Take `slots` from the schedule's pool, atomically. Succeeds only if
    /// the pool still has room for the whole request.
    pub fn reserve(
        &self,
        schedule_id: Uuid,
        slots: i32,
        hold: Duration,
    ) -> Result<ReservationToken, LedgerError> {
        // A hold covers at least one slot.
        if slots < 1 {
            return Err(LedgerError::InvalidSlotCount(slots));
        }

        let pool = {
            let pools = self.pools.read().unwrap_or_else(|e| e.into_inner());
            pools
                .get(&schedule_id)
                .cloned()
                .ok_or_else(|| LedgerError::ScheduleNotFound(schedule_id.to_string()))?
        };

        let mut current = pool.reserved.load(Ordering::Acquire);
        loop {
            let available = pool.capacity_total - current;
            if slots > available {
                return Err(LedgerError::CapacityExceeded {
                    requested: slots,
                    available,
                });
            }

            match pool.reserved.compare_exchange(
                current,
                current + slots,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        let token = ReservationToken {
            id: Uuid::new_v4(),
            schedule_id,
            slots,
            expires_at: Utc::now() + hold,
        };

        let mut reservations = self.reservations.lock().unwrap_or_else(|e| e.into_inner());
        reservations.insert(
            token.id,
            ReservationRecord {
                schedule_id,
                slots,
                state: HoldState::Held,
                expires_at: token.expires_at,
            },
        );

        Ok(token)
    }

    /// Give a reservation's slots back to the pool. Calling again is a
    /// no-op until the sweeper drops the released record.
    pub fn release(&self, token_id: Uuid) -> Result<(), LedgerError> {
        let mut reservations = self.reservations.lock().unwrap_or_else(|e| e.into_inner());
        let record = reservations
            .get_mut(&token_id)
            .ok_or_else(|| LedgerError::ReservationNotFound(token_id.to_string()))?;

        if record.state == HoldState::Released {
            return Ok(());
        }

        let pool = {
            let pools = self.pools.read().unwrap_or_else(|e| e.into_inner());
            pools
                .get(&record.schedule_id)
                .cloned()
                .ok_or_else(|| LedgerError::ScheduleNotFound(record.schedule_id.to_string()))?
        };

        pool.reserved.fetch_sub(record.slots, Ordering::AcqRel);
        record.state = HoldState::Released;

        Ok(())
    }

    /// Seal a hold into a committed booking. Fails if the hold was already
    /// swept or released.
    pub fn confirm(&self, token_id: Uuid) -> Result<(), LedgerError> {
        let mut reservations = self.reservations.lock().unwrap_or_else(|e| e.into_inner());
        let record = reservations
            .get_mut(&token_id)
            .ok_or_else(|| LedgerError::ReservationNotFound(token_id.to_string()))?;

        match record.state {
            HoldState::Held => {
                record.state = HoldState::Committed;
                Ok(())
            }
            HoldState::Committed => Ok(()),
            HoldState::Released => Err(LedgerError::HoldExpired(token_id.to_string())),
        }
    }

    /// Release uncommitted holds past their deadline and drop already
    /// released records past theirs. Returns how many live holds were swept.
    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut swept = 0;

        let pools = self.pools.read().unwrap_or_else(|e| e.into_inner());
        let mut reservations = self.reservations.lock().unwrap_or_else(|e| e.into_inner());

        // Drop released records first; a hold flipped below stays visible
        // until the next pass.
        reservations.retain(|_, r| !(r.state == HoldState::Released && r.expires_at <= now));

        for record in reservations.values_mut() {
            if record.state == HoldState::Held && record.expires_at <= now {
                if let Some(pool) = pools.get(&record.schedule_id) {
                    pool.reserved.fetch_sub(record.slots, Ordering::AcqRel);
                }
                record.state = HoldState::Released;
                swept += 1;
            }
        }

        swept
    }
}

impl Default for CapacityLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Schedule not registered: {0}")]
    ScheduleNotFound(String),

    #[error("Insufficient capacity: requested {requested}, available {available}")]
    CapacityExceeded { requested: i32, available: i32 },

    #[error("Invalid slot count: {0}")]
    InvalidSlotCount(i32),

    #[error("Reservation not found: {0}")]
    ReservationNotFound(String),

    #[error("Reservation hold expired: {0}")]
    HoldExpired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn schedule(capacity: i32) -> Schedule {
        Schedule {
            id: Uuid::new_v4(),
            tour_id: Uuid::new_v4(),
            departure_date: NaiveDate::from_ymd_opt(2026, 10, 5).unwrap(),
            return_date: NaiveDate::from_ymd_opt(2026, 10, 9).unwrap(),
            capacity_total: capacity,
            capacity_reserved: 0,
        }
    }

    #[test]
    fn test_reserve_release_lifecycle() {
        let ledger = CapacityLedger::new();
        let s = schedule(10);
        ledger.register(&s);

        let token = ledger.reserve(s.id, 4, Duration::minutes(15)).unwrap();
        assert_eq!(ledger.slots_available(s.id), Some(6));

        ledger.release(token.id).unwrap();
        assert_eq!(ledger.slots_available(s.id), Some(10));

        // Double release is a no-op
        ledger.release(token.id).unwrap();
        assert_eq!(ledger.slots_available(s.id), Some(10));
    }

    #[test]
    fn test_reserve_rejects_over_capacity() {
        let ledger = CapacityLedger::new();
        let s = schedule(4);
        ledger.register(&s);

        ledger.reserve(s.id, 2, Duration::minutes(15)).unwrap();

        let result = ledger.reserve(s.id, 4, Duration::minutes(15));
        match result {
            Err(LedgerError::CapacityExceeded {
                requested,
                available,
            }) => {
                assert_eq!(requested, 4);
                assert_eq!(available, 2);
            }
            other => panic!("Expected CapacityExceeded, got {:?}", other),
        }
    }

    #[test]
    fn test_reserve_rejects_non_positive_slot_counts() {
        let ledger = CapacityLedger::new();
        let s = schedule(10);
        ledger.register(&s);

        assert!(matches!(
            ledger.reserve(s.id, -4, Duration::minutes(15)),
            Err(LedgerError::InvalidSlotCount(-4))
        ));
        assert!(matches!(
            ledger.reserve(s.id, 0, Duration::minutes(15)),
            Err(LedgerError::InvalidSlotCount(0))
        ));
        assert_eq!(ledger.slots_available(s.id), Some(10));
    }

    #[test]
    fn test_committed_slots_stay_reserved_until_released() {
        let ledger = CapacityLedger::new();
        let s = schedule(10);
        ledger.register(&s);

        let token = ledger.reserve(s.id, 6, Duration::minutes(15)).unwrap();
        ledger.confirm(token.id).unwrap();
        assert_eq!(ledger.slots_available(s.id), Some(4));

        // Cancellation of the committed booking frees its slots
        ledger.release(token.id).unwrap();
        assert_eq!(ledger.slots_available(s.id), Some(10));
    }

    #[test]
    fn test_expired_holds_are_swept() {
        let ledger = CapacityLedger::new();
        let s = schedule(10);
        ledger.register(&s);

        let expired = ledger.reserve(s.id, 2, Duration::seconds(-1)).unwrap();
        let live = ledger.reserve(s.id, 2, Duration::minutes(15)).unwrap();
        assert_eq!(ledger.slots_available(s.id), Some(6));

        assert_eq!(ledger.sweep_expired(), 1);
        assert_eq!(ledger.slots_available(s.id), Some(8));

        // Swept holds cannot be committed any more
        assert!(matches!(
            ledger.confirm(expired.id),
            Err(LedgerError::HoldExpired(_))
        ));
        ledger.confirm(live.id).unwrap();
    }

    #[test]
    fn test_released_records_are_dropped_after_their_deadline() {
        let ledger = CapacityLedger::new();
        let s = schedule(10);
        ledger.register(&s);

        // A record released before its deadline survives the sweep
        let token = ledger.reserve(s.id, 2, Duration::minutes(15)).unwrap();
        ledger.release(token.id).unwrap();
        assert_eq!(ledger.sweep_expired(), 0);
        ledger.release(token.id).unwrap();

        // One past its deadline is purged
        let stale = ledger.reserve(s.id, 2, Duration::seconds(-1)).unwrap();
        ledger.release(stale.id).unwrap();
        assert_eq!(ledger.sweep_expired(), 0);
        assert!(matches!(
            ledger.release(stale.id),
            Err(LedgerError::ReservationNotFound(_))
        ));
        assert_eq!(ledger.slots_available(s.id), Some(10));
    }

    #[test]
    fn test_swept_holds_linger_one_pass_then_drop() {
        let ledger = CapacityLedger::new();
        let s = schedule(10);
        ledger.register(&s);

        let expired = ledger.reserve(s.id, 2, Duration::seconds(-1)).unwrap();
        assert_eq!(ledger.sweep_expired(), 1);
        assert_eq!(ledger.slots_available(s.id), Some(10));

        // The swept record still answers a late confirm
        assert!(matches!(
            ledger.confirm(expired.id),
            Err(LedgerError::HoldExpired(_))
        ));

        // The next pass drops it for good
        assert_eq!(ledger.sweep_expired(), 0);
        assert!(matches!(
            ledger.confirm(expired.id),
            Err(LedgerError::ReservationNotFound(_))
        ));
    }

    #[test]
    fn test_concurrent_reserves_never_oversell() {
        let ledger = Arc::new(CapacityLedger::new());
        let s = schedule(10);
        ledger.register(&s);

        let mut handles = Vec::new();
        for _ in 0..20 {
            let ledger = Arc::clone(&ledger);
            let schedule_id = s.id;
            handles.push(std::thread::spawn(move || {
                ledger
                    .reserve(schedule_id, 2, Duration::minutes(15))
                    .is_ok()
            }));
        }

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        // 10 slots, 2 per request: exactly 5 racers win
        assert_eq!(successes, 5);
        assert_eq!(ledger.slots_available(s.id), Some(0));
    }
}
