use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One dated departure of a tour template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub tour_id: Uuid,
    pub departure_date: NaiveDate,
    pub return_date: NaiveDate,
    pub capacity_total: i32,
    pub capacity_reserved: i32,
}

impl Schedule {
    pub fn slots_available(&self) -> i32 {
        self.capacity_total - self.capacity_reserved
    }

    pub fn departs_after(&self, date: NaiveDate) -> bool {
        self.departure_date > date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_available() {
        let schedule = Schedule {
            id: Uuid::new_v4(),
            tour_id: Uuid::new_v4(),
            departure_date: NaiveDate::from_ymd_opt(2026, 10, 5).unwrap(),
            return_date: NaiveDate::from_ymd_opt(2026, 10, 9).unwrap(),
            capacity_total: 20,
            capacity_reserved: 6,
        };

        assert_eq!(schedule.slots_available(), 14);
        assert!(schedule.departs_after(NaiveDate::from_ymd_opt(2026, 8, 22).unwrap()));
    }
}
