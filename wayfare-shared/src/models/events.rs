use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingConfirmedEvent {
    pub booking_id: Uuid,
    pub schedule_id: Uuid,
    pub party_size: i32,
    pub reserved_slots: i32,
    pub total: i64,
    pub currency: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingCancelledEvent {
    pub booking_id: Uuid,
    pub schedule_id: Uuid,
    pub released_slots: i32,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct CommitCompensatedEvent {
    pub schedule_id: Uuid,
    pub released_slots: i32,
    pub payment_reversed: bool,
    pub reason: String,
    pub timestamp: i64,
}
