use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;
use wayfare_booking::model::{Booking, BookingStatus};
use wayfare_booking::repository::BookingRepository;

pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    tour_id: Uuid,
    schedule_id: Uuid,
    status: String,
    reserved_slots: i32,
    reservation_id: Uuid,
    payment_authorization_id: String,
    selections: serde_json::Value,
    breakdown: serde_json::Value,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl BookingRow {
    fn into_booking(self) -> Result<Booking, Box<dyn std::error::Error + Send + Sync>> {
        let status = BookingStatus::parse(&self.status)
            .ok_or_else(|| format!("Unknown booking status: {}", self.status))?;

        Ok(Booking {
            id: self.id,
            tour_id: self.tour_id,
            schedule_id: self.schedule_id,
            selections: serde_json::from_value(self.selections)?,
            breakdown: serde_json::from_value(self.breakdown)?,
            reserved_slots: self.reserved_slots,
            reservation_id: self.reservation_id,
            payment_authorization_id: self.payment_authorization_id,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl BookingRepository for PgBookingStore {
    async fn create(
        &self,
        booking: &Booking,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            r#"
            INSERT INTO bookings (id, tour_id, schedule_id, status, reserved_slots, reservation_id, payment_authorization_id, currency, total, selections, breakdown, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(booking.id)
        .bind(booking.tour_id)
        .bind(booking.schedule_id)
        .bind(booking.status.as_str())
        .bind(booking.reserved_slots)
        .bind(booking.reservation_id)
        .bind(&booking.payment_authorization_id)
        .bind(&booking.breakdown.currency)
        .bind(booking.breakdown.total)
        .bind(serde_json::to_value(&booking.selections)?)
        .bind(serde_json::to_value(&booking.breakdown)?)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, BookingRow>(
            "SELECT id, tour_id, schedule_id, status, reserved_slots, reservation_id, payment_authorization_id, selections, breakdown, created_at, updated_at FROM bookings WHERE id = $1",
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row.into_booking()?)),
            None => Ok(None),
        }
    }

    async fn update_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query("UPDATE bookings SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status.as_str())
            .bind(booking_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
