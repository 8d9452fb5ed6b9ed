use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;
use wayfare_booking::model::{Booking, BookingStatus};
use wayfare_booking::repository::BookingRepository;
use wayfare_catalog::repository::CatalogRepository;
use wayfare_catalog::schedule::Schedule;
use wayfare_catalog::tour::TourTemplate;

/// Catalog backed by process memory, for development and tests
pub struct MemoryCatalogStore {
    tours: RwLock<HashMap<Uuid, TourTemplate>>,
    schedules: RwLock<HashMap<Uuid, Schedule>>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self {
            tours: RwLock::new(HashMap::new()),
            schedules: RwLock::new(HashMap::new()),
        }
    }

    pub async fn insert_tour(&self, tour: TourTemplate) {
        self.tours.write().await.insert(tour.id, tour);
    }

    pub async fn insert_schedule(&self, schedule: Schedule) {
        self.schedules.write().await.insert(schedule.id, schedule);
    }
}

impl Default for MemoryCatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogRepository for MemoryCatalogStore {
    async fn get_tour(
        &self,
        tour_id: Uuid,
    ) -> Result<Option<TourTemplate>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.tours.read().await.get(&tour_id).cloned())
    }

    async fn list_schedules(
        &self,
        tour_id: Uuid,
    ) -> Result<Vec<Schedule>, Box<dyn std::error::Error + Send + Sync>> {
        let schedules = self.schedules.read().await;
        let mut found: Vec<Schedule> = schedules
            .values()
            .filter(|s| s.tour_id == tour_id)
            .cloned()
            .collect();
        found.sort_by_key(|s| s.departure_date);
        Ok(found)
    }

    async fn get_schedule(
        &self,
        schedule_id: Uuid,
    ) -> Result<Option<Schedule>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.schedules.read().await.get(&schedule_id).cloned())
    }
}

/// Booking store backed by process memory, for development and tests
pub struct MemoryBookingStore {
    bookings: RwLock<HashMap<Uuid, Booking>>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self {
            bookings: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryBookingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookingRepository for MemoryBookingStore {
    async fn create(
        &self,
        booking: &Booking,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.bookings
            .write()
            .await
            .insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.bookings.read().await.get(&booking_id).cloned())
    }

    async fn update_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut bookings = self.bookings.write().await;
        if let Some(booking) = bookings.get_mut(&booking_id) {
            booking.status = status;
            booking.updated_at = Utc::now();
        }
        Ok(())
    }
}
