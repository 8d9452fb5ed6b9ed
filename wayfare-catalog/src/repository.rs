use async_trait::async_trait;
use uuid::Uuid;

use crate::schedule::Schedule;
use crate::tour::TourTemplate;

/// Read access to the tour catalog
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn get_tour(
        &self,
        tour_id: Uuid,
    ) -> Result<Option<TourTemplate>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list_schedules(
        &self,
        tour_id: Uuid,
    ) -> Result<Vec<Schedule>, Box<dyn std::error::Error + Send + Sync>>;

    async fn get_schedule(
        &self,
        schedule_id: Uuid,
    ) -> Result<Option<Schedule>, Box<dyn std::error::Error + Send + Sync>>;
}
