use crate::middleware::resiliency::ResiliencyState;
use std::sync::Arc;
use tokio::sync::RwLock;
use wayfare_booking::commit::BookingCommitService;
use wayfare_booking::repository::BookingRepository;
use wayfare_booking::wizard::WizardManager;
use wayfare_catalog::ledger::CapacityLedger;
use wayfare_catalog::repository::CatalogRepository;
use wayfare_store::telemetry::BookingTelemetry;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub ledger: Arc<CapacityLedger>,
    pub wizards: Arc<RwLock<WizardManager>>,
    pub commit: Arc<BookingCommitService>,
    pub telemetry: Arc<BookingTelemetry>,
    pub resiliency: Arc<ResiliencyState>,
}
