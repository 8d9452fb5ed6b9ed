pub mod app_config;
pub mod database;
pub mod memory;
pub mod postgres;
pub mod telemetry;

pub use app_config::{BookingRules, Config};
pub use database::DbClient;
pub use memory::{MemoryBookingStore, MemoryCatalogStore};
pub use postgres::PgBookingStore;
pub use telemetry::BookingTelemetry;
