pub mod ledger;
pub mod repository;
pub mod schedule;
pub mod tour;

pub use ledger::{CapacityLedger, LedgerError, ReservationToken};
pub use repository::CatalogRepository;
pub use schedule::Schedule;
pub use tour::{MealSession, MealSlot, TourTemplate, TransportLegKind};
