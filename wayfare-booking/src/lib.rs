pub mod commit;
pub mod model;
pub mod repository;
pub mod wizard;

pub use commit::{BookingCommitService, CommitError, MockPaymentGateway};
pub use model::{Booking, BookingStatus};
pub use repository::BookingRepository;
pub use wizard::{WizardError, WizardManager, WizardSession, WizardStep};
