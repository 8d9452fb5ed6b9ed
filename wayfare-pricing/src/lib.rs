pub mod model;
pub mod selections;
pub mod validator;

pub use model::{PriceBreakdown, PricingModel};
pub use selections::{ContactInfo, MealOptOut, RoomTierChoice, Selections};
pub use validator::{ConstraintValidator, Violation};
