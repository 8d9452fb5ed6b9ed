pub mod payment;

pub use payment::{PaymentGateway, PaymentAuthorization, PaymentError, PaymentMethod, Payer};
