//! External service integrations.

pub mod email;
pub mod stripe;

pub use email::EmailService;
pub use stripe::StripeGateway;
