//! HTTP route handlers.

pub mod admin;
pub mod auth;
pub mod bookings;
pub mod checkout;
pub mod culture_tags;
pub mod health;
pub mod inquiries;
pub mod payments;
pub mod providers;
pub mod quotes;
