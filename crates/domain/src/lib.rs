//! Domain layer for the Event Marketplace backend.
//!
//! This crate contains:
//! - Domain models (Provider, Inquiry, Quote, Booking, ...)
//! - The error taxonomy shared by every operation
//! - Persistence ports implemented by the `persistence` crate
//! - The inquiry/quote/booking lifecycle engine and account services
//! - An in-memory store implementing every port, for tests and local runs

pub mod error;
pub mod memory;
pub mod models;
pub mod ports;
pub mod services;

#[cfg(test)]
mod test_support;

pub use error::{DomainError, DomainResult, FieldError};
