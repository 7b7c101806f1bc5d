//! Persistence layer for the event marketplace backend.
//!
//! This crate contains:
//! - Database connection management and migrations
//! - Entity definitions (database row mappings)
//! - Repository implementations of the domain store ports

pub mod db;
pub mod entities;
pub mod error;
pub mod metrics;
pub mod repositories;

pub use repositories::postgres_stores;
