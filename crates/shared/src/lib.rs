//! Shared utilities and common types for the Event Marketplace backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Cryptographic utilities (token generation, hashing, HMAC signatures)
//! - Password hashing with Argon2id and password policy
//! - JWT access tokens carrying the caller's role
//! - Common validation logic

pub mod crypto;
pub mod jwt;
pub mod password;
pub mod validation;
