//! Domain models for the token database.
//!
//! These are the core types shared across all crates.

pub mod activity;
pub mod certificate;
pub mod token;
