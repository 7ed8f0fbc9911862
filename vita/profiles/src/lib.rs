#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! SQLite-backed store for user profiles and BMI history.
//!
//! The risk core never reads from this store; it only documents the
//! record shape the rest of the system passes in.

/// Store implementation and record types.
pub mod store;

pub use store::{
    BmiMeasurement, BmiRecord, NewProfile, ProfileStore, ProfileStoreError, UserProfile,
};
