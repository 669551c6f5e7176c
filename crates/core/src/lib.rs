//! Core domain types for the ad delivery engine — ads, content schemas,
//! targeting rules, event rows, errors, and configuration.

pub mod config;
pub mod content;
pub mod error;
pub mod event_bus;
pub mod types;

pub use config::AppConfig;
pub use error::{AdError, AdResult};
