//! Ad delivery engine — storage, admin mutations, placement selection, and
//! impression/click recording.
//!
//! Data lives in a DashMap-backed store (development mode; the API surface
//! is shaped so a SQL store can replace it). Every call takes an explicit
//! tenant id — there is no ambient tenant context anywhere below the HTTP
//! edge.

pub mod device;
pub mod recorder;
pub mod selection;
pub mod service;
pub mod store;

pub use recorder::EventRecorder;
pub use selection::SelectionEngine;
pub use service::{AdFilters, AdService, CreateAdRequest, UpdateAdRequest};
pub use store::AdStore;
