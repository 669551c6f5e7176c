//! Targeting evaluation — decides whether an ad matches a request context.
//!
//! Pure and deterministic: no I/O, no clock, no tenant state.

pub mod evaluator;
pub mod glob;

pub use evaluator::matches;
pub use glob::glob_match;
