//! Read-side grade aggregation.
//!
//! # Responsibility
//! - Turn scored assignments into category averages and a course grade.
//! - Build report and statistics read models for export collaborators.
//!
//! # Invariants
//! - Nothing in this module mutates storage.
//! - "No data" (`None`) and `0%` are distinct results.

pub mod distribution;
pub mod report;
pub mod scoring;
pub mod summary;
