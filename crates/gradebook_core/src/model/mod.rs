//! Gradebook domain model.
//!
//! # Responsibility
//! - Define courses, weighted categories and scored assignments.
//! - Own the structural validation rules every write path must pass.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Synthetic categories are told apart by `CategoryKind`, never by name.

pub mod assignment;
pub mod category;
pub mod course;
pub mod validation;
pub mod weight;
