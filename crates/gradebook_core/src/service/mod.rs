//! Engine use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into the operations CLI and export
//!   collaborators call.
//! - Keep callers decoupled from SQL and transaction details.

pub mod allocator;
pub mod assignment_service;
pub mod course_service;
pub mod grade_calculator;
