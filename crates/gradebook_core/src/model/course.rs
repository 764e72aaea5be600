//! Course domain model.

use super::validation::{require_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable course identifier.
pub type CourseId = Uuid;

/// Credit hours assigned when none are given.
pub const DEFAULT_CREDIT_HOURS: u32 = 3;

/// One course offering: a code taught in a given term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub uuid: CourseId,
    /// Catalog code, e.g. `CHM343`. Unique together with `term`.
    pub code: String,
    pub title: String,
    /// Free-form term label, e.g. `Fall 2024`.
    pub term: String,
    /// Zero is allowed (audited / pass-fail courses).
    pub credit_hours: u32,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Course {
    /// Creates a course with a generated id and trimmed text fields.
    pub fn new(
        code: &str,
        title: &str,
        term: &str,
        credit_hours: u32,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            uuid: Uuid::new_v4(),
            code: require_text(code, "course code")?,
            title: require_text(title, "course title")?,
            term: require_text(term, "term")?,
            credit_hours,
            created_at: 0,
        })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.code, "course code")?;
        require_text(&self.title, "course title")?;
        require_text(&self.term, "term")?;
        Ok(())
    }
}
