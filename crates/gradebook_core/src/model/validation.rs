//! Structural validation failures.
//!
//! # Responsibility
//! - Name every way an input can violate a gradebook invariant.
//! - Keep messages user-presentable; callers show them verbatim.
//!
//! # Invariants
//! - A `ValidationError` is always raised before any mutation happens.

use super::category::CategoryKind;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Input violates a structural invariant. Always recoverable.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Required text field is blank after trim.
    BlankField(&'static str),
    /// Category weight outside `(0, 1]`.
    WeightOutOfRange(f64),
    /// Bulk category weights do not add up to 1.0.
    WeightsDoNotSum { total: f64 },
    /// Bulk replacement was given no categories.
    NoCategories,
    /// Name collides with a synthetic category name.
    ReservedCategoryName(String),
    /// Name already used in the course (case-insensitive).
    DuplicateCategoryName(String),
    /// Synthetic category cannot be edited, renamed or graded directly.
    SyntheticCategory(CategoryKind),
    /// Course code already exists for the term.
    DuplicateCourse { code: String, term: String },
    /// Course code exists in several terms and no term was given.
    AmbiguousCourse { code: String, terms: Vec<String> },
    /// Score is NaN or infinite.
    NonFiniteScore,
    /// Max points must be strictly positive.
    NonPositiveMaxPoints(f64),
    /// Earned points must not be negative.
    NegativeEarnedPoints(f64),
    /// Earned points exceed max points.
    EarnedExceedsMax { earned: f64, max: f64 },
    /// Assignment and target category belong to different courses.
    CategoryOutsideCourse,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
            Self::WeightOutOfRange(weight) => {
                write!(f, "weight must be between 0 and 1 (got {weight})")
            }
            Self::WeightsDoNotSum { total } => write!(
                f,
                "weights must sum to 100% (got {:.2}%)",
                total * 100.0
            ),
            Self::NoCategories => write!(f, "at least one category is required"),
            Self::ReservedCategoryName(name) => {
                write!(f, "category name `{name}` is reserved")
            }
            Self::DuplicateCategoryName(name) => {
                write!(f, "category `{name}` already exists in this course")
            }
            Self::SyntheticCategory(kind) => {
                write!(f, "{} category cannot be modified directly", kind.label())
            }
            Self::DuplicateCourse { code, term } => {
                write!(f, "course {code} already exists for {term}")
            }
            Self::AmbiguousCourse { code, terms } => write!(
                f,
                "course {code} exists in several terms ({}); specify one",
                terms.join(", ")
            ),
            Self::NonFiniteScore => write!(f, "points must be finite numbers"),
            Self::NonPositiveMaxPoints(max) => {
                write!(f, "max points must be greater than 0 (got {max})")
            }
            Self::NegativeEarnedPoints(earned) => {
                write!(f, "earned points must not be negative (got {earned})")
            }
            Self::EarnedExceedsMax { earned, max } => {
                write!(f, "earned points ({earned}) cannot exceed max points ({max})")
            }
            Self::CategoryOutsideCourse => {
                write!(f, "category does not belong to the assignment's course")
            }
        }
    }
}

impl Error for ValidationError {}

/// Trims a text field and rejects blank values.
pub fn require_text(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(trimmed.to_string())
}
