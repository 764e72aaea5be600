//! Category domain model.
//!
//! # Responsibility
//! - Define weighted grading buckets and the synthetic rows the allocator
//!   manages beside them.
//!
//! # Invariants
//! - Regular categories carry weight in `(WEIGHT_EPSILON, 1]`.
//! - `Unallocated` carries the slack `1.0 - sum(regular)` and only exists
//!   while that slack is above `WEIGHT_EPSILON`.
//! - `Unassigned` and `Holding` are weight-0 sinks outside the weight sum.
//! - A course has at most one row of each synthetic kind.

use super::course::CourseId;
use super::validation::{require_text, ValidationError};
use super::weight::{FULL_WEIGHT, WEIGHT_EPSILON};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable category identifier.
pub type CategoryId = Uuid;

/// Display name of the slack category.
pub const UNALLOCATED_NAME: &str = "Unallocated";
/// Display name of the zero-weight sink for preserved assignments.
pub const UNASSIGNED_NAME: &str = "Unassigned";
/// Display name of the transient row used while replacing categories.
pub const HOLDING_NAME: &str = "(holding)";

/// Tag separating user categories from allocator-managed rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    /// User-defined weighted bucket.
    Regular,
    /// Slack weight not yet assigned to a regular category.
    Unallocated,
    /// Zero-weight sink for assignments whose category was removed.
    Unassigned,
    /// Zero-weight parking row, alive only inside one transaction.
    Holding,
}

/// The allocator-managed subset of [`CategoryKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntheticKind {
    Unallocated,
    Unassigned,
    Holding,
}

impl SyntheticKind {
    /// Fixed display name of rows of this kind.
    pub fn name(self) -> &'static str {
        match self {
            Self::Unallocated => UNALLOCATED_NAME,
            Self::Unassigned => UNASSIGNED_NAME,
            Self::Holding => HOLDING_NAME,
        }
    }
}

impl From<SyntheticKind> for CategoryKind {
    fn from(kind: SyntheticKind) -> Self {
        match kind {
            SyntheticKind::Unallocated => Self::Unallocated,
            SyntheticKind::Unassigned => Self::Unassigned,
            SyntheticKind::Holding => Self::Holding,
        }
    }
}

impl CategoryKind {
    /// Whether rows of this kind take part in the 100% weight sum.
    pub fn counts_toward_weight(self) -> bool {
        matches!(self, Self::Regular | Self::Unallocated)
    }

    pub fn is_regular(self) -> bool {
        self == Self::Regular
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Unallocated => "Unallocated",
            Self::Unassigned => "Unassigned",
            Self::Holding => "holding",
        }
    }
}

/// One weighted bucket of a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub uuid: CategoryId,
    pub course_uuid: CourseId,
    pub name: String,
    pub kind: CategoryKind,
    /// Fraction of the course grade, `1.0 == 100%`.
    pub weight: f64,
    /// Listing position among regular categories.
    pub sort_order: i64,
}

impl Category {
    /// Builds a regular category after validating name and weight.
    pub fn regular(
        course_uuid: CourseId,
        name: &str,
        weight: f64,
        sort_order: i64,
    ) -> Result<Self, ValidationError> {
        let category = Self {
            uuid: Uuid::new_v4(),
            course_uuid,
            name: validate_category_name(name)?,
            kind: CategoryKind::Regular,
            weight,
            sort_order,
        };
        category.validate()?;
        Ok(category)
    }

    /// Builds a synthetic row with its fixed name.
    ///
    /// `weight` is forced to 0 for the sink kinds.
    pub fn synthetic(course_uuid: CourseId, synthetic: SyntheticKind, weight: f64) -> Self {
        let kind = CategoryKind::from(synthetic);
        Self {
            uuid: Uuid::new_v4(),
            course_uuid,
            name: synthetic.name().to_string(),
            kind,
            weight: if kind.counts_toward_weight() { weight } else { 0.0 },
            sort_order: i64::MAX,
        }
    }

    pub fn is_unallocated(&self) -> bool {
        self.kind == CategoryKind::Unallocated
    }

    /// Checks the per-kind weight rules.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.name, "category name")?;
        match self.kind {
            CategoryKind::Regular | CategoryKind::Unallocated => validate_weight(self.weight),
            CategoryKind::Unassigned | CategoryKind::Holding => {
                if self.weight == 0.0 {
                    Ok(())
                } else {
                    Err(ValidationError::WeightOutOfRange(self.weight))
                }
            }
        }
    }
}

/// Rejects weights outside `(WEIGHT_EPSILON, 1 + WEIGHT_EPSILON]`.
///
/// A weight at or below the tolerance is indistinguishable from zero.
pub fn validate_weight(weight: f64) -> Result<(), ValidationError> {
    if !weight.is_finite() || weight <= WEIGHT_EPSILON || weight > FULL_WEIGHT + WEIGHT_EPSILON {
        return Err(ValidationError::WeightOutOfRange(weight));
    }
    Ok(())
}

/// Trims a user-supplied category name and rejects synthetic names.
pub fn validate_category_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = require_text(name, "category name")?;
    if is_reserved_name(&trimmed) {
        return Err(ValidationError::ReservedCategoryName(trimmed));
    }
    Ok(trimmed)
}

/// Whether `name` case-insensitively matches a synthetic category name.
pub fn is_reserved_name(name: &str) -> bool {
    [UNALLOCATED_NAME, UNASSIGNED_NAME, HOLDING_NAME]
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name.trim()))
}
