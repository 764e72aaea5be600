//! Assignment domain model.
//!
//! # Invariants
//! - `max_points > 0` and `0 <= earned_points <= max_points`.
//! - An assignment belongs to exactly one category of its own course.

use super::category::CategoryId;
use super::course::CourseId;
use super::validation::{require_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable assignment identifier.
pub type AssignmentId = Uuid;

/// One scored piece of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub uuid: AssignmentId,
    pub course_uuid: CourseId,
    pub category_uuid: CategoryId,
    pub title: String,
    pub max_points: f64,
    pub earned_points: f64,
    /// Unix epoch milliseconds; filled by storage on insert.
    pub created_at: i64,
}

impl Assignment {
    /// Creates a validated assignment with a generated id.
    pub fn new(
        course_uuid: CourseId,
        category_uuid: CategoryId,
        title: &str,
        max_points: f64,
        earned_points: f64,
    ) -> Result<Self, ValidationError> {
        let assignment = Self {
            uuid: Uuid::new_v4(),
            course_uuid,
            category_uuid,
            title: require_text(title, "assignment title")?,
            max_points,
            earned_points,
            created_at: 0,
        };
        assignment.validate()?;
        Ok(assignment)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.title, "assignment title")?;
        validate_points(self.max_points, self.earned_points)
    }
}

/// Enforces `max > 0` and `0 <= earned <= max`.
pub fn validate_points(max_points: f64, earned_points: f64) -> Result<(), ValidationError> {
    if !max_points.is_finite() || !earned_points.is_finite() {
        return Err(ValidationError::NonFiniteScore);
    }
    if max_points <= 0.0 {
        return Err(ValidationError::NonPositiveMaxPoints(max_points));
    }
    if earned_points < 0.0 {
        return Err(ValidationError::NegativeEarnedPoints(earned_points));
    }
    if earned_points > max_points {
        return Err(ValidationError::EarnedExceedsMax {
            earned: earned_points,
            max: max_points,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_points, Assignment};
    use crate::model::validation::ValidationError;
    use uuid::Uuid;

    #[test]
    fn earned_may_equal_max() {
        assert!(validate_points(100.0, 100.0).is_ok());
        assert!(validate_points(100.0, 0.0).is_ok());
    }

    #[test]
    fn earned_above_max_is_rejected() {
        assert_eq!(
            validate_points(50.0, 51.0),
            Err(ValidationError::EarnedExceedsMax {
                earned: 51.0,
                max: 50.0
            })
        );
    }

    #[test]
    fn zero_max_is_rejected_before_earned_checks() {
        assert_eq!(
            validate_points(0.0, 0.0),
            Err(ValidationError::NonPositiveMaxPoints(0.0))
        );
    }

    #[test]
    fn new_rejects_blank_title() {
        let err = Assignment::new(Uuid::new_v4(), Uuid::new_v4(), " ", 10.0, 5.0).unwrap_err();
        assert_eq!(err, ValidationError::BlankField("assignment title"));
    }
}
