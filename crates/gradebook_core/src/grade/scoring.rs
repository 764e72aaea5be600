//! Pure grade math over already-loaded categories and assignments.
//!
//! # Invariants
//! - Only regular categories contribute to a course grade; synthetic rows
//!   (Unallocated, Unassigned, holding) never do.
//! - The course grade is re-normalized over categories that have data, so
//!   empty categories do not dilute it.
//! - A course with no graded category has grade `0.0`.

use crate::error::{GradebookError, GradebookResult};
use crate::model::assignment::Assignment;
use crate::model::category::Category;
use crate::model::weight::{is_full_allocation, total_weight};

/// A category together with the assignments it owns.
#[derive(Debug, Clone, Copy)]
pub struct CategoryScores<'a> {
    pub category: &'a Category,
    pub assignments: &'a [Assignment],
}

/// `earned / max * 100`.
///
/// # Errors
/// - `GradebookError::Division` when `max_points <= 0`.
pub fn assignment_percentage(assignment: &Assignment) -> GradebookResult<f64> {
    if assignment.max_points <= 0.0 || !assignment.max_points.is_finite() {
        return Err(GradebookError::Division {
            max_points: assignment.max_points,
        });
    }
    Ok(assignment.earned_points / assignment.max_points * 100.0)
}

/// Arithmetic mean of assignment percentages; `None` when there is no data.
pub fn category_average(assignments: &[Assignment]) -> GradebookResult<Option<f64>> {
    if assignments.is_empty() {
        return Ok(None);
    }
    let mut sum = 0.0;
    for assignment in assignments {
        sum += assignment_percentage(assignment)?;
    }
    Ok(Some(sum / assignments.len() as f64))
}

/// `average / 100 * weight`, the share of the full course a category earns.
pub fn weighted_contribution(category: &Category, average: f64) -> f64 {
    average / 100.0 * category.weight
}

/// Weighted course grade in `[0, 100]`.
pub fn course_grade(categories: &[CategoryScores<'_>]) -> GradebookResult<f64> {
    let mut earned = 0.0;
    let mut populated_weight = 0.0;

    for scores in categories
        .iter()
        .filter(|scores| scores.category.kind.is_regular())
    {
        if let Some(average) = category_average(scores.assignments)? {
            earned += weighted_contribution(scores.category, average);
            populated_weight += scores.category.weight;
        }
    }

    if populated_weight <= 0.0 {
        return Ok(0.0);
    }
    Ok(earned / populated_weight * 100.0)
}

/// Sum of weights that take part in the 100% invariant.
///
/// The Unassigned sink and the holding row are excluded by kind.
pub fn allocated_weight(categories: &[Category]) -> f64 {
    total_weight(
        categories
            .iter()
            .filter(|category| category.kind.counts_toward_weight())
            .map(|category| category.weight),
    )
}

/// True iff the weight-bearing categories sum to 1.0 within tolerance.
pub fn validate_category_weights(categories: &[Category]) -> bool {
    is_full_allocation(allocated_weight(categories))
}

#[cfg(test)]
mod tests {
    use super::{
        assignment_percentage, category_average, course_grade, validate_category_weights,
        CategoryScores,
    };
    use crate::error::GradebookError;
    use crate::model::assignment::Assignment;
    use crate::model::category::{Category, SyntheticKind};
    use uuid::Uuid;

    fn scored(category: &Category, max: f64, earned: f64) -> Assignment {
        Assignment {
            uuid: Uuid::new_v4(),
            course_uuid: category.course_uuid,
            category_uuid: category.uuid,
            title: "work".to_string(),
            max_points: max,
            earned_points: earned,
            created_at: 0,
        }
    }

    fn sample_categories() -> Vec<Category> {
        let course = Uuid::new_v4();
        vec![
            Category::regular(course, "Homework", 0.3, 0).unwrap(),
            Category::regular(course, "Midterm", 0.3, 1).unwrap(),
            Category::regular(course, "Final", 0.4, 2).unwrap(),
        ]
    }

    #[test]
    fn percentage_rejects_zero_max() {
        let category = &sample_categories()[0];
        let mut assignment = scored(category, 10.0, 5.0);
        assignment.max_points = 0.0;
        let err = assignment_percentage(&assignment).unwrap_err();
        assert!(matches!(err, GradebookError::Division { max_points } if max_points == 0.0));
    }

    #[test]
    fn empty_category_average_is_no_data() {
        assert_eq!(category_average(&[]).unwrap(), None);
    }

    #[test]
    fn average_is_mean_of_percentages_not_points() {
        let category = &sample_categories()[0];
        let assignments = vec![scored(category, 10.0, 10.0), scored(category, 90.0, 0.0)];
        let average = category_average(&assignments).unwrap().unwrap();
        assert!((average - 50.0).abs() < 1e-9);
    }

    #[test]
    fn single_populated_category_is_renormalized() {
        let categories = sample_categories();
        let homework = vec![
            scored(&categories[0], 100.0, 90.0),
            scored(&categories[0], 100.0, 80.0),
        ];
        let scores = vec![
            CategoryScores {
                category: &categories[0],
                assignments: &homework,
            },
            CategoryScores {
                category: &categories[1],
                assignments: &[],
            },
            CategoryScores {
                category: &categories[2],
                assignments: &[],
            },
        ];
        assert!((course_grade(&scores).unwrap() - 85.0).abs() < 1e-9);
    }

    #[test]
    fn no_data_anywhere_is_zero() {
        let categories = sample_categories();
        let scores: Vec<CategoryScores<'_>> = categories
            .iter()
            .map(|category| CategoryScores {
                category,
                assignments: &[],
            })
            .collect();
        assert_eq!(course_grade(&scores).unwrap(), 0.0);
    }

    #[test]
    fn sink_assignments_do_not_count() {
        let categories = sample_categories();
        let sink = Category::synthetic(categories[0].course_uuid, SyntheticKind::Unassigned, 0.0);
        let parked = vec![scored(&sink, 100.0, 10.0)];
        let final_exam = vec![scored(&categories[2], 100.0, 70.0)];
        let scores = vec![
            CategoryScores {
                category: &sink,
                assignments: &parked,
            },
            CategoryScores {
                category: &categories[2],
                assignments: &final_exam,
            },
        ];
        assert!((course_grade(&scores).unwrap() - 70.0).abs() < 1e-9);
    }

    #[test]
    fn weight_validation_ignores_sink_and_counts_slack() {
        let mut categories = sample_categories();
        categories[2].weight = 0.3;
        assert!(!validate_category_weights(&categories));

        categories.push(Category::synthetic(
            categories[0].course_uuid,
            SyntheticKind::Unallocated,
            0.1,
        ));
        categories.push(Category::synthetic(
            categories[0].course_uuid,
            SyntheticKind::Unassigned,
            0.0,
        ));
        assert!(validate_category_weights(&categories));
    }

    #[test]
    fn empty_course_weights_are_not_valid() {
        assert!(!validate_category_weights(&[]));
    }
}
