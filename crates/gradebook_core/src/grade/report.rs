//! Course report read model consumed by table and file exporters.

use super::distribution::{grade_distribution, GradeDistribution};
use super::scoring::{
    allocated_weight, assignment_percentage, category_average, course_grade,
    validate_category_weights, weighted_contribution, CategoryScores,
};
use crate::error::GradebookResult;
use crate::model::assignment::Assignment;
use crate::model::category::Category;
use crate::model::course::Course;
use serde::Serialize;

/// One assignment with its computed percentage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentScore {
    pub assignment: Assignment,
    pub percentage: f64,
}

/// One category with its assignments and aggregates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryReport {
    pub category: Category,
    pub assignments: Vec<AssignmentScore>,
    /// `None` when the category has no assignments.
    pub average: Option<f64>,
    /// Weighted share of the full course; `None` without data.
    pub contribution: Option<f64>,
}

/// Everything an exporter needs to render one course.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseReport {
    pub course: Course,
    pub categories: Vec<CategoryReport>,
    pub grade: f64,
    pub weights_valid: bool,
    pub allocated_weight: f64,
    pub distribution: GradeDistribution,
}

impl CourseReport {
    /// Builds the report from categories in listing order and their
    /// assignments (`assignments[i]` belongs to `categories[i]`).
    pub fn build(
        course: Course,
        categories: Vec<Category>,
        assignments: Vec<Vec<Assignment>>,
    ) -> GradebookResult<Self> {
        let grade = {
            let scores: Vec<CategoryScores<'_>> = categories
                .iter()
                .zip(assignments.iter())
                .map(|(category, assignments)| CategoryScores {
                    category,
                    assignments,
                })
                .collect();
            course_grade(&scores)?
        };
        let weights_valid = validate_category_weights(&categories);
        let allocated = allocated_weight(&categories);
        let all_assignments: Vec<Assignment> = assignments.iter().flatten().cloned().collect();
        let distribution = grade_distribution(&all_assignments)?;

        let mut reports = Vec::with_capacity(categories.len());
        for (category, assignments) in categories.into_iter().zip(assignments) {
            let average = category_average(&assignments)?;
            let contribution = average.map(|average| weighted_contribution(&category, average));
            let mut scored = Vec::with_capacity(assignments.len());
            for assignment in assignments {
                let percentage = assignment_percentage(&assignment)?;
                scored.push(AssignmentScore {
                    assignment,
                    percentage,
                });
            }
            reports.push(CategoryReport {
                category,
                assignments: scored,
                average,
                contribution,
            });
        }

        Ok(Self {
            course,
            categories: reports,
            grade,
            weights_valid,
            allocated_weight: allocated,
            distribution,
        })
    }

    /// Total number of assignments across categories.
    pub fn assignment_count(&self) -> usize {
        self.categories
            .iter()
            .map(|category| category.assignments.len())
            .sum()
    }
}
