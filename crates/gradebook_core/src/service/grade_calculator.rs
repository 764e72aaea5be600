//! Grade calculator service.
//!
//! # Responsibility
//! - Load categories and assignments through the category repository and
//!   feed them to the pure math in `grade::scoring`.
//! - Produce course reports and weight audits for read-only collaborators.
//!
//! # Invariants
//! - Never opens a write transaction or mutates storage.

use crate::error::GradebookResult;
use crate::grade::distribution::score_summary;
use crate::grade::report::CourseReport;
use crate::grade::scoring::{self, CategoryScores};
use crate::grade::summary::{summary_order, CourseSummary};
use crate::model::assignment::Assignment;
use crate::model::category::{Category, CategoryId, CategoryKind};
use crate::model::course::{Course, CourseId};
use crate::repo::category_repo::CategoryRepository;
use crate::repo::NotFoundError;
use log::{debug, warn};
use serde::Serialize;

/// One course whose weight-bearing categories do not sum to 100%.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightAudit {
    pub course: Course,
    pub total_weight: f64,
    pub category_count: usize,
    pub has_unallocated: bool,
}

/// Read-only grade aggregation over stored categories and assignments.
pub struct GradeCalculator<R: CategoryRepository> {
    repo: R,
}

impl<R: CategoryRepository> GradeCalculator<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// `earned / max * 100`; see `grade::scoring::assignment_percentage`.
    pub fn assignment_percentage(&self, assignment: &Assignment) -> GradebookResult<f64> {
        scoring::assignment_percentage(assignment)
    }

    /// Mean assignment percentage of one category, `None` without data.
    pub fn category_average(&self, category: CategoryId) -> GradebookResult<Option<f64>> {
        if self.repo.get_category(category)?.is_none() {
            return Err(NotFoundError::Category(category).into());
        }
        let assignments = self.repo.fetch_assignments(category)?;
        scoring::category_average(&assignments)
    }

    /// Weighted course grade, re-normalized over categories with data.
    pub fn course_grade(&self, course: CourseId) -> GradebookResult<f64> {
        let loaded = self.load(course)?;
        let scores: Vec<CategoryScores<'_>> = loaded
            .iter()
            .map(|(category, assignments)| CategoryScores {
                category,
                assignments,
            })
            .collect();
        let grade = scoring::course_grade(&scores)?;
        debug!(
            "event=course_grade module=grades status=ok course_id={course} categories={}",
            scores.len()
        );
        Ok(grade)
    }

    /// Pre-flight check before trusting `course_grade`.
    pub fn validate_category_weights(&self, course: CourseId) -> GradebookResult<bool> {
        self.ensure_course(course)?;
        let categories = self.repo.fetch_categories(course)?;
        Ok(scoring::validate_category_weights(&categories))
    }

    /// Full per-category breakdown of one course.
    pub fn course_report(&self, course: &Course) -> GradebookResult<CourseReport> {
        let (categories, assignments): (Vec<_>, Vec<_>) =
            self.load(course.uuid)?.into_iter().unzip();
        let report = CourseReport::build(course.clone(), categories, assignments)?;
        if !report.weights_valid && !report.categories.is_empty() {
            warn!(
                "event=course_report module=grades status=ok course_id={} weights_valid=false allocated_weight={}",
                course.uuid, report.allocated_weight
            );
        }
        Ok(report)
    }

    /// Score statistics per course, optionally limited to one term.
    ///
    /// Every assignment of a course counts, including ones parked in the
    /// Unassigned sink. Ordered term descending, then title.
    pub fn course_summaries(
        &self,
        courses: &[Course],
        term: Option<&str>,
    ) -> GradebookResult<Vec<CourseSummary>> {
        let mut summaries = Vec::new();
        for course in courses {
            if term.is_some_and(|term| term != course.term) {
                continue;
            }
            let assignments: Vec<Assignment> = self
                .load(course.uuid)?
                .into_iter()
                .flat_map(|(_, assignments)| assignments)
                .collect();
            summaries.push(CourseSummary {
                course: course.clone(),
                summary: score_summary(&assignments)?,
            });
        }
        summaries.sort_by(summary_order);
        debug!(
            "event=course_summaries module=grades status=ok courses={}",
            summaries.len()
        );
        Ok(summaries)
    }

    /// Courses that have categories whose weights fail validation.
    ///
    /// Courses without any weight-bearing category are skipped.
    pub fn audit_weights(&self, courses: &[Course]) -> GradebookResult<Vec<WeightAudit>> {
        let mut findings = Vec::new();
        for course in courses {
            let categories = self.repo.fetch_categories(course.uuid)?;
            let weighted = categories
                .iter()
                .filter(|category| category.kind.counts_toward_weight())
                .count();
            if weighted == 0 || scoring::validate_category_weights(&categories) {
                continue;
            }
            findings.push(WeightAudit {
                course: course.clone(),
                total_weight: scoring::allocated_weight(&categories),
                category_count: weighted,
                has_unallocated: categories
                    .iter()
                    .any(|category| category.kind == CategoryKind::Unallocated),
            });
        }
        if !findings.is_empty() {
            warn!(
                "event=weight_audit module=grades status=ok courses={} invalid={}",
                courses.len(),
                findings.len()
            );
        }
        Ok(findings)
    }

    fn load(&self, course: CourseId) -> GradebookResult<Vec<(Category, Vec<Assignment>)>> {
        self.ensure_course(course)?;
        let categories = self.repo.fetch_categories(course)?;
        let mut loaded = Vec::with_capacity(categories.len());
        for category in categories {
            let assignments = self.repo.fetch_assignments(category.uuid)?;
            loaded.push((category, assignments));
        }
        Ok(loaded)
    }

    fn ensure_course(&self, course: CourseId) -> GradebookResult<()> {
        if !self.repo.course_exists(course)? {
            return Err(NotFoundError::Course(course).into());
        }
        Ok(())
    }
}
