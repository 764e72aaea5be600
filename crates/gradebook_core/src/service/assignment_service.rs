//! Assignment use-case service.
//!
//! # Responsibility
//! - Create, edit, move, delete and list scored assignments.
//! - Guard assignment placement: only regular categories of the
//!   assignment's own course can receive assignments.
//!
//! # Invariants
//! - `max_points > 0` and `0 <= earned_points <= max_points` after every
//!   write (validated on the merged record, not the patch alone).
//! - Assignments never change course.

use crate::error::GradebookResult;
use crate::model::assignment::{Assignment, AssignmentId};
use crate::model::category::{Category, CategoryId};
use crate::model::course::CourseId;
use crate::model::validation::{require_text, ValidationError};
use crate::repo::assignment_repo::AssignmentRepository;
use crate::repo::category_repo::CategoryRepository;
use crate::repo::NotFoundError;
use log::info;

/// Partial assignment update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentPatch {
    pub title: Option<String>,
    pub max_points: Option<f64>,
    pub earned_points: Option<f64>,
    pub category: Option<CategoryId>,
}

impl AssignmentPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.max_points.is_none()
            && self.earned_points.is_none()
            && self.category.is_none()
    }
}

/// Assignment operations over assignment and category repositories.
pub struct AssignmentService<A: AssignmentRepository, C: CategoryRepository> {
    assignments: A,
    categories: C,
}

impl<A: AssignmentRepository, C: CategoryRepository> AssignmentService<A, C> {
    pub fn new(assignments: A, categories: C) -> Self {
        Self {
            assignments,
            categories,
        }
    }

    /// Records a new scored assignment in a regular category of `course`.
    pub fn add_assignment(
        &self,
        course: CourseId,
        category: CategoryId,
        title: &str,
        max_points: f64,
        earned_points: f64,
    ) -> GradebookResult<Assignment> {
        let assignment = Assignment::new(course, category, title, max_points, earned_points)?;
        self.assignable_category(course, category)?;

        let created = self.assignments.create_assignment(&assignment)?;
        info!(
            "event=assignment_add module=assignments status=ok course_id={course} category_id={category} assignment_id={}",
            created.uuid
        );
        Ok(created)
    }

    pub fn get_assignment(&self, id: AssignmentId) -> GradebookResult<Assignment> {
        Ok(self
            .assignments
            .get_assignment(id)?
            .ok_or(NotFoundError::Assignment(id))?)
    }

    /// Finds an assignment by exact title; the newest wins when titles repeat.
    pub fn find_assignment(&self, course: CourseId, title: &str) -> GradebookResult<Assignment> {
        let title = require_text(title, "assignment title")?;
        self.assignments
            .find_assignments_by_title(course, &title)?
            .into_iter()
            .next()
            .ok_or_else(|| NotFoundError::AssignmentTitle { course, title }.into())
    }

    /// Applies `patch` and persists the merged, re-validated record.
    pub fn update_assignment(
        &self,
        id: AssignmentId,
        patch: AssignmentPatch,
    ) -> GradebookResult<Assignment> {
        let mut assignment = self.get_assignment(id)?;
        if patch.is_empty() {
            return Ok(assignment);
        }

        if let Some(title) = patch.title {
            assignment.title = require_text(&title, "assignment title")?;
        }
        if let Some(max_points) = patch.max_points {
            assignment.max_points = max_points;
        }
        if let Some(earned_points) = patch.earned_points {
            assignment.earned_points = earned_points;
        }
        assignment.validate()?;

        if let Some(category) = patch.category {
            if category != assignment.category_uuid {
                self.assignable_category(assignment.course_uuid, category)?;
                assignment.category_uuid = category;
            }
        }

        self.assignments.update_assignment(&assignment)?;
        info!("event=assignment_update module=assignments status=ok assignment_id={id}");
        Ok(assignment)
    }

    /// Moves an assignment to another regular category of the same course.
    pub fn move_assignment(
        &self,
        id: AssignmentId,
        category: CategoryId,
    ) -> GradebookResult<Assignment> {
        self.update_assignment(
            id,
            AssignmentPatch {
                category: Some(category),
                ..AssignmentPatch::default()
            },
        )
    }

    pub fn delete_assignment(&self, id: AssignmentId) -> GradebookResult<()> {
        self.assignments.delete_assignment(id)?;
        info!("event=assignment_delete module=assignments status=ok assignment_id={id}");
        Ok(())
    }

    /// Every assignment of a course, newest first.
    pub fn list_assignments(&self, course: CourseId) -> GradebookResult<Vec<Assignment>> {
        if !self.categories.course_exists(course)? {
            return Err(NotFoundError::Course(course).into());
        }
        Ok(self.assignments.list_course_assignments(course)?)
    }

    fn assignable_category(
        &self,
        course: CourseId,
        category: CategoryId,
    ) -> GradebookResult<Category> {
        let target = self
            .categories
            .get_category(category)?
            .ok_or(NotFoundError::Category(category))?;
        if target.course_uuid != course {
            return Err(ValidationError::CategoryOutsideCourse.into());
        }
        if !target.kind.is_regular() {
            return Err(ValidationError::SyntheticCategory(target.kind).into());
        }
        Ok(target)
    }
}
