//! Course use-case service.
//!
//! # Responsibility
//! - Create, look up, list and remove courses.
//! - Resolve user-facing `(code, term)` references to one course.
//!
//! # Invariants
//! - `(code, term)` is unique; duplicates surface as `DuplicateCourse`.
//! - Removing a course cascades to its categories and assignments.

use crate::error::GradebookResult;
use crate::model::course::{Course, CourseId};
use crate::model::validation::{require_text, ValidationError};
use crate::repo::course_repo::CourseRepository;
use crate::repo::NotFoundError;
use log::info;

/// Course lifecycle operations over a course repository.
pub struct CourseService<R: CourseRepository> {
    repo: R,
}

impl<R: CourseRepository> CourseService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a course.
    ///
    /// # Errors
    /// - `Validation(BlankField)` for blank code/title/term.
    /// - `Validation(DuplicateCourse)` when `(code, term)` already exists.
    pub fn add_course(
        &self,
        code: &str,
        title: &str,
        term: &str,
        credit_hours: u32,
    ) -> GradebookResult<Course> {
        let course = Course::new(code, title, term, credit_hours)?;
        let created = self.repo.create_course(&course)?;
        info!(
            "event=course_add module=courses status=ok course_id={}",
            created.uuid
        );
        Ok(created)
    }

    pub fn get_course(&self, id: CourseId) -> GradebookResult<Course> {
        Ok(self
            .repo
            .get_course(id)?
            .ok_or(NotFoundError::Course(id))?)
    }

    /// Resolves a course by code and optional term.
    ///
    /// Without a term, the code must identify exactly one course; several
    /// matches fail with `AmbiguousCourse` listing the candidate terms.
    pub fn find_course(&self, code: &str, term: Option<&str>) -> GradebookResult<Course> {
        let code = require_text(code, "course code")?;
        let term = term.map(str::trim).filter(|value| !value.is_empty());
        let mut matches = self.repo.find_courses_by_code(&code)?;

        if let Some(term) = term {
            matches.retain(|course| course.term == term);
        }

        match matches.len() {
            0 => Err(NotFoundError::CourseCode {
                code,
                term: term.map(str::to_string),
            }
            .into()),
            1 => Ok(matches.remove(0)),
            _ => Err(ValidationError::AmbiguousCourse {
                code,
                terms: matches.into_iter().map(|course| course.term).collect(),
            }
            .into()),
        }
    }

    /// Lists every course, newest term first.
    pub fn list_courses(&self) -> GradebookResult<Vec<Course>> {
        Ok(self.repo.list_courses()?)
    }

    /// Deletes a course with its categories and assignments.
    pub fn remove_course(&self, id: CourseId) -> GradebookResult<()> {
        self.repo.delete_course(id)?;
        info!("event=course_remove module=courses status=ok course_id={id}");
        Ok(())
    }
}
