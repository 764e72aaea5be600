//! Course repository contract and SQLite implementation.
//!
//! # Invariants
//! - `(code, term)` is unique.
//! - Deleting a course removes its categories and assignments.

use super::schema::{ensure_connection_ready, map_unique_violation, parse_uuid};
use super::{NotFoundError, RepoError, RepoResult};
use crate::model::course::{Course, CourseId};
use crate::model::validation::ValidationError;
use rusqlite::{params, Connection, Row};

const COURSE_SELECT_SQL: &str = "SELECT
    uuid,
    code,
    title,
    term,
    credit_hours,
    created_at
FROM courses";

/// Repository interface for course records.
pub trait CourseRepository {
    fn create_course(&self, course: &Course) -> RepoResult<Course>;
    fn get_course(&self, id: CourseId) -> RepoResult<Option<Course>>;
    /// All terms a code is offered in, newest term label first.
    fn find_courses_by_code(&self, code: &str) -> RepoResult<Vec<Course>>;
    fn list_courses(&self) -> RepoResult<Vec<Course>>;
    fn delete_course(&self, id: CourseId) -> RepoResult<()>;
}

/// SQLite-backed course repository.
pub struct SqliteCourseRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCourseRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "courses")?;
        Ok(Self { conn })
    }
}

impl CourseRepository for SqliteCourseRepository<'_> {
    fn create_course(&self, course: &Course) -> RepoResult<Course> {
        course.validate()?;

        self.conn
            .execute(
                "INSERT INTO courses (uuid, code, title, term, credit_hours)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    course.uuid.to_string(),
                    course.code.as_str(),
                    course.title.as_str(),
                    course.term.as_str(),
                    i64::from(course.credit_hours),
                ],
            )
            .map_err(|err| {
                map_unique_violation(err, || {
                    RepoError::Validation(ValidationError::DuplicateCourse {
                        code: course.code.clone(),
                        term: course.term.clone(),
                    })
                })
            })?;

        self.get_course(course.uuid)?
            .ok_or(RepoError::NotFound(NotFoundError::Course(course.uuid)))
    }

    fn get_course(&self, id: CourseId) -> RepoResult<Option<Course>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{COURSE_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_course_row(row)?));
        }
        Ok(None)
    }

    fn find_courses_by_code(&self, code: &str) -> RepoResult<Vec<Course>> {
        let mut stmt = self.conn.prepare(&format!(
            "{COURSE_SELECT_SQL}
             WHERE code = ?1
             ORDER BY term DESC;"
        ))?;
        let mut rows = stmt.query([code.trim()])?;
        let mut courses = Vec::new();
        while let Some(row) = rows.next()? {
            courses.push(parse_course_row(row)?);
        }
        Ok(courses)
    }

    fn list_courses(&self) -> RepoResult<Vec<Course>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{COURSE_SELECT_SQL} ORDER BY term DESC, title ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut courses = Vec::new();
        while let Some(row) = rows.next()? {
            courses.push(parse_course_row(row)?);
        }
        Ok(courses)
    }

    fn delete_course(&self, id: CourseId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM courses WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(NotFoundError::Course(id).into());
        }
        Ok(())
    }
}

fn parse_course_row(row: &Row<'_>) -> RepoResult<Course> {
    let uuid_text: String = row.get("uuid")?;
    let credit_hours = row.get::<_, i64>("credit_hours")?;
    let credit_hours = u32::try_from(credit_hours).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid credit_hours `{credit_hours}` in courses.credit_hours"
        ))
    })?;

    let course = Course {
        uuid: parse_uuid(&uuid_text, "courses.uuid")?,
        code: row.get("code")?,
        title: row.get("title")?,
        term: row.get("term")?,
        credit_hours,
        created_at: row.get("created_at")?,
    };
    course.validate()?;
    Ok(course)
}
