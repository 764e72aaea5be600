//! Assignment repository contract and SQLite implementation.
//!
//! # Invariants
//! - Write paths call `Assignment::validate()` before SQL mutations.
//! - Listing order is `created_at DESC, uuid ASC` (newest first).

use super::schema::{ensure_connection_ready, parse_uuid};
use super::{NotFoundError, RepoError, RepoResult};
use crate::model::assignment::{Assignment, AssignmentId};
use crate::model::course::CourseId;
use rusqlite::{params, Connection, Row};

pub(crate) const ASSIGNMENT_SELECT_SQL: &str = "SELECT
    uuid,
    course_uuid,
    category_uuid,
    title,
    max_points,
    earned_points,
    created_at
FROM assignments";

/// Repository interface for assignment records.
pub trait AssignmentRepository {
    fn create_assignment(&self, assignment: &Assignment) -> RepoResult<Assignment>;
    fn get_assignment(&self, id: AssignmentId) -> RepoResult<Option<Assignment>>;
    /// Exact title lookup within a course; titles are not unique, so every
    /// match is returned.
    fn find_assignments_by_title(
        &self,
        course: CourseId,
        title: &str,
    ) -> RepoResult<Vec<Assignment>>;
    /// Persists title, points and category of an existing assignment.
    fn update_assignment(&self, assignment: &Assignment) -> RepoResult<()>;
    fn delete_assignment(&self, id: AssignmentId) -> RepoResult<()>;
    fn list_course_assignments(&self, course: CourseId) -> RepoResult<Vec<Assignment>>;
}

/// SQLite-backed assignment repository.
pub struct SqliteAssignmentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAssignmentRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "assignments")?;
        Ok(Self { conn })
    }

    fn query_assignments(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> RepoResult<Vec<Assignment>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut assignments = Vec::new();
        while let Some(row) = rows.next()? {
            assignments.push(parse_assignment_row(row)?);
        }
        Ok(assignments)
    }
}

impl AssignmentRepository for SqliteAssignmentRepository<'_> {
    fn create_assignment(&self, assignment: &Assignment) -> RepoResult<Assignment> {
        assignment.validate()?;

        self.conn.execute(
            "INSERT INTO assignments (
                uuid,
                course_uuid,
                category_uuid,
                title,
                max_points,
                earned_points
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                assignment.uuid.to_string(),
                assignment.course_uuid.to_string(),
                assignment.category_uuid.to_string(),
                assignment.title.as_str(),
                assignment.max_points,
                assignment.earned_points,
            ],
        )?;

        self.get_assignment(assignment.uuid)?
            .ok_or(RepoError::NotFound(NotFoundError::Assignment(assignment.uuid)))
    }

    fn get_assignment(&self, id: AssignmentId) -> RepoResult<Option<Assignment>> {
        Ok(self
            .query_assignments(
                &format!("{ASSIGNMENT_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
            )?
            .into_iter()
            .next())
    }

    fn find_assignments_by_title(
        &self,
        course: CourseId,
        title: &str,
    ) -> RepoResult<Vec<Assignment>> {
        self.query_assignments(
            &format!(
                "{ASSIGNMENT_SELECT_SQL}
                 WHERE course_uuid = ?1 AND title = ?2
                 ORDER BY created_at DESC, uuid ASC;"
            ),
            params![course.to_string(), title.trim()],
        )
    }

    fn update_assignment(&self, assignment: &Assignment) -> RepoResult<()> {
        assignment.validate()?;

        let changed = self.conn.execute(
            "UPDATE assignments
             SET
                category_uuid = ?2,
                title = ?3,
                max_points = ?4,
                earned_points = ?5,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![
                assignment.uuid.to_string(),
                assignment.category_uuid.to_string(),
                assignment.title.as_str(),
                assignment.max_points,
                assignment.earned_points,
            ],
        )?;

        if changed == 0 {
            return Err(NotFoundError::Assignment(assignment.uuid).into());
        }
        Ok(())
    }

    fn delete_assignment(&self, id: AssignmentId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM assignments WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(NotFoundError::Assignment(id).into());
        }
        Ok(())
    }

    fn list_course_assignments(&self, course: CourseId) -> RepoResult<Vec<Assignment>> {
        self.query_assignments(
            &format!(
                "{ASSIGNMENT_SELECT_SQL}
                 WHERE course_uuid = ?1
                 ORDER BY created_at DESC, uuid ASC;"
            ),
            [course.to_string()],
        )
    }
}

pub(crate) fn parse_assignment_row(row: &Row<'_>) -> RepoResult<Assignment> {
    let uuid_text: String = row.get("uuid")?;
    let course_text: String = row.get("course_uuid")?;
    let category_text: String = row.get("category_uuid")?;

    let assignment = Assignment {
        uuid: parse_uuid(&uuid_text, "assignments.uuid")?,
        course_uuid: parse_uuid(&course_text, "assignments.course_uuid")?,
        category_uuid: parse_uuid(&category_text, "assignments.category_uuid")?,
        title: row.get("title")?,
        max_points: row.get("max_points")?,
        earned_points: row.get("earned_points")?,
        created_at: row.get("created_at")?,
    };
    assignment.validate().map_err(|err| {
        RepoError::InvalidData(format!(
            "assignment {} failed validation: {err}",
            assignment.uuid
        ))
    })?;
    Ok(assignment)
}
