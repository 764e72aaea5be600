//! Category storage collaborator consumed by the weight allocator and the
//! grade calculator.
//!
//! # Responsibility
//! - Provide the fetch/upsert/delete/reassign primitives the engine needs.
//! - Expose one transaction boundary for multi-step weight mutations.
//!
//! # Invariants
//! - Category listing order is deterministic: regular rows by
//!   `sort_order ASC, name ASC`, then Unallocated, Unassigned, holding.
//! - Deleting a category that still owns assignments fails (foreign key).
//! - Category names are unique per course, case-insensitively.

use super::assignment_repo::{parse_assignment_row, ASSIGNMENT_SELECT_SQL};
use super::schema::{ensure_connection_ready, map_unique_violation, parse_uuid};
use super::{NotFoundError, RepoError, RepoResult};
use crate::model::assignment::Assignment;
use crate::model::category::{Category, CategoryId, CategoryKind};
use crate::model::course::CourseId;
use crate::model::validation::ValidationError;
use log::debug;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const CATEGORY_SELECT_SQL: &str = "SELECT
    uuid,
    course_uuid,
    name,
    kind,
    weight,
    sort_order
FROM categories";

const CATEGORY_ORDER_SQL: &str = "ORDER BY
    CASE kind
        WHEN 'regular' THEN 0
        WHEN 'unallocated' THEN 1
        WHEN 'unassigned' THEN 2
        ELSE 3
    END,
    sort_order ASC,
    name ASC";

/// Storage primitives for category weights and assignment placement.
pub trait CategoryRepository {
    /// Runs `f` inside one all-or-nothing transaction.
    ///
    /// Commits when `f` returns `Ok`; rolls back every statement `f` issued
    /// when it returns `Err`.
    fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        Self: Sized,
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RepoError>;

    /// Whether the course row exists.
    fn course_exists(&self, course: CourseId) -> RepoResult<bool>;
    /// Ids of every course, for batch repair.
    fn list_course_ids(&self) -> RepoResult<Vec<CourseId>>;
    /// All categories of a course in listing order.
    fn fetch_categories(&self, course: CourseId) -> RepoResult<Vec<Category>>;
    fn get_category(&self, id: CategoryId) -> RepoResult<Option<Category>>;
    /// Case-insensitive name lookup within one course.
    fn find_category_by_name(&self, course: CourseId, name: &str)
        -> RepoResult<Option<Category>>;
    /// The course's row of a synthetic kind, if present.
    fn find_synthetic(&self, course: CourseId, kind: CategoryKind)
        -> RepoResult<Option<Category>>;
    /// Next free `sort_order` among the course's regular categories.
    fn next_sort_order(&self, course: CourseId) -> RepoResult<i64>;
    /// Inserts the category or updates name/weight/order of an existing id.
    fn upsert_category(&self, category: &Category) -> RepoResult<()>;
    fn delete_category(&self, id: CategoryId) -> RepoResult<()>;
    /// Moves every assignment of `from` into `to`; returns moved count.
    fn reassign_assignments(&self, from: CategoryId, to: CategoryId) -> RepoResult<usize>;
    /// Deletes every assignment of a category; returns deleted count.
    fn delete_assignments_in(&self, category: CategoryId) -> RepoResult<usize>;
    fn fetch_assignments(&self, category: CategoryId) -> RepoResult<Vec<Assignment>>;
}

/// SQLite-backed category repository.
pub struct SqliteCategoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCategoryRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "categories")?;
        Ok(Self { conn })
    }

    fn query_categories(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> RepoResult<Vec<Category>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next()? {
            categories.push(parse_category_row(row)?);
        }
        Ok(categories)
    }

    fn query_one_category(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> RepoResult<Option<Category>> {
        Ok(self.query_categories(sql, params)?.into_iter().next())
    }
}

impl CategoryRepository for SqliteCategoryRepository<'_> {
    fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        Self: Sized,
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RepoError>,
    {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;
        match f(self) {
            Ok(value) => {
                tx.commit().map_err(RepoError::from)?;
                Ok(value)
            }
            Err(err) => {
                debug!("event=tx_rollback module=repo status=ok");
                drop(tx);
                Err(err)
            }
        }
    }

    fn course_exists(&self, course: CourseId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM courses WHERE uuid = ?1);",
            [course.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn list_course_ids(&self) -> RepoResult<Vec<CourseId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT uuid FROM courses ORDER BY term DESC, code ASC;")?;
        let mut rows = stmt.query([])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            ids.push(parse_uuid(&value, "courses.uuid")?);
        }
        Ok(ids)
    }

    fn fetch_categories(&self, course: CourseId) -> RepoResult<Vec<Category>> {
        self.query_categories(
            &format!("{CATEGORY_SELECT_SQL} WHERE course_uuid = ?1 {CATEGORY_ORDER_SQL};"),
            [course.to_string()],
        )
    }

    fn get_category(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        self.query_one_category(
            &format!("{CATEGORY_SELECT_SQL} WHERE uuid = ?1;"),
            [id.to_string()],
        )
    }

    fn find_category_by_name(
        &self,
        course: CourseId,
        name: &str,
    ) -> RepoResult<Option<Category>> {
        // `name` is declared COLLATE NOCASE, so `=` is case-insensitive.
        self.query_one_category(
            &format!("{CATEGORY_SELECT_SQL} WHERE course_uuid = ?1 AND name = ?2;"),
            params![course.to_string(), name.trim()],
        )
    }

    fn find_synthetic(
        &self,
        course: CourseId,
        kind: CategoryKind,
    ) -> RepoResult<Option<Category>> {
        self.query_one_category(
            &format!("{CATEGORY_SELECT_SQL} WHERE course_uuid = ?1 AND kind = ?2;"),
            params![course.to_string(), category_kind_to_db(kind)],
        )
    }

    fn next_sort_order(&self, course: CourseId) -> RepoResult<i64> {
        let next = self.conn.query_row(
            "SELECT COALESCE(MAX(sort_order), -1) + 1
             FROM categories
             WHERE course_uuid = ?1
               AND kind = 'regular';",
            [course.to_string()],
            |row| row.get(0),
        )?;
        Ok(next)
    }

    fn upsert_category(&self, category: &Category) -> RepoResult<()> {
        category.validate()?;

        self.conn
            .execute(
                "INSERT INTO categories (uuid, course_uuid, name, kind, weight, sort_order)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(uuid) DO UPDATE SET
                    name = excluded.name,
                    weight = excluded.weight,
                    sort_order = excluded.sort_order,
                    updated_at = (strftime('%s', 'now') * 1000);",
                params![
                    category.uuid.to_string(),
                    category.course_uuid.to_string(),
                    category.name.as_str(),
                    category_kind_to_db(category.kind),
                    category.weight,
                    category.sort_order,
                ],
            )
            .map_err(|err| {
                map_unique_violation(err, || {
                    RepoError::Validation(ValidationError::DuplicateCategoryName(
                        category.name.clone(),
                    ))
                })
            })?;
        Ok(())
    }

    fn delete_category(&self, id: CategoryId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM categories WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(NotFoundError::Category(id).into());
        }
        Ok(())
    }

    fn reassign_assignments(&self, from: CategoryId, to: CategoryId) -> RepoResult<usize> {
        let moved = self.conn.execute(
            "UPDATE assignments
             SET category_uuid = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE category_uuid = ?1;",
            params![from.to_string(), to.to_string()],
        )?;
        Ok(moved)
    }

    fn delete_assignments_in(&self, category: CategoryId) -> RepoResult<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM assignments WHERE category_uuid = ?1;",
            [category.to_string()],
        )?;
        Ok(deleted)
    }

    fn fetch_assignments(&self, category: CategoryId) -> RepoResult<Vec<Assignment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ASSIGNMENT_SELECT_SQL}
             WHERE category_uuid = ?1
             ORDER BY created_at ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([category.to_string()])?;
        let mut assignments = Vec::new();
        while let Some(row) = rows.next()? {
            assignments.push(parse_assignment_row(row)?);
        }
        Ok(assignments)
    }
}

fn parse_category_row(row: &Row<'_>) -> RepoResult<Category> {
    let uuid_text: String = row.get("uuid")?;
    let course_text: String = row.get("course_uuid")?;
    let kind_text: String = row.get("kind")?;
    let kind = parse_category_kind(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid category kind `{kind_text}` in categories.kind"))
    })?;

    let category = Category {
        uuid: parse_uuid(&uuid_text, "categories.uuid")?,
        course_uuid: parse_uuid(&course_text, "categories.course_uuid")?,
        name: row.get("name")?,
        kind,
        weight: row.get("weight")?,
        sort_order: row.get("sort_order")?,
    };
    category.validate().map_err(|err| {
        RepoError::InvalidData(format!("category {} failed validation: {err}", category.uuid))
    })?;
    Ok(category)
}

fn category_kind_to_db(kind: CategoryKind) -> &'static str {
    match kind {
        CategoryKind::Regular => "regular",
        CategoryKind::Unallocated => "unallocated",
        CategoryKind::Unassigned => "unassigned",
        CategoryKind::Holding => "holding",
    }
}

fn parse_category_kind(value: &str) -> Option<CategoryKind> {
    match value {
        "regular" => Some(CategoryKind::Regular),
        "unallocated" => Some(CategoryKind::Unallocated),
        "unassigned" => Some(CategoryKind::Unassigned),
        "holding" => Some(CategoryKind::Holding),
        _ => None,
    }
}
