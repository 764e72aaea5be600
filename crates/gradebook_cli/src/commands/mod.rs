//! Command handler layer.
//!
//! ## Files
//! - `course.rs`: course add/list/show/remove.
//! - `category.rs`: category set/add/edit/remove/normalize/list.
//! - `assignment.rs`: assignment add/edit/move/remove.
//! - `report.rs`: grade, stats, summary, audit, normalize-all, export.
//!
//! ## Principles
//! - Resolve user-facing names (course code, category name, title) here.
//! - Delegate every rule to `gradebook_core` services.

pub mod assignment;
pub mod category;
pub mod course;
pub mod report;

use crate::cli::{Commands, CourseRef};
use anyhow::bail;
use gradebook_core::db::Connection;
use gradebook_core::{
    AssignmentService, Course, CourseService, FreedWeightPolicy, GradeCalculator,
    SqliteAssignmentRepository, SqliteCategoryRepository, SqliteCourseRepository,
    WeightAllocator,
};

/// One invocation's connection and output settings.
pub struct Session {
    conn: Connection,
    pub json: bool,
    freed_weight: FreedWeightPolicy,
}

impl Session {
    pub fn new(conn: Connection, json: bool, freed_weight: FreedWeightPolicy) -> Self {
        Self {
            conn,
            json,
            freed_weight,
        }
    }

    pub fn courses(&self) -> anyhow::Result<CourseService<SqliteCourseRepository<'_>>> {
        Ok(CourseService::new(SqliteCourseRepository::try_new(
            &self.conn,
        )?))
    }

    pub fn allocator(&self) -> anyhow::Result<WeightAllocator<SqliteCategoryRepository<'_>>> {
        Ok(WeightAllocator::with_policy(
            SqliteCategoryRepository::try_new(&self.conn)?,
            self.freed_weight,
        ))
    }

    pub fn assignments(
        &self,
    ) -> anyhow::Result<
        AssignmentService<SqliteAssignmentRepository<'_>, SqliteCategoryRepository<'_>>,
    > {
        Ok(AssignmentService::new(
            SqliteAssignmentRepository::try_new(&self.conn)?,
            SqliteCategoryRepository::try_new(&self.conn)?,
        ))
    }

    pub fn calculator(&self) -> anyhow::Result<GradeCalculator<SqliteCategoryRepository<'_>>> {
        Ok(GradeCalculator::new(SqliteCategoryRepository::try_new(
            &self.conn,
        )?))
    }

    pub fn resolve_course(&self, course: &CourseRef) -> anyhow::Result<Course> {
        Ok(self
            .courses()?
            .find_course(&course.code, course.term.as_deref())?)
    }
}

pub fn dispatch(session: &Session, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Course { command } => course::handle(session, command),
        Commands::Category { command } => category::handle(session, command),
        Commands::Assignment { command } => assignment::handle(session, command),
        Commands::Grade { course } => report::grade(session, &course),
        Commands::Stats { course } => report::stats(session, &course),
        Commands::NormalizeAll => report::normalize_all(session),
        Commands::Audit => report::audit(session),
        Commands::Summary { term } => report::summary(session, term.as_deref()),
        Commands::Export {
            all: Some(dir),
            format,
            ..
        } => report::export_all(session, format, &dir),
        Commands::Export {
            code: Some(code),
            term,
            format,
            output,
            ..
        } => report::export(session, &CourseRef { code, term }, format, output),
        Commands::Export { .. } => bail!("export needs a course code or --all <DIR>"),
    }
}

/// Stable command name for log events.
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Course { .. } => "course",
        Commands::Category { .. } => "category",
        Commands::Assignment { .. } => "assignment",
        Commands::Grade { .. } => "grade",
        Commands::Stats { .. } => "stats",
        Commands::Summary { .. } => "summary",
        Commands::NormalizeAll => "normalize_all",
        Commands::Audit => "audit",
        Commands::Export { .. } => "export",
    }
}
