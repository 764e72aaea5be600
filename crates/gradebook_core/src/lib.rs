//! Gradebook engine: weighted categories, scored assignments, course grades.
//! This crate owns every weight and score invariant; callers only render.

pub mod config;
pub mod db;
pub mod error;
pub mod grade;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, GradebookConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use error::{GradebookError, GradebookResult};
pub use grade::distribution::{
    grade_distribution, score_summary, GradeDistribution, LetterBand, ScoreSummary,
};
pub use grade::report::{CategoryReport, CourseReport};
pub use grade::summary::{term_summaries, CourseSummary, TermSummary};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::assignment::{Assignment, AssignmentId};
pub use model::category::{Category, CategoryId, CategoryKind, SyntheticKind};
pub use model::course::{Course, CourseId};
pub use model::validation::ValidationError;
pub use repo::assignment_repo::{AssignmentRepository, SqliteAssignmentRepository};
pub use repo::category_repo::{CategoryRepository, SqliteCategoryRepository};
pub use repo::course_repo::{CourseRepository, SqliteCourseRepository};
pub use repo::{NotFoundError, RepoError, RepoResult};
pub use service::allocator::{
    FreedWeightPolicy, NormalizeOutcome, RemovedCategory, WeightAllocator,
};
pub use service::assignment_service::{AssignmentPatch, AssignmentService};
pub use service::course_service::CourseService;
pub use service::grade_calculator::{GradeCalculator, WeightAudit};

/// Returns the engine crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
