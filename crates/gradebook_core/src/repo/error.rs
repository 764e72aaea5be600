use crate::db::DbError;
use crate::model::assignment::AssignmentId;
use crate::model::category::CategoryId;
use crate::model::course::CourseId;
use crate::model::validation::ValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Referenced course, category or assignment does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    Course(CourseId),
    CourseCode { code: String, term: Option<String> },
    Category(CategoryId),
    CategoryName { course: CourseId, name: String },
    Assignment(AssignmentId),
    AssignmentTitle { course: CourseId, title: String },
}

impl Display for NotFoundError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Course(id) => write!(f, "course not found: {id}"),
            Self::CourseCode {
                code,
                term: Some(term),
            } => write!(f, "course '{code}' not found for term '{term}'"),
            Self::CourseCode { code, term: None } => write!(f, "course '{code}' not found"),
            Self::Category(id) => write!(f, "category not found: {id}"),
            Self::CategoryName { name, .. } => write!(f, "category '{name}' not found"),
            Self::Assignment(id) => write!(f, "assignment not found: {id}"),
            Self::AssignmentTitle { title, .. } => {
                write!(f, "assignment '{title}' not found")
            }
        }
    }
}

impl Error for NotFoundError {}

/// Error for gradebook persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound(NotFoundError),
    /// Persisted row cannot be turned into a valid model.
    InvalidData(String),
    /// Connection is not at the schema version this binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted gradebook data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "gradebook repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "gradebook repository requires table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(err) => Some(err),
            Self::InvalidData(_) => None,
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<NotFoundError> for RepoError {
    fn from(value: NotFoundError) -> Self {
        Self::NotFound(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
