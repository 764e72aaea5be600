//! Engine-level typed failures.
//!
//! # Responsibility
//! - Give every engine operation one failure type callers can match on.
//! - Lift semantic repository errors (`NotFound`, `Validation`) to
//!   top-level variants so callers never dig through `Repo`.
//!
//! # Invariants
//! - `Repo` only carries transport/persistence failures after lifting.

use crate::model::validation::ValidationError;
use crate::repo::{NotFoundError, RepoError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type GradebookResult<T> = Result<T, GradebookError>;

/// Failure returned by allocator, calculator and use-case services.
#[derive(Debug)]
pub enum GradebookError {
    /// Input violates a structural invariant; nothing was mutated.
    Validation(ValidationError),
    /// Referenced course, category or assignment does not exist.
    NotFound(NotFoundError),
    /// A weight increase asks for more than Unallocated holds.
    InsufficientSlack { requested: f64, available: f64 },
    /// Zero or negative max-points divisor reached the calculator.
    Division { max_points: f64 },
    /// Storage-level failure.
    Repo(RepoError),
}

impl Display for GradebookError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(err) => write!(f, "{err}"),
            Self::InsufficientSlack {
                available,
                requested,
            } if *available <= 0.0 => write!(
                f,
                "no Unallocated weight available (needs {:.1}%)",
                requested * 100.0
            ),
            Self::InsufficientSlack {
                requested,
                available,
            } => write!(
                f,
                "not enough weight in Unallocated category (has {:.1}%, needs {:.1}%)",
                available * 100.0,
                requested * 100.0
            ),
            Self::Division { max_points } => write!(
                f,
                "cannot compute a percentage with max points {max_points}"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for GradebookError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::InsufficientSlack { .. } | Self::Division { .. } => None,
        }
    }
}

impl From<ValidationError> for GradebookError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<NotFoundError> for GradebookError {
    fn from(value: NotFoundError) -> Self {
        Self::NotFound(value)
    }
}

impl From<RepoError> for GradebookError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(err) => Self::NotFound(err),
            other => Self::Repo(other),
        }
    }
}
