//! Repository layer: storage collaborator contracts and SQLite
//! implementations.
//!
//! # Responsibility
//! - Define the query/update primitives the engine consumes.
//! - Keep SQL details out of allocator and calculator code.
//!
//! # Invariants
//! - Write paths validate models before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Multi-step mutations run inside `CategoryRepository::with_transaction`.

pub mod assignment_repo;
pub mod category_repo;
pub mod course_repo;
mod error;
mod schema;

pub use error::{NotFoundError, RepoError, RepoResult};
