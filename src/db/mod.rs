//! Persistence for users, assignments and submissions.
//!
//! Backed by libSQL: in-memory for tests, a local file for development, or a
//! remote Turso database with the `turso` feature.

pub mod traits;
pub mod turso;

pub use traits::{DatabaseProvider, UserLookup};
pub use turso::TursoClient;
