//! Persistence layer modules.

pub mod action_repo;
pub mod assessment_repo;
pub mod db;
pub mod schema;
pub mod workflow_repo;

/// Re-export the database pool type for convenience.
pub use sqlx::SqlitePool;
