//! Infrastructure layer - database, redis and migrations.

mod cache;
mod db;
pub mod migrations;

pub use cache::{session_key, user_sessions_key, Cache};
pub use db::Database;
pub use migrations::Migrator;
