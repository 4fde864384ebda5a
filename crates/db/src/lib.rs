//! PostgreSQL storage backend for PayVault.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for the ledger tables
//! - Database migrations
//! - [`SqlStore`], the PostgreSQL implementation of the core storage traits
//!   (row locks via `SELECT ... FOR UPDATE`, bounded waits via
//!   `SET LOCAL lock_timeout`, idempotence via unique indexes)

pub mod entities;
pub mod migration;
pub mod store;

pub use store::{SqlStore, SqlTxn};

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection pool to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url.to_string());
    options.max_connections(max_connections);
    Database::connect(options).await
}
