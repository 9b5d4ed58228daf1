//! Common library for HoneyBEE
//!
//! This crate provides the pieces shared by the auth, analytics and API
//! crates: database and Redis connectivity, the typed records for every table
//! HoneyBEE touches, and the record store through which all of them are read
//! and written.
//!
//! ```rust,no_run
//! use common::database::{DatabaseConfig, init_pool, health_check};
//! use common::{PgRecordStore, RecordStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env()?;
//!     let pool = init_pool(&config).await?;
//!     println!("Database health check: {}", health_check(&pool).await?);
//!
//!     let store = PgRecordStore::new(pool);
//!     println!("{} companies", store.list_companies().await?.len());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod database;
pub mod error;
pub mod models;
pub mod repositories;

pub use repositories::{InMemoryRecordStore, PgRecordStore, RecordStore};
