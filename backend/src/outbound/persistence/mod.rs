//! PostgreSQL persistence adapters using Diesel.
//!
//! One generic adapter, [`DieselRepository`], implements the repository
//! port for every entity with a row mapping. Statements are rendered from
//! compiled query plans (`sql.rs`) and executed through `diesel-async` on a
//! `bb8` pool. Row structs (`models.rs`) and table definitions
//! (`schema.rs`) stay private to this module.
//!
//! # Example
//!
//! ```ignore
//! use storefront::outbound::persistence::{DbPool, DieselRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/storefront")).await?;
//! let products: DieselRepository<Product> = DieselRepository::new(pool, clock);
//! ```

mod diesel_repository;
mod error_mapping;
mod migrations;
mod models;
mod pool;
mod schema;
mod sql;

pub use diesel_repository::{DieselRepository, PgEntity, PgScope};
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
