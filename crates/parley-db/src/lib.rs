//! Database layer for the Parley backend.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! embedded SQL migrations, and runtime tunables. Every table in Parley is
//! created through versioned migrations managed by this crate, including the
//! seeded default AI roles.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: a single-server chat backend needs concurrent
//!   readers with one writer, which is exactly WAL's model. No external
//!   database process required.
//! - **`r2d2` connection pool**: bounded connection reuse without manual
//!   lifetime management.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!`, ensuring migrations ship with the server and cannot
//!   drift from the code that depends on them.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
