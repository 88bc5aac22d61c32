//! pgdb library
//!
//! Builds a PostgreSQL connection pool from a URL, routes the driver's statement
//! traces into a structured stderr logger, and registers the UUID and NUMERIC
//! codecs on every new connection.

pub mod config;
pub mod db;
pub mod error;
pub mod trace;

pub use config::Config;
pub use db::PgDb;
pub use error::PgDbError;
