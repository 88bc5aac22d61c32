//! Database access layer.
//!
//! - Pool construction with trace sink and post-connect hook wiring
//! - Per-connection codec registry

pub mod pool;
pub mod types;

pub use pool::PgDb;
pub use types::{
    AfterConnectHook, Codec, ConnectionTypes, NUMERIC_CODEC, TypeMap, TypeMapError, UUID_CODEC,
    register_types,
};
