//! Per-connection type registry.
//!
//! sqlx resolves codecs statically through its `Type`/`Encode`/`Decode` impls; the
//! `uuid` and `rust_decimal` features supply the ones for UUID and NUMERIC. A
//! [`TypeMap`] records which extension codecs a connection was set up with, keyed
//! by PostgreSQL OID. Each registered codec is checked against the server's
//! `pg_type` catalog before the connection is handed out, and the pool keeps the
//! outcome in [`ConnectionTypes`].

use rust_decimal::Decimal;
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::{Type, TypeInfo};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use uuid::Uuid;

/// Descriptor of one value codec.
#[derive(Clone, Copy)]
pub struct Codec {
    name: &'static str,
    oid: u32,
    array_oid: u32,
    rust_type: &'static str,
    type_info: fn() -> PgTypeInfo,
}

impl Codec {
    pub const fn new(
        name: &'static str,
        oid: u32,
        array_oid: u32,
        rust_type: &'static str,
        type_info: fn() -> PgTypeInfo,
    ) -> Self {
        Self {
            name,
            oid,
            array_oid,
            rust_type,
            type_info,
        }
    }

    /// PostgreSQL type name, lowercase.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn oid(&self) -> u32 {
        self.oid
    }

    pub fn array_oid(&self) -> u32 {
        self.array_oid
    }

    pub fn rust_type(&self) -> &'static str {
        self.rust_type
    }

    /// Driver type info of the Rust type backing this codec.
    pub fn type_info(&self) -> PgTypeInfo {
        (self.type_info)()
    }

    /// Compare with the server's `(oid, array_oid)` for this type name.
    ///
    /// `None` means the server does not know the type.
    pub fn check_catalog(&self, entry: Option<(u32, u32)>) -> Result<(), TypeMapError> {
        match entry {
            Some((oid, array_oid)) if oid == self.oid && array_oid == self.array_oid => Ok(()),
            found => Err(TypeMapError::CatalogMismatch {
                name: self.name,
                expected: (self.oid, self.array_oid),
                found,
            }),
        }
    }
}

impl PartialEq for Codec {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.oid == other.oid
            && self.array_oid == other.array_oid
            && self.rust_type == other.rust_type
    }
}

impl Eq for Codec {}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("name", &self.name)
            .field("oid", &self.oid)
            .field("array_oid", &self.array_oid)
            .field("rust_type", &self.rust_type)
            .finish()
    }
}

pub const UUID_CODEC: Codec = Codec::new(
    "uuid",
    2950,
    2951,
    "uuid::Uuid",
    <Uuid as Type<Postgres>>::type_info,
);

pub const NUMERIC_CODEC: Codec = Codec::new(
    "numeric",
    1700,
    1231,
    "rust_decimal::Decimal",
    <Decimal as Type<Postgres>>::type_info,
);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeMapError {
    #[error("OID {oid} is already registered to {existing}, cannot register {requested}")]
    OidConflict {
        oid: u32,
        existing: &'static str,
        requested: &'static str,
    },

    #[error("type name '{name}' is already registered with OID {existing_oid}")]
    NameConflict { name: &'static str, existing_oid: u32 },

    #[error("server catalog has {found:?} for '{name}', codec expects {expected:?}")]
    CatalogMismatch {
        name: &'static str,
        expected: (u32, u32),
        found: Option<(u32, u32)>,
    },
}

/// Registry of codecs available on one connection.
#[derive(Debug, Clone, Default)]
pub struct TypeMap {
    by_oid: HashMap<u32, Codec>,
    oid_by_name: HashMap<&'static str, u32>,
}

impl TypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a codec.
    ///
    /// Registering an identical codec again is a no-op. A different codec for an
    /// OID or name already present is rejected and leaves the map unchanged.
    pub fn register(&mut self, codec: Codec) -> Result<(), TypeMapError> {
        if let Some(existing) = self.by_oid.get(&codec.oid) {
            if *existing == codec {
                return Ok(());
            }
            return Err(TypeMapError::OidConflict {
                oid: codec.oid,
                existing: existing.rust_type,
                requested: codec.rust_type,
            });
        }

        if let Some(&existing_oid) = self.oid_by_name.get(codec.name) {
            return Err(TypeMapError::NameConflict {
                name: codec.name,
                existing_oid,
            });
        }

        self.by_oid.insert(codec.oid, codec);
        self.oid_by_name.insert(codec.name, codec.oid);
        Ok(())
    }

    /// Registered codecs in OID order.
    pub fn codecs(&self) -> Vec<Codec> {
        let mut codecs: Vec<Codec> = self.by_oid.values().copied().collect();
        codecs.sort_unstable_by_key(|c| c.oid);
        codecs
    }

    pub fn get_by_oid(&self, oid: u32) -> Option<&Codec> {
        self.by_oid.get(&oid)
    }

    /// Look up a codec by type name, ignoring ASCII case.
    pub fn get_by_name(&self, name: &str) -> Option<&Codec> {
        let lower = name.to_ascii_lowercase();
        self.oid_by_name
            .get(lower.as_str())
            .and_then(|oid| self.by_oid.get(oid))
    }

    /// Check whether values of `T` are covered by a registered codec.
    pub fn supports<T: Type<Postgres>>(&self) -> bool {
        self.get_by_name(T::type_info().name()).is_some()
    }

    /// Registered type names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.oid_by_name.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.by_oid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_oid.is_empty()
    }
}

/// Registrations made on the connections of one pool.
#[derive(Debug, Default)]
pub struct ConnectionTypes {
    prepared: AtomicU64,
    last: Mutex<TypeMap>,
}

impl ConnectionTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of connections that passed registration.
    pub fn prepared(&self) -> u64 {
        self.prepared.load(Ordering::Acquire)
    }

    /// Type map of the most recently prepared connection.
    pub fn last(&self) -> TypeMap {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn record(&self, types: TypeMap) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = types;
        self.prepared.fetch_add(1, Ordering::AcqRel);
    }
}

/// Post-connect callback run against the type map of each new connection.
pub type AfterConnectHook = fn(&mut TypeMap) -> Result<(), TypeMapError>;

/// Register the UUID and NUMERIC codecs.
pub fn register_types(types: &mut TypeMap) -> Result<(), TypeMapError> {
    types.register(UUID_CODEC)?;
    types.register(NUMERIC_CODEC)?;
    Ok(())
}
