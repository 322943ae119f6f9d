//! [`CodecRegistry`]: type id → codec factory, plus a cache of built codecs.
//!
//! The factory map is read on every lookup and replaced rarely, so it lives in
//! an [`ArcSwap`] for lock-free reads. Registering a factory swaps in a new map
//! and clears the codec cache so stale instances are not served.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use common::{Error, Result, TypeSpec, Value};
use tracing::debug;

use crate::cache::BoundedCache;
use crate::codec::{temporal, CharKind, Codec, IntegerWidth, MoneyKind};

/// Builds a codec from a type selector.
pub type CodecFactory = Arc<dyn Fn(&TypeSpec) -> Result<Codec> + Send + Sync>;

fn factory(build: fn(&TypeSpec) -> Result<Codec>) -> CodecFactory {
    Arc::new(build)
}

/// Built-in type ids and their factories.
fn builtin_factories() -> HashMap<String, CodecFactory> {
    let entries: [(&str, CodecFactory); 24] = [
        ("bit", factory(|_| Ok(Codec::Integer(IntegerWidth::Bit)))),
        ("tinyint", factory(|_| Ok(Codec::Integer(IntegerWidth::TinyInt)))),
        ("smallint", factory(|_| Ok(Codec::Integer(IntegerWidth::SmallInt)))),
        ("int", factory(|_| Ok(Codec::Integer(IntegerWidth::Int)))),
        ("bigint", factory(|_| Ok(Codec::Integer(IntegerWidth::BigInt)))),
        ("real", factory(|_| Ok(Codec::Real))),
        ("float", factory(|_| Ok(Codec::Float))),
        ("decimal", factory(Codec::decimal)),
        ("numeric", factory(Codec::decimal)),
        ("money", factory(|_| Ok(Codec::Money(MoneyKind::Money)))),
        ("smallmoney", factory(|_| Ok(Codec::Money(MoneyKind::SmallMoney)))),
        ("uniqueidentifier", factory(|_| Ok(Codec::Guid))),
        ("date", factory(|_| Ok(Codec::Date))),
        ("time", factory(Codec::time)),
        ("datetime2", factory(Codec::datetime2)),
        ("datetimeoffset", factory(Codec::datetimeoffset)),
        ("datetime", factory(|_| Ok(Codec::DateTime))),
        ("smalldatetime", factory(|_| Ok(Codec::SmallDateTime))),
        ("char", factory(|s| Codec::char(CharKind::Char, s))),
        ("varchar", factory(|s| Codec::char(CharKind::VarChar, s))),
        ("nchar", factory(|s| Codec::char(CharKind::NChar, s))),
        ("nvarchar", factory(|s| Codec::char(CharKind::NVarChar, s))),
        ("binary", factory(|s| Codec::binary(true, s))),
        ("varbinary", factory(|s| Codec::binary(false, s))),
    ];
    entries
        .into_iter()
        .map(|(id, factory)| (id.to_owned(), factory))
        .collect()
}

/// Resolves [`TypeSpec`]s to shared [`Codec`] instances.
#[derive(Clone)]
pub struct CodecRegistry {
    factories: Arc<ArcSwap<HashMap<String, CodecFactory>>>,
    codecs: BoundedCache<TypeSpec, Arc<Codec>>,
}

impl CodecRegistry {
    /// A registry with every built-in type, caching up to `capacity` codecs.
    pub fn new(capacity: usize) -> Self {
        Self {
            factories: Arc::new(ArcSwap::from_pointee(builtin_factories())),
            codecs: BoundedCache::new(capacity),
        }
    }

    /// Add or replace the factory for `type_id` (case-insensitive).
    pub fn register<F>(&self, type_id: &str, factory: F)
    where
        F: Fn(&TypeSpec) -> Result<Codec> + Send + Sync + 'static,
    {
        let type_id = type_id.to_ascii_lowercase();
        let factory: CodecFactory = Arc::new(factory);
        self.factories.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(type_id.clone(), Arc::clone(&factory));
            next
        });
        self.codecs.clear();
        debug!(type_id = %type_id, "registered codec factory");
    }

    /// Return the codec for `spec`, building and caching it on a miss.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedTypeConversion`] for an unknown type id.
    /// - Any construction error from the factory (bad size, precision, code page).
    /// - [`Error::InvalidPrecisionOrScale`] when a factory returns a codec with
    ///   out-of-range parameters; nothing is cached in that case.
    pub fn codec(&self, spec: &TypeSpec) -> Result<Arc<Codec>> {
        self.codecs.get_or_try_insert_with(spec.clone(), || {
            let factory = self
                .factories
                .load()
                .get(spec.type_id())
                .cloned()
                .ok_or_else(|| {
                    Error::UnsupportedTypeConversion(format!(
                        "no codec is registered for type '{}'",
                        spec.type_id()
                    ))
                })?;
            debug!(type_spec = %spec, "creating codec");
            let codec = factory(spec)?;
            codec.validate()?;
            Ok(Arc::new(codec))
        })
    }

    /// The type a value maps to when the caller names none.
    pub fn default_type_for(value: &Value) -> TypeSpec {
        match value {
            Value::Bool(_) => TypeSpec::new("bit"),
            Value::U8(_) => TypeSpec::new("tinyint"),
            Value::I16(_) => TypeSpec::new("smallint"),
            Value::I32(_) => TypeSpec::new("int"),
            Value::I64(_) => TypeSpec::new("bigint"),
            Value::F32(_) => TypeSpec::new("real"),
            Value::F64(_) => TypeSpec::new("float"),
            Value::Decimal(d) => TypeSpec::new("decimal").with_precision(38, d.scale()),
            Value::Guid(_) => TypeSpec::new("uniqueidentifier"),
            Value::Date(_) => TypeSpec::new("date"),
            Value::Time(_) => TypeSpec::new("time").with_scale(temporal::MAX_TIME_SCALE),
            Value::DateTime(_) => TypeSpec::new("datetime2").with_scale(temporal::MAX_TIME_SCALE),
            Value::DateTimeOffset(_) => {
                TypeSpec::new("datetimeoffset").with_scale(temporal::MAX_TIME_SCALE)
            }
            Value::String(_) => TypeSpec::new("nvarchar"),
            Value::Bytes(_) => TypeSpec::new("varbinary"),
        }
    }

    /// The codec for a value's default type.
    pub fn codec_for_value(&self, value: &Value) -> Result<Arc<Codec>> {
        self.codec(&Self::default_type_for(value))
    }

    /// Registered type ids, sorted.
    pub fn type_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.factories.load().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of cached codec instances.
    pub fn cached_codecs(&self) -> usize {
        self.codecs.len()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CACHE_CAPACITY)
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("type_ids", &self.type_ids())
            .field("cached_codecs", &self.codecs.len())
            .finish()
    }
}
