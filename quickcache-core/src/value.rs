//! Dynamic argument values.
//!
//! Memoized functions receive their arguments as [`Value`]s so that key
//! derivation can branch over a closed set of kinds instead of inspecting
//! arbitrary runtime types.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::num::TryFromIntError;
use uuid::Uuid;

/// A call argument.
///
/// Every variant except [`Value::Object`] and [`Value::Opaque`] has a key
/// encoding. Those two can still be passed to a memoized function and
/// walked with an attribute path, but encoding them directly is an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    /// Entries in construction order; encoding is order-independent and the
    /// last entry wins for a repeated key.
    Map(Vec<(Value, Value)>),
    /// Members in construction order; encoding is order-independent and
    /// ignores repeated members.
    Set(Vec<Value>),
    Uuid(Uuid),
    /// Date-time without timezone information.
    NaiveDateTime(NaiveDateTime),
    /// Timezone-aware date-time.
    DateTime(DateTime<FixedOffset>),
    /// Structured value exposing named attributes.
    Object(Record),
    /// Anything else, kept only for diagnostics.
    Opaque { type_name: String, repr: String },
}

impl Value {
    /// Build a list from anything convertible to values.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Build a map from key/value pairs.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Value>,
        V: Into<Value>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a set from members.
    pub fn set<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Self::Set(items.into_iter().map(Into::into).collect())
    }

    /// Build a byte string.
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// Build a value that has no key encoding.
    pub fn opaque(type_name: impl Into<String>, repr: impl Into<String>) -> Self {
        Self::Opaque {
            type_name: type_name.into(),
            repr: repr.into(),
        }
    }

    /// Name of the value's kind, used in diagnostics.
    pub fn type_name(&self) -> &str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Set(_) => "set",
            Self::Uuid(_) => "uuid",
            Self::NaiveDateTime(_) => "naive_datetime",
            Self::DateTime(_) => "datetime",
            Self::Object(record) => record.type_name(),
            Self::Opaque { type_name, .. } => type_name,
        }
    }

    /// Truthiness used when a parameter controls cache skipping.
    ///
    /// Empty, zero and absent values are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(n) => *n != 0,
            Self::Float(f) => *f != 0.0,
            Self::Text(s) => !s.is_empty(),
            Self::Bytes(b) => !b.is_empty(),
            Self::List(items) | Self::Set(items) => !items.is_empty(),
            Self::Map(entries) => !entries.is_empty(),
            Self::Uuid(_)
            | Self::NaiveDateTime(_)
            | Self::DateTime(_)
            | Self::Object(_)
            | Self::Opaque { .. } => true,
        }
    }

    /// Look up a named attribute. Only [`Value::Object`] has attributes.
    pub fn attr(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Object(record) => record.get(name),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(n) => write!(f, "{}", n),
            Self::Float(x) => write!(f, "{:?}", x),
            Self::Text(s) => write!(f, "{:?}", s),
            Self::Bytes(b) => write!(f, "b\"{}\"", b.escape_ascii()),
            Self::List(items) => {
                write!(f, "[")?;
                write_joined(f, items.iter())?;
                write!(f, "]")
            }
            Self::Set(items) => {
                write!(f, "{{")?;
                write_joined(f, items.iter())?;
                write!(f, "}}")
            }
            Self::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Self::Uuid(id) => write!(f, "{}", id),
            Self::NaiveDateTime(dt) => write!(f, "{}", dt),
            Self::DateTime(dt) => write!(f, "{}", dt),
            Self::Object(record) => write!(f, "{}", record),
            Self::Opaque { repr, .. } => write!(f, "{}", repr),
        }
    }
}

fn write_joined<'a>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = &'a Value>,
) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// A named bag of attributes, standing in for a struct or object argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    type_name: String,
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Add or replace a field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{ ", self.type_name)?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        write!(f, " }}")
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Self::Object(record)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Self::Int(i64::from(n))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! impl_try_from_int {
    ($($t:ty),*) => {
        $(
            impl TryFrom<$t> for Value {
                type Error = TryFromIntError;

                /// Fails for values above `i64::MAX`.
                fn try_from(n: $t) -> Result<Self, Self::Error> {
                    i64::try_from(n).map(Self::Int)
                }
            }
        )*
    };
}

impl_try_from_int!(u64, usize);

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Self::Float(f64::from(x))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Self::Bytes(b.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<Uuid> for Value {
    fn from(id: Uuid) -> Self {
        Self::Uuid(id)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Self::NaiveDateTime(dt)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Self::DateTime(dt)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt.into())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}

impl<K: Into<Value>, V: Into<Value>> From<HashMap<K, V>> for Value {
    fn from(map: HashMap<K, V>) -> Self {
        Self::map(map)
    }
}

impl<K: Into<Value>, V: Into<Value>> From<BTreeMap<K, V>> for Value {
    fn from(map: BTreeMap<K, V>) -> Self {
        Self::map(map)
    }
}

impl<T: Into<Value>> From<HashSet<T>> for Value {
    fn from(set: HashSet<T>) -> Self {
        Self::set(set)
    }
}

impl<T: Into<Value>> From<BTreeSet<T>> for Value {
    fn from(set: BTreeSet<T>) -> Self {
        Self::set(set)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::None.is_truthy());
        assert!(!Value::from(false).is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::from(0.0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(!Value::Map(vec![]).is_truthy());

        assert!(Value::from(true).is_truthy());
        assert!(Value::from(-1).is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(Value::from(Uuid::nil()).is_truthy());
        assert!(Value::from(Record::new("Item")).is_truthy());
    }

    #[test]
    fn test_attr_only_on_objects() {
        let item = Value::from(Record::new("Item").field("id", 1).field("name", "james"));
        assert_eq!(item.attr("id"), Some(&Value::Int(1)));
        assert_eq!(item.attr("missing"), None);
        assert_eq!(Value::from("id").attr("id"), None);
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i32>), Value::None);
        assert_eq!(Value::from(Some("a")), Value::Text("a".to_string()));
    }

    #[test]
    fn test_unsigned_conversions() {
        assert_eq!(Value::from(255u8), Value::Int(255));
        assert_eq!(Value::try_from(42u64), Ok(Value::Int(42)));
        assert_eq!(Value::try_from(7usize), Ok(Value::Int(7)));
        assert!(Value::try_from(u64::MAX).is_err());
        // Byte vectors stay byte strings; typed vectors go through `list`.
        assert_eq!(Value::from(vec![1u8, 2]), Value::Bytes(vec![1, 2]));
        assert_eq!(Value::list([1u8, 2]), Value::List(vec![Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn test_display_record() {
        let item = Record::new("Item").field("id", 1).field("name", "james");
        assert_eq!(item.to_string(), "Item { id: 1, name: \"james\" }");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::from(1.5).type_name(), "float");
        assert_eq!(Value::opaque("Socket", "<socket>").type_name(), "Socket");
        assert_eq!(Value::from(Record::new("Item")).type_name(), "Item");
    }
}
