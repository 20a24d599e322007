//! Deterministic key encoding for argument values.
//!
//! Every encoded value starts with a short discriminator so that values of
//! different kinds can never produce the same text:
//!
//! | Kind | Encoding |
//! |---|---|
//! | text, UTF-8 bytes | `u` + hash |
//! | bool | `b0` / `b1` |
//! | int, float | `n` + decimal form |
//! | list | `L` + hash of members in order |
//! | map | `D` + hash of sorted `[key, value]` entries, last entry wins per key |
//! | set | `S` + hash of sorted, distinct members |
//! | uuid | `U` + hyphenated form |
//! | date-time | `DT` + ISO-8601, aware values normalized to UTC |
//!
//! Sub-second digits are omitted when zero, six wide at microsecond
//! precision and nine wide when nanoseconds are set.
//! | none | `N` |

use chrono::{NaiveDateTime, Timelike, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::{KeyError, Value};

/// Serialized vary-on text longer than this is replaced by its hash.
pub const MAX_ARGS_LEN: usize = 150;

/// Default number of hex characters kept from a digest.
pub const DEFAULT_HASH_LENGTH: usize = 32;

/// Hook invoked with `(condition, message)` when encoding hits a suspicious
/// input. The non-UTF-8 byte string case calls it with `false`.
pub type EncodingAssert = Arc<dyn Fn(bool, &str) + Send + Sync>;

/// The default hook: log failed assertions and carry on.
pub fn default_encoding_assert() -> EncodingAssert {
    Arc::new(|condition: bool, message: &str| {
        if !condition {
            tracing::error!(assertion = message, "quickcache encoding assertion failed");
        }
    })
}

/// Last `length` hex characters of the MD5 digest of `text`.
pub fn hash_text(text: &str, length: usize) -> String {
    hash_bytes(text.as_bytes(), length)
}

/// Last `length` hex characters of the MD5 digest of `bytes`.
pub fn hash_bytes(bytes: &[u8], length: usize) -> String {
    let digest = format!("{:x}", md5::compute(bytes));
    let start = digest.len().saturating_sub(length);
    digest[start..].to_string()
}

/// Serializes values into cache-key fragments.
#[derive(Clone)]
pub struct KeyCodec {
    encoding_assert: EncodingAssert,
}

impl Default for KeyCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for KeyCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyCodec").finish_non_exhaustive()
    }
}

impl KeyCodec {
    pub fn new() -> Self {
        Self {
            encoding_assert: default_encoding_assert(),
        }
    }

    /// Use a custom hook for the non-UTF-8 bytes case.
    pub fn with_encoding_assert(encoding_assert: EncodingAssert) -> Self {
        Self { encoding_assert }
    }

    /// Encode a single value.
    pub fn serialize(&self, value: &Value) -> Result<String, KeyError> {
        match value {
            Value::Text(text) => Ok(format!("u{}", hash_text(text, DEFAULT_HASH_LENGTH))),
            // Text and its UTF-8 bytes are treated as the same argument.
            Value::Bytes(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => Ok(format!("u{}", hash_text(text, DEFAULT_HASH_LENGTH))),
                Err(_) => {
                    (self.encoding_assert)(false, "Non-utf8 encoded string used as cache vary on");
                    Ok(format!("u{}", hash_bytes(bytes, DEFAULT_HASH_LENGTH)))
                }
            },
            Value::Bool(b) => Ok(format!("b{}", u8::from(*b))),
            Value::Int(n) => Ok(format!("n{}", n)),
            Value::Float(x) => Ok(format!("n{:?}", x)),
            Value::List(items) => Ok(format!("L{}", self.hash_members(items.iter(), false)?)),
            Value::Map(entries) => {
                let mut by_key = BTreeMap::new();
                for (k, v) in entries {
                    by_key.insert(self.serialize(k)?, self.serialize_list([k, v].into_iter())?);
                }
                let mut parts: Vec<String> = by_key.into_values().collect();
                parts.sort();
                Ok(format!("D{}", hash_text(&parts.join(","), DEFAULT_HASH_LENGTH)))
            }
            Value::Set(items) => Ok(format!("S{}", self.hash_members(items.iter(), true)?)),
            Value::Uuid(id) => Ok(format!("U{}", id.hyphenated())),
            Value::NaiveDateTime(dt) => Ok(format!("DT{}", iso_format(dt))),
            Value::DateTime(dt) => Ok(format!(
                "DT{}+00:00",
                iso_format(&dt.with_timezone(&Utc).naive_utc())
            )),
            Value::None => Ok("N".to_string()),
            Value::Object(_) | Value::Opaque { .. } => Err(KeyError::UnsupportedType {
                type_name: value.type_name().to_string(),
                value: value.to_string(),
            }),
        }
    }

    /// Encode an ordered sequence of vary-on values into the argument part
    /// of a cache key, hashing it when it grows past [`MAX_ARGS_LEN`].
    pub fn serialize_args(&self, values: &[Value]) -> Result<String, KeyError> {
        let args = values
            .iter()
            .map(|v| self.serialize(v))
            .collect::<Result<Vec<_>, _>>()?
            .join(",");
        if args.len() > MAX_ARGS_LEN {
            Ok(format!("H{}", hash_text(&args, DEFAULT_HASH_LENGTH)))
        } else {
            Ok(args)
        }
    }

    fn serialize_list<'a>(&self, items: impl Iterator<Item = &'a Value>) -> Result<String, KeyError> {
        Ok(format!("L{}", self.hash_members(items, false)?))
    }

    fn hash_members<'a>(
        &self,
        items: impl Iterator<Item = &'a Value>,
        as_set: bool,
    ) -> Result<String, KeyError> {
        let mut parts = items
            .map(|v| self.serialize(v))
            .collect::<Result<Vec<_>, _>>()?;
        if as_set {
            parts.sort();
            parts.dedup();
        }
        Ok(hash_text(&parts.join(","), DEFAULT_HASH_LENGTH))
    }
}

/// `YYYY-MM-DDTHH:MM:SS`, followed by `.ffffff` at microsecond precision or
/// `.fffffffff` when sub-microsecond digits are set.
fn iso_format(dt: &NaiveDateTime) -> String {
    let base = dt.format("%Y-%m-%dT%H:%M:%S").to_string();
    // A leap second stores its fraction past 1e9; `%S` already renders it as 60.
    let nanos = dt.nanosecond() % 1_000_000_000;
    match (nanos / 1_000, nanos % 1_000) {
        (0, 0) => base,
        (micros, 0) => format!("{}.{:06}", base, micros),
        _ => format!("{}.{:09}", base, nanos),
    }
}

// =============================================================================
// TESTS
// =============================================================================
