//! quickcache core - values, key derivation and errors
//!
//! Turns the arguments of a call to a deterministic function into a short,
//! stable cache key. Nothing in this crate talks to a cache; the storage
//! side lives in `quickcache-storage`.

pub mod args;
pub mod codec;
pub mod error;
pub mod introspect;
pub mod key;
pub mod value;

pub use args::{BoundArgs, CallArgs};
pub use codec::{
    default_encoding_assert, hash_bytes, hash_text, EncodingAssert, KeyCodec,
    DEFAULT_HASH_LENGTH, MAX_ARGS_LEN,
};
pub use error::{
    BindError, CacheError, ConfigError, KeyError, QuickCacheError, QuickCacheResult,
};
pub use introspect::{FnSignature, Introspect, Param};
pub use key::{
    validate_specs, CacheKey, FunctionFingerprint, KeyScheme, SkipPredicate, SkipSpec,
    VaryExtractor, VaryOn, VarySpec, KEY_NAMESPACE,
};
pub use value::{Record, Value};
