//! Cache key derivation.
//!
//! A cache key has the shape
//! `quickcache.<name>.<source hash>/<serialized vary-on values>`. The
//! `<name>.<source hash>` part is the [`FunctionFingerprint`]; the rest comes
//! from resolving a [`VarySpec`] against one call and running the values
//! through the [`KeyCodec`].

use std::fmt;
use std::sync::Arc;

use crate::codec::hash_text;
use crate::{BoundArgs, CallArgs, ConfigError, Introspect, KeyCodec, KeyError, Value};

/// Namespace every key starts with.
pub const KEY_NAMESPACE: &str = "quickcache";

/// Function names are cut to this many characters in keys.
const NAME_LIMIT: usize = 40;

/// Marker appended to truncated names.
const TRUNCATION_MARKER: &str = "..";

/// Number of hex characters kept from the source digest.
const SOURCE_HASH_LENGTH: usize = 8;

// ============================================================================
// FINGERPRINT
// ============================================================================

/// Stable identity of a memoized function: its (truncated) name plus a short
/// digest of its source, so two functions sharing a truncated name still get
/// separate key namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionFingerprint {
    truncated_name: String,
    source_hash: String,
}

impl FunctionFingerprint {
    pub fn new(name: &str, source: &str) -> Self {
        let mut truncated_name: String = name.chars().take(NAME_LIMIT).collect();
        if name.chars().count() > NAME_LIMIT {
            truncated_name.push_str(TRUNCATION_MARKER);
        }
        Self {
            truncated_name,
            source_hash: hash_text(source, SOURCE_HASH_LENGTH),
        }
    }

    /// Fingerprint an introspectable function. Fails if its source is unavailable.
    pub fn of(function: &dyn Introspect) -> Result<Self, ConfigError> {
        let source = function.source()?;
        Ok(Self::new(function.name(), &source))
    }

    pub fn truncated_name(&self) -> &str {
        &self.truncated_name
    }

    pub fn source_hash(&self) -> &str {
        &self.source_hash
    }
}

impl fmt::Display for FunctionFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.truncated_name, self.source_hash)
    }
}

// ============================================================================
// CACHE KEY
// ============================================================================

/// A fully derived cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(fingerprint: &FunctionFingerprint, serialized_args: &str) -> Self {
        Self(format!("{}.{}/{}", KEY_NAMESPACE, fingerprint, serialized_args))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// VARY SPEC
// ============================================================================

/// One vary-on entry: a parameter name and the attribute path to follow
/// from its bound value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VaryOn {
    pub argument: String,
    pub path: Vec<String>,
}

impl VaryOn {
    pub fn new(argument: impl Into<String>) -> Self {
        Self {
            argument: argument.into(),
            path: Vec::new(),
        }
    }

    /// Parse a dotted expression such as `item.id`.
    pub fn parse(expression: &str) -> Self {
        let mut parts = expression.split('.').map(str::to_string);
        let argument = parts.next().unwrap_or_default();
        Self {
            argument,
            path: parts.collect(),
        }
    }

    /// Extend the attribute path.
    pub fn attr(mut self, name: impl Into<String>) -> Self {
        self.path.push(name.into());
        self
    }

    fn is_well_formed(&self) -> bool {
        !self.argument.is_empty() && self.path.iter().all(|p| !p.is_empty())
    }

    /// Follow the attribute path from the bound argument.
    fn resolve<'a>(&self, bound: &'a BoundArgs) -> Result<&'a Value, KeyError> {
        let mut value = bound
            .get(&self.argument)
            .ok_or_else(|| KeyError::MissingArgument {
                argument: self.argument.clone(),
            })?;
        for attribute in &self.path {
            value = value
                .attr(attribute)
                .ok_or_else(|| KeyError::MissingAttribute {
                    argument: self.argument.clone(),
                    attribute: attribute.clone(),
                    type_name: value.type_name().to_string(),
                })?;
        }
        Ok(value)
    }
}

impl fmt::Display for VaryOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argument)?;
        for attribute in &self.path {
            write!(f, ".{}", attribute)?;
        }
        Ok(())
    }
}

/// Function computing the vary-on values directly from a call's arguments.
pub type VaryExtractor = Arc<dyn Fn(&CallArgs) -> Result<Vec<Value>, KeyError> + Send + Sync>;

/// Which values of a call feed its cache key.
#[derive(Clone)]
pub enum VarySpec {
    /// Named parameters, each optionally followed by an attribute path.
    Args(Vec<VaryOn>),
    /// A function of the original call arguments.
    Extractor(VaryExtractor),
}

impl VarySpec {
    /// Build from dotted expressions: `VarySpec::args(["item.id", "force"])`.
    pub fn args<I, S>(expressions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Args(
            expressions
                .into_iter()
                .map(|e| VaryOn::parse(e.as_ref()))
                .collect(),
        )
    }

    /// Vary on nothing: every call shares one key.
    pub fn none() -> Self {
        Self::Args(Vec::new())
    }

    pub fn extractor<F>(f: F) -> Self
    where
        F: Fn(&CallArgs) -> Result<Vec<Value>, KeyError> + Send + Sync + 'static,
    {
        Self::Extractor(Arc::new(f))
    }

    /// Produce the ordered vary-on values for one call.
    pub fn resolve(&self, call: &CallArgs, bound: &BoundArgs) -> Result<Vec<Value>, KeyError> {
        match self {
            Self::Args(entries) => entries
                .iter()
                .map(|entry| entry.resolve(bound).cloned())
                .collect(),
            Self::Extractor(extract) => extract(call),
        }
    }
}

impl fmt::Debug for VarySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Args(entries) => f.debug_tuple("Args").field(entries).finish(),
            Self::Extractor(_) => f.write_str("Extractor(..)"),
        }
    }
}

// ============================================================================
// SKIP SPEC
// ============================================================================

/// Predicate over a call's arguments; `true` bypasses the cache lookup.
pub type SkipPredicate = Arc<dyn Fn(&CallArgs) -> bool + Send + Sync>;

/// When a call bypasses the cache lookup.
#[derive(Clone, Default)]
pub enum SkipSpec {
    #[default]
    Never,
    /// Skip when the named parameter's bound value is truthy.
    Param(String),
    Predicate(SkipPredicate),
}

impl SkipSpec {
    pub fn param(name: impl Into<String>) -> Self {
        Self::Param(name.into())
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&CallArgs) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    /// Decide whether this call skips the lookup.
    pub fn should_skip(&self, call: &CallArgs, bound: &BoundArgs) -> Result<bool, KeyError> {
        match self {
            Self::Never => Ok(false),
            Self::Param(name) => bound
                .get(name)
                .map(Value::is_truthy)
                .ok_or_else(|| KeyError::MissingArgument {
                    argument: name.clone(),
                }),
            Self::Predicate(predicate) => Ok(predicate(call)),
        }
    }
}

impl fmt::Debug for SkipSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Never => f.write_str("Never"),
            Self::Param(name) => f.debug_tuple("Param").field(name).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Check a vary/skip configuration against a function's declared parameters.
pub fn validate_specs(
    function: &dyn Introspect,
    vary_on: &VarySpec,
    skip: &SkipSpec,
) -> Result<(), ConfigError> {
    let parameters = function.parameters();

    if let VarySpec::Args(entries) = vary_on {
        for entry in entries {
            if !entry.is_well_formed() {
                return Err(ConfigError::InvalidVaryOn {
                    expression: entry.to_string(),
                    function: function.name().to_string(),
                });
            }
            if !parameters.contains(&entry.argument.as_str()) {
                return Err(ConfigError::UnknownVaryArgument {
                    argument: entry.argument.clone(),
                    function: function.name().to_string(),
                });
            }
        }
    }

    if let SkipSpec::Param(name) = skip {
        if !parameters.contains(&name.as_str()) {
            return Err(ConfigError::UnknownSkipArgument {
                argument: name.clone(),
                function: function.name().to_string(),
            });
        }
        if let VarySpec::Args(entries) = vary_on {
            if entries.iter().any(|entry| &entry.argument == name) {
                return Err(ConfigError::SkipArgumentInVaryOn {
                    argument: name.clone(),
                    function: function.name().to_string(),
                });
            }
        }
    }

    Ok(())
}

// ============================================================================
// KEY SCHEME
// ============================================================================

/// Everything needed to turn a call into a [`CacheKey`], fixed at setup time.
#[derive(Debug, Clone)]
pub struct KeyScheme {
    fingerprint: FunctionFingerprint,
    vary_on: VarySpec,
    codec: KeyCodec,
}

impl KeyScheme {
    pub fn new(fingerprint: FunctionFingerprint, vary_on: VarySpec, codec: KeyCodec) -> Self {
        Self {
            fingerprint,
            vary_on,
            codec,
        }
    }

    pub fn fingerprint(&self) -> &FunctionFingerprint {
        &self.fingerprint
    }

    pub fn vary_on(&self) -> &VarySpec {
        &self.vary_on
    }

    /// Derive the key for one call.
    pub fn key(&self, call: &CallArgs, bound: &BoundArgs) -> Result<CacheKey, KeyError> {
        let values = self.vary_on.resolve(call, bound)?;
        let args = self.codec.serialize_args(&values)?;
        Ok(CacheKey::new(&self.fingerprint, &args))
    }
}

// =============================================================================
// TESTS
// =============================================================================
