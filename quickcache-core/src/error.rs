//! Error types for quickcache operations

use thiserror::Error;

/// Setup-time configuration errors.
///
/// These are raised while a memoized binding is being constructed and never
/// from an individual call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("We cannot vary on \"{argument}\" because the function {function} has no such argument")]
    UnknownVaryArgument { argument: String, function: String },

    #[error(
        "We cannot use \"{argument}\" as the \"skip\" parameter because the function {function} \
         has no such argument"
    )]
    UnknownSkipArgument { argument: String, function: String },

    #[error(
        "You cannot use the \"{argument}\" argument as a vary on parameter and as the \
         \"skip cache\" parameter in the function: {function}"
    )]
    SkipArgumentInVaryOn { argument: String, function: String },

    #[error("Invalid vary on expression \"{expression}\" for function {function}")]
    InvalidVaryOn { expression: String, function: String },

    #[error("Source of function {function} is unavailable: {reason}")]
    SourceUnavailable { function: String, reason: String },

    #[error("the quickcache builder still needs values for the following parameters: {missing:?}")]
    MissingValues { missing: Vec<String> },

    #[error("No cache registered under the name \"{name}\"")]
    UnknownCache { name: String },

    #[error("Invalid tier presets: {reason}")]
    InvalidPresets { reason: String },
}

/// Key derivation errors raised per call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("Bad type \"{type_name}\": {value}")]
    UnsupportedType { type_name: String, value: String },

    #[error("No bound value for argument \"{argument}\"")]
    MissingArgument { argument: String },

    #[error("\"{type_name}\" value reached through \"{argument}\" has no attribute \"{attribute}\"")]
    MissingAttribute {
        argument: String,
        attribute: String,
        type_name: String,
    },

    #[error("Vary on extractor failed: {reason}")]
    Extractor { reason: String },
}

/// Errors binding a call's arguments to declared parameters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BindError {
    #[error("{function}() takes {expected} positional arguments but {got} were given")]
    TooManyPositional {
        function: String,
        expected: usize,
        got: usize,
    },

    #[error("{function}() got an unexpected keyword argument \"{keyword}\"")]
    UnexpectedKeyword { function: String, keyword: String },

    #[error("{function}() got multiple values for argument \"{argument}\"")]
    MultipleValues { function: String, argument: String },

    #[error("{function}() missing required argument \"{argument}\"")]
    MissingRequired { function: String, argument: String },
}

/// Errors surfaced by a cache backend or tier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// Bypass signal: treat the operation as a miss / no-op.
    #[error("Cache operation skipped")]
    ForceSkip,

    #[error("Cache backend {backend} failed: {reason}")]
    Backend { backend: String, reason: String },

    #[error("Cache lock poisoned")]
    LockPoisoned,
}

impl CacheError {
    /// Build a hard backend failure.
    pub fn backend(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Backend {
            backend: backend.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for the bypass signal, which callers translate to a miss.
    pub fn is_force_skip(&self) -> bool {
        matches!(self, Self::ForceSkip)
    }
}

/// Master error type for all quickcache errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QuickCacheError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    #[error("Bind error: {0}")]
    Bind(#[from] BindError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Result type alias for quickcache operations.
pub type QuickCacheResult<T> = Result<T, QuickCacheError>;

// =============================================================================
// TESTS
// =============================================================================
