//! Function introspection seam.
//!
//! Key derivation needs three facts about the memoized function: its declared
//! parameter names, how a call's arguments bind to them, and a textual
//! rendering of its source for fingerprinting. [`Introspect`] supplies them;
//! [`FnSignature`] is the declarative implementation most callers use.

use crate::{BindError, BoundArgs, CallArgs, ConfigError, Value};

/// Capability describing a callable to the memoization layer.
pub trait Introspect: Send + Sync {
    /// The function's name.
    fn name(&self) -> &str;

    /// Declared parameter names, in order.
    fn parameters(&self) -> Vec<&str>;

    /// Bind a call's arguments to parameter names, applying defaults.
    fn bind(&self, call: &CallArgs) -> Result<BoundArgs, BindError>;

    /// Source text used to fingerprint the function.
    ///
    /// Fails for callables that cannot be introspected; the failure is
    /// surfaced when the memoized binding is constructed.
    fn source(&self) -> Result<String, ConfigError>;
}

/// A declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub default: Option<Value>,
}

/// Declarative description of a function: name, parameters with optional
/// defaults, and source text.
///
/// ```
/// use quickcache_core::FnSignature;
///
/// let sig = FnSignature::new("by_name")
///     .param("name")
///     .param_with_default("force", false)
///     .with_source(stringify!(fn by_name(name: &str, force: bool) -> String { lookup(name) }));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FnSignature {
    name: String,
    params: Vec<Param>,
    source: Option<String>,
}

impl FnSignature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            source: None,
        }
    }

    /// Declare a required parameter.
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            default: None,
        });
        self
    }

    /// Declare a parameter with a default value.
    pub fn param_with_default(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.params.push(Param {
            name: name.into(),
            default: Some(default.into()),
        });
        self
    }

    /// Attach the source text used for fingerprinting.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }
}

impl Introspect for FnSignature {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.name.as_str()).collect()
    }

    fn bind(&self, call: &CallArgs) -> Result<BoundArgs, BindError> {
        let positional = call.positional();
        if positional.len() > self.params.len() {
            return Err(BindError::TooManyPositional {
                function: self.name.clone(),
                expected: self.params.len(),
                got: positional.len(),
            });
        }

        let mut slots: Vec<Option<Value>> = vec![None; self.params.len()];
        for (slot, value) in slots.iter_mut().zip(positional) {
            *slot = Some(value.clone());
        }

        for (keyword, value) in call.keyword() {
            let index = self
                .params
                .iter()
                .position(|p| &p.name == keyword)
                .ok_or_else(|| BindError::UnexpectedKeyword {
                    function: self.name.clone(),
                    keyword: keyword.clone(),
                })?;
            if slots[index].is_some() {
                return Err(BindError::MultipleValues {
                    function: self.name.clone(),
                    argument: keyword.clone(),
                });
            }
            slots[index] = Some(value.clone());
        }

        let mut values = Vec::with_capacity(self.params.len());
        for (param, slot) in self.params.iter().zip(slots) {
            let value = match slot.or_else(|| param.default.clone()) {
                Some(value) => value,
                None => {
                    return Err(BindError::MissingRequired {
                        function: self.name.clone(),
                        argument: param.name.clone(),
                    })
                }
            };
            values.push((param.name.clone(), value));
        }
        Ok(BoundArgs::new(values))
    }

    fn source(&self) -> Result<String, ConfigError> {
        self.source
            .clone()
            .ok_or_else(|| ConfigError::SourceUnavailable {
                function: self.name.clone(),
                reason: "no source text attached to signature".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn by_name() -> FnSignature {
        FnSignature::new("by_name")
            .param("name")
            .param_with_default("force", false)
            .with_source("fn by_name(name, force) {}")
    }

    #[test]
    fn test_bind_positional_and_default() {
        let bound = by_name().bind(&CallArgs::new().arg("ben")).unwrap();
        assert_eq!(bound.get("name"), Some(&Value::from("ben")));
        assert_eq!(bound.get("force"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_bind_keyword() {
        let bound = by_name()
            .bind(&CallArgs::new().kwarg("force", true).kwarg("name", "ben"))
            .unwrap();
        let names: Vec<&str> = bound.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["name", "force"]);
        assert_eq!(bound.get("force"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_bind_errors() {
        let sig = by_name();
        assert!(matches!(
            sig.bind(&CallArgs::new().arg(1).arg(2).arg(3)),
            Err(BindError::TooManyPositional { expected: 2, got: 3, .. })
        ));
        assert!(matches!(
            sig.bind(&CallArgs::new().arg("a").kwarg("colour", "red")),
            Err(BindError::UnexpectedKeyword { .. })
        ));
        assert!(matches!(
            sig.bind(&CallArgs::new().arg("a").kwarg("name", "b")),
            Err(BindError::MultipleValues { .. })
        ));
        assert!(matches!(
            sig.bind(&CallArgs::new()),
            Err(BindError::MissingRequired { .. })
        ));
    }

    #[test]
    fn test_source_unavailable() {
        let sig = FnSignature::new("generated").param("x");
        assert!(matches!(
            sig.source(),
            Err(ConfigError::SourceUnavailable { .. })
        ));
        assert_eq!(by_name().parameters(), vec!["name", "force"]);
    }

    #[test]
    fn test_attached_source_is_returned() {
        let sig = FnSignature::new("double").param("n").with_source("fn double(n) { n * 2 }");
        assert_eq!(sig.source().unwrap(), "fn double(n) { n * 2 }");
    }
}
