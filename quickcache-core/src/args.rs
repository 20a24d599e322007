//! Call arguments, before and after binding to declared parameters.

use crate::Value;

/// The arguments of a single call as the caller wrote them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    positional: Vec<Value>,
    keyword: Vec<(String, Value)>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Append a keyword argument.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.push((name.into(), value.into()));
        self
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn keyword(&self) -> &[(String, Value)] {
        &self.keyword
    }

    /// Look up a keyword argument by name.
    pub fn get_keyword(&self, name: &str) -> Option<&Value> {
        self.keyword
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }
}

/// Parameter name to value mapping for one call, in declaration order,
/// with defaults applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArgs {
    values: Vec<(String, Value)>,
}

impl BoundArgs {
    pub fn new(values: Vec<(String, Value)>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_args_builder() {
        let call = CallArgs::new().arg("name").kwarg("force", true);
        assert_eq!(call.positional(), &[Value::from("name")]);
        assert_eq!(call.get_keyword("force"), Some(&Value::Bool(true)));
        assert_eq!(call.get_keyword("other"), None);
    }

    #[test]
    fn test_bound_args_lookup_preserves_order() {
        let bound = BoundArgs::new(vec![
            ("b".to_string(), Value::from(2)),
            ("a".to_string(), Value::from(1)),
        ]);
        let names: Vec<&str> = bound.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(bound.get("a"), Some(&Value::Int(1)));
        assert_eq!(bound.len(), 2);
    }
}
