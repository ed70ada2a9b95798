//! Unary value transforms applied to resolved column values.

use anyhow::{anyhow, bail, Result};
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A caller-supplied `Value -> Value` conversion that may fail
pub type Transform = Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>;

/// Wrap a closure as a [`Transform`]
pub fn transform<F>(f: F) -> Transform
where
    F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Named transforms that declarative table configs can refer to
#[derive(Clone, Default)]
pub struct TransformRegistry {
    transforms: HashMap<String, Transform>,
}

impl TransformRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with `negate`, `to_string`, `lowercase`,
    /// `uppercase`, `trim` and `to_number`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("negate", transform(negate));
        registry.register("to_string", transform(to_string));
        registry.register("lowercase", transform(|v| map_str(v, |s| s.to_lowercase())));
        registry.register("uppercase", transform(|v| map_str(v, |s| s.to_uppercase())));
        registry.register("trim", transform(|v| map_str(v, |s| s.trim().to_string())));
        registry.register("to_number", transform(to_number));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, transform: Transform) {
        self.transforms.insert(name.into(), transform);
    }

    pub fn get(&self, name: &str) -> Option<Transform> {
        self.transforms.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.transforms.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("transforms", &self.names())
            .finish()
    }
}

/// Multiply a number by -1; null passes through
pub fn negate(value: Value) -> Result<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                let negated = i.checked_neg().ok_or_else(|| anyhow!("cannot negate {}", i))?;
                Ok(Value::Number(negated.into()))
            } else if let Some(f) = n.as_f64() {
                Number::from_f64(-f)
                    .map(Value::Number)
                    .ok_or_else(|| anyhow!("cannot negate {}", f))
            } else {
                bail!("cannot negate {}", n)
            }
        }
        other => bail!("cannot negate non-numeric value {}", other),
    }
}

/// Render any value as a string; strings and null are kept as they are
pub fn to_string(value: Value) -> Result<Value> {
    Ok(match value {
        Value::Null => Value::Null,
        Value::String(s) => Value::String(s),
        other => Value::String(other.to_string()),
    })
}

/// Parse a numeric string into a number; numbers and null are kept
pub fn to_number(value: Value) -> Result<Value> {
    match value {
        Value::Null | Value::Number(_) => Ok(value),
        Value::Bool(b) => Ok(Value::Number(u8::from(b).into())),
        Value::String(s) => {
            let text = s.trim();
            if let Ok(i) = text.parse::<i64>() {
                return Ok(Value::Number(i.into()));
            }
            text.parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| anyhow!("'{}' is not a number", s))
        }
        other => bail!("cannot convert {} to a number", other),
    }
}

fn map_str(value: Value, f: impl Fn(&str) -> String) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(f(&s))),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_negate() {
        assert_eq!(negate(json!(300)).unwrap(), json!(-300));
        assert_eq!(negate(json!(0)).unwrap(), json!(0));
        assert_eq!(negate(json!(2.5)).unwrap(), json!(-2.5));
        assert_eq!(negate(Value::Null).unwrap(), Value::Null);
        assert!(negate(json!("abc")).is_err());
    }

    #[test]
    fn test_to_number() {
        assert_eq!(to_number(json!(" 42 ")).unwrap(), json!(42));
        assert_eq!(to_number(json!("1.5")).unwrap(), json!(1.5));
        assert_eq!(to_number(json!(true)).unwrap(), json!(1));
        assert!(to_number(json!("forty")).is_err());
    }

    #[test]
    fn test_builtin_registry() {
        let registry = TransformRegistry::with_builtins();
        assert_eq!(
            registry.names(),
            vec!["lowercase", "negate", "to_number", "to_string", "trim", "uppercase"]
        );

        let upper = registry.get("uppercase").unwrap();
        assert_eq!(upper(json!("abc")).unwrap(), json!("ABC"));
        assert_eq!(upper(json!(1)).unwrap(), json!(1));

        let stringify = registry.get("to_string").unwrap();
        assert_eq!(stringify(json!(12)).unwrap(), json!("12"));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = TransformRegistry::new();
        registry.register("double", transform(|v| Ok(json!(v.as_i64().unwrap_or(0) * 2))));
        assert_eq!(registry.get("double").unwrap()(json!(4)).unwrap(), json!(8));
    }
}
