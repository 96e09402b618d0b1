use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A caller-supplied shader uniform value: a number or a flat number array.
/// JSON booleans are accepted wherever a number is and read as 1 or 0.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged, from = "RawValue")]
pub enum UniformValue {
    Scalar(f64),
    Vector(Vec<f64>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Component {
    Number(f64),
    Flag(bool),
}

impl Component {
    fn value(self) -> f64 {
        match self {
            Component::Number(v) => v,
            Component::Flag(flag) => f64::from(u8::from(flag)),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    One(Component),
    Many(Vec<Component>),
}

impl From<RawValue> for UniformValue {
    fn from(raw: RawValue) -> Self {
        match raw {
            RawValue::One(c) => UniformValue::Scalar(c.value()),
            RawValue::Many(cs) => {
                UniformValue::Vector(cs.into_iter().map(Component::value).collect())
            }
        }
    }
}

impl UniformValue {
    pub fn components(&self) -> &[f64] {
        match self {
            UniformValue::Scalar(v) => std::slice::from_ref(v),
            UniformValue::Vector(v) => v,
        }
    }

    /// Parses a JSON number, boolean or array of them (`0.5`, `true`, `[1, 0]`).
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text.trim())
    }
}

impl From<f64> for UniformValue {
    fn from(value: f64) -> Self {
        UniformValue::Scalar(value)
    }
}

impl From<bool> for UniformValue {
    fn from(value: bool) -> Self {
        UniformValue::Scalar(f64::from(u8::from(value)))
    }
}

impl From<Vec<f64>> for UniformValue {
    fn from(value: Vec<f64>) -> Self {
        UniformValue::Vector(value)
    }
}

/// Ordered name → value mapping. Later entries with the same name win.
///
/// Names the compiled program does not declare are ignored at bind time,
/// never rejected.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UniformBindings {
    entries: Vec<(String, UniformValue)>,
}

impl UniformBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<UniformValue>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<UniformValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniformValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for UniformBindings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(k, v)| (k, v)))
    }
}

impl<'de> Deserialize<'de> for UniformBindings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BindingsVisitor;

        impl<'de> Visitor<'de> for BindingsVisitor {
            type Value = UniformBindings;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of uniform names to numbers, booleans or arrays of them")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut bindings = UniformBindings::new();
                while let Some((name, value)) = map.next_entry::<String, UniformValue>()? {
                    bindings.insert(name, value);
                }
                Ok(bindings)
            }
        }

        deserializer.deserialize_map(BindingsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalar_and_vector() {
        assert_eq!(UniformValue::parse("0.5").unwrap(), UniformValue::Scalar(0.5));
        assert_eq!(UniformValue::parse("3").unwrap(), UniformValue::Scalar(3.0));
        assert_eq!(
            UniformValue::parse("[1, 0.5]").unwrap(),
            UniformValue::Vector(vec![1.0, 0.5])
        );
    }

    #[test]
    fn test_parse_booleans() {
        assert_eq!(UniformValue::parse("true").unwrap(), UniformValue::Scalar(1.0));
        assert_eq!(UniformValue::parse("false").unwrap(), UniformValue::Scalar(0.0));
        assert_eq!(
            UniformValue::parse("[true, false, 0.5]").unwrap(),
            UniformValue::Vector(vec![1.0, 0.0, 0.5])
        );
        assert_eq!(UniformValue::from(true), UniformValue::Scalar(1.0));
    }

    #[test]
    fn test_bindings_accept_boolean_values() {
        let bindings: UniformBindings = serde_json::from_str(r#"{"swap": true}"#).unwrap();
        let (name, value) = bindings.iter().next().unwrap();
        assert_eq!(name, "swap");
        assert_eq!(value.components(), &[1.0]);
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        assert!(UniformValue::parse("\"red\"").is_err());
        assert!(UniformValue::parse("[1, \"x\"]").is_err());
    }

    #[test]
    fn test_components() {
        assert_eq!(UniformValue::Scalar(2.0).components(), &[2.0]);
        assert_eq!(UniformValue::Vector(vec![1.0, 2.0]).components(), &[1.0, 2.0]);
    }

    #[test]
    fn test_bindings_deserialize_preserves_order() {
        let json = r#"{"zeta": 1, "alpha": [0.1, 0.2], "mid": 3.5}"#;
        let bindings: UniformBindings = serde_json::from_str(json).unwrap();
        let names: Vec<&str> = bindings.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_bindings_round_trip_through_json() {
        let bindings = UniformBindings::new()
            .with("strength", 0.3)
            .with("direction", vec![1.0, 0.0]);
        let json = serde_json::to_string(&bindings).unwrap();
        assert_eq!(json, r#"{"strength":0.3,"direction":[1.0,0.0]}"#);
    }

    #[test]
    fn test_empty_bindings() {
        let bindings: UniformBindings = serde_json::from_str("{}").unwrap();
        assert!(bindings.is_empty());
        assert_eq!(bindings.len(), 0);
    }
}
