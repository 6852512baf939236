use {
    crate::{display_json, from_str_json, path::IntoKeyPath, AssertError, DocumentAssert, KeyPath, ValueKind},
    serde::{de::Deserializer, Deserialize, Serialize},
    serde_json::{Map, Value},
};

/// One synthesized resource's template fragment, e.g.
/// `{"Type": "AWS::SNS::Topic", "Properties": {...}, "DependsOn": [...]}`.
///
/// The document is always a mapping at the top level and is never modified once constructed.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResourceDocument {
    value: Value,
}

impl ResourceDocument {
    #[inline]
    pub fn new(map: Map<String, Value>) -> Self {
        Self {
            value: Value::Object(map),
        }
    }

    /// The whole document as a value.
    #[inline]
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// The value at `path`.
    pub fn get<P: IntoKeyPath>(&self, path: P) -> Result<&Value, AssertError> {
        path.into_key_path()?.extract(&self.value)
    }

    /// The resource's `Type`, if present and a string.
    pub fn resource_type(&self) -> Option<&str> {
        self.value.get("Type").and_then(Value::as_str)
    }

    /// The top-level keys of the document.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.value.as_object().into_iter().flat_map(|map| map.keys().map(String::as_str))
    }

    /// Start an assertion chain on this document.
    #[inline]
    pub fn assert_that(&self) -> DocumentAssert<'_> {
        DocumentAssert::new(&self.value)
    }
}

impl<'de> Deserialize<'de> for ResourceDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::new(Map::deserialize(deserializer)?))
    }
}

impl TryFrom<Value> for ResourceDocument {
    type Error = AssertError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self::new(map)),
            other => Err(AssertError::TypeMismatch {
                path: KeyPath::root(),
                expected: ValueKind::Mapping,
                found: ValueKind::of(&other),
            }),
        }
    }
}

impl From<Map<String, Value>> for ResourceDocument {
    fn from(map: Map<String, Value>) -> Self {
        Self::new(map)
    }
}

display_json!(ResourceDocument);
from_str_json!(ResourceDocument);
