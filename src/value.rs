use {
    serde_json::Value,
    std::fmt::{Display, Formatter, Result as FmtResult},
};

/// The kind of a document value, used when reporting type mismatches.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ValueKind {
    Mapping,
    Sequence,
    String,
    Number,
    Bool,
    Null,
}

impl ValueKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => Self::Mapping,
            Value::Array(_) => Self::Sequence,
            Value::String(_) => Self::String,
            Value::Number(_) => Self::Number,
            Value::Bool(_) => Self::Bool,
            Value::Null => Self::Null,
        }
    }
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        f.write_str(match self {
            Self::Mapping => "mapping",
            Self::Sequence => "sequence",
            Self::String => "string",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::Null => "null",
        })
    }
}

/// Render a value as compact JSON for diagnostics.
pub(crate) fn describe(value: &Value) -> String {
    value.to_string()
}

/// View a value as a list of elements. A sequence yields its elements; anything else is a single element.
pub(crate) fn as_elements(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(elements) => elements.iter().collect(),
        other => vec![other],
    }
}
