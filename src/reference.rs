use {
    crate::{JoinExpression, Pattern},
    serde_json::Value,
    std::fmt::{Display, Formatter, Result as FmtResult},
};

/// A deferred reference to another resource in the template.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Reference {
    /// `{"Ref": "LogicalId"}`
    Ref(String),

    /// `{"Fn::GetAtt": ["LogicalId", "Attribute"]}` or `{"Fn::GetAtt": "LogicalId.Attribute"}`
    GetAtt {
        logical_id: String,
        attribute: String,
    },

    /// `{"Fn::Join": [delimiter, [parts...]]}`
    Join(JoinExpression),
}

impl Reference {
    /// Recognize a reference intrinsic. The value must be a mapping with exactly one of `Ref`, `Fn::GetAtt` or
    /// `Fn::Join` as its only key.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = match value {
            Value::Object(map) if map.len() == 1 => map,
            _ => return None,
        };

        let (key, inner) = map.iter().next()?;
        match (key.as_str(), inner) {
            ("Ref", Value::String(target)) => Some(Self::Ref(target.clone())),
            ("Fn::GetAtt", Value::Array(parts)) if parts.len() == 2 => match (&parts[0], &parts[1]) {
                (Value::String(logical_id), Value::String(attribute)) => Some(Self::GetAtt {
                    logical_id: logical_id.clone(),
                    attribute: attribute.clone(),
                }),
                _ => None,
            },
            ("Fn::GetAtt", Value::String(dotted)) => {
                let (logical_id, attribute) = dotted.split_once('.')?;
                Some(Self::GetAtt {
                    logical_id: logical_id.to_string(),
                    attribute: attribute.to_string(),
                })
            }
            ("Fn::Join", payload) => Some(Self::Join(JoinExpression::new(payload.clone()))),
            _ => None,
        }
    }

    /// The logical id this reference points at. Join expressions don't point at a single resource.
    pub fn logical_id(&self) -> Option<&str> {
        match self {
            Self::Ref(target) => Some(target),
            Self::GetAtt {
                logical_id,
                ..
            } => Some(logical_id),
            Self::Join(_) => None,
        }
    }

    /// Resolve to a string for comparison: the logical id, or the flattened join.
    pub fn resolve(&self) -> String {
        match self {
            Self::Join(expr) => expr.flatten(),
            other => other.logical_id().unwrap_or_default().to_string(),
        }
    }

    /// Does this reference match `pattern`? For `Fn::GetAtt`, either the logical id or the attribute may match.
    pub fn matches(&self, pattern: &Pattern) -> bool {
        match self {
            Self::Ref(target) => pattern.is_match(target),
            Self::GetAtt {
                logical_id,
                attribute,
            } => pattern.is_match(logical_id) || pattern.is_match(attribute),
            Self::Join(expr) => pattern.is_match(&expr.flatten()),
        }
    }
}

impl Display for Reference {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::Ref(target) => write!(f, "Ref({})", target),
            Self::GetAtt {
                logical_id,
                attribute,
            } => write!(f, "GetAtt({}.{})", logical_id, attribute),
            Self::Join(expr) => write!(f, "Join({})", expr.flatten()),
        }
    }
}
