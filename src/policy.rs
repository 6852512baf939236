use {
    crate::{value::describe, AssertError, Effect, Expected, KeyPath, Pattern, Reference, ValueKind},
    derive_builder::Builder,
    log::debug,
    serde::{de::Deserializer, ser::Serializer, Deserialize, Serialize},
    serde_json::{Map, Value},
    std::{
        collections::BTreeMap,
        fmt::{Display, Formatter, Result as FmtResult},
        str::FromStr,
    },
};

/// Policy language versions.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PolicyVersion {
    V2008_10_17,
    V2012_10_17,
}

impl Display for PolicyVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::V2008_10_17 => f.write_str("2008-10-17"),
            Self::V2012_10_17 => f.write_str("2012-10-17"),
        }
    }
}

impl<'de> Deserialize<'de> for PolicyVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        match PolicyVersion::from_str(&value) {
            Ok(v) => Ok(v),
            Err(e) => Err(serde::de::Error::custom(e)),
        }
    }
}

impl FromStr for PolicyVersion {
    type Err = AssertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "2008-10-17" => Ok(Self::V2008_10_17),
            "2012-10-17" => Ok(Self::V2012_10_17),
            _ => Err(AssertError::ValueMismatch {
                path: KeyPath::from(["Version"]),
                expected: "a policy version".to_string(),
                found: s.to_string(),
            }),
        }
    }
}

impl Serialize for PolicyVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.to_string().as_str())
    }
}

/// What a policy document is expected to grant.
///
/// Every statement must carry `effect` and `action`. If `principal` is set, at least one statement's `Principal` must
/// contain all of its entries (extra entries are fine). If `resource` is set, at least one statement's `Resource` must
/// resolve to a string matching that pattern.
#[derive(Builder, Clone, Debug, Eq, PartialEq)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct PolicyExpectation {
    #[builder(default = "PolicyVersion::V2012_10_17")]
    version: PolicyVersion,

    effect: Effect,

    #[builder(setter(into))]
    action: String,

    #[builder(setter(into, strip_option), default)]
    principal: Option<BTreeMap<String, String>>,

    #[builder(setter(into, strip_option), default)]
    resource: Option<String>,
}

impl PolicyExpectationBuilder {
    fn validate(&self) -> Result<(), PolicyExpectationBuilderError> {
        let mut errors = Vec::with_capacity(2);

        if let Some(action) = &self.action {
            if action.is_empty() {
                errors.push("Action must not be empty.".to_string());
            }
        }

        if let Some(Some(resource)) = &self.resource {
            if Pattern::new(resource).is_err() {
                errors.push(format!("Resource pattern is invalid: {}", resource));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PolicyExpectationBuilderError::ValidationError(errors.join(" ")))
        }
    }
}

impl PolicyExpectation {
    #[inline]
    pub fn builder() -> PolicyExpectationBuilder {
        PolicyExpectationBuilder::default()
    }

    #[inline]
    pub fn version(&self) -> PolicyVersion {
        self.version
    }

    #[inline]
    pub fn effect(&self) -> Effect {
        self.effect
    }

    #[inline]
    pub fn action(&self) -> &str {
        &self.action
    }

    #[inline]
    pub fn principal(&self) -> Option<&BTreeMap<String, String>> {
        self.principal.as_ref()
    }

    #[inline]
    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    /// Validate a policy document (`{"Version": ..., "Statement": [...]}`) against this expectation. Paths in errors
    /// are relative to the document.
    pub fn validate(&self, document: &Value) -> Result<(), AssertError> {
        let version_path = KeyPath::from(["Version"]);
        let version = version_path.extract(document)?;
        let expected_version = self.version.to_string();
        if version.as_str() != Some(expected_version.as_str()) {
            return Err(mismatch(&version_path, describe(&Value::from(expected_version)), version));
        }

        let statements = statements(document)?;

        for (i, statement) in statements.iter().enumerate() {
            let path = KeyPath::from(["Statement"]).child(i);
            self.check_effect_action(&path, statement)?;
        }

        if let Some(expected) = &self.principal {
            if !statements.iter().any(|s| principal_contains(s, expected)) {
                let found: Vec<Value> =
                    statements.iter().map(|s| s.get("Principal").cloned().unwrap_or(Value::Null)).collect();
                let expected: Map<String, Value> =
                    expected.iter().map(|(k, v)| (k.clone(), Value::from(v.as_str()))).collect();
                let expected = format!("a Principal containing {}", Value::Object(expected));
                return Err(mismatch(&KeyPath::from(["Statement"]), expected, &Value::Array(found)));
            }
        }

        if let Some(resource) = &self.resource {
            let pattern = Pattern::new(resource)?;
            if !statements.iter().any(|s| s.get("Resource").map(|r| resource_matches(r, &pattern)).unwrap_or(false)) {
                let found: Vec<Value> =
                    statements.iter().map(|s| s.get("Resource").cloned().unwrap_or(Value::Null)).collect();
                let expected = format!("a Resource matching {}", pattern);
                return Err(mismatch(&KeyPath::from(["Statement"]), expected, &Value::Array(found)));
            }
        }

        Ok(())
    }

    fn check_effect_action(&self, path: &KeyPath, statement: &Map<String, Value>) -> Result<(), AssertError> {
        let effect_path = path.child("Effect");
        let effect = statement.get("Effect").ok_or_else(|| AssertError::MissingPath {
            path: path.clone(),
            segment: "Effect".to_string(),
        })?;
        let expected_effect = self.effect.to_string();
        if effect.as_str() != Some(expected_effect.as_str()) {
            return Err(mismatch(&effect_path, describe(&Value::from(expected_effect)), effect));
        }

        let action_path = path.child("Action");
        let action = statement.get("Action").ok_or_else(|| AssertError::MissingPath {
            path: path.clone(),
            segment: "Action".to_string(),
        })?;
        let carries_action = match action {
            Value::String(a) => a == &self.action,
            Value::Array(_) => Expected::literal(self.action.as_str()).matches(action),
            _ => false,
        };
        if !carries_action {
            return Err(mismatch(&action_path, describe(&Value::from(self.action.as_str())), action));
        }

        Ok(())
    }
}

/// The statements of a policy document. A single statement written as a mapping counts as one statement.
fn statements(document: &Value) -> Result<Vec<&Map<String, Value>>, AssertError> {
    let path = KeyPath::from(["Statement"]);
    let raw = match path.extract_optional(document)? {
        None | Some(Value::Null) => {
            return Err(AssertError::EmptyCollection {
                path,
            })
        }
        Some(raw) => raw,
    };

    let elements: Vec<&Value> = match raw {
        Value::Array(elements) => elements.iter().collect(),
        Value::Object(_) => vec![raw],
        other => {
            return Err(AssertError::TypeMismatch {
                path,
                expected: ValueKind::Sequence,
                found: ValueKind::of(other),
            })
        }
    };

    if elements.is_empty() {
        return Err(AssertError::EmptyCollection {
            path,
        });
    }

    let mut result = Vec::with_capacity(elements.len());
    for (i, element) in elements.into_iter().enumerate() {
        match element {
            Value::Object(map) => result.push(map),
            other => {
                return Err(AssertError::TypeMismatch {
                    path: path.child(i),
                    expected: ValueKind::Mapping,
                    found: ValueKind::of(other),
                })
            }
        }
    }

    Ok(result)
}

fn principal_contains(statement: &Map<String, Value>, expected: &BTreeMap<String, String>) -> bool {
    match statement.get("Principal") {
        Some(Value::Object(principal)) => expected.iter().all(|(key, value)| match principal.get(key) {
            Some(actual) => Expected::literal(value.as_str()).matches(actual),
            None => false,
        }),
        _ => false,
    }
}

fn resource_matches(resource: &Value, pattern: &Pattern) -> bool {
    match resource {
        Value::String(s) => pattern.is_match(s),
        Value::Array(resources) => resources.iter().any(|r| resource_matches(r, pattern)),
        Value::Object(_) => match Reference::from_value(resource) {
            Some(reference) => reference.matches(pattern),
            None => false,
        },
        _ => false,
    }
}

fn mismatch<E: Display>(path: &KeyPath, expected: E, found: &Value) -> AssertError {
    debug!("Policy mismatch at {}: expected {}, found {}", path, expected, describe(found));
    AssertError::ValueMismatch {
        path: path.clone(),
        expected: expected.to_string(),
        found: describe(found),
    }
}
