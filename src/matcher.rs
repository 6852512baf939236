use {
    crate::{
        value::{as_elements, describe},
        AssertError, KeyPath,
    },
    log::debug,
    regex::{Regex, RegexBuilder},
    serde_json::Value,
    std::fmt::{Display, Formatter, Result as FmtResult},
};

/// A compiled, anchored regular expression. The whole string must match, not just a substring.
#[derive(Clone, Debug)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new<S: AsRef<str>>(source: S) -> Result<Self, AssertError> {
        let source = source.as_ref();
        let anchored = format!("^(?:{})$", source);
        match RegexBuilder::new(&anchored).build() {
            Ok(regex) => Ok(Self {
                source: source.to_string(),
                regex,
            }),
            Err(e) => {
                debug!("Failed to compile pattern {}: {}", source, e);
                Err(AssertError::InvalidPattern(source.to_string()))
            }
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    #[inline]
    pub fn is_match(&self, s: &str) -> bool {
        self.regex.is_match(s)
    }
}

impl Display for Pattern {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "/{}/", self.source)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Pattern {}

/// What an extracted value is compared against.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Expected {
    /// Exact equality on type and value. No coercion: `512` does not equal `"512"`.
    Literal(Value),

    /// Anchored regular expression over string values.
    Pattern(Pattern),
}

impl Expected {
    #[inline]
    pub fn literal<V: Into<Value>>(value: V) -> Self {
        Self::Literal(value.into())
    }

    #[inline]
    pub fn pattern<S: AsRef<str>>(pattern: S) -> Result<Self, AssertError> {
        Ok(Self::Pattern(Pattern::new(pattern)?))
    }

    /// Does `actual` satisfy this expectation?
    ///
    /// If `actual` is a sequence, this is an existential match: it succeeds if any element satisfies the
    /// expectation. A literal sequence is also allowed to equal the whole sequence.
    pub fn matches(&self, actual: &Value) -> bool {
        match self {
            Self::Literal(expected) => {
                expected == actual || (actual.is_array() && as_elements(actual).into_iter().any(|v| v == expected))
            }
            Self::Pattern(pattern) => as_elements(actual).into_iter().any(|v| match v {
                Value::String(s) => pattern.is_match(s),
                _ => false,
            }),
        }
    }

    /// Like [Expected::matches], but produces a [AssertError::ValueMismatch] at `path` on failure.
    pub fn check(&self, path: &KeyPath, actual: &Value) -> Result<(), AssertError> {
        if self.matches(actual) {
            Ok(())
        } else {
            debug!("Mismatch at {}: expected {}, found {}", path, self, describe(actual));
            Err(AssertError::ValueMismatch {
                path: path.clone(),
                expected: self.to_string(),
                found: describe(actual),
            })
        }
    }
}

impl Display for Expected {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::Literal(value) => f.write_str(&describe(value)),
            Self::Pattern(pattern) => write!(f, "{}", pattern),
        }
    }
}

impl From<Pattern> for Expected {
    fn from(pattern: Pattern) -> Self {
        Self::Pattern(pattern)
    }
}

impl From<Value> for Expected {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}
