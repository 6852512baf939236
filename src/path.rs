use {
    crate::{AssertError, ValueKind},
    log::trace,
    serde_json::Value,
    std::{
        fmt::{Display, Formatter, Result as FmtResult},
        str::FromStr,
    },
};

/// One step of a [KeyPath].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "[{}]", index),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// A path into a nested document, e.g. `Properties.Environment.Variables.ENV` or `Statement[0].Effect`.
///
/// Segments are separated by `.`; a segment may carry one or more bracketed sequence indices. Keys containing `::`
/// (such as `Fn::GetAtt`) need no escaping.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct KeyPath {
    segments: Vec<PathSegment>,
}

impl KeyPath {
    #[inline]
    pub fn root() -> Self {
        Self::default()
    }

    #[inline]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns a new path with `segment` appended.
    pub fn child<S: Into<PathSegment>>(&self, segment: S) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self {
            segments,
        }
    }

    /// Returns a new path consisting of this path followed by `other`.
    pub fn join(&self, other: &KeyPath) -> Self {
        let mut segments = Vec::with_capacity(self.len() + other.len());
        segments.extend_from_slice(&self.segments);
        segments.extend_from_slice(&other.segments);
        Self {
            segments,
        }
    }

    /// Walk `root` along this path.
    ///
    /// Fails with [AssertError::MissingPath] naming the first absent segment, or [AssertError::TypeMismatch] if a
    /// segment is applied to a value that cannot contain it. The path in either error is the prefix that did resolve.
    pub fn extract<'v>(&self, root: &'v Value) -> Result<&'v Value, AssertError> {
        let mut current = root;

        for (i, segment) in self.segments.iter().enumerate() {
            let prefix = || Self {
                segments: self.segments[..i].to_vec(),
            };

            trace!("extract: {} at {}", segment, prefix());

            current = match (segment, current) {
                (PathSegment::Key(key), Value::Object(map)) => match map.get(key) {
                    Some(v) => v,
                    None => {
                        return Err(AssertError::MissingPath {
                            path: prefix(),
                            segment: key.clone(),
                        })
                    }
                },
                (PathSegment::Index(index), Value::Array(seq)) => match seq.get(*index) {
                    Some(v) => v,
                    None => {
                        return Err(AssertError::MissingPath {
                            path: prefix(),
                            segment: segment.to_string(),
                        })
                    }
                },
                (PathSegment::Key(_), other) => {
                    return Err(AssertError::TypeMismatch {
                        path: prefix(),
                        expected: ValueKind::Mapping,
                        found: ValueKind::of(other),
                    })
                }
                (PathSegment::Index(_), other) => {
                    return Err(AssertError::TypeMismatch {
                        path: prefix(),
                        expected: ValueKind::Sequence,
                        found: ValueKind::of(other),
                    })
                }
            };
        }

        Ok(current)
    }

    /// Like [KeyPath::extract], but an absent final segment yields `None` instead of an error. Absent or mistyped
    /// intermediate segments still fail.
    pub fn extract_optional<'v>(&self, root: &'v Value) -> Result<Option<&'v Value>, AssertError> {
        match self.extract(root) {
            Ok(v) => Ok(Some(v)),
            Err(AssertError::MissingPath {
                path,
                ..
            }) if path.len() + 1 == self.len() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl Display for KeyPath {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        if self.segments.is_empty() {
            return f.write_str("$");
        }

        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 && matches!(segment, PathSegment::Key(_)) {
                f.write_str(".")?;
            }
            write!(f, "{}", segment)?;
        }

        Ok(())
    }
}

impl FromStr for KeyPath {
    type Err = AssertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments = Vec::new();
        if s.is_empty() || s == "$" {
            return Ok(Self::root());
        }

        for part in s.split('.') {
            let (key, mut rest) = match part.find('[') {
                Some(pos) => (&part[..pos], &part[pos..]),
                None => (part, ""),
            };

            if key.contains(']') || (key.is_empty() && rest.is_empty()) {
                return Err(AssertError::InvalidPath(s.to_string()));
            }

            if !key.is_empty() {
                segments.push(PathSegment::Key(key.to_string()));
            }

            while !rest.is_empty() {
                let close = match (rest.starts_with('['), rest.find(']')) {
                    (true, Some(close)) => close,
                    _ => return Err(AssertError::InvalidPath(s.to_string())),
                };

                let index = rest[1..close].parse::<usize>().map_err(|_| AssertError::InvalidPath(s.to_string()))?;
                segments.push(PathSegment::Index(index));
                rest = &rest[close + 1..];
            }
        }

        Ok(Self {
            segments,
        })
    }
}

impl<S: Into<PathSegment>> FromIterator<S> for KeyPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<&[&str]> for KeyPath {
    fn from(keys: &[&str]) -> Self {
        keys.iter().copied().collect()
    }
}

impl<const N: usize> From<[&str; N]> for KeyPath {
    fn from(keys: [&str; N]) -> Self {
        keys.into_iter().collect()
    }
}

/// Something that can be turned into a [KeyPath]: an existing path, an array of keys, or a textual path.
pub trait IntoKeyPath {
    fn into_key_path(self) -> Result<KeyPath, AssertError>;
}

impl IntoKeyPath for KeyPath {
    fn into_key_path(self) -> Result<KeyPath, AssertError> {
        Ok(self)
    }
}

impl IntoKeyPath for &KeyPath {
    fn into_key_path(self) -> Result<KeyPath, AssertError> {
        Ok(self.clone())
    }
}

impl IntoKeyPath for &str {
    fn into_key_path(self) -> Result<KeyPath, AssertError> {
        KeyPath::from_str(self)
    }
}

impl IntoKeyPath for String {
    fn into_key_path(self) -> Result<KeyPath, AssertError> {
        KeyPath::from_str(&self)
    }
}

impl<const N: usize> IntoKeyPath for [&str; N] {
    fn into_key_path(self) -> Result<KeyPath, AssertError> {
        Ok(KeyPath::from(self))
    }
}
