use {
    crate::{KeyPath, ValueKind},
    std::{
        error::Error,
        fmt::{Display, Formatter, Result as FmtResult},
    },
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AssertError {
    /// A key (or index) along the path is absent. `path` is the path up to, but not including, `segment`.
    MissingPath {
        path: KeyPath,
        segment: String,
    },

    /// The value at `path` is not the kind of container (or scalar) the check needs.
    TypeMismatch {
        path: KeyPath,
        expected: ValueKind,
        found: ValueKind,
    },

    /// The value at `path` is present but does not satisfy the expectation.
    ValueMismatch {
        path: KeyPath,
        expected: String,
        found: String,
    },

    /// A sequence that must have at least one element is empty or absent.
    EmptyCollection {
        path: KeyPath,
    },

    InvalidPattern(String),
    InvalidPath(String),

    NoMatchingResource {
        resource_type: String,
        pattern: String,
    },

    CountMismatch {
        resource_type: String,
        expected: usize,
        found: usize,
    },
}

impl AssertError {
    /// Re-root the path carried by this error under `prefix`.
    pub(crate) fn within(self, prefix: &KeyPath) -> Self {
        if prefix.is_empty() {
            return self;
        }

        match self {
            Self::MissingPath {
                path,
                segment,
            } => Self::MissingPath {
                path: prefix.join(&path),
                segment,
            },
            Self::TypeMismatch {
                path,
                expected,
                found,
            } => Self::TypeMismatch {
                path: prefix.join(&path),
                expected,
                found,
            },
            Self::ValueMismatch {
                path,
                expected,
                found,
            } => Self::ValueMismatch {
                path: prefix.join(&path),
                expected,
                found,
            },
            Self::EmptyCollection {
                path,
            } => Self::EmptyCollection {
                path: prefix.join(&path),
            },
            other => other,
        }
    }
}

impl Display for AssertError {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::MissingPath {
                path,
                segment,
            } => {
                if path.is_empty() {
                    write!(f, "Missing path segment {}", segment)
                } else {
                    write!(f, "Missing path segment {} under {}", segment, path)
                }
            }
            Self::TypeMismatch {
                path,
                expected,
                found,
            } => write!(f, "Type mismatch at {}: expected {}, found {}", path, expected, found),
            Self::ValueMismatch {
                path,
                expected,
                found,
            } => write!(f, "Value mismatch at {}: expected {}, found {}", path, expected, found),
            Self::EmptyCollection {
                path,
            } => write!(f, "Empty or absent collection at {}", path),
            Self::InvalidPattern(pattern) => write!(f, "Invalid pattern: {}", pattern),
            Self::InvalidPath(path) => write!(f, "Invalid path: {}", path),
            Self::NoMatchingResource {
                resource_type,
                pattern,
            } => write!(f, "No resource of type {} with a logical id matching {}", resource_type, pattern),
            Self::CountMismatch {
                resource_type,
                expected,
                found,
            } => write!(f, "Expected {} resources of type {}, found {}", expected, resource_type, found),
        }
    }
}

impl Error for AssertError {}
