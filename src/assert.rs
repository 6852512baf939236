use {
    crate::{
        join::flatten,
        path::IntoKeyPath,
        value::{as_elements, describe},
        AssertError, Expected, KeyPath, Pattern, PolicyExpectation, Reference, ValueKind,
    },
    log::debug,
    serde_json::Value,
};

static NOTHING: Value = Value::Null;

/// A fluent assertion chain over one document (or a part of it).
///
/// Each check consumes the handle and returns it. The first failure is kept and every later check in the chain is
/// skipped. Finish the chain with [DocumentAssert::result] or [DocumentAssert::verify].
///
/// Resource-level helpers such as [DocumentAssert::has_tag] and [DocumentAssert::has_dependency] use paths relative
/// to the handle's root, which is the resource document unless the chain was narrowed with [DocumentAssert::at].
#[derive(Clone, Debug)]
#[must_use = "an assertion chain does nothing until result() or verify() is called"]
pub struct DocumentAssert<'a> {
    root: &'a Value,
    scope: KeyPath,
    outcome: Result<(), AssertError>,
}

impl<'a> DocumentAssert<'a> {
    pub fn new(root: &'a Value) -> Self {
        Self {
            root,
            scope: KeyPath::root(),
            outcome: Ok(()),
        }
    }

    /// A chain that has already failed; every check on it is skipped.
    pub(crate) fn failed(error: AssertError) -> Self {
        Self {
            root: &NOTHING,
            scope: KeyPath::root(),
            outcome: Err(error),
        }
    }

    #[inline]
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The first failure in the chain, if any.
    #[inline]
    pub fn error(&self) -> Option<&AssertError> {
        self.outcome.as_ref().err()
    }

    pub fn result(self) -> Result<(), AssertError> {
        self.outcome
    }

    /// Panic with the first failure in the chain, if any.
    #[track_caller]
    pub fn verify(self) {
        if let Err(e) = self.outcome {
            panic!("{}", e);
        }
    }

    fn check<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&'a Value) -> Result<(), AssertError>,
    {
        if self.outcome.is_ok() {
            if let Err(e) = f(self.root) {
                let e = e.within(&self.scope);
                debug!("Assertion failed: {}", e);
                self.outcome = Err(e);
            }
        }
        self
    }

    /// Narrow the chain to the value at `path`. Later checks are relative to that value; failures still report the
    /// full path.
    pub fn at<P: IntoKeyPath>(self, path: P) -> Self {
        if self.outcome.is_err() {
            return self;
        }

        let found = path.into_key_path().and_then(|path| Ok((path.extract(self.root)?, path)));
        match found {
            Ok((root, path)) => Self {
                root,
                scope: self.scope.join(&path),
                outcome: Ok(()),
            },
            Err(e) => {
                let e = e.within(&self.scope);
                debug!("Assertion failed: {}", e);
                Self::failed(e)
            }
        }
    }

    /// Narrow the chain to the resource's `Properties`.
    #[inline]
    pub fn properties(self) -> Self {
        self.at(["Properties"])
    }

    /// The value at `path` equals `expected` (exact type and value). A sequence matches if any element equals it.
    pub fn has_value<P: IntoKeyPath, V: Into<Value>>(self, path: P, expected: V) -> Self {
        let expected = Expected::literal(expected);
        self.check(|root| {
            let path = path.into_key_path()?;
            expected.check(&path, path.extract(root)?)
        })
    }

    /// The string at `path` (or any string element, for a sequence) matches `pattern` in full.
    pub fn has_value_matching<P: IntoKeyPath>(self, path: P, pattern: &str) -> Self {
        self.check(|root| {
            let path = path.into_key_path()?;
            let expected = Expected::pattern(pattern)?;
            expected.check(&path, path.extract(root)?)
        })
    }

    /// The value at `path` is a `Ref`, `Fn::GetAtt` or `Fn::Join` (or a sequence of them) that resolves to a string
    /// matching `pattern`.
    pub fn has_reference<P: IntoKeyPath>(self, path: P, pattern: &str) -> Self {
        self.check(|root| {
            let path = path.into_key_path()?;
            let pattern = Pattern::new(pattern)?;
            let actual = path.extract(root)?;
            let matched = as_elements(actual).into_iter().any(|v| match Reference::from_value(v) {
                Some(reference) => reference.matches(&pattern),
                None => false,
            });

            if matched {
                Ok(())
            } else {
                Err(AssertError::ValueMismatch {
                    path,
                    expected: format!("a reference matching {}", pattern),
                    found: describe(actual),
                })
            }
        })
    }

    /// The join expression at `path` flattens to a string matching `pattern`.
    pub fn has_join_matching<P: IntoKeyPath>(self, path: P, pattern: &str) -> Self {
        self.check(|root| {
            let path = path.into_key_path()?;
            let pattern = Pattern::new(pattern)?;
            let flattened = flatten(Some(path.extract(root)?));
            if pattern.is_match(&flattened) {
                Ok(())
            } else {
                Err(AssertError::ValueMismatch {
                    path,
                    expected: pattern.to_string(),
                    found: describe(&Value::from(flattened)),
                })
            }
        })
    }

    /// The policy document at `path` satisfies `expectation`.
    pub fn has_policy<P: IntoKeyPath>(self, path: P, expectation: &PolicyExpectation) -> Self {
        self.check(|root| {
            let path = path.into_key_path()?;
            expectation.validate(path.extract(root)?).map_err(|e| e.within(&path))
        })
    }

    pub fn has_type(self, resource_type: &str) -> Self {
        self.has_value(["Type"], resource_type)
    }

    /// `Properties.Tags` has a tag with this key and value.
    #[inline]
    pub fn has_tag<V: Into<Value>>(self, key: &str, value: V) -> Self {
        self.has_tag_in("Tags", key, value)
    }

    /// `Properties.<tags_key>` has a tag with this key and value.
    ///
    /// Tags are normally a sequence of `{"Key": ..., "Value": ...}` entries; a plain mapping of keys to values is
    /// also accepted. An empty or absent tag collection fails with [AssertError::EmptyCollection]. A tag whose key
    /// is present with another value fails with [AssertError::ValueMismatch]; an absent key fails with
    /// [AssertError::MissingPath].
    pub fn has_tag_in<V: Into<Value>>(self, tags_key: &str, key: &str, value: V) -> Self {
        let expected = value.into();
        self.check(|root| {
            let tags_path = KeyPath::from(["Properties", tags_key]);
            let tags = match tags_path.extract_optional(root)? {
                None | Some(Value::Null) => {
                    return Err(AssertError::EmptyCollection {
                        path: tags_path,
                    })
                }
                Some(tags) => tags,
            };

            match tags {
                Value::Array(entries) if entries.is_empty() => Err(AssertError::EmptyCollection {
                    path: tags_path,
                }),
                Value::Array(entries) => {
                    let mut wrong_value = None;
                    for (i, entry) in entries.iter().enumerate() {
                        if entry.get("Key").and_then(Value::as_str) != Some(key) {
                            continue;
                        }

                        let actual = entry.get("Value").unwrap_or(&NOTHING);
                        if actual == &expected {
                            return Ok(());
                        }

                        wrong_value.get_or_insert((i, actual));
                    }

                    match wrong_value {
                        Some((i, actual)) => Err(AssertError::ValueMismatch {
                            path: tags_path.child(i).child("Value"),
                            expected: describe(&expected),
                            found: describe(actual),
                        }),
                        None => Err(AssertError::MissingPath {
                            path: tags_path,
                            segment: key.to_string(),
                        }),
                    }
                }
                Value::Object(entries) if entries.is_empty() => Err(AssertError::EmptyCollection {
                    path: tags_path,
                }),
                Value::Object(_) => {
                    let tag_path = tags_path.child(key);
                    Expected::Literal(expected).check(&tag_path, tag_path.extract(root)?)
                }
                other => Err(AssertError::TypeMismatch {
                    path: tags_path,
                    expected: ValueKind::Sequence,
                    found: ValueKind::of(other),
                }),
            }
        })
    }

    /// `DependsOn` (a sequence, or a single logical id) has an entry matching `pattern`. An empty or absent
    /// `DependsOn` fails with [AssertError::EmptyCollection], as for tags.
    pub fn has_dependency(self, pattern: &str) -> Self {
        self.check(|root| {
            let path = KeyPath::from(["DependsOn"]);
            let pattern = Expected::pattern(pattern)?;
            match path.extract_optional(root)? {
                None | Some(Value::Null) => Err(AssertError::EmptyCollection {
                    path,
                }),
                Some(Value::Array(entries)) if entries.is_empty() => Err(AssertError::EmptyCollection {
                    path,
                }),
                Some(deps @ (Value::Array(_) | Value::String(_))) => pattern.check(&path, deps),
                Some(other) => Err(AssertError::TypeMismatch {
                    path,
                    expected: ValueKind::Sequence,
                    found: ValueKind::of(other),
                }),
            }
        })
    }

    pub fn has_update_replace_policy(self, expected: &str) -> Self {
        self.has_value(["UpdateReplacePolicy"], expected)
    }

    pub fn has_deletion_policy(self, expected: &str) -> Self {
        self.has_value(["DeletionPolicy"], expected)
    }

    /// `Properties.Environment.Variables.<key>` equals `value`.
    pub fn has_environment_variable(self, key: &str, value: &str) -> Self {
        self.has_value(["Properties", "Environment", "Variables", key], value)
    }

    pub fn has_description(self, expected: &str) -> Self {
        self.has_value(["Properties", "Description"], expected)
    }

    pub fn has_memory_size(self, expected: i64) -> Self {
        self.has_value(["Properties", "MemorySize"], expected)
    }

    pub fn has_runtime(self, expected: &str) -> Self {
        self.has_value(["Properties", "Runtime"], expected)
    }

    pub fn has_timeout(self, seconds: i64) -> Self {
        self.has_value(["Properties", "Timeout"], seconds)
    }
}
