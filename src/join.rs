use {
    crate::Reference,
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

/// The placeholder for the deployment partition; flattens to `aws`.
pub const PARTITION_PLACEHOLDER: &str = "AWS::Partition";

/// The placeholder for the deployment region; flattens to nothing.
pub const REGION_PLACEHOLDER: &str = "AWS::Region";

/// A deferred string concatenation (`Fn::Join`).
///
/// This holds the payload of the `Fn::Join` intrinsic, normally `[delimiter, [part, ...]]`, where each part is a
/// literal string, a nested reference, or a further nested sequence. Any other shape is treated as a bare sequence of
/// segments.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct JoinExpression {
    payload: Value,
}

impl JoinExpression {
    #[inline]
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
        }
    }

    /// Recognize `{"Fn::Join": payload}`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(map) if map.len() == 1 => map.get("Fn::Join").map(|payload| Self::new(payload.clone())),
            _ => None,
        }
    }

    #[inline]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Flatten to a literal string, applying the placeholder substitutions.
    ///
    /// A `[delimiter, [parts...]]` payload joins the parts with the delimiter, so `[":", ["a", "b"]]` gives `a:b`.
    /// The same segments passed to [flatten] as a bare sequence are concatenated in order, giving `:ab`. The two
    /// only agree when the delimiter is empty.
    pub fn flatten(&self) -> String {
        substitute_placeholders(&join_payload(&self.payload))
    }
}

/// Flatten a join expression (or any segment value) into a literal string for comparison.
///
/// Accepts the `{"Fn::Join": ...}` form, a bare segment sequence, a single literal or a single reference. Absent or
/// null input flattens to the empty string. Unrecognized values contribute nothing.
pub fn flatten(value: Option<&Value>) -> String {
    let value = match value {
        None | Some(Value::Null) => return String::new(),
        Some(value) => value,
    };

    substitute_placeholders(&walked(value))
}

fn join_payload(payload: &Value) -> String {
    if let Value::Array(items) = payload {
        if let [Value::String(delimiter), Value::Array(parts)] = items.as_slice() {
            return parts.iter().map(walked).collect::<Vec<_>>().join(delimiter.as_str());
        }
    }

    walked(payload)
}

fn walked(value: &Value) -> String {
    let mut s = String::new();
    walk(value, &mut s);
    s
}

fn walk(value: &Value, out: &mut String) {
    match value {
        Value::String(s) => out.push_str(s),
        Value::Array(items) => {
            for item in items {
                walk(item, out);
            }
        }
        Value::Object(_) => match Reference::from_value(value) {
            Some(Reference::Join(expr)) => out.push_str(&join_payload(expr.payload())),
            Some(reference) => {
                if let Some(logical_id) = reference.logical_id() {
                    out.push_str(logical_id);
                }
            }
            None => (),
        },
        _ => (),
    }
}

fn substitute_placeholders(s: &str) -> String {
    s.replace(PARTITION_PLACEHOLDER, "aws").replace(REGION_PLACEHOLDER, "")
}

#[cfg(test)]
mod tests {
    use {
        super::flatten,
        crate::JoinExpression,
        indoc::indoc,
        pretty_assertions::assert_eq,
        serde_json::{json, Value},
    };

    #[test_log::test]
    fn test_flat_input() {
        assert_eq!(flatten(Some(&json!(["abc"]))), "abc");
        assert_eq!(flatten(Some(&json!("abc"))), "abc");
    }

    #[test_log::test]
    fn test_empty() {
        assert_eq!(flatten(None), "");
        assert_eq!(flatten(Some(&Value::Null)), "");
        assert_eq!(flatten(Some(&json!([]))), "");
        assert_eq!(flatten(Some(&json!({}))), "");
    }

    #[test_log::test]
    fn test_partition_placeholder() {
        let expr = json!(["arn:", {"Ref": "AWS::Partition"}, ":sns:::Topic"]);
        assert_eq!(flatten(Some(&expr)), "arn:aws:sns:::Topic");
    }

    #[test_log::test]
    fn test_source_arn() {
        let source_arn: Value = serde_json::from_str(indoc! { r#"
        {
            "Fn::Join": [
                "",
                [
                    "arn:",
                    {
                        "Ref": "AWS::Partition"
                    },
                    ":execute-api:",
                    {
                        "Ref": "AWS::Region"
                    },
                    ":ap-southeast-2:",
                    {
                        "Ref": "RestApi0C43BF4B"
                    },
                    "/",
                    {
                        "Ref": "RestApiDeploymentStageTest1234ABCD"
                    },
                    "/*/*"
                ]
            ]
        }"# })
        .unwrap();

        let expected = "arn:aws:execute-api::ap-southeast-2:RestApi0C43BF4B/RestApiDeploymentStageTest1234ABCD/*/*";
        assert_eq!(flatten(Some(&source_arn)), expected);
        assert_eq!(JoinExpression::from_value(&source_arn).unwrap().flatten(), expected);
    }

    #[test_log::test]
    fn test_delimiter() {
        let expr = JoinExpression::new(json!([":", ["arn", {"Ref": "AWS::Partition"}, "s3", "", "", "bucket"]]));
        assert_eq!(expr.flatten(), "arn:aws:s3:::bucket");
    }

    #[test_log::test]
    fn test_delimiter_join_vs_bare_sequence() {
        let payload = json!([":", ["a", "b"]]);
        assert_eq!(JoinExpression::new(payload.clone()).flatten(), "a:b");
        assert_eq!(flatten(Some(&json!({ "Fn::Join": payload.clone() }))), "a:b");
        assert_eq!(flatten(Some(&payload)), ":ab");

        let payload = json!(["", ["a", "b"]]);
        assert_eq!(JoinExpression::new(payload.clone()).flatten(), flatten(Some(&payload)));
    }

    #[test_log::test]
    fn test_nested_and_unrecognized() {
        let expr = json!([
            "a",
            ["b", ["c", {"Ref": "D"}]],
            {"Fn::GetAtt": ["Role1234", "Arn"]},
            {"Fn::Join": ["-", ["x", "y"]]},
            42,
            true,
            null,
            {"Fn::Sub": "ignored"}
        ]);
        assert_eq!(flatten(Some(&expr)), "abcDRole1234x-y");
    }

    #[test_log::test]
    fn test_from_value() {
        assert!(JoinExpression::from_value(&json!({"Ref": "X"})).is_none());
        assert!(JoinExpression::from_value(&json!("x")).is_none());
        let expr = JoinExpression::from_value(&json!({"Fn::Join": ["", ["a", "b"]]})).unwrap();
        assert_eq!(expr.payload(), &json!(["", ["a", "b"]]));
        assert_eq!(serde_json::to_value(&expr).unwrap(), json!(["", ["a", "b"]]));
    }
}
