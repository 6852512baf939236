use {
    crate::{
        display_json, from_str_json, serutil::deserialize_resources, AssertError, DocumentAssert, Pattern,
        ResourceDocument,
    },
    log::debug,
    serde::{Deserialize, Serialize},
    serde_json::Value,
    std::collections::BTreeMap,
};

/// A synthesized template: a `Resources` section mapping logical ids to resource documents, plus whatever other
/// top-level sections (`Parameters`, `Outputs`, ...) the synthesizer emitted.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    #[serde(deserialize_with = "deserialize_resources")]
    resources: BTreeMap<String, ResourceDocument>,

    #[serde(flatten)]
    sections: BTreeMap<String, Value>,
}

impl Template {
    #[inline]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[inline]
    pub fn resources(&self) -> &BTreeMap<String, ResourceDocument> {
        &self.resources
    }

    #[inline]
    pub fn resource(&self, logical_id: &str) -> Option<&ResourceDocument> {
        self.resources.get(logical_id)
    }

    /// Another top-level section, e.g. `Outputs`.
    #[inline]
    pub fn section(&self, name: &str) -> Option<&Value> {
        self.sections.get(name)
    }

    /// All resources of the given type, in logical id order.
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a ResourceDocument)> {
        self.resources
            .iter()
            .filter(move |(_, doc)| doc.resource_type() == Some(resource_type))
            .map(|(id, doc)| (id.as_str(), doc))
    }

    /// Resources of the given type whose logical id matches `pattern` in full, in logical id order.
    pub fn find_resources<'a>(
        &'a self,
        resource_type: &'a str,
        pattern: &'a Pattern,
    ) -> impl Iterator<Item = (&'a str, &'a ResourceDocument)> {
        self.resources_of_type(resource_type).filter(move |(id, _)| pattern.is_match(id))
    }

    #[inline]
    pub fn assert_that(&self) -> TemplateAssert<'_> {
        TemplateAssert {
            template: self,
            outcome: Ok(()),
        }
    }
}

display_json!(Template);
from_str_json!(Template);

/// Assertions over a whole template. [TemplateAssert::contains_resource] hands off to a [DocumentAssert] on the
/// selected resource.
#[derive(Clone, Debug)]
#[must_use = "an assertion chain does nothing until result() or verify() is called"]
pub struct TemplateAssert<'a> {
    template: &'a Template,
    outcome: Result<(), AssertError>,
}

impl<'a> TemplateAssert<'a> {
    /// Select the resource of `resource_type` whose logical id matches `id_pattern`. If several match, the first in
    /// logical id order is used.
    pub fn contains_resource(self, resource_type: &str, id_pattern: &str) -> DocumentAssert<'a> {
        if let Err(e) = self.outcome {
            return DocumentAssert::failed(e);
        }

        let pattern = match Pattern::new(id_pattern) {
            Ok(pattern) => pattern,
            Err(e) => return DocumentAssert::failed(e),
        };

        let mut found = self
            .template
            .resources
            .iter()
            .filter(|(id, doc)| doc.resource_type() == Some(resource_type) && pattern.is_match(id))
            .map(|(id, doc)| (id.as_str(), doc));
        match found.next() {
            Some((logical_id, doc)) => {
                let others: Vec<&str> = found.map(|(id, _)| id).collect();
                if !others.is_empty() {
                    debug!("{} also matched {}; using {}", id_pattern, others.join(", "), logical_id);
                }
                DocumentAssert::new(doc.as_value())
            }
            None => {
                debug!("No {} resource matched {}", resource_type, id_pattern);
                DocumentAssert::failed(AssertError::NoMatchingResource {
                    resource_type: resource_type.to_string(),
                    pattern: id_pattern.to_string(),
                })
            }
        }
    }

    /// The template has exactly `expected` resources of `resource_type`.
    pub fn has_resource_count(mut self, resource_type: &str, expected: usize) -> Self {
        if self.outcome.is_ok() {
            let found = self.template.resources_of_type(resource_type).count();
            if found != expected {
                self.outcome = Err(AssertError::CountMismatch {
                    resource_type: resource_type.to_string(),
                    expected,
                    found,
                });
            }
        }
        self
    }

    pub fn result(self) -> Result<(), AssertError> {
        self.outcome
    }

    #[track_caller]
    pub fn verify(self) {
        if let Err(e) = self.outcome {
            panic!("{}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        crate::{AssertError, Effect, KeyPath, Pattern, PolicyExpectation, Template},
        indoc::indoc,
        pretty_assertions::assert_eq,
        std::{collections::BTreeMap, str::FromStr},
    };

    const LAMBDA_STACK: &str = indoc! { r#"
    {
        "Description": "Lambda example",
        "Resources": {
            "FunctionServiceRole1A2B3C4D": {
                "Type": "AWS::IAM::Role",
                "Properties": {
                    "AssumeRolePolicyDocument": {
                        "Statement": [
                            {
                                "Action": "sts:AssumeRole",
                                "Effect": "Allow",
                                "Principal": {
                                    "Service": "lambda.amazonaws.com"
                                }
                            }
                        ],
                        "Version": "2012-10-17"
                    },
                    "ManagedPolicyArns": [
                        {
                            "Fn::Join": [
                                "",
                                [
                                    "arn:",
                                    {
                                        "Ref": "AWS::Partition"
                                    },
                                    ":iam::aws:policy/service-role/AWSLambdaBasicExecutionRole"
                                ]
                            ]
                        }
                    ],
                    "Tags": [
                        {
                            "Key": "ENVIRONMENT",
                            "Value": "test"
                        }
                    ]
                }
            },
            "FunctionServiceRoleDefaultPolicy5E6F7A8B": {
                "Type": "AWS::IAM::Policy",
                "Properties": {
                    "PolicyDocument": {
                        "Statement": [
                            {
                                "Action": "sns:Publish",
                                "Effect": "Allow",
                                "Resource": {
                                    "Ref": "FunctionDeadLetterTopic9C0D1E2F"
                                }
                            }
                        ],
                        "Version": "2012-10-17"
                    },
                    "PolicyName": "FunctionServiceRoleDefaultPolicy5E6F7A8B",
                    "Roles": [
                        {
                            "Ref": "FunctionServiceRole1A2B3C4D"
                        }
                    ]
                }
            },
            "FunctionDeadLetterTopic9C0D1E2F": {
                "Type": "AWS::SNS::Topic"
            },
            "Function76856677": {
                "Type": "AWS::Lambda::Function",
                "Properties": {
                    "Handler": "org.springframework.cloud.function.adapter.aws.FunctionInvoker::handleRequest",
                    "MemorySize": 512,
                    "Role": {
                        "Fn::GetAtt": [
                            "FunctionServiceRole1A2B3C4D",
                            "Arn"
                        ]
                    }
                },
                "DependsOn": [
                    "FunctionServiceRoleDefaultPolicy5E6F7A8B",
                    "FunctionServiceRole1A2B3C4D"
                ]
            }
        },
        "Parameters": {
            "BootstrapVersion": {
                "Type": "AWS::SSM::Parameter::Value<String>",
                "Default": "/cdk-bootstrap/hnb659fds/version"
            }
        }
    }"# };

    #[test_log::test]
    fn test_parse() {
        let t = Template::from_str(LAMBDA_STACK).unwrap();
        assert_eq!(t.description(), Some("Lambda example"));
        assert_eq!(t.resources().len(), 4);
        assert!(t.resource("Function76856677").is_some());
        assert!(t.resource("Function").is_none());
        assert!(t.section("Parameters").is_some());
        assert!(t.section("Outputs").is_none());

        let roles: Vec<&str> = t.resources_of_type("AWS::IAM::Role").map(|(id, _)| id).collect();
        assert_eq!(roles, vec!["FunctionServiceRole1A2B3C4D"]);

        let pattern = Pattern::new("^Function[a-zA-Z0-9]{8}$").unwrap();
        let functions: Vec<&str> = t.find_resources("AWS::Lambda::Function", &pattern).map(|(id, _)| id).collect();
        assert_eq!(functions, vec!["Function76856677"]);

        let reparsed = Template::from_str(&t.to_string()).unwrap();
        assert_eq!(reparsed, t);
    }

    #[test_log::test]
    fn test_parse_bad() {
        let e = Template::from_str(r#"{"Resources": {"My-Topic": {"Type": "AWS::SNS::Topic"}}}"#).unwrap_err();
        assert!(e.to_string().starts_with("invalid value: string \"My-Topic\""), "{}", e);

        let e = Template::from_str(r#"{"Description": "no resources"}"#).unwrap_err();
        assert!(e.to_string().starts_with("missing field `Resources`"), "{}", e);

        let e = Template::from_str(r#"{"Resources": {"Topic": "AWS::SNS::Topic"}}"#).unwrap_err();
        assert!(e.is_data(), "{}", e);
    }

    #[test_log::test]
    fn test_function() {
        let t = Template::from_str(LAMBDA_STACK).unwrap();
        t.assert_that()
            .has_resource_count("AWS::Lambda::Function", 1)
            .contains_resource("AWS::Lambda::Function", "^Function[a-zA-Z0-9]{8}$")
            .has_value_matching(
                "Properties.Handler",
                r"org\.springframework\.cloud\.function\.adapter\.aws\..*::handleRequest",
            )
            .has_reference("Properties.Role", "^FunctionServiceRole[a-zA-Z0-9]{8}$")
            .has_dependency("^FunctionServiceRoleDefaultPolicy[a-zA-Z0-9]{8}$")
            .has_dependency("^FunctionServiceRole[a-zA-Z0-9]{8}$")
            .has_memory_size(512)
            .verify();
    }

    #[test_log::test]
    fn test_policy_and_role() {
        let t = Template::from_str(LAMBDA_STACK).unwrap();
        let policy_name = "^FunctionServiceRoleDefaultPolicy[a-zA-Z0-9]{8}$";

        let publish = PolicyExpectation::builder()
            .effect(Effect::Allow)
            .action("sns:Publish")
            .resource("^FunctionDeadLetterTopic[a-zA-Z0-9]{8}$")
            .build()
            .unwrap();
        t.assert_that()
            .contains_resource("AWS::IAM::Policy", policy_name)
            .has_value_matching("Properties.PolicyName", policy_name)
            .has_reference("Properties.Roles", "^FunctionServiceRole[a-zA-Z0-9]{8}$")
            .has_policy("Properties.PolicyDocument", &publish)
            .verify();

        let assume = PolicyExpectation::builder()
            .effect(Effect::Allow)
            .action("sts:AssumeRole")
            .principal(BTreeMap::from([("Service".to_string(), "lambda.amazonaws.com".to_string())]))
            .build()
            .unwrap();
        t.assert_that()
            .contains_resource("AWS::IAM::Role", "^FunctionServiceRole[a-zA-Z0-9]{8}$")
            .has_join_matching(
                "Properties.ManagedPolicyArns[0]",
                "^arn:aws:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole$",
            )
            .has_policy("Properties.AssumeRolePolicyDocument", &assume)
            .has_tag("ENVIRONMENT", "test")
            .verify();
    }

    #[test_log::test]
    fn test_missing_resource() {
        let t = Template::from_str(LAMBDA_STACK).unwrap();
        let e = t
            .assert_that()
            .contains_resource("AWS::SQS::Queue", "^Queue[a-zA-Z0-9]{8}$")
            .has_memory_size(512)
            .result()
            .unwrap_err();
        assert_eq!(
            e,
            AssertError::NoMatchingResource {
                resource_type: "AWS::SQS::Queue".to_string(),
                pattern: "^Queue[a-zA-Z0-9]{8}$".to_string(),
            }
        );

        // The type has to match as well as the logical id.
        let e = t.assert_that().contains_resource("AWS::SNS::Topic", "^Function[a-zA-Z0-9]{8}$").result().unwrap_err();
        assert!(matches!(e, AssertError::NoMatchingResource { .. }));

        let e = t.assert_that().contains_resource("AWS::SNS::Topic", "Function[").result().unwrap_err();
        assert_eq!(e, AssertError::InvalidPattern("Function[".to_string()));
    }

    #[test_log::test]
    fn test_first_match_in_logical_id_order() {
        let t = Template::from_str(indoc! { r#"
        {
            "Resources": {
                "TopicB": {
                    "Type": "AWS::SNS::Topic",
                    "Properties": {
                        "N": "b"
                    }
                },
                "TopicA": {
                    "Type": "AWS::SNS::Topic",
                    "Properties": {
                        "N": "a"
                    }
                }
            }
        }"# })
        .unwrap();

        t.assert_that().contains_resource("AWS::SNS::Topic", "^Topic[AB]$").has_value("Properties.N", "a").verify();

        let e = t
            .assert_that()
            .contains_resource("AWS::SNS::Topic", "^Topic[AB]$")
            .has_value("Properties.N", "b")
            .result()
            .unwrap_err();
        assert_eq!(
            e,
            AssertError::ValueMismatch {
                path: KeyPath::from(["Properties", "N"]),
                expected: r#""b""#.to_string(),
                found: r#""a""#.to_string(),
            }
        );

        t.assert_that().contains_resource("AWS::SNS::Topic", "^TopicB$").has_value("Properties.N", "b").verify();
    }

    #[test_log::test]
    fn test_resource_count() {
        let t = Template::from_str(LAMBDA_STACK).unwrap();
        t.assert_that().has_resource_count("AWS::SQS::Queue", 0).has_resource_count("AWS::SNS::Topic", 1).verify();

        let e = t
            .assert_that()
            .has_resource_count("AWS::SNS::Topic", 2)
            .contains_resource("AWS::SNS::Topic", ".*")
            .result()
            .unwrap_err();
        assert_eq!(
            e,
            AssertError::CountMismatch {
                resource_type: "AWS::SNS::Topic".to_string(),
                expected: 2,
                found: 1,
            }
        );
    }
}
