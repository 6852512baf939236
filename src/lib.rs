//! Structural assertions over synthesized CloudFormation template documents.
//!
//! A [Template] holds the `Resources` of a synthesized template. Select one resource by type and logical-id pattern
//! and chain checks on it:
//!
//! ```
//! use {scratchstack_template_assert::Template, std::str::FromStr};
//!
//! let template = Template::from_str(
//!     r#"{"Resources": {"Topic1A2B3C4D": {
//!         "Type": "AWS::SNS::Topic",
//!         "Properties": {"Tags": [{"Key": "ENV", "Value": "test"}]},
//!         "DependsOn": ["RoleABC123"]
//!     }}}"#,
//! )
//! .unwrap();
//!
//! template
//!     .assert_that()
//!     .contains_resource("AWS::SNS::Topic", "^Topic[a-zA-Z0-9]{8}$")
//!     .has_tag("ENV", "test")
//!     .has_dependency("^Role[A-Za-z0-9]+$")
//!     .verify();
//! ```
#![warn(clippy::all)]
pub(crate) mod assert;
pub(crate) mod document;
pub(crate) mod effect;
pub(crate) mod error;
pub(crate) mod join;
pub(crate) mod matcher;
pub(crate) mod path;
pub(crate) mod policy;
pub(crate) mod reference;
pub(crate) mod template;
pub(crate) mod value;

#[macro_use]
pub(crate) mod serutil;

pub use {
    assert::DocumentAssert,
    document::ResourceDocument,
    effect::Effect,
    error::AssertError,
    join::{flatten, JoinExpression, PARTITION_PLACEHOLDER, REGION_PLACEHOLDER},
    matcher::{Expected, Pattern},
    path::{IntoKeyPath, KeyPath, PathSegment},
    policy::{PolicyExpectation, PolicyExpectationBuilder, PolicyExpectationBuilderError, PolicyVersion},
    reference::Reference,
    template::{Template, TemplateAssert},
    value::ValueKind,
};
