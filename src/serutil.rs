use {
    crate::ResourceDocument,
    lazy_static::lazy_static,
    log::debug,
    regex::Regex,
    serde::de::{self, Deserializer, MapAccess, Unexpected, Visitor},
    std::{
        collections::BTreeMap,
        fmt::{Formatter, Result as FmtResult},
    },
};

lazy_static! {
    static ref LOGICAL_ID: Regex = Regex::new(r"^[A-Za-z0-9]+$").unwrap();
}

/// Implement Display for a given class by formatting it as JSON pretty-printed with a four-space indent.
#[macro_export]
macro_rules! display_json {
    ($cls:ident) => {
        impl std::fmt::Display for $cls {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                let formatter = ::serde_json::ser::PrettyFormatter::with_indent(b"    ");
                let mut ser = ::serde_json::Serializer::with_formatter(Vec::new(), formatter);
                if let Err(e) = ::serde::Serialize::serialize(self, &mut ser) {
                    ::log::error!("Failed to serialize {}: {}", stringify!($cls), e);
                    return Err(::std::fmt::Error {});
                }

                match String::from_utf8(ser.into_inner()) {
                    Ok(s) => f.write_str(&s),
                    Err(e) => {
                        ::log::error!("JSON serialization of {} was not UTF-8: {}", stringify!($cls), e);
                        Err(::std::fmt::Error {})
                    }
                }
            }
        }
    };
}

/// Implement FromStr for a given class by parsing it as JSON.
#[macro_export]
macro_rules! from_str_json {
    ($cls:ident) => {
        impl ::std::str::FromStr for $cls {
            type Err = ::serde_json::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                ::serde_json::from_str::<Self>(s).map_err(|e| {
                    ::log::debug!("Failed to parse {}: {:?}", stringify!($cls), e);
                    e
                })
            }
        }
    };
}

/// Is `id` a valid logical id (alphanumeric, non-empty)?
pub(crate) fn is_logical_id(id: &str) -> bool {
    LOGICAL_ID.is_match(id)
}

struct ResourcesVisitor {}

impl<'de> Visitor<'de> for ResourcesVisitor {
    type Value = BTreeMap<String, ResourceDocument>;

    fn expecting(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "map of alphanumeric logical ids to resource documents")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut result = BTreeMap::new();

        while let Some(logical_id) = access.next_key::<String>()? {
            if !is_logical_id(&logical_id) {
                debug!("Rejecting resource with invalid logical id: {:?}", logical_id);
                return Err(de::Error::invalid_value(Unexpected::Str(&logical_id), &self));
            }

            if result.contains_key(&logical_id) {
                return Err(de::Error::custom(format!("duplicate logical id `{}`", logical_id)));
            }

            let document = access.next_value::<ResourceDocument>()?;
            result.insert(logical_id, document);
        }

        Ok(result)
    }
}

/// Deserialize the `Resources` section of a template, validating logical ids.
pub(crate) fn deserialize_resources<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, ResourceDocument>, D::Error> {
    deserializer.deserialize_map(ResourcesVisitor {})
}
