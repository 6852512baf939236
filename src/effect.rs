use {
    crate::{AssertError, KeyPath},
    serde::{Deserialize, Serialize},
    std::{
        fmt::{Display, Formatter, Result as FmtResult},
        str::FromStr,
    },
};

/// The `Effect` of a policy statement.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "Allow",
            Self::Deny => "Deny",
        }
    }
}

impl Display for Effect {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for Effect {
    type Err = AssertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Allow" => Ok(Self::Allow),
            "Deny" => Ok(Self::Deny),
            _ => Err(AssertError::ValueMismatch {
                path: KeyPath::from(["Effect"]),
                expected: r#""Allow" or "Deny""#.to_string(),
                found: s.to_string(),
            }),
        }
    }
}
