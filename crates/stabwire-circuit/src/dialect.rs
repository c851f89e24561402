use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// Circuit language dialects understood on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    /// Extended CHP instruction set.
    #[default]
    #[serde(rename = "chpext")]
    ChpExt,
}

impl Dialect {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::ChpExt => "chpext",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chpext" => Ok(Dialect::ChpExt),
            other => Err(ParseError::UnknownDialect(other.to_string())),
        }
    }
}
