//! Deployment stage label carried on every directive and result (spec §3, §6).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Deployment environment label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Dev,
    Stage,
    Prod,
}

impl Stage {
    /// Short string used in secret names and log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Dev => "dev",
            Stage::Stage => "stage",
            Stage::Prod => "prod",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = ra_error::RezError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(Stage::Dev),
            "stage" => Ok(Stage::Stage),
            "prod" => Ok(Stage::Prod),
            other => Err(ra_error::RezError::validation(format!("unknown stage: {other}"))),
        }
    }
}
