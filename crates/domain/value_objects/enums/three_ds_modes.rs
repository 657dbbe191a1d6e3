use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// 3-D Secure behaviour requested for a charge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThreeDsMode {
    Normal,
    Require,
    Force,
    Skip,
}

impl ThreeDsMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreeDsMode::Normal => "normal",
            ThreeDsMode::Require => "require",
            ThreeDsMode::Force => "force",
            ThreeDsMode::Skip => "skip",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "normal" => Some(ThreeDsMode::Normal),
            "require" => Some(ThreeDsMode::Require),
            "force" => Some(ThreeDsMode::Force),
            "skip" => Some(ThreeDsMode::Skip),
            _ => None,
        }
    }
}

impl Display for ThreeDsMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
