use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TerminationMode {
    #[default]
    Immediate,
    OnNextPayment,
}

impl TerminationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationMode::Immediate => "immediate",
            TerminationMode::OnNextPayment => "on_next_payment",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "immediate" => Some(TerminationMode::Immediate),
            "on_next_payment" => Some(TerminationMode::OnNextPayment),
            _ => None,
        }
    }
}

impl Display for TerminationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
