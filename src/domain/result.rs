use serde::{Serialize, Serializer};
use std::fmt;

/// Which path of the evaluation produced the decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    FlagNotFound,
    FlagDisabled,
    /// Rule rendered as "attribute operator value"
    RuleMatched(String),
    FullRollout,
    InRollout { bucket: u8, percentage: u8 },
    OutsideRollout { bucket: u8, percentage: u8 },
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::FlagNotFound => write!(f, "flag not found"),
            Reason::FlagDisabled => write!(f, "flag disabled"),
            Reason::RuleMatched(rule) => write!(f, "targeting rule matched: {}", rule),
            Reason::FullRollout => write!(f, "rollout 100%"),
            Reason::InRollout { bucket, percentage } => {
                write!(f, "in rollout bucket {} < {}%", bucket, percentage)
            }
            Reason::OutsideRollout { bucket, percentage } => {
                write!(f, "outside rollout bucket {} >= {}%", bucket, percentage)
            }
        }
    }
}

impl Serialize for Reason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Outcome of a flag evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvalResult {
    /// Final decision
    pub enabled: bool,

    /// Diagnostic explanation, serialized as text
    pub reason: Reason,
}

impl EvalResult {
    pub fn on(reason: Reason) -> Self {
        EvalResult {
            enabled: true,
            reason,
        }
    }

    pub fn off(reason: Reason) -> Self {
        EvalResult {
            enabled: false,
            reason,
        }
    }

    /// Reason rendered as text.
    pub fn reason_text(&self) -> String {
        self.reason.to_string()
    }
}
