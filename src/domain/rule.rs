use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A condition on one user attribute that forces a flag on when it matches.
///
/// The operator is kept as the raw string it was created with. Names outside
/// the supported set are stored untouched and never match during evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetingRule {
    pub id: Uuid,

    /// Flag this rule belongs to
    pub flag_name: String,

    /// User attribute inspected by the rule
    pub attribute: String,

    /// Operator name (e.g. "equals", "in")
    pub operator: String,

    /// Right-hand operand; comma-separated list for "in"
    pub value: String,

    pub created_at: DateTime<Utc>,
}

impl TargetingRule {
    /// Create a rule with a fresh id.
    pub fn new(
        flag_name: impl Into<String>,
        attribute: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        TargetingRule {
            id: Uuid::new_v4(),
            flag_name: flag_name.into(),
            attribute: attribute.into(),
            operator: operator.into(),
            value: value.into(),
            created_at: Utc::now(),
        }
    }

    /// Short "attribute operator value" form used in reasons and logs.
    pub fn describe(&self) -> String {
        format!("{} {} {}", self.attribute, self.operator, self.value)
    }
}
