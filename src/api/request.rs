use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::admin::FlagUpdate;

/// Query parameter carrying the user identifier on evaluation requests.
pub const USER_ID_PARAM: &str = "userId";

/// Request to create a flag.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateFlagRequest {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,
}

/// Request to update a flag. Omitted fields are left unchanged.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFlagRequest {
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Kept wide so out-of-range values reach validation instead of failing
    /// deserialization.
    #[serde(default)]
    pub rollout_percentage: Option<i64>,
}

impl From<UpdateFlagRequest> for FlagUpdate {
    fn from(req: UpdateFlagRequest) -> Self {
        FlagUpdate {
            enabled: req.enabled,
            rollout_percentage: req.rollout_percentage,
        }
    }
}

/// Request to add a targeting rule to a flag.
#[derive(Debug, Serialize, Deserialize)]
pub struct AddRuleRequest {
    pub attribute: String,
    pub operator: String,
    pub value: String,
}

/// Split evaluation query parameters into the user id and the attribute map.
///
/// Every parameter other than `userId` becomes an attribute. Returns `None`
/// when `userId` is missing.
pub fn split_evaluation_params(
    mut params: HashMap<String, String>,
) -> Option<(String, HashMap<String, String>)> {
    let user_id = params.remove(USER_ID_PARAM)?;
    Some((user_id, params))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_deserialization() {
        let req: UpdateFlagRequest =
            serde_json::from_str(r#"{"enabled": true, "rolloutPercentage": 25}"#).unwrap();
        assert_eq!(req.enabled, Some(true));
        assert_eq!(req.rollout_percentage, Some(25));

        let req: UpdateFlagRequest = serde_json::from_str(r#"{"rolloutPercentage": -3}"#).unwrap();
        assert_eq!(req.enabled, None);
        assert_eq!(req.rollout_percentage, Some(-3));
    }

    #[test]
    fn test_create_request_description_optional() {
        let req: CreateFlagRequest = serde_json::from_str(r#"{"name": "beta"}"#).unwrap();

        assert_eq!(req.name, "beta");
        assert!(req.description.is_none());
    }

    #[test]
    fn test_split_evaluation_params() {
        let params: HashMap<String, String> = [
            ("userId", "u1"),
            ("plan", "gold"),
            ("country", "US"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let (user_id, attributes) = split_evaluation_params(params).unwrap();

        assert_eq!(user_id, "u1");
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes.get("plan").map(String::as_str), Some("gold"));
        assert!(!attributes.contains_key(USER_ID_PARAM));

        let missing = HashMap::from([("plan".to_string(), "gold".to_string())]);
        assert!(split_evaluation_params(missing).is_none());
    }
}
