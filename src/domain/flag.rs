use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rollout percentage that admits every user.
pub const FULL_ROLLOUT: u8 = 100;

/// Rejected rollout percentage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rollout percentage must be within 0..=100, got {0}")]
pub struct InvalidRollout(pub i64);

/// Validate a raw rollout percentage coming from a request or a database row.
pub fn parse_rollout(raw: i64) -> Result<u8, InvalidRollout> {
    if (0..=i64::from(FULL_ROLLOUT)).contains(&raw) {
        Ok(raw as u8)
    } else {
        Err(InvalidRollout(raw))
    }
}

/// A named on/off toggle with a gradual rollout percentage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flag {
    /// Unique flag name
    pub name: String,

    /// Free text description
    #[serde(default)]
    pub description: Option<String>,

    /// Master switch; a disabled flag is off for everyone
    pub enabled: bool,

    /// Share of users (by bucket) admitted when no targeting rule matches
    pub rollout_percentage: u8,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Flag {
    /// Create a disabled, fully rolled out flag.
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        let now = Utc::now();
        Flag {
            name: name.into(),
            description,
            enabled: false,
            rollout_percentage: FULL_ROLLOUT,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.updated_at = Utc::now();
    }

    pub fn set_rollout_percentage(&mut self, percentage: u8) -> Result<(), InvalidRollout> {
        if percentage > FULL_ROLLOUT {
            return Err(InvalidRollout(i64::from(percentage)));
        }
        self.rollout_percentage = percentage;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Returns true if rollout admits every user without bucketing.
    #[inline]
    pub fn is_fully_rolled_out(&self) -> bool {
        self.rollout_percentage >= FULL_ROLLOUT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_flag_defaults() {
        let flag = Flag::new("beta", Some("beta program".to_string()));

        assert!(!flag.enabled);
        assert_eq!(flag.rollout_percentage, 100);
        assert!(flag.is_fully_rolled_out());
        assert_eq!(flag.created_at, flag.updated_at);
    }

    #[test]
    fn test_mutations_refresh_updated_at() {
        let mut flag = Flag::new("beta", None);
        let created = flag.updated_at;

        std::thread::sleep(std::time::Duration::from_millis(2));
        flag.set_enabled(true);
        assert!(flag.updated_at > created);

        let after_toggle = flag.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(2));
        flag.set_rollout_percentage(25).unwrap();
        assert!(flag.updated_at > after_toggle);
        assert_eq!(flag.rollout_percentage, 25);
        assert!(!flag.is_fully_rolled_out());
    }

    #[test]
    fn test_rollout_bounds() {
        let mut flag = Flag::new("beta", None);

        assert_eq!(flag.set_rollout_percentage(101), Err(InvalidRollout(101)));
        assert_eq!(flag.rollout_percentage, 100);

        assert_eq!(parse_rollout(0), Ok(0));
        assert_eq!(parse_rollout(100), Ok(100));
        assert_eq!(parse_rollout(-1), Err(InvalidRollout(-1)));
        assert_eq!(parse_rollout(250), Err(InvalidRollout(250)));
    }

    #[test]
    fn test_flag_serialization() {
        let flag = Flag::new("beta", None);
        let json = serde_json::to_string(&flag).unwrap();

        assert!(json.contains("\"rolloutPercentage\":100"));
        assert!(json.contains("\"enabled\":false"));
        assert!(json.contains("\"createdAt\""));
    }
}
