use crate::error::{Result, SalesPerformanceError};
use crate::schema::BucketGranularity;
use crate::utils::offset_from_hours;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    #[schemars(
        description = "Offset used when request parameters carry no utcHourDifference (e.g. 9 for KST)"
    )]
    pub default_utc_offset_hours: i32,

    #[schemars(description = "Bucket size used when the request does not name one")]
    pub granularity: BucketGranularity,

    #[schemars(description = "Maximum number of entries in best-product and best-option lists")]
    pub leaderboard_limit: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_utc_offset_hours: 0,
            granularity: BucketGranularity::Day,
            leaderboard_limit: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        offset_from_hours(self.default_utc_offset_hours).map_err(|_| {
            SalesPerformanceError::InvalidConfig(format!(
                "defaultUtcOffsetHours {} is outside ±23 hours",
                self.default_utc_offset_hours
            ))
        })?;

        if self.leaderboard_limit == Some(0) {
            return Err(SalesPerformanceError::InvalidConfig(
                "leaderboardLimit must be at least 1 when set".to_string(),
            ));
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(EngineConfig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "defaultUtcOffsetHours": 9 }"#).unwrap();
        assert_eq!(config.default_utc_offset_hours, 9);
        assert_eq!(config.granularity, BucketGranularity::Day);
        assert_eq!(config.leaderboard_limit, None);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "defaultUtcOffsetHours": 40 }"#),
            Err(SalesPerformanceError::InvalidConfig(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "leaderboardLimit": 0 }"#),
            Err(SalesPerformanceError::InvalidConfig(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str("not json"),
            Err(SalesPerformanceError::SerializationError(_))
        ));
    }

    #[test]
    fn test_from_path() {
        let path = std::env::temp_dir().join(format!(
            "sales-performance-config-{}.json",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, r#"{{ "granularity": "week", "leaderboardLimit": 5 }}"#).unwrap();

        let config = EngineConfig::from_path(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.granularity, BucketGranularity::Week);
        assert_eq!(config.leaderboard_limit, Some(5));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            EngineConfig::from_path("/nonexistent/sales-performance.json"),
            Err(SalesPerformanceError::IoError(_))
        ));
    }
}
