use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::question::Question;

pub const TEST_DRAFT: &str = "draft";
pub const TEST_PUBLISHED: &str = "published";
pub const TEST_CLOSED: &str = "closed";
pub const TEST_CANCELLED: &str = "cancelled";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Test {
    pub id: Uuid,
    pub school_id: Uuid,
    pub subject_id: Option<Uuid>,
    pub title: String,
    pub instructions: Option<String>,
    pub status: String,
    pub available_from: Option<DateTime<Utc>>,
    /// Structured test configuration (see [`TestConfig`]). First-class
    /// column; legacy records that shipped the config as an opaque blob go
    /// through [`TestConfig::from_legacy_blob`] on import.
    pub config: JsonValue,
    pub max_score: rust_decimal::Decimal,
    pub passing_score: rust_decimal::Decimal,
    pub created_by: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Test {
    pub fn config(&self) -> TestConfig {
        TestConfig::from_value(&self.config)
    }

    /// Moment after which submissions stop being accepted (before grace).
    pub fn closes_at(&self) -> Option<DateTime<Utc>> {
        self.available_from
            .map(|from| from + Duration::minutes(self.config().duration_minutes))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TestConfig {
    #[serde(rename = "duration")]
    pub duration_minutes: i64,
    pub questions: Vec<Question>,
    pub allow_retake: bool,
    pub show_results_immediately: bool,
    pub shuffle_questions: bool,
    pub shuffle_options: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            duration_minutes: 60,
            questions: Vec::new(),
            allow_retake: false,
            show_results_immediately: true,
            shuffle_questions: false,
            shuffle_options: false,
        }
    }
}

impl TestConfig {
    /// Parse a stored config column. A malformed record degrades to the
    /// defaults instead of failing the whole page.
    pub fn from_value(value: &JsonValue) -> TestConfig {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    /// Parse a config blob embedded in a legacy attachments field.
    pub fn from_legacy_blob(raw: &str) -> TestConfig {
        serde_json::from_str(raw).unwrap_or_default()
    }

    pub fn total_marks(&self) -> i32 {
        self.questions.iter().map(|q| q.marks).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_config_degrades_to_defaults() {
        for raw in ["not json at all", "{\"duration\": \"soon\"}", ""] {
            let cfg = TestConfig::from_legacy_blob(raw);
            assert_eq!(cfg, TestConfig::default());
        }
        let cfg = TestConfig::from_value(&serde_json::json!(42));
        assert_eq!(cfg.duration_minutes, 60);
        assert!(cfg.questions.is_empty());
        assert!(!cfg.allow_retake);
        assert!(cfg.show_results_immediately);
        assert!(!cfg.shuffle_questions);
        assert!(!cfg.shuffle_options);
    }

    #[test]
    fn partial_config_keeps_field_defaults() {
        let cfg = TestConfig::from_value(&serde_json::json!({"duration": 25}));
        assert_eq!(cfg.duration_minutes, 25);
        assert!(cfg.show_results_immediately);
    }
}
