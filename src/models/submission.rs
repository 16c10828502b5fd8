use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

pub const SUBMISSION_PENDING: &str = "pending";
pub const SUBMISSION_GRADED: &str = "graded";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestSubmission {
    pub id: Uuid,
    pub test_id: Uuid,
    pub student_id: Uuid,
    /// Map of question id -> answer value, exactly as submitted.
    pub answers: JsonValue,
    pub graded_answers: Option<JsonValue>,
    pub score: Option<rust_decimal::Decimal>,
    pub max_score: Option<rust_decimal::Decimal>,
    pub status: String,
    pub time_spent_seconds: i32,
    pub auto_submit: bool,
    pub submitted_at: DateTime<Utc>,
    pub graded_by: Option<Uuid>,
    pub graded_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
