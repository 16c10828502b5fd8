use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::test::TestConfig;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTestPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub subject_id: Option<Uuid>,
    pub instructions: Option<String>,
    pub available_from: Option<DateTime<Utc>>,
    pub passing_score: rust_decimal::Decimal,
    pub config: TestConfig,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTestPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub subject_id: Option<Uuid>,
    pub instructions: Option<String>,
    pub available_from: Option<DateTime<Utc>>,
    pub passing_score: Option<rust_decimal::Decimal>,
    pub config: Option<TestConfig>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GradeAnswerRequest {
    pub question_id: i32,
    #[validate(range(min = 0))]
    pub marks_awarded: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignmentPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub subject_id: Option<Uuid>,
    pub description: Option<String>,
    pub due_at: Option<DateTime<Utc>>,
    pub max_score: rust_decimal::Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GradeAssignmentRequest {
    pub score: rust_decimal::Decimal,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAssignmentRequest {
    #[validate(length(min = 1))]
    pub body: String,
}
