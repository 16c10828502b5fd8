use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::question::Question;
use crate::models::submission::TestSubmission;
use crate::models::test::{Test, TestConfig};
use crate::services::test_service::{StudentTestItem, StudentTestSummary};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentTestList {
    pub tests: Vec<StudentTestItem>,
    pub summary: StudentTestSummary,
}

/// Full test definition handed to a student opening the test. Correct
/// answers never leave the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentTestDetail {
    pub id: Uuid,
    pub title: String,
    pub instructions: Option<String>,
    pub subject_id: Option<Uuid>,
    pub status: String,
    pub available_from: Option<DateTime<Utc>>,
    pub duration_minutes: i64,
    pub questions: Vec<Question>,
    pub max_score: rust_decimal::Decimal,
    pub passing_score: rust_decimal::Decimal,
    pub allow_retake: bool,
    pub show_results_immediately: bool,
    pub shuffle_questions: bool,
    pub shuffle_options: bool,
}

impl StudentTestDetail {
    pub fn from_test(test: &Test, config: &TestConfig) -> Self {
        Self {
            id: test.id,
            title: test.title.clone(),
            instructions: test.instructions.clone(),
            subject_id: test.subject_id,
            status: test.status.clone(),
            available_from: test.available_from,
            duration_minutes: config.duration_minutes,
            questions: config.questions.iter().map(Question::without_answer).collect(),
            max_score: test.max_score,
            passing_score: test.passing_score,
            allow_retake: config.allow_retake,
            show_results_immediately: config.show_results_immediately,
            shuffle_questions: config.shuffle_questions,
            shuffle_options: config.shuffle_options,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTestResult {
    pub submission_id: Uuid,
    pub status: String,
    pub auto_submit: bool,
    pub show_results: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<rust_decimal::Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_score: Option<rust_decimal::Decimal>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResultView {
    pub submission_id: Uuid,
    pub test_id: Uuid,
    pub status: String,
    pub time_spent_seconds: i32,
    pub auto_submit: bool,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<rust_decimal::Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_score: Option<rust_decimal::Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graded_answers: Option<JsonValue>,
}

impl TestResultView {
    /// Results are withheld while grading is pending unless the test shows
    /// them immediately.
    pub fn from_submission(
        submission: &TestSubmission,
        passing_score: rust_decimal::Decimal,
        show_results: bool,
    ) -> Self {
        let reveal = show_results || submission.status == crate::models::submission::SUBMISSION_GRADED;
        let passed = if reveal {
            match (submission.score, submission.max_score) {
                (Some(score), Some(_)) => Some(score >= passing_score),
                _ => None,
            }
        } else {
            None
        };
        Self {
            submission_id: submission.id,
            test_id: submission.test_id,
            status: submission.status.clone(),
            time_spent_seconds: submission.time_spent_seconds,
            auto_submit: submission.auto_submit,
            submitted_at: submission.submitted_at,
            score: if reveal { submission.score } else { None },
            max_score: if reveal { submission.max_score } else { None },
            passed,
            graded_answers: if reveal {
                submission.graded_answers.clone()
            } else {
                None
            },
        }
    }
}
