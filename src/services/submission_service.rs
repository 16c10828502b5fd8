use chrono::{Duration, Utc};
use serde_json::{Map, Value as JsonValue};
use sqlx::PgPool;
use uuid::Uuid;

use crate::attempt::SubmissionPayload;
use crate::error::{Error, Result};
use crate::models::submission::{TestSubmission, SUBMISSION_GRADED, SUBMISSION_PENDING};
use crate::models::test::{Test, TEST_CANCELLED, TEST_DRAFT};
use crate::services::grading_service::GradingService;

#[derive(Clone)]
pub struct SubmissionService {
    pool: PgPool,
}

impl SubmissionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, submission_id: Uuid) -> Result<TestSubmission> {
        let submission = sqlx::query_as::<_, TestSubmission>(
            r#"SELECT * FROM test_submissions WHERE id = $1"#,
        )
        .bind(submission_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Submission not found".to_string()))?;
        Ok(submission)
    }

    pub async fn find_for_student(
        &self,
        test_id: Uuid,
        student_id: Uuid,
    ) -> Result<Option<TestSubmission>> {
        let submission = sqlx::query_as::<_, TestSubmission>(
            r#"SELECT * FROM test_submissions WHERE test_id = $1 AND student_id = $2"#,
        )
        .bind(test_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(submission)
    }

    pub async fn list_for_test(&self, test_id: Uuid) -> Result<Vec<TestSubmission>> {
        let submissions = sqlx::query_as::<_, TestSubmission>(
            r#"SELECT * FROM test_submissions WHERE test_id = $1 ORDER BY submitted_at ASC"#,
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(submissions)
    }

    /// Accept a submission for `student_id`. Objective questions are scored
    /// here; theory answers leave the submission `pending` until a teacher
    /// grades them. One submission per (test, student): a duplicate is a
    /// conflict unless the test allows retakes, in which case the previous
    /// submission is replaced.
    ///
    /// The client timer is advisory only. The deadline is enforced here:
    /// anything arriving after `available_from + duration + grace` bounces.
    pub async fn submit(
        &self,
        test: &Test,
        student_id: Uuid,
        payload: &SubmissionPayload,
        grace_seconds: i64,
    ) -> Result<TestSubmission> {
        if test.status == TEST_DRAFT || test.status == TEST_CANCELLED {
            return Err(Error::BadRequest(format!(
                "Test is not open for submissions (status: {})",
                test.status
            )));
        }

        let now = Utc::now();
        if let Some(from) = test.available_from {
            if from > now {
                return Err(Error::BadRequest(
                    "Test has not opened yet".to_string(),
                ));
            }
        }
        if let Some(closes_at) = test.closes_at() {
            if now > closes_at + Duration::seconds(grace_seconds) {
                return Err(Error::Forbidden(
                    "Submission window has closed".to_string(),
                ));
            }
        }

        let config = test.config();
        let answers_map = to_answer_map(&payload.answers);
        let outcome = GradingService::grade_objective_only(&config.questions, &answers_map);
        let status = if outcome.needs_review {
            SUBMISSION_PENDING
        } else {
            SUBMISSION_GRADED
        };
        let score = rust_decimal::Decimal::from(outcome.earned_marks);
        let max_score = rust_decimal::Decimal::from(outcome.total_marks);
        let graded_json = serde_json::to_value(&outcome.graded_answers)?;
        let answers_json = JsonValue::Object(answers_map);

        // One atomic statement covers both the first submission and a
        // retake. With retakes disallowed the conflict arm is a no-op, no
        // row comes back, and the caller gets a 409; the previous
        // submission is never touched.
        let submission = sqlx::query_as::<_, TestSubmission>(
            r#"
            INSERT INTO test_submissions (
                test_id, student_id, answers, graded_answers, score, max_score,
                status, time_spent_seconds, auto_submit, submitted_at,
                graded_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6,
                $7, $8, $9, $10,
                CASE WHEN $7 = 'graded' THEN $10 ELSE NULL END
            )
            ON CONFLICT (test_id, student_id) DO UPDATE SET
                answers = EXCLUDED.answers,
                graded_answers = EXCLUDED.graded_answers,
                score = EXCLUDED.score,
                max_score = EXCLUDED.max_score,
                status = EXCLUDED.status,
                time_spent_seconds = EXCLUDED.time_spent_seconds,
                auto_submit = EXCLUDED.auto_submit,
                submitted_at = EXCLUDED.submitted_at,
                graded_by = NULL,
                graded_at = EXCLUDED.graded_at,
                updated_at = NOW()
            WHERE $11::bool
            RETURNING *
            "#,
        )
        .bind(test.id)
        .bind(student_id)
        .bind(answers_json)
        .bind(graded_json)
        .bind(score)
        .bind(max_score)
        .bind(status)
        .bind(payload.time_spent.min(i32::MAX as i64) as i32)
        .bind(payload.auto_submit)
        .bind(now)
        .bind(config.allow_retake)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::Conflict("Test has already been submitted".to_string()))?;

        tracing::info!(
            test_id = %test.id,
            student_id = %student_id,
            status = %submission.status,
            auto_submit = payload.auto_submit,
            "Submission stored"
        );

        Ok(submission)
    }

    /// Teacher grades one theory answer. When the last pending theory answer
    /// gets its marks the submission flips to `graded` and the final score
    /// is fixed.
    pub async fn grade_theory_answer(
        &self,
        submission_id: Uuid,
        question_id: i32,
        marks_awarded: i32,
        graded_by: Uuid,
    ) -> Result<TestSubmission> {
        let submission = self.get_by_id(submission_id).await?;
        let graded_val = submission
            .graded_answers
            .clone()
            .unwrap_or_else(|| serde_json::json!([]));
        let mut graded_answers: Vec<JsonValue> =
            serde_json::from_value(graded_val).unwrap_or_default();

        let mut found = false;
        let mut total = 0i64;
        let mut max = 0i64;

        for ans in graded_answers.iter_mut() {
            let q_id = ans.get("question_id").and_then(|v| v.as_i64());
            if q_id == Some(question_id as i64) {
                let max_marks = ans.get("max_marks").and_then(|v| v.as_i64()).unwrap_or(0) as i32;
                if ans.get("type").and_then(|v| v.as_str()) != Some("theory") {
                    return Err(Error::BadRequest(
                        "Only theory answers are graded manually".to_string(),
                    ));
                }
                let awarded = marks_awarded.clamp(0, max_marks);
                ans["marks_earned"] = serde_json::json!(awarded);
                ans["is_correct"] = serde_json::json!(awarded == max_marks);
                ans["needs_review"] = serde_json::json!(false);
                found = true;
            }
            total += ans.get("marks_earned").and_then(|v| v.as_i64()).unwrap_or(0);
            max += ans.get("max_marks").and_then(|v| v.as_i64()).unwrap_or(0);
        }

        if !found {
            return Err(Error::NotFound(
                "Question answer not found in submission".to_string(),
            ));
        }

        let still_pending = graded_answers
            .iter()
            .any(|a| a.get("needs_review").and_then(|v| v.as_bool()).unwrap_or(false));
        let status = if still_pending {
            SUBMISSION_PENDING
        } else {
            SUBMISSION_GRADED
        };

        let updated = sqlx::query_as::<_, TestSubmission>(
            r#"
            UPDATE test_submissions
            SET status = $2, graded_answers = $3, score = $4, max_score = $5,
                graded_by = $6,
                graded_at = CASE WHEN $2 = 'graded' THEN NOW() ELSE graded_at END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(submission_id)
        .bind(status)
        .bind(serde_json::to_value(&graded_answers)?)
        .bind(rust_decimal::Decimal::from(total))
        .bind(rust_decimal::Decimal::from(max))
        .bind(graded_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }
}

fn to_answer_map(answers: &std::collections::BTreeMap<i32, JsonValue>) -> Map<String, JsonValue> {
    answers
        .iter()
        .map(|(id, v)| (id.to_string(), v.clone()))
        .collect()
}
