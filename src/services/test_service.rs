use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::question::Question;
use crate::models::submission::{TestSubmission, SUBMISSION_GRADED};
use crate::models::test::{Test, TEST_CANCELLED, TEST_CLOSED, TEST_DRAFT, TEST_PUBLISHED};

/// One row of the student test listing, with the status computed in exactly
/// one place: here. The old stack split this between the server and a
/// client-side post-filter; every status value now derives from the
/// (test, own submission) pair server-side.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentTestItem {
    pub id: Uuid,
    pub title: String,
    pub subject_id: Option<Uuid>,
    pub status: &'static str,
    pub available_from: Option<DateTime<Utc>>,
    pub duration_minutes: i64,
    pub question_count: usize,
    pub max_score: rust_decimal::Decimal,
    pub passing_score: rust_decimal::Decimal,
    pub submission_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentTestSummary {
    pub total: usize,
    pub available: usize,
    pub upcoming: usize,
    pub completed: usize,
    pub pending: usize,
    pub not_submitted: usize,
}

#[derive(Clone)]
pub struct TestService {
    pool: PgPool,
}

impl TestService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_test(
        &self,
        payload: crate::dto::staff_dto::CreateTestPayload,
        school_id: Uuid,
        created_by: Uuid,
    ) -> Result<Test> {
        let mut config = payload.config;
        config.questions = assign_question_ids(config.questions);
        let max_score = rust_decimal::Decimal::from(config.total_marks());
        let config_json = serde_json::to_value(&config)?;

        let test = sqlx::query_as::<_, Test>(
            r#"
            INSERT INTO tests (
                school_id, subject_id, title, instructions, status,
                available_from, config, max_score, passing_score, created_by
            ) VALUES ($1, $2, $3, $4, 'draft', $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(school_id)
        .bind(payload.subject_id)
        .bind(&payload.title)
        .bind(&payload.instructions)
        .bind(payload.available_from)
        .bind(config_json)
        .bind(max_score)
        .bind(payload.passing_score)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(test)
    }

    pub async fn update_test(
        &self,
        test_id: Uuid,
        school_id: Uuid,
        payload: crate::dto::staff_dto::UpdateTestPayload,
    ) -> Result<Test> {
        let existing = self.get_test_for_school(test_id, school_id).await?;
        if existing.status != TEST_DRAFT {
            return Err(Error::BadRequest(
                "Only draft tests can be edited".to_string(),
            ));
        }

        let (config_json, max_score) = match payload.config {
            Some(mut config) => {
                config.questions = assign_question_ids(config.questions);
                let max = rust_decimal::Decimal::from(config.total_marks());
                (Some(serde_json::to_value(&config)?), Some(max))
            }
            None => (None, None),
        };

        let test = sqlx::query_as::<_, Test>(
            r#"
            UPDATE tests
            SET title = COALESCE($1, title),
                instructions = COALESCE($2, instructions),
                subject_id = COALESCE($3, subject_id),
                available_from = COALESCE($4, available_from),
                config = COALESCE($5, config),
                max_score = COALESCE($6, max_score),
                passing_score = COALESCE($7, passing_score),
                updated_at = NOW()
            WHERE id = $8 AND school_id = $9
            RETURNING *
            "#,
        )
        .bind(payload.title)
        .bind(payload.instructions)
        .bind(payload.subject_id)
        .bind(payload.available_from)
        .bind(config_json)
        .bind(max_score)
        .bind(payload.passing_score)
        .bind(test_id)
        .bind(school_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(test)
    }

    pub async fn get_test_for_school(&self, test_id: Uuid, school_id: Uuid) -> Result<Test> {
        let test = sqlx::query_as::<_, Test>(
            r#"SELECT * FROM tests WHERE id = $1 AND school_id = $2"#,
        )
        .bind(test_id)
        .bind(school_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Test not found".to_string()))?;
        Ok(test)
    }

    pub async fn list_tests_for_school(
        &self,
        school_id: Uuid,
        status: Option<String>,
        subject_id: Option<Uuid>,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<Test>, i64)> {
        let offset = (page - 1).max(0) * per_page;
        let tests = sqlx::query_as::<_, Test>(
            r#"
            SELECT * FROM tests
            WHERE school_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR subject_id = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(school_id)
        .bind(status.clone())
        .bind(subject_id)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM tests
            WHERE school_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR subject_id = $3)
            "#,
        )
        .bind(school_id)
        .bind(status)
        .bind(subject_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((tests, total))
    }

    /// Publish / close / cancel a test. Illegal moves are rejected rather
    /// than silently coerced.
    pub async fn transition(&self, test_id: Uuid, school_id: Uuid, action: &str) -> Result<Test> {
        let test = self.get_test_for_school(test_id, school_id).await?;
        let new_status = match (action, test.status.as_str()) {
            ("publish", TEST_DRAFT) => TEST_PUBLISHED,
            ("close", TEST_PUBLISHED) => TEST_CLOSED,
            ("cancel", TEST_DRAFT) | ("cancel", TEST_PUBLISHED) => TEST_CANCELLED,
            (action, current) => {
                return Err(Error::BadRequest(format!(
                    "Cannot {} a {} test",
                    action, current
                )))
            }
        };

        // publishing without a window opens the test immediately
        let updated = sqlx::query_as::<_, Test>(
            r#"
            UPDATE tests
            SET status = $1,
                available_from = CASE
                    WHEN $1 = 'published' THEN COALESCE(available_from, NOW())
                    ELSE available_from
                END,
                updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(new_status)
        .bind(test_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }

    pub async fn delete_test(&self, test_id: Uuid, school_id: Uuid) -> Result<()> {
        let test = self.get_test_for_school(test_id, school_id).await?;
        if test.status != TEST_DRAFT {
            return Err(Error::BadRequest(
                "Only draft tests can be deleted".to_string(),
            ));
        }
        sqlx::query(r#"DELETE FROM tests WHERE id = $1"#)
            .bind(test_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Student listing. Drafts are never shown; every other status value is
    /// computed by [`student_status`] and filtered here.
    pub async fn list_for_student(
        &self,
        school_id: Uuid,
        student_id: Uuid,
        status_filter: Option<&str>,
    ) -> Result<(Vec<StudentTestItem>, StudentTestSummary)> {
        let tests = sqlx::query_as::<_, Test>(
            r#"
            SELECT * FROM tests
            WHERE school_id = $1 AND status <> 'draft'
            ORDER BY available_from DESC NULLS LAST, created_at DESC
            "#,
        )
        .bind(school_id)
        .fetch_all(&self.pool)
        .await?;

        let submissions = sqlx::query_as::<_, TestSubmission>(
            r#"SELECT * FROM test_submissions WHERE student_id = $1"#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        let by_test: std::collections::HashMap<Uuid, TestSubmission> =
            submissions.into_iter().map(|s| (s.test_id, s)).collect();

        let now = Utc::now();
        let mut items = Vec::with_capacity(tests.len());
        let mut summary = StudentTestSummary::default();

        for test in tests {
            let submission = by_test.get(&test.id);
            let status = student_status(&test, submission, now);
            summary.total += 1;
            match status {
                "available" => summary.available += 1,
                "upcoming" => summary.upcoming += 1,
                "completed" => summary.completed += 1,
                "pending" => summary.pending += 1,
                "not-submitted" => summary.not_submitted += 1,
                _ => {}
            }
            if let Some(filter) = status_filter {
                if filter != "all" && filter != status {
                    continue;
                }
            }
            let config = test.config();
            items.push(StudentTestItem {
                id: test.id,
                title: test.title,
                subject_id: test.subject_id,
                status,
                available_from: test.available_from,
                duration_minutes: config.duration_minutes,
                question_count: config.questions.len(),
                max_score: test.max_score,
                passing_score: test.passing_score,
                submission_id: submission.map(|s| s.id),
            });
        }

        Ok((items, summary))
    }

    /// Close published tests whose window (plus grace) has passed. The
    /// client timer is best-effort; the server owns the deadline.
    pub async fn sweep_expired(&self, grace_seconds: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE tests
            SET status = 'closed', updated_at = NOW()
            WHERE status = 'published'
              AND available_from IS NOT NULL
              AND available_from
                  + COALESCE((config->>'duration')::int, 60) * interval '1 minute'
                  + $1 * interval '1 second' <= NOW()
            "#,
        )
        .bind(grace_seconds)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

/// Single source of truth for the per-student test status.
pub fn student_status(
    test: &Test,
    submission: Option<&TestSubmission>,
    now: DateTime<Utc>,
) -> &'static str {
    if let Some(sub) = submission {
        return if sub.status == SUBMISSION_GRADED {
            "completed"
        } else {
            "pending"
        };
    }
    match test.status.as_str() {
        TEST_DRAFT => "draft",
        TEST_CANCELLED => "cancelled",
        TEST_CLOSED => "not-submitted",
        _ => match test.available_from {
            Some(from) if from > now => "upcoming",
            _ => match test.closes_at() {
                Some(end) if end < now => "not-submitted",
                _ => "available",
            },
        },
    }
}

fn assign_question_ids(questions: Vec<Question>) -> Vec<Question> {
    questions
        .into_iter()
        .enumerate()
        .map(|(idx, mut q)| {
            q.id = idx as i32 + 1;
            q
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::models::submission::SUBMISSION_PENDING;

    fn test_row(status: &str, available_from: Option<DateTime<Utc>>, duration: i64) -> Test {
        Test {
            id: Uuid::new_v4(),
            school_id: Uuid::new_v4(),
            subject_id: None,
            title: "t".into(),
            instructions: None,
            status: status.into(),
            available_from,
            config: serde_json::json!({"duration": duration, "questions": []}),
            max_score: rust_decimal::Decimal::from(10),
            passing_score: rust_decimal::Decimal::from(5),
            created_by: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn submission_row(test: &Test, status: &str) -> TestSubmission {
        TestSubmission {
            id: Uuid::new_v4(),
            test_id: test.id,
            student_id: Uuid::new_v4(),
            answers: serde_json::json!({}),
            graded_answers: None,
            score: None,
            max_score: None,
            status: status.into(),
            time_spent_seconds: 0,
            auto_submit: false,
            submitted_at: Utc::now(),
            graded_by: None,
            graded_at: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn submission_presence_dominates_status() {
        let now = Utc::now();
        let test = test_row(TEST_PUBLISHED, Some(now - Duration::minutes(5)), 30);
        let graded = submission_row(&test, SUBMISSION_GRADED);
        let pending = submission_row(&test, SUBMISSION_PENDING);
        assert_eq!(student_status(&test, Some(&graded), now), "completed");
        assert_eq!(student_status(&test, Some(&pending), now), "pending");
    }

    #[test]
    fn window_drives_status_without_submission() {
        let now = Utc::now();
        let upcoming = test_row(TEST_PUBLISHED, Some(now + Duration::hours(1)), 30);
        assert_eq!(student_status(&upcoming, None, now), "upcoming");

        let open = test_row(TEST_PUBLISHED, Some(now - Duration::minutes(5)), 30);
        assert_eq!(student_status(&open, None, now), "available");

        let missed = test_row(TEST_PUBLISHED, Some(now - Duration::hours(2)), 30);
        assert_eq!(student_status(&missed, None, now), "not-submitted");

        let closed = test_row(TEST_CLOSED, Some(now - Duration::hours(2)), 30);
        assert_eq!(student_status(&closed, None, now), "not-submitted");

        let cancelled = test_row(TEST_CANCELLED, None, 30);
        assert_eq!(student_status(&cancelled, None, now), "cancelled");
    }
}
