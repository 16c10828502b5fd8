use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::assignment::{Assignment, AssignmentSubmission};

#[derive(Clone)]
pub struct AssignmentService {
    pool: PgPool,
}

impl AssignmentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        school_id: Uuid,
        payload: crate::dto::staff_dto::CreateAssignmentPayload,
        created_by: Uuid,
    ) -> Result<Assignment> {
        let assignment = sqlx::query_as::<_, Assignment>(
            r#"
            INSERT INTO assignments (school_id, subject_id, title, description, due_at, max_score, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(school_id)
        .bind(payload.subject_id)
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(payload.due_at)
        .bind(payload.max_score)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(assignment)
    }

    pub async fn get_for_school(&self, assignment_id: Uuid, school_id: Uuid) -> Result<Assignment> {
        let assignment = sqlx::query_as::<_, Assignment>(
            r#"SELECT * FROM assignments WHERE id = $1 AND school_id = $2"#,
        )
        .bind(assignment_id)
        .bind(school_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Assignment not found".to_string()))?;
        Ok(assignment)
    }

    pub async fn list_for_school(&self, school_id: Uuid) -> Result<Vec<Assignment>> {
        let assignments = sqlx::query_as::<_, Assignment>(
            r#"SELECT * FROM assignments WHERE school_id = $1 ORDER BY due_at ASC NULLS LAST"#,
        )
        .bind(school_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(assignments)
    }

    pub async fn submit(
        &self,
        assignment: &Assignment,
        student_id: Uuid,
        body: &str,
    ) -> Result<AssignmentSubmission> {
        if let Some(due) = assignment.due_at {
            if Utc::now() > due {
                return Err(Error::Forbidden("Assignment is past due".to_string()));
            }
        }
        let submission = sqlx::query_as::<_, AssignmentSubmission>(
            r#"
            INSERT INTO assignment_submissions (assignment_id, student_id, body)
            VALUES ($1, $2, $3)
            ON CONFLICT (assignment_id, student_id)
            DO UPDATE SET body = EXCLUDED.body, submitted_at = NOW(), score = NULL, feedback = NULL, graded_at = NULL
            RETURNING *
            "#,
        )
        .bind(assignment.id)
        .bind(student_id)
        .bind(body)
        .fetch_one(&self.pool)
        .await?;
        Ok(submission)
    }

    pub async fn get_submission(&self, submission_id: Uuid) -> Result<AssignmentSubmission> {
        let submission = sqlx::query_as::<_, AssignmentSubmission>(
            r#"SELECT * FROM assignment_submissions WHERE id = $1"#,
        )
        .bind(submission_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Assignment submission not found".to_string()))?;
        Ok(submission)
    }

    pub async fn list_submissions(&self, assignment_id: Uuid) -> Result<Vec<AssignmentSubmission>> {
        let submissions = sqlx::query_as::<_, AssignmentSubmission>(
            r#"SELECT * FROM assignment_submissions WHERE assignment_id = $1 ORDER BY submitted_at ASC"#,
        )
        .bind(assignment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(submissions)
    }

    pub async fn grade(
        &self,
        submission_id: Uuid,
        score: rust_decimal::Decimal,
        feedback: Option<String>,
    ) -> Result<AssignmentSubmission> {
        let submission = sqlx::query_as::<_, AssignmentSubmission>(
            r#"
            UPDATE assignment_submissions
            SET score = $1, feedback = $2, graded_at = NOW()
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(score)
        .bind(feedback)
        .bind(submission_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Assignment submission not found".to_string()))?;
        Ok(submission)
    }
}
