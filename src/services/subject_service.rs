use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::subject::Subject;

#[derive(Clone)]
pub struct SubjectService {
    pool: PgPool,
}

impl SubjectService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_school(&self, school_id: Uuid) -> Result<Vec<Subject>> {
        let subjects = sqlx::query_as::<_, Subject>(
            r#"SELECT * FROM subjects WHERE school_id = $1 ORDER BY name ASC"#,
        )
        .bind(school_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(subjects)
    }

    pub async fn create(
        &self,
        school_id: Uuid,
        name: &str,
        teacher_id: Option<Uuid>,
    ) -> Result<Subject> {
        let subject = sqlx::query_as::<_, Subject>(
            r#"
            INSERT INTO subjects (school_id, name, teacher_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(school_id)
        .bind(name)
        .bind(teacher_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(subject)
    }

    pub async fn assign_teacher(
        &self,
        subject_id: Uuid,
        school_id: Uuid,
        teacher_id: Option<Uuid>,
    ) -> Result<Subject> {
        let subject = sqlx::query_as::<_, Subject>(
            r#"
            UPDATE subjects SET teacher_id = $1, updated_at = NOW()
            WHERE id = $2 AND school_id = $3
            RETURNING *
            "#,
        )
        .bind(teacher_id)
        .bind(subject_id)
        .bind(school_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Subject not found".to_string()))?;
        Ok(subject)
    }
}
