use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::school::School;

#[derive(Clone)]
pub struct SchoolService {
    pool: PgPool,
}

impl SchoolService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, school_id: Uuid) -> Result<School> {
        let school = sqlx::query_as::<_, School>(r#"SELECT * FROM schools WHERE id = $1"#)
            .bind(school_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("School not found".to_string()))?;
        Ok(school)
    }

    pub async fn list(&self) -> Result<Vec<School>> {
        let schools =
            sqlx::query_as::<_, School>(r#"SELECT * FROM schools ORDER BY name ASC"#)
                .fetch_all(&self.pool)
                .await?;
        Ok(schools)
    }

    pub async fn create(&self, name: &str, slug: &str) -> Result<School> {
        let school = sqlx::query_as::<_, School>(
            r#"
            INSERT INTO schools (name, slug, is_active)
            VALUES ($1, $2, TRUE)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(slug)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Error::Conflict("A school with this slug already exists".to_string())
            }
            other => other.into(),
        })?;
        Ok(school)
    }
}
