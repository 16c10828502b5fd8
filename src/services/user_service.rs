use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::user::User;
use crate::utils::crypto::hash_password;

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE email = $1"#)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get_by_id(&self, user_id: Uuid) -> Result<User> {
        let user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE id = $1"#)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))?;
        Ok(user)
    }

    pub async fn create(
        &self,
        school_id: Option<Uuid>,
        name: &str,
        email: &str,
        password: &str,
        role: &str,
    ) -> Result<User> {
        let password_hash = hash_password(password)
            .map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (school_id, name, email, password_hash, role, is_active)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            RETURNING *
            "#,
        )
        .bind(school_id)
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Error::Conflict("A user with this email already exists".to_string())
            }
            other => other.into(),
        })?;

        Ok(user)
    }

    pub async fn list_for_school(
        &self,
        school_id: Uuid,
        role: Option<String>,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<User>, i64)> {
        let offset = (page - 1).max(0) * per_page;
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE school_id = $1
              AND ($2::text IS NULL OR role = $2)
            ORDER BY name ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(school_id)
        .bind(role.clone())
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM users
            WHERE school_id = $1 AND ($2::text IS NULL OR role = $2)
            "#,
        )
        .bind(school_id)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;

        Ok((users, total))
    }

    pub async fn set_active(&self, user_id: Uuid, school_id: Uuid, active: bool) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET is_active = $1, updated_at = NOW()
            WHERE id = $2 AND school_id = $3
            RETURNING *
            "#,
        )
        .bind(active)
        .bind(user_id)
        .bind(school_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))?;
        Ok(user)
    }
}
