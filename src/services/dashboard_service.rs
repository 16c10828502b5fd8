use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub students: i64,
    pub teachers: i64,
    pub tests_by_status: std::collections::HashMap<String, i64>,
    pub submissions_pending_grading: i64,
    pub unpaid_invoice_total: rust_decimal::Decimal,
}

#[derive(Clone)]
pub struct DashboardService {
    pool: PgPool,
}

impl DashboardService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn stats_for_school(&self, school_id: Uuid) -> Result<DashboardStats> {
        let students: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM users WHERE school_id = $1 AND role = 'student' AND is_active"#,
        )
        .bind(school_id)
        .fetch_one(&self.pool)
        .await?;

        let teachers: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM users WHERE school_id = $1 AND role = 'teacher' AND is_active"#,
        )
        .bind(school_id)
        .fetch_one(&self.pool)
        .await?;

        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"SELECT status, COUNT(*) FROM tests WHERE school_id = $1 GROUP BY status"#,
        )
        .bind(school_id)
        .fetch_all(&self.pool)
        .await?;
        let tests_by_status = rows.into_iter().collect();

        let submissions_pending_grading: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM test_submissions s
            JOIN tests t ON s.test_id = t.id
            WHERE t.school_id = $1 AND s.status = 'pending'
            "#,
        )
        .bind(school_id)
        .fetch_one(&self.pool)
        .await?;

        let unpaid_invoice_total: Option<rust_decimal::Decimal> = sqlx::query_scalar(
            r#"SELECT SUM(amount) FROM invoices WHERE school_id = $1 AND status = 'unpaid'"#,
        )
        .bind(school_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardStats {
            students,
            teachers,
            tests_by_status,
            submissions_pending_grading,
            unpaid_invoice_total: unpaid_invoice_total.unwrap_or_default(),
        })
    }
}
