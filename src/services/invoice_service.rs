use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::invoice::{Invoice, INVOICE_PAID, INVOICE_UNPAID, INVOICE_VOID};
use crate::utils::token::generate_reference;

#[derive(Clone)]
pub struct InvoiceService {
    pool: PgPool,
}

impl InvoiceService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        school_id: Uuid,
        student_id: Uuid,
        description: Option<String>,
        amount: rust_decimal::Decimal,
        currency: &str,
        due_date: Option<NaiveDate>,
    ) -> Result<Invoice> {
        let reference = format!("INV-{}", generate_reference(10).to_uppercase());
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (school_id, student_id, reference, description, amount, currency, status, due_date)
            VALUES ($1, $2, $3, $4, $5, $6, 'unpaid', $7)
            RETURNING *
            "#,
        )
        .bind(school_id)
        .bind(student_id)
        .bind(reference)
        .bind(description)
        .bind(amount)
        .bind(currency)
        .bind(due_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(invoice)
    }

    pub async fn get_for_student(&self, invoice_id: Uuid, student_id: Uuid) -> Result<Invoice> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"SELECT * FROM invoices WHERE id = $1 AND student_id = $2"#,
        )
        .bind(invoice_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Invoice not found".to_string()))?;
        Ok(invoice)
    }

    pub async fn list_for_student(&self, student_id: Uuid) -> Result<Vec<Invoice>> {
        let invoices = sqlx::query_as::<_, Invoice>(
            r#"SELECT * FROM invoices WHERE student_id = $1 ORDER BY created_at DESC"#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(invoices)
    }

    pub async fn list_for_school(
        &self,
        school_id: Uuid,
        status: Option<String>,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<Invoice>, i64)> {
        let offset = (page - 1).max(0) * per_page;
        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT * FROM invoices
            WHERE school_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(school_id)
        .bind(status.clone())
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM invoices WHERE school_id = $1 AND ($2::text IS NULL OR status = $2)"#,
        )
        .bind(school_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok((invoices, total))
    }

    pub async fn mark_paid(&self, invoice_id: Uuid, school_id: Uuid) -> Result<Invoice> {
        self.set_status(invoice_id, school_id, INVOICE_PAID).await
    }

    pub async fn void(&self, invoice_id: Uuid, school_id: Uuid) -> Result<Invoice> {
        self.set_status(invoice_id, school_id, INVOICE_VOID).await
    }

    async fn set_status(&self, invoice_id: Uuid, school_id: Uuid, status: &str) -> Result<Invoice> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices
            SET status = $1,
                paid_at = CASE WHEN $1 = 'paid' THEN NOW() ELSE paid_at END,
                updated_at = NOW()
            WHERE id = $2 AND school_id = $3 AND status = 'unpaid'
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(invoice_id)
        .bind(school_id)
        .fetch_optional(&self.pool)
        .await?;

        match invoice {
            Some(inv) => Ok(inv),
            None => {
                // distinguish missing from already-settled
                let existing = sqlx::query_as::<_, Invoice>(
                    r#"SELECT * FROM invoices WHERE id = $1 AND school_id = $2"#,
                )
                .bind(invoice_id)
                .bind(school_id)
                .fetch_optional(&self.pool)
                .await?;
                match existing {
                    Some(inv) if inv.status != INVOICE_UNPAID => Err(Error::Conflict(format!(
                        "Invoice is already {}",
                        inv.status
                    ))),
                    _ => Err(Error::NotFound("Invoice not found".to_string())),
                }
            }
        }
    }
}
