use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserPayload {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub role: String,
    /// Headadmin may create users in any school; others are pinned to
    /// their own.
    pub school_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSchoolPayload {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 1, max = 60))]
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubjectPayload {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub teacher_id: Option<Uuid>,
    /// Headadmin only: the school to create the subject in.
    pub school_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTeacherPayload {
    /// `null` clears the assignment.
    pub teacher_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoicePayload {
    pub student_id: Uuid,
    pub description: Option<String>,
    pub amount: rust_decimal::Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub due_date: Option<NaiveDate>,
    /// Headadmin only: the school to bill under.
    pub school_id: Option<Uuid>,
}

fn default_currency() -> String {
    "USD".to_string()
}
