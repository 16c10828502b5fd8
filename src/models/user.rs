use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const ROLE_STUDENT: &str = "student";
pub const ROLE_TEACHER: &str = "teacher";
pub const ROLE_COORDINATOR: &str = "coordinator";
pub const ROLE_DIRECTOR: &str = "director";
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_HEADADMIN: &str = "headadmin";

/// Roles allowed to create and grade tests.
pub const STAFF_ROLES: &[&str] = &[ROLE_TEACHER, ROLE_COORDINATOR, ROLE_DIRECTOR];

/// Roles allowed to manage users, subjects and invoices within a school.
pub const ADMIN_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_DIRECTOR, ROLE_HEADADMIN];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub school_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
