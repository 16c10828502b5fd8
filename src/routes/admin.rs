use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::dto::admin_dto::{
    AssignTeacherPayload, CreateInvoicePayload, CreateSchoolPayload, CreateSubjectPayload,
    CreateUserPayload,
};
use crate::error::Error;
use crate::middleware::auth::AuthUser;
use crate::models::user::{
    ROLE_ADMIN, ROLE_COORDINATOR, ROLE_DIRECTOR, ROLE_HEADADMIN, ROLE_STUDENT, ROLE_TEACHER,
};
use crate::AppState;

const KNOWN_ROLES: &[&str] = &[
    ROLE_STUDENT,
    ROLE_TEACHER,
    ROLE_COORDINATOR,
    ROLE_DIRECTOR,
    ROLE_ADMIN,
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub role: Option<String>,
    pub status: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
    /// Headadmin only: act on a specific school.
    pub school_id: Option<Uuid>,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    25
}

/// School the admin call applies to: the caller's own, or the explicit
/// query parameter for headadmin.
fn resolve_school(user: &AuthUser, explicit: Option<Uuid>) -> crate::error::Result<Uuid> {
    if user.role == ROLE_HEADADMIN {
        explicit.ok_or_else(|| Error::BadRequest("schoolId is required for headadmin".to_string()))
    } else {
        user.require_school()
    }
}

#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<PageQuery>,
) -> crate::error::Result<Response> {
    let school_id = resolve_school(&user, query.school_id)?;
    let (users, total) = state
        .user_service
        .list_for_school(school_id, query.role, query.page, query.per_page)
        .await?;
    Ok(Json(json!({
        "items": users,
        "total": total,
        "page": query.page,
        "perPage": query.per_page,
    }))
    .into_response())
}

#[axum::debug_handler]
pub async fn create_user(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateUserPayload>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    if !KNOWN_ROLES.contains(&payload.role.as_str()) {
        return Err(Error::BadRequest(format!("Unknown role: {}", payload.role)));
    }
    let school_id = resolve_school(&user, payload.school_id)?;
    let created = state
        .user_service
        .create(
            Some(school_id),
            &payload.name,
            &payload.email,
            &payload.password,
            &payload.role,
        )
        .await?;
    tracing::info!(user_id = %created.id, role = %created.role, by = %user.id, "User created");
    Ok(Json(created).into_response())
}

#[axum::debug_handler]
pub async fn deactivate_user(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> crate::error::Result<Response> {
    let school_id = resolve_school(&user, query.school_id)?;
    let updated = state
        .user_service
        .set_active(user_id, school_id, false)
        .await?;
    Ok(Json(updated).into_response())
}

#[axum::debug_handler]
pub async fn list_schools(State(state): State<AppState>) -> crate::error::Result<Response> {
    let schools = state.school_service.list().await?;
    Ok(Json(schools).into_response())
}

#[axum::debug_handler]
pub async fn create_school(
    State(state): State<AppState>,
    Json(payload): Json<CreateSchoolPayload>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    let school = state
        .school_service
        .create(&payload.name, &payload.slug)
        .await?;
    Ok(Json(school).into_response())
}

#[axum::debug_handler]
pub async fn list_subjects(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<PageQuery>,
) -> crate::error::Result<Response> {
    let school_id = resolve_school(&user, query.school_id)?;
    let subjects = state.subject_service.list_for_school(school_id).await?;
    Ok(Json(subjects).into_response())
}

#[axum::debug_handler]
pub async fn create_subject(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateSubjectPayload>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    let school_id = resolve_school(&user, payload.school_id)?;
    let subject = state
        .subject_service
        .create(school_id, &payload.name, payload.teacher_id)
        .await?;
    Ok(Json(subject).into_response())
}

#[axum::debug_handler]
pub async fn assign_subject_teacher(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(subject_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
    Json(payload): Json<AssignTeacherPayload>,
) -> crate::error::Result<Response> {
    let school_id = resolve_school(&user, query.school_id)?;
    let subject = state
        .subject_service
        .assign_teacher(subject_id, school_id, payload.teacher_id)
        .await?;
    Ok(Json(subject).into_response())
}

#[axum::debug_handler]
pub async fn create_invoice(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateInvoicePayload>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    let school_id = resolve_school(&user, payload.school_id)?;
    let invoice = state
        .invoice_service
        .create(
            school_id,
            payload.student_id,
            payload.description,
            payload.amount,
            &payload.currency,
            payload.due_date,
        )
        .await?;
    Ok(Json(invoice).into_response())
}

#[axum::debug_handler]
pub async fn list_invoices(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<PageQuery>,
) -> crate::error::Result<Response> {
    let school_id = resolve_school(&user, query.school_id)?;
    let (invoices, total) = state
        .invoice_service
        .list_for_school(school_id, query.status, query.page, query.per_page)
        .await?;
    Ok(Json(json!({
        "items": invoices,
        "total": total,
        "page": query.page,
        "perPage": query.per_page,
    }))
    .into_response())
}

#[axum::debug_handler]
pub async fn mark_invoice_paid(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(invoice_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> crate::error::Result<Response> {
    let school_id = resolve_school(&user, query.school_id)?;
    let invoice = state.invoice_service.mark_paid(invoice_id, school_id).await?;
    Ok(Json(invoice).into_response())
}

#[axum::debug_handler]
pub async fn void_invoice(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(invoice_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> crate::error::Result<Response> {
    let school_id = resolve_school(&user, query.school_id)?;
    let invoice = state.invoice_service.void(invoice_id, school_id).await?;
    Ok(Json(invoice).into_response())
}

#[axum::debug_handler]
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<PageQuery>,
) -> crate::error::Result<Response> {
    let school_id = resolve_school(&user, query.school_id)?;
    let stats = state.dashboard_service.stats_for_school(school_id).await?;
    Ok(Json(stats).into_response())
}
