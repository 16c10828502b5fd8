use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::dto::staff_dto::{
    CreateAssignmentPayload, CreateTestPayload, GradeAnswerRequest, GradeAssignmentRequest,
    UpdateTestPayload,
};
use crate::middleware::auth::AuthUser;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
    pub subject_id: Option<Uuid>,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    25
}

#[axum::debug_handler]
pub async fn create_test(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateTestPayload>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    let school_id = user.require_school()?;
    let test = state
        .test_service
        .create_test(payload, school_id, user.id)
        .await?;
    tracing::info!(test_id = %test.id, created_by = %user.id, "Test created");
    Ok(Json(test).into_response())
}

#[axum::debug_handler]
pub async fn update_test(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(test_id): Path<Uuid>,
    Json(payload): Json<UpdateTestPayload>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    let school_id = user.require_school()?;
    let test = state
        .test_service
        .update_test(test_id, school_id, payload)
        .await?;
    Ok(Json(test).into_response())
}

#[axum::debug_handler]
pub async fn get_test(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(test_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let school_id = user.require_school()?;
    let test = state.test_service.get_test_for_school(test_id, school_id).await?;
    Ok(Json(test).into_response())
}

#[axum::debug_handler]
pub async fn list_tests(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> crate::error::Result<Response> {
    let school_id = user.require_school()?;
    let (tests, total) = state
        .test_service
        .list_tests_for_school(school_id, query.status, query.subject_id, query.page, query.per_page)
        .await?;
    Ok(Json(json!({
        "items": tests,
        "total": total,
        "page": query.page,
        "perPage": query.per_page,
    }))
    .into_response())
}

#[axum::debug_handler]
pub async fn publish_test(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(test_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    transition(state, user, test_id, "publish").await
}

#[axum::debug_handler]
pub async fn close_test(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(test_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    transition(state, user, test_id, "close").await
}

#[axum::debug_handler]
pub async fn cancel_test(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(test_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    transition(state, user, test_id, "cancel").await
}

async fn transition(
    state: AppState,
    user: AuthUser,
    test_id: Uuid,
    action: &str,
) -> crate::error::Result<Response> {
    let school_id = user.require_school()?;
    let test = state.test_service.transition(test_id, school_id, action).await?;
    tracing::info!(test_id = %test.id, status = %test.status, by = %user.id, "Test status changed");
    Ok(Json(test).into_response())
}

#[axum::debug_handler]
pub async fn delete_test(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(test_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let school_id = user.require_school()?;
    state.test_service.delete_test(test_id, school_id).await?;
    Ok(Json(json!({"deleted": true})).into_response())
}

#[axum::debug_handler]
pub async fn list_submissions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(test_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let school_id = user.require_school()?;
    // scope check before touching submissions
    state.test_service.get_test_for_school(test_id, school_id).await?;
    let submissions = state.submission_service.list_for_test(test_id).await?;
    Ok(Json(submissions).into_response())
}

/// Manual grading of a single theory answer.
#[axum::debug_handler]
pub async fn grade_submission_answer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(submission_id): Path<Uuid>,
    Json(req): Json<GradeAnswerRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let school_id = user.require_school()?;
    let submission = state.submission_service.get_by_id(submission_id).await?;
    // the submission must belong to a test of the grader's school
    state
        .test_service
        .get_test_for_school(submission.test_id, school_id)
        .await?;

    let updated = state
        .submission_service
        .grade_theory_answer(submission_id, req.question_id, req.marks_awarded, user.id)
        .await?;
    tracing::info!(
        submission_id = %updated.id,
        question_id = req.question_id,
        graded_by = %user.id,
        status = %updated.status,
        "Theory answer graded"
    );
    Ok(Json(updated).into_response())
}

#[axum::debug_handler]
pub async fn create_assignment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateAssignmentPayload>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    let school_id = user.require_school()?;
    let assignment = state
        .assignment_service
        .create(school_id, payload, user.id)
        .await?;
    Ok(Json(assignment).into_response())
}

#[axum::debug_handler]
pub async fn list_assignments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> crate::error::Result<Response> {
    let school_id = user.require_school()?;
    let assignments = state.assignment_service.list_for_school(school_id).await?;
    Ok(Json(assignments).into_response())
}

#[axum::debug_handler]
pub async fn list_assignment_submissions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(assignment_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let school_id = user.require_school()?;
    state
        .assignment_service
        .get_for_school(assignment_id, school_id)
        .await?;
    let submissions = state
        .assignment_service
        .list_submissions(assignment_id)
        .await?;
    Ok(Json(submissions).into_response())
}

#[axum::debug_handler]
pub async fn grade_assignment_submission(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(submission_id): Path<Uuid>,
    Json(req): Json<GradeAssignmentRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let school_id = user.require_school()?;
    let submission = state.assignment_service.get_submission(submission_id).await?;
    // the submission must belong to an assignment of the grader's school
    state
        .assignment_service
        .get_for_school(submission.assignment_id, school_id)
        .await?;
    let submission = state
        .assignment_service
        .grade(submission_id, req.score, req.feedback)
        .await?;
    Ok(Json(submission).into_response())
}
