use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::attempt::SubmissionPayload;
use crate::dto::student_dto::{StudentTestDetail, StudentTestList, SubmitTestResult, TestResultView};
use crate::dto::ApiEnvelope;
use crate::middleware::auth::AuthUser;
use crate::models::submission::SUBMISSION_GRADED;
use crate::services::test_service::student_status;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TestListQuery {
    pub status: Option<String>,
}

#[axum::debug_handler]
pub async fn list_tests(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<TestListQuery>,
) -> crate::error::Result<Response> {
    let school_id = user.require_school()?;
    let (tests, summary) = state
        .test_service
        .list_for_student(school_id, user.id, query.status.as_deref())
        .await?;
    Ok(Json(ApiEnvelope::ok(StudentTestList { tests, summary })).into_response())
}

/// Full test definition for the taking page. When the test disallows
/// retakes and this student already submitted, the client is pointed at the
/// results view instead of a fresh attempt.
#[axum::debug_handler]
pub async fn get_test(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(test_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let school_id = user.require_school()?;
    let test = state.test_service.get_test_for_school(test_id, school_id).await?;
    let config = test.config();

    let submission = state
        .submission_service
        .find_for_student(test.id, user.id)
        .await?;

    if submission.is_some() && !config.allow_retake {
        return Ok((
            StatusCode::CONFLICT,
            Json(json!({
                "error": "already_submitted",
                "redirect": "results"
            })),
        )
            .into_response());
    }

    let status = student_status(&test, submission.as_ref(), Utc::now());
    match status {
        "available" | "pending" | "completed" => {}
        "upcoming" => {
            return Err(crate::error::Error::Forbidden(
                "Test has not opened yet".to_string(),
            ))
        }
        _ => {
            return Err(crate::error::Error::Forbidden(
                "Test is not available".to_string(),
            ))
        }
    }

    let detail = StudentTestDetail::from_test(&test, &config);
    Ok(Json(ApiEnvelope::ok(detail)).into_response())
}

#[axum::debug_handler]
pub async fn submit_test(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<SubmissionPayload>,
) -> crate::error::Result<Response> {
    let school_id = user.require_school()?;
    let test = state
        .test_service
        .get_test_for_school(payload.test_id, school_id)
        .await?;

    let grace = crate::config::get_config().submission_grace_seconds;
    let submission = state
        .submission_service
        .submit(&test, user.id, &payload, grace)
        .await?;

    let config = test.config();
    let reveal = config.show_results_immediately || submission.status == SUBMISSION_GRADED;
    let result = SubmitTestResult {
        submission_id: submission.id,
        status: submission.status.clone(),
        auto_submit: submission.auto_submit,
        show_results: reveal,
        score: if reveal { submission.score } else { None },
        max_score: if reveal { submission.max_score } else { None },
    };
    Ok(Json(ApiEnvelope::ok(result)).into_response())
}

#[axum::debug_handler]
pub async fn get_result(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(test_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let school_id = user.require_school()?;
    let test = state.test_service.get_test_for_school(test_id, school_id).await?;
    let submission = state
        .submission_service
        .find_for_student(test.id, user.id)
        .await?
        .ok_or_else(|| crate::error::Error::NotFound("No submission for this test".to_string()))?;

    let config = test.config();
    let view = TestResultView::from_submission(
        &submission,
        test.passing_score,
        config.show_results_immediately,
    );
    Ok(Json(ApiEnvelope::ok(view)).into_response())
}

#[axum::debug_handler]
pub async fn list_invoices(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> crate::error::Result<Response> {
    let invoices = state.invoice_service.list_for_student(user.id).await?;
    Ok(Json(ApiEnvelope::ok(invoices)).into_response())
}

#[axum::debug_handler]
pub async fn get_invoice(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(invoice_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let invoice = state
        .invoice_service
        .get_for_student(invoice_id, user.id)
        .await?;
    Ok(Json(ApiEnvelope::ok(invoice)).into_response())
}

#[axum::debug_handler]
pub async fn list_assignments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> crate::error::Result<Response> {
    let school_id = user.require_school()?;
    let assignments = state.assignment_service.list_for_school(school_id).await?;
    Ok(Json(ApiEnvelope::ok(assignments)).into_response())
}

#[axum::debug_handler]
pub async fn submit_assignment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(assignment_id): Path<Uuid>,
    Json(req): Json<crate::dto::staff_dto::SubmitAssignmentRequest>,
) -> crate::error::Result<Response> {
    use validator::Validate;
    req.validate()?;
    let school_id = user.require_school()?;
    let assignment = state
        .assignment_service
        .get_for_school(assignment_id, school_id)
        .await?;
    let submission = state
        .assignment_service
        .submit(&assignment, user.id, &req.body)
        .await?;
    Ok(Json(ApiEnvelope::ok(submission)).into_response())
}
