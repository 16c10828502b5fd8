use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
};
use validator::Validate;

use crate::dto::auth_dto::{LoginRequest, LoginResponse};
use crate::error::Error;
use crate::middleware::auth::issue_token;
use crate::utils::crypto::verify_password;
use crate::AppState;

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;

    let user = state
        .user_service
        .find_by_email(&req.email)
        .await?
        .ok_or_else(|| Error::Unauthorized("Invalid email or password".to_string()))?;

    if !user.is_active {
        return Err(Error::Forbidden("Account is deactivated".to_string()));
    }

    let ok = verify_password(&req.password, &user.password_hash)
        .map_err(|e| Error::Internal(format!("Password verification failed: {}", e)))?;
    if !ok {
        return Err(Error::Unauthorized("Invalid email or password".to_string()));
    }

    let token = issue_token(&user)?;
    tracing::info!(user_id = %user.id, role = %user.role, "User logged in");
    Ok(Json(LoginResponse { token, user }).into_response())
}
