use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::models::user::{User, ADMIN_ROLES, ROLE_HEADADMIN, ROLE_STUDENT, STAFF_ROLES};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: String,
    pub school_id: Option<Uuid>,
}

/// Request-scoped authentication context. Resolved once by the middleware
/// and handed to handlers explicitly via `Extension<AuthUser>` instead of a
/// hidden session lookup inside each handler.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: String,
    pub school_id: Option<Uuid>,
}

impl AuthUser {
    /// School the caller operates on. Headadmin carries no school of its
    /// own and must name one explicitly where it matters.
    pub fn require_school(&self) -> crate::error::Result<Uuid> {
        self.school_id
            .ok_or_else(|| crate::error::Error::BadRequest("No school in scope".to_string()))
    }
}

pub fn issue_token(user: &User) -> crate::error::Result<String> {
    let config = crate::config::get_config();
    let exp = chrono::Utc::now() + chrono::Duration::hours(config.token_ttl_hours);
    let claims = Claims {
        sub: user.id.to_string(),
        exp: exp.timestamp() as usize,
        role: user.role.clone(),
        school_id: user.school_id,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| crate::error::Error::Internal(format!("Failed to issue token: {}", e)))
}

fn unauthorized(code: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": code }))).into_response()
}

fn decode_bearer(req: &Request) -> Result<AuthUser, Response> {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return Err(unauthorized("missing_authorization"));
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err(unauthorized("bad_authorization"));
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(unauthorized("unsupported_scheme"));
    };

    let config = crate::config::get_config();
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|_| unauthorized("invalid_token"))?;

    let Ok(id) = data.claims.sub.parse::<Uuid>() else {
        return Err(unauthorized("invalid_token"));
    };
    Ok(AuthUser {
        id,
        role: data.claims.role,
        school_id: data.claims.school_id,
    })
}

fn forbidden() -> Response {
    (StatusCode::FORBIDDEN, Json(json!({"error": "forbidden"}))).into_response()
}

async fn run_with_roles(mut req: Request, next: Next, allowed: &[&str]) -> Response {
    let user = match decode_bearer(&req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    if !allowed.is_empty() && !allowed.iter().any(|r| r.eq_ignore_ascii_case(&user.role)) {
        return forbidden();
    }
    req.extensions_mut().insert(user);
    next.run(req).await
}

/// Any authenticated user.
pub async fn require_auth(req: Request, next: Next) -> Response {
    run_with_roles(req, next, &[]).await
}

pub async fn require_student(req: Request, next: Next) -> Response {
    run_with_roles(req, next, &[ROLE_STUDENT]).await
}

/// Teaching staff: teachers, coordinators, directors.
pub async fn require_staff(req: Request, next: Next) -> Response {
    run_with_roles(req, next, STAFF_ROLES).await
}

/// School administration: admin, director, headadmin.
pub async fn require_admin(req: Request, next: Next) -> Response {
    run_with_roles(req, next, ADMIN_ROLES).await
}

pub async fn require_headadmin(req: Request, next: Next) -> Response {
    run_with_roles(req, next, &[ROLE_HEADADMIN]).await
}
