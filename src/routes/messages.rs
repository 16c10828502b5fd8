use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::dto::message_dto::SendMessageRequest;
use crate::error::Error;
use crate::middleware::auth::AuthUser;
use crate::models::user::ROLE_HEADADMIN;
use crate::AppState;

#[axum::debug_handler]
pub async fn send_message(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<SendMessageRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let recipient = state.user_service.get_by_id(req.recipient_id).await?;

    // conversations stay within one school; headadmin may reach anyone
    let school_id = match (user.school_id, recipient.school_id) {
        (Some(own), Some(theirs)) if own == theirs => own,
        (_, Some(theirs)) if user.role == ROLE_HEADADMIN => theirs,
        _ => {
            return Err(Error::Forbidden(
                "Cannot message users outside your school".to_string(),
            ))
        }
    };

    let conversation = state
        .message_service
        .get_or_create_conversation(school_id, user.id, recipient.id)
        .await?;
    let message = state
        .message_service
        .send(conversation.id, user.id, &req.body)
        .await?;

    Ok(Json(json!({
        "conversationId": conversation.id,
        "message": message,
    }))
    .into_response())
}

#[axum::debug_handler]
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> crate::error::Result<Response> {
    let conversations = state.message_service.list_conversations(user.id).await?;
    Ok(Json(conversations).into_response())
}

#[axum::debug_handler]
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(conversation_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let conversation = state
        .message_service
        .get_conversation_for_user(conversation_id, user.id)
        .await?;
    let messages = state.message_service.list_messages(conversation.id).await?;
    Ok(Json(messages).into_response())
}

#[axum::debug_handler]
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(conversation_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let conversation = state
        .message_service
        .get_conversation_for_user(conversation_id, user.id)
        .await?;
    let updated = state.message_service.mark_read(conversation.id, user.id).await?;
    Ok(Json(json!({"markedRead": updated})).into_response())
}

#[axum::debug_handler]
pub async fn unread_count(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> crate::error::Result<Response> {
    let count = state.message_service.unread_count(user.id).await?;
    Ok(Json(json!({"unread": count})).into_response())
}
