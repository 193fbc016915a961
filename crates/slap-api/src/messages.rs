use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use slap_db::models::{MessageRow, UserRow};
use slap_types::api::{MessageResponse, SendMessageRequest};
use slap_types::models::PublicProfile;

use crate::conversations;
use crate::error::ApiError;
use crate::middleware::Claims;
use crate::posts::lacks_content;
use crate::state::AppState;
use crate::time::parse_timestamp;

/// Chat clients poll a single conversation; keep each page bounded.
pub const MAX_CONVERSATION_MESSAGES: i64 = 100;

/// GET /messages — the caller's conversation list, one entry per
/// counterpart, most recent exchange first.
pub async fn list_contacts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let requester_id = claims.sub.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.messages_involving(&requester_id))
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("blocking task failed: {e}")))??;

    let messages: Vec<MessageResponse> = rows.into_iter().map(message_response).collect();
    let contacts = conversations::build_contacts(&claims.sub, &messages);
    Ok(Json(contacts))
}

/// GET /messages/{user_id} — the two-party thread with that counterpart,
/// oldest first.
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(other_user_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    if other_user_id.trim().is_empty() {
        return Err(ApiError::validation("missing counterpart user id"));
    }

    let db = state.clone();
    let requester_id = claims.sub.clone();
    let rows = tokio::task::spawn_blocking(move || {
        db.db
            .messages_between(&requester_id, &other_user_id, MAX_CONVERSATION_MESSAGES)
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("blocking task failed: {e}")))??;

    let messages: Vec<MessageResponse> = rows.into_iter().map(message_response).collect();
    Ok(Json(messages))
}

/// POST /messages
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.receiver_id.trim().is_empty() {
        return Err(ApiError::validation("receiver id is required"));
    }
    if req.receiver_id == claims.sub {
        return Err(ApiError::validation("you cannot message yourself"));
    }
    let text = req
        .text_content
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    if lacks_content(text.as_deref(), req.image_url_1.as_deref(), req.image_url_2.as_deref()) {
        return Err(ApiError::validation(
            "a message needs content (text or an image)",
        ));
    }

    let db = state.clone();
    let sender_id = claims.sub.clone();
    let receiver_id = req.receiver_id.clone();
    let text_db = text.clone();
    let image_url_1 = req.image_url_1.clone();
    let image_url_2 = req.image_url_2.clone();
    let (message_id, sender, receiver) =
        tokio::task::spawn_blocking(move || -> Result<(i64, UserRow, UserRow), ApiError> {
            let sender = db
                .db
                .get_user_by_id(&sender_id)?
                .ok_or(ApiError::Forbidden("complete your profile before messaging"))?;
            let receiver = db
                .db
                .get_user_by_id(&receiver_id)?
                .ok_or(ApiError::NotFound("receiver"))?;
            let message_id = db.db.insert_message(
                &sender_id,
                &receiver_id,
                text_db.as_deref(),
                image_url_1.as_deref(),
                image_url_2.as_deref(),
            )?;
            Ok((message_id, sender, receiver))
        })
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("blocking task failed: {e}")))??;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            id: message_id,
            sender: public_profile(sender),
            receiver: public_profile(receiver),
            text_content: text,
            image_url_1: req.image_url_1,
            image_url_2: req.image_url_2,
            created_at: Some(chrono::Utc::now()),
        }),
    ))
}

pub(crate) fn message_response(row: MessageRow) -> MessageResponse {
    let created_at = parse_timestamp(&row.created_at, "message");
    MessageResponse {
        id: row.id,
        sender: PublicProfile {
            id: row.sender_id,
            username: row.sender_username,
            name: row.sender_name,
            profile_image_url: row.sender_image_url,
        },
        receiver: PublicProfile {
            id: row.receiver_id,
            username: row.receiver_username,
            name: row.receiver_name,
            profile_image_url: row.receiver_image_url,
        },
        text_content: row.text_content,
        image_url_1: row.image_url_1,
        image_url_2: row.image_url_2,
        created_at,
    }
}

pub(crate) fn public_profile(row: UserRow) -> PublicProfile {
    PublicProfile {
        id: row.id,
        username: row.username,
        name: row.name,
        profile_image_url: row.profile_image_url,
    }
}
