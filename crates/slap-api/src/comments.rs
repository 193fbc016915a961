use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use slap_db::models::{CommentRow, ReplyRow};
use slap_types::api::{CommentResponse, CreateCommentRequest, PostSummary, ReplyResponse};
use slap_types::models::PublicProfile;

use crate::error::ApiError;
use crate::middleware::Claims;
use crate::posts::{lacks_content, normalize_text};
use crate::state::AppState;
use crate::time::parse_timestamp;

pub const MAX_COMMENT_TEXT: usize = 300;

/// POST /posts/{post_id}/comments. Reading comments happens through
/// GET /posts/{post_id} only, so list responses stay bounded.
pub async fn create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let text = normalize_text(req.text_content, MAX_COMMENT_TEXT, "comment")?;
    if lacks_content(text.as_deref(), req.image_url_1.as_deref(), req.image_url_2.as_deref()) {
        return Err(ApiError::validation(
            "a comment needs content (text or an image)",
        ));
    }

    let db = state.clone();
    let commenter_id = claims.sub.clone();
    let row = tokio::task::spawn_blocking(move || -> Result<CommentRow, ApiError> {
        if db.db.get_post(post_id)?.is_none() {
            return Err(ApiError::NotFound("post"));
        }
        if db.db.get_user_by_id(&commenter_id)?.is_none() {
            return Err(ApiError::Forbidden("complete your profile before commenting"));
        }
        let comment_id = db.db.insert_comment(
            post_id,
            &commenter_id,
            text.as_deref(),
            req.image_url_1.as_deref(),
            req.image_url_2.as_deref(),
        )?;
        db.db.get_comment(comment_id)?.ok_or_else(|| {
            ApiError::Internal(anyhow::anyhow!("created comment vanished: {comment_id}"))
        })
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("blocking task failed: {e}")))??;

    Ok((StatusCode::CREATED, Json(comment_response(row))))
}

pub(crate) fn comment_response(row: CommentRow) -> CommentResponse {
    let created_at = parse_timestamp(&row.created_at, "comment");
    CommentResponse {
        id: row.id,
        post_id: row.post_id,
        author: PublicProfile {
            id: row.author_id,
            username: row.author_username,
            name: row.author_name,
            profile_image_url: row.author_image_url,
        },
        text_content: row.text_content,
        image_url_1: row.image_url_1,
        image_url_2: row.image_url_2,
        created_at,
    }
}

pub(crate) fn reply_response(row: ReplyRow) -> ReplyResponse {
    let post = PostSummary {
        id: row.comment.post_id,
        text_content: row.post_text_content,
        author: PublicProfile {
            id: row.post_author_id,
            username: row.post_author_username,
            name: row.post_author_name,
            profile_image_url: row.post_author_image_url,
        },
    };
    ReplyResponse {
        comment: comment_response(row.comment),
        post,
    }
}
