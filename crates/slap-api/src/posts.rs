use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use slap_db::models::{CommentRow, PostRow};
use slap_types::api::{
    ConfirmationResponse, CreatePostRequest, PostDetailResponse, PostResponse, UpdatePostRequest,
};
use slap_types::models::PublicProfile;

use crate::comments::comment_response;
use crate::error::ApiError;
use crate::feed;
use crate::middleware::Claims;
use crate::state::AppState;
use crate::time::parse_timestamp;

pub const MAX_POST_TEXT: usize = 500;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<i64>,
    /// Spotlight switch; only the literal string "true" activates it.
    #[serde(rename = "rightNow")]
    pub right_now: Option<String>,
    #[serde(rename = "searchQuery")]
    pub search_query: Option<String>,
}

/// GET /posts — the main feed, the spotlight, and post search share this
/// handler; the mode decides the filter and limit.
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let right_now = query.right_now.as_deref() == Some("true");
    let mode = feed::resolve_mode(right_now, query.search_query.as_deref());
    let plan = feed::plan(mode, query.limit)?;

    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || {
        db.db.list_posts(plan.text_filter.as_deref(), plan.limit)
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("blocking task failed: {e}")))??;

    let posts: Vec<PostResponse> = rows.into_iter().map(post_response).collect();
    Ok(Json(posts))
}

/// GET /posts/{post_id} — one post with its full comment thread.
pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let (row, comment_rows) = tokio::task::spawn_blocking(
        move || -> Result<(PostRow, Vec<CommentRow>), ApiError> {
            let row = db.db.get_post(post_id)?.ok_or(ApiError::NotFound("post"))?;
            let comments = db.db.comments_for_post(post_id)?;
            Ok((row, comments))
        },
    )
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("blocking task failed: {e}")))??;

    Ok(Json(PostDetailResponse {
        post: post_response(row),
        comments: comment_rows.into_iter().map(comment_response).collect(),
    }))
}

/// POST /posts
pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let text = normalize_text(req.text_content, MAX_POST_TEXT, "post")?;
    if lacks_content(text.as_deref(), req.image_url_1.as_deref(), req.image_url_2.as_deref()) {
        return Err(ApiError::validation("a post needs content (text or an image)"));
    }
    let mood = req.mood.filter(|m| !m.trim().is_empty());

    let db = state.clone();
    let author_id = claims.sub.clone();
    let row = tokio::task::spawn_blocking(move || -> Result<PostRow, ApiError> {
        // The profile-setup step should have created the author row already.
        if db.db.get_user_by_id(&author_id)?.is_none() {
            return Err(ApiError::Forbidden("complete your profile before posting"));
        }
        let post_id = db.db.insert_post(
            &author_id,
            text.as_deref(),
            req.image_url_1.as_deref(),
            req.image_url_2.as_deref(),
            mood.as_deref(),
        )?;
        db.db
            .get_post(post_id)?
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("created post vanished: {post_id}")))
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("blocking task failed: {e}")))??;

    Ok((StatusCode::CREATED, Json(post_response(row))))
}

/// PUT /posts/{post_id} — partial update, author only.
pub async fn update_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.text_content.is_none()
        && req.image_url_1.is_none()
        && req.image_url_2.is_none()
        && req.mood.is_none()
    {
        return Err(ApiError::validation("no fields to update"));
    }

    let new_text = match req.text_content {
        Some(value) => Some(normalize_text(value, MAX_POST_TEXT, "post")?),
        None => None,
    };

    let db = state.clone();
    let caller = claims.sub.clone();
    let row = tokio::task::spawn_blocking(move || -> Result<PostRow, ApiError> {
        let existing = db.db.get_post(post_id)?.ok_or(ApiError::NotFound("post"))?;
        if existing.author_id != caller {
            return Err(ApiError::Forbidden("not allowed to edit this post"));
        }

        // Absent fields keep their stored value; an explicit null clears.
        let text = new_text.unwrap_or(existing.text_content);
        let image_url_1 = req.image_url_1.unwrap_or(existing.image_url_1);
        let image_url_2 = req.image_url_2.unwrap_or(existing.image_url_2);
        let mood = req
            .mood
            .map(|m| m.filter(|s| !s.trim().is_empty()))
            .unwrap_or(existing.mood);

        if lacks_content(text.as_deref(), image_url_1.as_deref(), image_url_2.as_deref()) {
            return Err(ApiError::validation(
                "the update would leave the post without content",
            ));
        }

        db.db.update_post(
            post_id,
            text.as_deref(),
            image_url_1.as_deref(),
            image_url_2.as_deref(),
            mood.as_deref(),
        )?;
        db.db
            .get_post(post_id)?
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("updated post vanished: {post_id}")))
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("blocking task failed: {e}")))??;

    Ok(Json(post_response(row)))
}

/// DELETE /posts/{post_id} — author only; comments cascade with the post.
pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let caller = claims.sub.clone();
    tokio::task::spawn_blocking(move || -> Result<(), ApiError> {
        let existing = db.db.get_post(post_id)?.ok_or(ApiError::NotFound("post"))?;
        if existing.author_id != caller {
            return Err(ApiError::Forbidden("not allowed to delete this post"));
        }
        db.db.delete_post(post_id)?;
        Ok(())
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("blocking task failed: {e}")))??;

    Ok(Json(ConfirmationResponse {
        message: "post deleted".into(),
    }))
}

/// Posts, comments and messages all share the same rule: something must
/// survive normalization — text or at least one image.
pub(crate) fn lacks_content(
    text: Option<&str>,
    image_url_1: Option<&str>,
    image_url_2: Option<&str>,
) -> bool {
    text.is_none() && image_url_1.is_none() && image_url_2.is_none()
}

/// Trim, drop empty strings, and enforce the per-kind length cap.
pub(crate) fn normalize_text(
    text: Option<String>,
    max_chars: usize,
    what: &str,
) -> Result<Option<String>, ApiError> {
    let text = text
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    if let Some(t) = &text {
        if t.chars().count() > max_chars {
            return Err(ApiError::Validation(format!(
                "{what} text is limited to {max_chars} characters"
            )));
        }
    }
    Ok(text)
}

pub(crate) fn post_response(row: PostRow) -> PostResponse {
    let created_at = parse_timestamp(&row.created_at, "post");
    let updated_at = parse_timestamp(&row.updated_at, "post");
    PostResponse {
        id: row.id,
        author: PublicProfile {
            id: row.author_id,
            username: row.author_username,
            name: row.author_name,
            profile_image_url: row.author_image_url,
        },
        text_content: row.text_content,
        image_url_1: row.image_url_1,
        image_url_2: row.image_url_2,
        mood: row.mood,
        created_at,
        updated_at,
        comment_count: row.comment_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_rule_accepts_text_only_and_rejects_nothing() {
        // "hello" with no image is valid content.
        let text = normalize_text(Some("hello".into()), MAX_POST_TEXT, "post").unwrap();
        assert!(!lacks_content(text.as_deref(), None, None));

        // Empty text and no image is not.
        let empty = normalize_text(Some("".into()), MAX_POST_TEXT, "post").unwrap();
        assert!(lacks_content(empty.as_deref(), None, None));

        // An image alone carries the post.
        assert!(!lacks_content(None, Some("https://img/x.png"), None));
        assert!(!lacks_content(None, None, Some("https://img/y.png")));
    }

    #[test]
    fn normalize_text_trims_and_drops_empty() {
        assert_eq!(
            normalize_text(Some("  hello  ".into()), 500, "post").unwrap(),
            Some("hello".into())
        );
        assert_eq!(normalize_text(Some("   ".into()), 500, "post").unwrap(), None);
        assert_eq!(normalize_text(None, 500, "post").unwrap(), None);
    }

    #[test]
    fn normalize_text_enforces_the_cap_in_chars() {
        let at_cap = "a".repeat(500);
        assert!(normalize_text(Some(at_cap), 500, "post").is_ok());

        let over = "a".repeat(501);
        assert!(normalize_text(Some(over), 500, "post").is_err());

        // 300 multibyte chars are 300 characters, not 600 bytes.
        let multibyte = "é".repeat(300);
        assert!(normalize_text(Some(multibyte), 300, "comment").is_ok());
    }
}
