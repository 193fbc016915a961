use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use slap_db::models::UserRow;
use slap_types::api::{PostResponse, ReplyResponse, UpsertProfileRequest};
use slap_types::models::User;

use crate::comments::reply_response;
use crate::error::ApiError;
use crate::middleware::Claims;
use crate::posts::post_response;
use crate::state::AppState;
use crate::time::parse_timestamp;

pub const USER_SEARCH_LIMIT: u32 = 10;
pub const USER_POSTS_LIMIT: i64 = 20;
pub const USER_REPLIES_LIMIT: i64 = 20;

/// POST /users — create-or-update the caller's profile. Used by the
/// profile-setup step after first login and by later edits.
pub async fn upsert_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpsertProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // The session subject is authoritative; a contradicting body id is
    // someone trying to edit another account.
    if let Some(body_id) = &req.auth0_id {
        if body_id != &claims.sub {
            return Err(ApiError::Forbidden("user id mismatch"));
        }
    }

    validate_handle(&req.username)?;
    let username = req.username.to_lowercase();

    let name = req
        .name
        .filter(|n| !n.trim().is_empty())
        .or(claims.name)
        .unwrap_or_else(|| username.clone());
    let profile_image_url = req.profile_image_url.or(claims.picture);

    let db = state.clone();
    let caller_id = claims.sub.clone();
    let row = tokio::task::spawn_blocking(move || -> Result<UserRow, ApiError> {
        // Pre-check: is the handle owned by a DIFFERENT identity? Owning it
        // oneself is not a conflict.
        if let Some(existing) = db.db.get_user_by_username(&username)? {
            if existing.id != caller_id {
                return Err(ApiError::Conflict("this @username is already taken".into()));
            }
        }

        // The NOCASE unique index backs the pre-check up; losing the race
        // surfaces as a constraint violation, translated to the same 409.
        db.db
            .upsert_user(&caller_id, &username, &name, profile_image_url.as_deref())
            .map_err(ApiError::username_conflict_or_internal)
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("blocking task failed: {e}")))??;

    Ok(Json(user_response(row)))
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub username: Option<String>,
    #[serde(rename = "auth0Id")]
    pub auth0_id: Option<String>,
    /// Alias for auth0Id.
    pub id: Option<String>,
    #[serde(rename = "searchQuery")]
    pub search_query: Option<String>,
}

/// GET /users — resolve a user by handle or subject id, or search by
/// free text. Exactly one parameter family applies, in that order.
pub async fn resolve_users(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Response, ApiError> {
    if let Some(username) = query.username {
        let lookup = username.to_lowercase();
        let db = state.clone();
        let row = tokio::task::spawn_blocking(move || db.db.get_user_by_username(&lookup))
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("blocking task failed: {e}")))??
            .ok_or(ApiError::NotFound("user"))?;
        return Ok(Json(user_response(row)).into_response());
    }

    if let Some(id) = query.auth0_id.or(query.id) {
        let db = state.clone();
        let row = tokio::task::spawn_blocking(move || db.db.get_user_by_id(&id))
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("blocking task failed: {e}")))??
            .ok_or(ApiError::NotFound("user"))?;
        return Ok(Json(user_response(row)).into_response());
    }

    if let Some(search_query) = query.search_query {
        let db = state.clone();
        let rows = tokio::task::spawn_blocking(move || {
            db.db.search_users(&search_query, USER_SEARCH_LIMIT)
        })
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("blocking task failed: {e}")))??;
        let users: Vec<User> = rows.into_iter().map(user_response).collect();
        return Ok(Json(users).into_response());
    }

    Err(ApiError::validation("missing user lookup parameter"))
}

/// GET /users/{user_id}/posts — a profile's own posts, newest first.
pub async fn user_posts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.posts_by_user(&user_id, USER_POSTS_LIMIT))
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("blocking task failed: {e}")))??;

    let posts: Vec<PostResponse> = rows.into_iter().map(post_response).collect();
    Ok(Json(posts))
}

/// GET /users/{user_id}/replies — the profile's comments with parent-post
/// context, newest first.
pub async fn user_replies(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let rows =
        tokio::task::spawn_blocking(move || db.db.replies_by_user(&user_id, USER_REPLIES_LIMIT))
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("blocking task failed: {e}")))??;

    let replies: Vec<ReplyResponse> = rows.into_iter().map(reply_response).collect();
    Ok(Json(replies))
}

/// Handles are 3-20 characters of letters, digits and underscore;
/// uniqueness is case-insensitive, so storage lowercases them.
fn validate_handle(username: &str) -> Result<(), ApiError> {
    let ok = (3..=20).contains(&username.chars().count())
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if ok {
        Ok(())
    } else {
        Err(ApiError::validation(
            "invalid username: 3-20 characters, letters, digits and underscore only",
        ))
    }
}

fn user_response(row: UserRow) -> User {
    let created_at = parse_timestamp(&row.created_at, "user");
    let updated_at = parse_timestamp(&row.updated_at, "user");
    User {
        id: row.id,
        username: row.username,
        name: row.name,
        profile_image_url: row.profile_image_url,
        created_at,
        updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::validate_handle;

    #[test]
    fn accepts_well_formed_handles() {
        assert!(validate_handle("bob").is_ok());
        assert!(validate_handle("Tori_Vega").is_ok());
        assert!(validate_handle("a2345678901234567890").is_ok());
    }

    #[test]
    fn rejects_bad_lengths_and_characters() {
        assert!(validate_handle("ab").is_err());
        assert!(validate_handle("a23456789012345678901").is_err());
        assert!(validate_handle("").is_err());
        assert!(validate_handle("bad handle").is_err());
        assert!(validate_handle("émile").is_err());
        assert!(validate_handle("bob!").is_err());
    }
}
