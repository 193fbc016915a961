use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::PublicProfile;

// -- Posts --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatePostRequest {
    pub text_content: Option<String>,
    pub image_url_1: Option<String>,
    pub image_url_2: Option<String>,
    pub mood: Option<String>,
}

/// Partial update: absent fields are left untouched, a present-but-null
/// image field clears that image.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdatePostRequest {
    #[serde(default)]
    pub text_content: Option<Option<String>>,
    #[serde(default)]
    pub image_url_1: Option<Option<String>>,
    #[serde(default)]
    pub image_url_2: Option<Option<String>>,
    #[serde(default)]
    pub mood: Option<Option<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: i64,
    pub author: PublicProfile,
    pub text_content: Option<String>,
    pub image_url_1: Option<String>,
    pub image_url_2: Option<String>,
    pub mood: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub comment_count: i64,
}

/// A single opened post: the only place full comment lists travel.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetailResponse {
    #[serde(flatten)]
    pub post: PostResponse,
    pub comments: Vec<CommentResponse>,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub text_content: Option<String>,
    pub image_url_1: Option<String>,
    pub image_url_2: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: i64,
    pub post_id: i64,
    pub author: PublicProfile,
    pub text_content: Option<String>,
    pub image_url_1: Option<String>,
    pub image_url_2: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A comment as shown on its author's replies tab, with enough of the
/// parent post to render context.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyResponse {
    #[serde(flatten)]
    pub comment: CommentResponse,
    pub post: PostSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: i64,
    pub text_content: Option<String>,
    pub author: PublicProfile,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendMessageRequest {
    pub receiver_id: String,
    pub text_content: Option<String>,
    pub image_url_1: Option<String>,
    pub image_url_2: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: i64,
    pub sender: PublicProfile,
    pub receiver: PublicProfile,
    pub text_content: Option<String>,
    pub image_url_1: Option<String>,
    pub image_url_2: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// One entry in the conversation list: the counterpart plus a preview of
/// the most recent message exchanged with them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactResponse {
    pub user: PublicProfile,
    pub last_message: String,
    pub last_message_at: Option<DateTime<Utc>>,
}

// -- Profiles --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertProfileRequest {
    /// Optional echo of the caller's subject id; must match the session if set.
    pub auth0_id: Option<String>,
    pub username: String,
    pub name: Option<String>,
    pub profile_image_url: Option<String>,
}

// -- Uploads --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UploadRequest {
    pub image_base64: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub image_url: String,
}

// -- Misc --

#[derive(Debug, Serialize)]
pub struct ConfirmationResponse {
    pub message: String,
}
