/// Database row types — these map directly to SQLite rows.
/// Distinct from the slap-types API models to keep the DB layer independent.
/// List rows carry their author's profile columns joined in, so handlers
/// never issue a second per-row lookup.

#[derive(Debug)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub name: String,
    pub profile_image_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct PostRow {
    pub id: i64,
    pub author_id: String,
    pub author_username: String,
    pub author_name: String,
    pub author_image_url: Option<String>,
    pub text_content: Option<String>,
    pub image_url_1: Option<String>,
    pub image_url_2: Option<String>,
    pub mood: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub comment_count: i64,
}

pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub author_id: String,
    pub author_username: String,
    pub author_name: String,
    pub author_image_url: Option<String>,
    pub text_content: Option<String>,
    pub image_url_1: Option<String>,
    pub image_url_2: Option<String>,
    pub created_at: String,
}

/// A comment joined with a summary of its parent post and the post's author,
/// for the profile "replies" tab.
pub struct ReplyRow {
    pub comment: CommentRow,
    pub post_text_content: Option<String>,
    pub post_author_id: String,
    pub post_author_username: String,
    pub post_author_name: String,
    pub post_author_image_url: Option<String>,
}

pub struct MessageRow {
    pub id: i64,
    pub sender_id: String,
    pub sender_username: String,
    pub sender_name: String,
    pub sender_image_url: Option<String>,
    pub receiver_id: String,
    pub receiver_username: String,
    pub receiver_name: String,
    pub receiver_image_url: Option<String>,
    pub text_content: Option<String>,
    pub image_url_1: Option<String>,
    pub image_url_2: Option<String>,
    pub created_at: String,
}
