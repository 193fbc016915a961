use crate::Database;
use crate::models::{CommentRow, MessageRow, PostRow, ReplyRow, UserRow};
use anyhow::Result;
use rusqlite::{Connection, Row};

const POST_SELECT: &str = "
    SELECT p.id, p.user_id, u.username, u.name, u.profile_image_url,
           p.text_content, p.image_url_1, p.image_url_2, p.mood,
           p.created_at, p.updated_at,
           (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count
    FROM posts p
    JOIN users u ON p.user_id = u.id";

const MESSAGE_SELECT: &str = "
    SELECT m.id,
           m.sender_id, s.username, s.name, s.profile_image_url,
           m.receiver_id, r.username, r.name, r.profile_image_url,
           m.text_content, m.image_url_1, m.image_url_2, m.created_at
    FROM messages m
    JOIN users s ON m.sender_id = s.id
    JOIN users r ON m.receiver_id = r.id";

impl Database {
    // -- Users --

    /// Create-or-update a profile keyed on the identity provider's subject id.
    /// A clash on the NOCASE-unique username column surfaces as the raw
    /// rusqlite constraint error so callers can translate it to a conflict.
    pub fn upsert_user(
        &self,
        id: &str,
        username: &str,
        name: &str,
        profile_image_url: Option<&str>,
    ) -> Result<UserRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, name, profile_image_url)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                     username = excluded.username,
                     name = excluded.name,
                     profile_image_url = excluded.profile_image_url,
                     updated_at = datetime('now')",
                rusqlite::params![id, username, name, profile_image_url],
            )?;
            query_user_by_id(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("upserted user vanished: {}", id))
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{USER_SELECT} WHERE username = ?1"))?;
            let row = stmt.query_row([username], map_user_row).optional()?;
            Ok(row)
        })
    }

    /// Case-insensitive contains over handle and display name.
    pub fn search_users(&self, query: &str, limit: u32) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{USER_SELECT}
                 WHERE instr(lower(username), lower(?1)) > 0
                    OR instr(lower(name), lower(?1)) > 0
                 ORDER BY username ASC
                 LIMIT ?2"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![query, limit], map_user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Posts --

    pub fn insert_post(
        &self,
        user_id: &str,
        text_content: Option<&str>,
        image_url_1: Option<&str>,
        image_url_2: Option<&str>,
        mood: Option<&str>,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO posts (user_id, text_content, image_url_1, image_url_2, mood)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![user_id, text_content, image_url_1, image_url_2, mood],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_post(&self, post_id: i64) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{POST_SELECT} WHERE p.id = ?1"))?;
            let row = stmt.query_row([post_id], map_post_row).optional()?;
            Ok(row)
        })
    }

    /// Shared feed selection: newest first, optional case-insensitive text
    /// filter. Ties on created_at fall back to id so the emitted order is
    /// always deterministic.
    pub fn list_posts(&self, text_filter: Option<&str>, limit: i64) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let rows = match text_filter {
                Some(filter) => {
                    let mut stmt = conn.prepare(&format!(
                        "{POST_SELECT}
                         WHERE instr(lower(p.text_content), lower(?1)) > 0
                         ORDER BY p.created_at DESC, p.id DESC
                         LIMIT ?2"
                    ))?;
                    stmt.query_map(rusqlite::params![filter, limit], map_post_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "{POST_SELECT}
                         ORDER BY p.created_at DESC, p.id DESC
                         LIMIT ?1"
                    ))?;
                    stmt.query_map([limit], map_post_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?
                }
            };
            Ok(rows)
        })
    }

    pub fn posts_by_user(&self, user_id: &str, limit: i64) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{POST_SELECT}
                 WHERE p.user_id = ?1
                 ORDER BY p.created_at DESC, p.id DESC
                 LIMIT ?2"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], map_post_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Full-value update; the handler decides the final field set.
    pub fn update_post(
        &self,
        post_id: i64,
        text_content: Option<&str>,
        image_url_1: Option<&str>,
        image_url_2: Option<&str>,
        mood: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE posts
                 SET text_content = ?2, image_url_1 = ?3, image_url_2 = ?4, mood = ?5,
                     updated_at = datetime('now')
                 WHERE id = ?1",
                rusqlite::params![post_id, text_content, image_url_1, image_url_2, mood],
            )?;
            Ok(())
        })
    }

    /// Comments go with the post via ON DELETE CASCADE.
    pub fn delete_post(&self, post_id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM posts WHERE id = ?1", [post_id])?;
            Ok(())
        })
    }

    // -- Comments --

    pub fn insert_comment(
        &self,
        post_id: i64,
        user_id: &str,
        text_content: Option<&str>,
        image_url_1: Option<&str>,
        image_url_2: Option<&str>,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (post_id, user_id, text_content, image_url_1, image_url_2)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![post_id, user_id, text_content, image_url_1, image_url_2],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_comment(&self, comment_id: i64) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{COMMENT_SELECT} WHERE c.id = ?1"))?;
            let row = stmt.query_row([comment_id], map_comment_row).optional()?;
            Ok(row)
        })
    }

    /// Oldest first, so an opened post reads top to bottom.
    pub fn comments_for_post(&self, post_id: i64) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{COMMENT_SELECT}
                 WHERE c.post_id = ?1
                 ORDER BY c.created_at ASC, c.id ASC"
            ))?;
            let rows = stmt
                .query_map([post_id], map_comment_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn replies_by_user(&self, user_id: &str, limit: i64) -> Result<Vec<ReplyRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.post_id, c.user_id, u.username, u.name, u.profile_image_url,
                        c.text_content, c.image_url_1, c.image_url_2, c.created_at,
                        p.text_content,
                        p.user_id, pu.username, pu.name, pu.profile_image_url
                 FROM comments c
                 JOIN users u ON c.user_id = u.id
                 JOIN posts p ON c.post_id = p.id
                 JOIN users pu ON p.user_id = pu.id
                 WHERE c.user_id = ?1
                 ORDER BY c.created_at DESC, c.id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], |row| {
                    Ok(ReplyRow {
                        comment: CommentRow {
                            id: row.get(0)?,
                            post_id: row.get(1)?,
                            author_id: row.get(2)?,
                            author_username: row.get(3)?,
                            author_name: row.get(4)?,
                            author_image_url: row.get(5)?,
                            text_content: row.get(6)?,
                            image_url_1: row.get(7)?,
                            image_url_2: row.get(8)?,
                            created_at: row.get(9)?,
                        },
                        post_text_content: row.get(10)?,
                        post_author_id: row.get(11)?,
                        post_author_username: row.get(12)?,
                        post_author_name: row.get(13)?,
                        post_author_image_url: row.get(14)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        sender_id: &str,
        receiver_id: &str,
        text_content: Option<&str>,
        image_url_1: Option<&str>,
        image_url_2: Option<&str>,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (sender_id, receiver_id, text_content, image_url_1, image_url_2)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![sender_id, receiver_id, text_content, image_url_1, image_url_2],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// The two-party conversation, oldest first.
    pub fn messages_between(&self, user_a: &str, user_b: &str, limit: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{MESSAGE_SELECT}
                 WHERE (m.sender_id = ?1 AND m.receiver_id = ?2)
                    OR (m.sender_id = ?2 AND m.receiver_id = ?1)
                 ORDER BY m.created_at ASC, m.id ASC
                 LIMIT ?3"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![user_a, user_b, limit], map_message_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Everything the user ever sent or received, newest first — the input
    /// the conversation index folds over.
    pub fn messages_involving(&self, user_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{MESSAGE_SELECT}
                 WHERE m.sender_id = ?1 OR m.receiver_id = ?1
                 ORDER BY m.created_at DESC, m.id DESC"
            ))?;
            let rows = stmt
                .query_map([user_id], map_message_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

const USER_SELECT: &str =
    "SELECT id, username, name, profile_image_url, created_at, updated_at FROM users";

const COMMENT_SELECT: &str = "
    SELECT c.id, c.post_id, c.user_id, u.username, u.name, u.profile_image_url,
           c.text_content, c.image_url_1, c.image_url_2, c.created_at
    FROM comments c
    JOIN users u ON c.user_id = u.id";

fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!("{USER_SELECT} WHERE id = ?1"))?;
    let row = stmt.query_row([id], map_user_row).optional()?;
    Ok(row)
}

fn map_user_row(row: &Row<'_>) -> std::result::Result<UserRow, rusqlite::Error> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        name: row.get(2)?,
        profile_image_url: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn map_post_row(row: &Row<'_>) -> std::result::Result<PostRow, rusqlite::Error> {
    Ok(PostRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_username: row.get(2)?,
        author_name: row.get(3)?,
        author_image_url: row.get(4)?,
        text_content: row.get(5)?,
        image_url_1: row.get(6)?,
        image_url_2: row.get(7)?,
        mood: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        comment_count: row.get(11)?,
    })
}

fn map_comment_row(row: &Row<'_>) -> std::result::Result<CommentRow, rusqlite::Error> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author_id: row.get(2)?,
        author_username: row.get(3)?,
        author_name: row.get(4)?,
        author_image_url: row.get(5)?,
        text_content: row.get(6)?,
        image_url_1: row.get(7)?,
        image_url_2: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn map_message_row(row: &Row<'_>) -> std::result::Result<MessageRow, rusqlite::Error> {
    Ok(MessageRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        sender_username: row.get(2)?,
        sender_name: row.get(3)?,
        sender_image_url: row.get(4)?,
        receiver_id: row.get(5)?,
        receiver_username: row.get(6)?,
        receiver_name: row.get(7)?,
        receiver_image_url: row.get(8)?,
        text_content: row.get(9)?,
        image_url_1: row.get(10)?,
        image_url_2: row.get(11)?,
        created_at: row.get(12)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;

    fn db_with_users() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.upsert_user("auth0|alice", "alice", "Alice", None).unwrap();
        db.upsert_user("auth0|bob", "bob", "Bob", Some("https://img/bob.png"))
            .unwrap();
        db
    }

    #[test]
    fn upsert_creates_then_updates() {
        let db = Database::open_in_memory().unwrap();

        let created = db
            .upsert_user("auth0|alice", "alice", "Alice", None)
            .unwrap();
        assert_eq!(created.username, "alice");

        let updated = db
            .upsert_user("auth0|alice", "alice_2", "Alice Q", Some("https://img/a.png"))
            .unwrap();
        assert_eq!(updated.id, "auth0|alice");
        assert_eq!(updated.username, "alice_2");
        assert_eq!(updated.name, "Alice Q");
        assert_eq!(updated.profile_image_url.as_deref(), Some("https://img/a.png"));
    }

    #[test]
    fn username_unique_is_case_insensitive() {
        let db = db_with_users();

        // Same handle, different case, different identity: constraint fires.
        let err = db
            .upsert_user("auth0|mallory", "ALICE", "Mallory", None)
            .unwrap_err();
        let sqlite = err.downcast_ref::<rusqlite::Error>().unwrap();
        assert!(matches!(
            sqlite,
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        ));
    }

    #[test]
    fn resubmitting_own_handle_succeeds() {
        let db = db_with_users();
        let user = db
            .upsert_user("auth0|alice", "alice", "Alice Again", None)
            .unwrap();
        assert_eq!(user.name, "Alice Again");
    }

    #[test]
    fn deleting_a_post_cascades_to_comments() {
        let db = db_with_users();
        let post_id = db
            .insert_post("auth0|alice", Some("hello"), None, None, None)
            .unwrap();
        db.insert_comment(post_id, "auth0|bob", Some("hi back"), None, None)
            .unwrap();
        assert_eq!(db.comments_for_post(post_id).unwrap().len(), 1);

        db.delete_post(post_id).unwrap();

        assert!(db.get_post(post_id).unwrap().is_none());
        assert!(db.comments_for_post(post_id).unwrap().is_empty());
    }

    #[test]
    fn comment_count_rides_along_with_posts() {
        let db = db_with_users();
        let post_id = db
            .insert_post("auth0|alice", Some("counted"), None, None, None)
            .unwrap();
        db.insert_comment(post_id, "auth0|bob", Some("one"), None, None)
            .unwrap();
        db.insert_comment(post_id, "auth0|alice", Some("two"), None, None)
            .unwrap();

        let post = db.get_post(post_id).unwrap().unwrap();
        assert_eq!(post.comment_count, 2);
    }

    #[test]
    fn post_search_is_case_insensitive_contains() {
        let db = db_with_users();
        db.insert_post("auth0|alice", Some("Good Morning World"), None, None, None)
            .unwrap();
        db.insert_post("auth0|bob", Some("nothing to see"), None, None, None)
            .unwrap();

        let hits = db.list_posts(Some("MORNING"), 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text_content.as_deref(), Some("Good Morning World"));

        // An image-only post has no text to match.
        db.insert_post("auth0|bob", None, Some("https://img/x.png"), None, None)
            .unwrap();
        assert_eq!(db.list_posts(Some("img"), 10).unwrap().len(), 0);
    }

    #[test]
    fn feed_order_is_newest_first_with_id_tiebreak() {
        let db = db_with_users();
        let first = db.insert_post("auth0|alice", Some("a"), None, None, None).unwrap();
        let second = db.insert_post("auth0|alice", Some("b"), None, None, None).unwrap();
        let third = db.insert_post("auth0|bob", Some("c"), None, None, None).unwrap();

        let ids: Vec<i64> = db.list_posts(None, 10).unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![third, second, first]);
    }

    #[test]
    fn conversation_reads_oldest_first_and_index_input_newest_first() {
        let db = db_with_users();
        let m1 = db
            .insert_message("auth0|alice", "auth0|bob", Some("hey"), None, None)
            .unwrap();
        let m2 = db
            .insert_message("auth0|bob", "auth0|alice", Some("yo"), None, None)
            .unwrap();

        let convo = db.messages_between("auth0|alice", "auth0|bob", 100).unwrap();
        assert_eq!(convo.iter().map(|m| m.id).collect::<Vec<_>>(), vec![m1, m2]);

        let involving = db.messages_involving("auth0|alice").unwrap();
        assert_eq!(involving.iter().map(|m| m.id).collect::<Vec<_>>(), vec![m2, m1]);
        assert_eq!(involving[0].sender_username, "bob");
        assert_eq!(involving[0].receiver_username, "alice");
    }

    #[test]
    fn self_messages_are_rejected_by_the_store() {
        let db = db_with_users();
        assert!(
            db.insert_message("auth0|alice", "auth0|alice", Some("me"), None, None)
                .is_err()
        );
    }

    #[test]
    fn user_search_matches_handle_and_display_name() {
        let db = db_with_users();
        db.upsert_user("auth0|carol", "cj_official", "Carol Jones", None)
            .unwrap();

        let by_handle = db.search_users("CJ", 10).unwrap();
        assert_eq!(by_handle.len(), 1);
        assert_eq!(by_handle[0].username, "cj_official");

        let by_name = db.search_users("jones", 10).unwrap();
        assert_eq!(by_name.len(), 1);

        assert!(db.search_users("nobody", 10).unwrap().is_empty());
    }
}
