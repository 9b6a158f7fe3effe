//! Database row types. These map directly to SQLite rows.
//! Distinct from yatube-types documents to keep the DB layer independent.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub date_joined: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRow {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

/// A post joined with its author's username, its group (if any) and its comment count.
#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: i64,
    pub text: String,
    pub pub_date: String,
    pub author_id: i64,
    pub author_username: String,
    pub group: Option<GroupRow>,
    /// Path relative to the media root.
    pub image: Option<String>,
    pub comment_count: u64,
}

#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub text: String,
    pub created: String,
}
