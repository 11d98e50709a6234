/// Database row types — these map directly to SQLite rows.
/// Distinct from the agora-types wire models to keep the DB layer
/// independent.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub name: String,
    pub password: String,
    pub created_at: String,
}

pub struct PostRow {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub author_name: String,
    pub author_email: String,
    pub created_at: String,
    pub comment_count: i64,
    pub like_count: i64,
    pub dislike_count: i64,
}

pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub author_name: String,
    pub author_email: String,
    pub content: String,
    pub parent_id: Option<String>,
    pub created_at: String,
}

/// Just enough of a comment to run ownership and same-post checks.
pub struct CommentMetaRow {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
}

pub struct ProfileRow {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub post_count: i64,
    pub comment_count: i64,
}

pub struct RecentPostRow {
    pub id: String,
    pub title: String,
    pub created_at: String,
    pub comment_count: i64,
    pub like_count: i64,
}
