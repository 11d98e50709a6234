use crate::models::{CommentMetaRow, CommentRow, PostRow, ProfileRow, RecentPostRow, UserRow};
use crate::{Database, now_timestamp};
use anyhow::Result;
use rusqlite::{Connection, Row, params};

/// Sort order for the post list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostSort {
    Latest,
    MostLiked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteKind {
    Like,
    Dislike,
}

impl VoteKind {
    pub fn opposite(self) -> VoteKind {
        match self {
            VoteKind::Like => VoteKind::Dislike,
            VoteKind::Dislike => VoteKind::Like,
        }
    }
}

/// What a vote attaches to. Posts and comments use separate tables with
/// the same shape, so every vote query is generic over the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTarget {
    Post,
    Comment,
}

impl VoteTarget {
    fn subject_column(self) -> &'static str {
        match self {
            VoteTarget::Post => "post_id",
            VoteTarget::Comment => "comment_id",
        }
    }

    fn table(self, kind: VoteKind) -> &'static str {
        match (self, kind) {
            (VoteTarget::Post, VoteKind::Like) => "likes",
            (VoteTarget::Post, VoteKind::Dislike) => "dislikes",
            (VoteTarget::Comment, VoteKind::Like) => "comment_likes",
            (VoteTarget::Comment, VoteKind::Dislike) => "comment_dislikes",
        }
    }
}

const POST_SELECT: &str = "
    SELECT p.id, p.title, p.content, p.author_id, u.name, u.email, p.created_at,
           (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count,
           (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS like_count,
           (SELECT COUNT(*) FROM dislikes d WHERE d.post_id = p.id) AS dislike_count
    FROM posts p
    LEFT JOIN users u ON p.author_id = u.id";

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, email: &str, name: &str, password_hash: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, name, password, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, email, name, password_hash, now_timestamp()],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn get_user_profile(&self, id: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.name, u.created_at,
                        (SELECT COUNT(*) FROM posts p WHERE p.author_id = u.id),
                        (SELECT COUNT(*) FROM comments c WHERE c.author_id = u.id)
                 FROM users u WHERE u.id = ?1",
            )?;
            let row = stmt
                .query_row([id], |row| {
                    Ok(ProfileRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        created_at: row.get(2)?,
                        post_count: row.get(3)?,
                        comment_count: row.get(4)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    /// Total likes received across all of a user's posts.
    pub fn count_likes_received(&self, author_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM likes l JOIN posts p ON l.post_id = p.id WHERE p.author_id = ?1",
                [author_id],
                |row| row.get(0),
            )?;
            Ok(n)
        })
    }

    pub fn recent_posts_by_author(&self, author_id: &str, limit: u32) -> Result<Vec<RecentPostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.title, p.created_at,
                        (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id),
                        (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id)
                 FROM posts p
                 WHERE p.author_id = ?1
                 ORDER BY p.created_at DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![author_id, limit], |row| {
                    Ok(RecentPostRow {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        created_at: row.get(2)?,
                        comment_count: row.get(3)?,
                        like_count: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Posts --

    pub fn insert_post(&self, id: &str, title: &str, content: &str, author_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO posts (id, title, content, author_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, title, content, author_id, now_timestamp()],
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!("{POST_SELECT} WHERE p.id = ?1");
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row([id], map_post_row).optional()?;
            Ok(row)
        })
    }

    pub fn get_post_author(&self, id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row("SELECT author_id FROM posts WHERE id = ?1", [id], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(row)
        })
    }

    pub fn post_exists(&self, id: &str) -> Result<bool> {
        Ok(self.get_post_author(id)?.is_some())
    }

    /// Paginated post listing with substring search over title/content.
    pub fn list_posts(
        &self,
        search: &str,
        sort: PostSort,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PostRow>> {
        let order = match sort {
            PostSort::Latest => "p.created_at DESC",
            PostSort::MostLiked => "like_count DESC, p.created_at DESC",
        };
        self.with_conn(|conn| {
            let sql = format!(
                "{POST_SELECT}
                 WHERE (?1 = '' OR p.title LIKE '%' || ?1 || '%' OR p.content LIKE '%' || ?1 || '%')
                 ORDER BY {order}
                 LIMIT ?2 OFFSET ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![search, limit, offset], map_post_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_posts(&self, search: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM posts p
                 WHERE (?1 = '' OR p.title LIKE '%' || ?1 || '%' OR p.content LIKE '%' || ?1 || '%')",
                [search],
                |row| row.get(0),
            )?;
            Ok(n)
        })
    }

    /// Leaderboard listing: only posts with at least one like, most liked
    /// first.
    pub fn list_best_posts(&self, search: &str, limit: u32, offset: u64) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{POST_SELECT}
                 WHERE EXISTS (SELECT 1 FROM likes l2 WHERE l2.post_id = p.id)
                   AND (?1 = '' OR p.title LIKE '%' || ?1 || '%' OR p.content LIKE '%' || ?1 || '%')
                 ORDER BY like_count DESC, p.created_at DESC
                 LIMIT ?2 OFFSET ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![search, limit, offset], map_post_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_best_posts(&self, search: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM posts p
                 WHERE EXISTS (SELECT 1 FROM likes l2 WHERE l2.post_id = p.id)
                   AND (?1 = '' OR p.title LIKE '%' || ?1 || '%' OR p.content LIKE '%' || ?1 || '%')",
                [search],
                |row| row.get(0),
            )?;
            Ok(n)
        })
    }

    pub fn update_post(&self, id: &str, title: &str, content: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE posts SET title = ?1, content = ?2 WHERE id = ?3",
                params![title, content, id],
            )?;
            Ok(())
        })
    }

    /// Comments, likes and dislikes go with the post via schema cascades.
    pub fn delete_post(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- Comments --

    pub fn insert_comment(
        &self,
        id: &str,
        post_id: &str,
        author_id: &str,
        content: &str,
        parent_id: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (id, post_id, author_id, content, parent_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, post_id, author_id, content, parent_id, now_timestamp()],
            )?;
            Ok(())
        })
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.post_id, c.author_id, u.name, u.email, c.content, c.parent_id, c.created_at
                 FROM comments c
                 LEFT JOIN users u ON c.author_id = u.id
                 WHERE c.id = ?1",
            )?;
            let row = stmt.query_row([id], map_comment_row).optional()?;
            Ok(row)
        })
    }

    pub fn get_comment_meta(&self, id: &str) -> Result<Option<CommentMetaRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, post_id, author_id FROM comments WHERE id = ?1",
                    [id],
                    |row| {
                        Ok(CommentMetaRow {
                            id: row.get(0)?,
                            post_id: row.get(1)?,
                            author_id: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Every comment on a post in one flat query, newest first. The tree
    /// view is derived from this in memory — no per-level round trips.
    pub fn comments_for_post(&self, post_id: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.post_id, c.author_id, u.name, u.email, c.content, c.parent_id, c.created_at
                 FROM comments c
                 LEFT JOIN users u ON c.author_id = u.id
                 WHERE c.post_id = ?1
                 ORDER BY c.created_at DESC",
            )?;
            let rows = stmt
                .query_map([post_id], map_comment_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_comments(&self, post_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM comments WHERE post_id = ?1",
                [post_id],
                |row| row.get(0),
            )?;
            Ok(n)
        })
    }

    /// Deletes a comment; descendants and their vote rows follow via the
    /// schema cascades, all inside SQLite's implicit statement transaction.
    pub fn delete_comment(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM comments WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- Votes --

    pub fn count_votes(&self, target: VoteTarget, kind: VoteKind, subject_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT COUNT(*) FROM {} WHERE {} = ?1",
                target.table(kind),
                target.subject_column()
            );
            let n = conn.query_row(&sql, [subject_id], |row| row.get(0))?;
            Ok(n)
        })
    }

    pub fn has_vote(
        &self,
        target: VoteTarget,
        kind: VoteKind,
        subject_id: &str,
        user_id: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT 1 FROM {} WHERE {} = ?1 AND user_id = ?2",
                target.table(kind),
                target.subject_column()
            );
            let row: Option<i64> = conn
                .query_row(&sql, params![subject_id, user_id], |row| row.get(0))
                .optional()?;
            Ok(row.is_some())
        })
    }

    /// Toggle a vote: removes it if present, otherwise clears any opposite
    /// vote and inserts. Returns true when the vote is active afterwards.
    ///
    /// The delete-opposite + insert pair runs in one transaction so a
    /// failure cannot strand the user between states. A UNIQUE violation on
    /// the insert means a concurrent toggle already created the row; that
    /// resolves as "vote active", not an error.
    pub fn toggle_vote(
        &self,
        target: VoteTarget,
        kind: VoteKind,
        subject_id: &str,
        user_id: &str,
        vote_id: &str,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let table = target.table(kind);
            let opposite = target.table(kind.opposite());
            let subject_col = target.subject_column();

            let tx = conn.unchecked_transaction()?;

            let existing: Option<String> = tx
                .query_row(
                    &format!("SELECT id FROM {table} WHERE {subject_col} = ?1 AND user_id = ?2"),
                    params![subject_id, user_id],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(existing_id) = existing {
                // Retraction
                tx.execute(&format!("DELETE FROM {table} WHERE id = ?1"), [&existing_id])?;
                tx.commit()?;
                return Ok(false);
            }

            // Mutual exclusion: drop the opposite vote before inserting
            tx.execute(
                &format!("DELETE FROM {opposite} WHERE {subject_col} = ?1 AND user_id = ?2"),
                params![subject_id, user_id],
            )?;

            let inserted = tx.execute(
                &format!(
                    "INSERT INTO {table} (id, {subject_col}, user_id, created_at) VALUES (?1, ?2, ?3, ?4)"
                ),
                params![vote_id, subject_id, user_id, now_timestamp()],
            );
            match inserted {
                Ok(_) => {}
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    // Lost a race with another toggle; the vote exists.
                }
                Err(e) => return Err(e.into()),
            }

            tx.commit()?;
            Ok(true)
        })
    }
}

fn map_post_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        author_id: row.get(3)?,
        author_name: row
            .get::<_, Option<String>>(4)?
            .unwrap_or_else(|| "unknown".to_string()),
        author_email: row
            .get::<_, Option<String>>(5)?
            .unwrap_or_else(|| "unknown".to_string()),
        created_at: row.get(6)?,
        comment_count: row.get(7)?,
        like_count: row.get(8)?,
        dislike_count: row.get(9)?,
    })
}

fn map_comment_row(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author_id: row.get(2)?,
        author_name: row
            .get::<_, Option<String>>(3)?
            .unwrap_or_else(|| "unknown".to_string()),
        author_email: row
            .get::<_, Option<String>>(4)?
            .unwrap_or_else(|| "unknown".to_string()),
        content: row.get(5)?,
        parent_id: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT id, email, name, password, created_at FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                name: row.get(2)?,
                password: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
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
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn seed_user(db: &Database, id: &str) {
        db.create_user(id, &format!("{id}@example.com"), id, "hash")
            .unwrap();
    }

    fn seed_post(db: &Database, id: &str, author: &str) {
        db.insert_post(id, "title", "content", author).unwrap();
    }

    #[test]
    fn vote_toggle_idempotent() {
        let db = test_db();
        seed_user(&db, "u1");
        seed_post(&db, "p1", "u1");

        let active = db
            .toggle_vote(VoteTarget::Post, VoteKind::Like, "p1", "u1", "v1")
            .unwrap();
        assert!(active);
        assert_eq!(db.count_votes(VoteTarget::Post, VoteKind::Like, "p1").unwrap(), 1);
        assert!(db.has_vote(VoteTarget::Post, VoteKind::Like, "p1", "u1").unwrap());

        // Second toggle retracts — back to the original state
        let active = db
            .toggle_vote(VoteTarget::Post, VoteKind::Like, "p1", "u1", "v2")
            .unwrap();
        assert!(!active);
        assert_eq!(db.count_votes(VoteTarget::Post, VoteKind::Like, "p1").unwrap(), 0);
        assert!(!db.has_vote(VoteTarget::Post, VoteKind::Like, "p1", "u1").unwrap());
    }

    #[test]
    fn vote_mutual_exclusion() {
        let db = test_db();
        seed_user(&db, "u1");
        seed_user(&db, "u2");
        seed_post(&db, "p1", "u1");

        db.toggle_vote(VoteTarget::Post, VoteKind::Like, "p1", "u2", "v1")
            .unwrap();
        // Switching to dislike must clear the like
        let active = db
            .toggle_vote(VoteTarget::Post, VoteKind::Dislike, "p1", "u2", "v2")
            .unwrap();
        assert!(active);
        assert_eq!(db.count_votes(VoteTarget::Post, VoteKind::Like, "p1").unwrap(), 0);
        assert_eq!(db.count_votes(VoteTarget::Post, VoteKind::Dislike, "p1").unwrap(), 1);
        assert!(!db.has_vote(VoteTarget::Post, VoteKind::Like, "p1", "u2").unwrap());
        assert!(db.has_vote(VoteTarget::Post, VoteKind::Dislike, "p1", "u2").unwrap());
    }

    #[test]
    fn vote_mutual_exclusion_holds_under_any_sequence() {
        let db = test_db();
        seed_user(&db, "u1");
        seed_post(&db, "p1", "u1");

        let sequence = [
            VoteKind::Like,
            VoteKind::Like,
            VoteKind::Dislike,
            VoteKind::Like,
            VoteKind::Dislike,
            VoteKind::Dislike,
            VoteKind::Like,
        ];
        for kind in sequence {
            db.toggle_vote(VoteTarget::Post, kind, "p1", "u1", &format!("v-{kind:?}"))
                .ok();
            let liked = db.has_vote(VoteTarget::Post, VoteKind::Like, "p1", "u1").unwrap();
            let disliked = db
                .has_vote(VoteTarget::Post, VoteKind::Dislike, "p1", "u1")
                .unwrap();
            assert!(!(liked && disliked));
        }
    }

    #[test]
    fn comment_votes_are_scoped_per_comment() {
        let db = test_db();
        seed_user(&db, "u1");
        seed_post(&db, "p1", "u1");
        db.insert_comment("c1", "p1", "u1", "hello", None).unwrap();
        db.insert_comment("c2", "p1", "u1", "world", None).unwrap();

        db.toggle_vote(VoteTarget::Comment, VoteKind::Like, "c1", "u1", "v1")
            .unwrap();
        assert_eq!(db.count_votes(VoteTarget::Comment, VoteKind::Like, "c1").unwrap(), 1);
        assert_eq!(db.count_votes(VoteTarget::Comment, VoteKind::Like, "c2").unwrap(), 0);
    }

    #[test]
    fn duplicate_vote_insert_resolves_as_voted() {
        let db = test_db();
        seed_user(&db, "u1");
        seed_post(&db, "p1", "u1");

        db.toggle_vote(VoteTarget::Post, VoteKind::Like, "p1", "u1", "v1")
            .unwrap();
        // Direct duplicate insert (simulating the race the UNIQUE key guards
        // against) must fail at the store level
        let dup = db.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO likes (id, post_id, user_id) VALUES ('v2', 'p1', 'u1')",
                [],
            )?;
            Ok(())
        });
        assert!(dup.is_err());
        assert_eq!(db.count_votes(VoteTarget::Post, VoteKind::Like, "p1").unwrap(), 1);
    }

    #[test]
    fn post_delete_cascades_comments_and_votes() {
        let db = test_db();
        seed_user(&db, "u1");
        seed_user(&db, "u2");
        seed_post(&db, "p1", "u1");
        db.insert_comment("c1", "p1", "u2", "hi", None).unwrap();
        db.insert_comment("c2", "p1", "u2", "reply", Some("c1")).unwrap();
        db.toggle_vote(VoteTarget::Post, VoteKind::Like, "p1", "u2", "v1")
            .unwrap();
        db.toggle_vote(VoteTarget::Comment, VoteKind::Dislike, "c2", "u1", "v2")
            .unwrap();

        db.delete_post("p1").unwrap();

        assert!(db.get_post("p1").unwrap().is_none());
        assert_eq!(db.count_comments("p1").unwrap(), 0);
        assert_eq!(db.count_votes(VoteTarget::Post, VoteKind::Like, "p1").unwrap(), 0);
        assert_eq!(db.count_votes(VoteTarget::Comment, VoteKind::Dislike, "c2").unwrap(), 0);
    }

    #[test]
    fn comment_delete_cascades_subtree_and_votes() {
        let db = test_db();
        seed_user(&db, "u1");
        seed_post(&db, "p1", "u1");
        db.insert_comment("c1", "p1", "u1", "top", None).unwrap();
        db.insert_comment("c2", "p1", "u1", "child", Some("c1")).unwrap();
        db.insert_comment("c3", "p1", "u1", "grandchild", Some("c2")).unwrap();
        db.toggle_vote(VoteTarget::Comment, VoteKind::Like, "c3", "u1", "v1")
            .unwrap();
        assert_eq!(db.count_comments("p1").unwrap(), 3);

        db.delete_comment("c1").unwrap();

        assert_eq!(db.count_comments("p1").unwrap(), 0);
        assert!(db.get_comment_meta("c2").unwrap().is_none());
        assert!(db.get_comment_meta("c3").unwrap().is_none());
        assert_eq!(db.count_votes(VoteTarget::Comment, VoteKind::Like, "c3").unwrap(), 0);
    }

    #[test]
    fn duplicate_email_rejected() {
        let db = test_db();
        db.create_user("u1", "a@example.com", "a", "hash").unwrap();
        assert!(db.create_user("u2", "a@example.com", "b", "hash").is_err());
    }

    #[test]
    fn search_and_pagination() {
        let db = test_db();
        seed_user(&db, "u1");
        db.insert_post("p1", "hello world", "first", "u1").unwrap();
        db.insert_post("p2", "second", "also hello", "u1").unwrap();
        db.insert_post("p3", "third", "unrelated", "u1").unwrap();

        assert_eq!(db.count_posts("").unwrap(), 3);
        assert_eq!(db.count_posts("hello").unwrap(), 2);

        let page = db.list_posts("", PostSort::Latest, 2, 0).unwrap();
        assert_eq!(page.len(), 2);
        // Newest first
        assert_eq!(page[0].id, "p3");
        assert_eq!(page[1].id, "p2");

        let page = db.list_posts("", PostSort::Latest, 2, 2).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, "p1");

        let hits = db.list_posts("hello", PostSort::Latest, 10, 0).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn best_posts_ranked_by_likes_and_exclude_unliked() {
        let db = test_db();
        for u in ["u1", "u2", "u3"] {
            seed_user(&db, u);
        }
        seed_post(&db, "p1", "u1");
        seed_post(&db, "p2", "u1");
        seed_post(&db, "p3", "u1");

        // p2 gets two likes, p1 one, p3 none
        db.toggle_vote(VoteTarget::Post, VoteKind::Like, "p2", "u1", "v1").unwrap();
        db.toggle_vote(VoteTarget::Post, VoteKind::Like, "p2", "u2", "v2").unwrap();
        db.toggle_vote(VoteTarget::Post, VoteKind::Like, "p1", "u3", "v3").unwrap();

        let best = db.list_best_posts("", 10, 0).unwrap();
        assert_eq!(best.len(), 2);
        assert_eq!(best[0].id, "p2");
        assert_eq!(best[0].like_count, 2);
        assert_eq!(best[1].id, "p1");
        assert_eq!(db.count_best_posts("").unwrap(), 2);
    }

    #[test]
    fn sort_by_likes_on_main_list_keeps_unliked_posts() {
        let db = test_db();
        seed_user(&db, "u1");
        seed_post(&db, "p1", "u1");
        seed_post(&db, "p2", "u1");
        db.toggle_vote(VoteTarget::Post, VoteKind::Like, "p1", "u1", "v1").unwrap();

        let rows = db.list_posts("", PostSort::MostLiked, 10, 0).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "p1");
    }

    #[test]
    fn post_counts_include_comments_and_votes() {
        let db = test_db();
        seed_user(&db, "u1");
        seed_user(&db, "u2");
        seed_post(&db, "p1", "u1");
        db.insert_comment("c1", "p1", "u2", "hi", None).unwrap();
        db.insert_comment("c2", "p1", "u2", "re", Some("c1")).unwrap();
        db.toggle_vote(VoteTarget::Post, VoteKind::Like, "p1", "u2", "v1").unwrap();
        db.toggle_vote(VoteTarget::Post, VoteKind::Dislike, "p1", "u1", "v2").unwrap();

        let post = db.get_post("p1").unwrap().unwrap();
        assert_eq!(post.comment_count, 2);
        assert_eq!(post.like_count, 1);
        assert_eq!(post.dislike_count, 1);
        assert_eq!(post.author_name, "u1");
        assert_eq!(post.author_email, "u1@example.com");
    }

    #[test]
    fn profile_aggregates() {
        let db = test_db();
        seed_user(&db, "u1");
        seed_user(&db, "u2");
        seed_post(&db, "p1", "u1");
        seed_post(&db, "p2", "u1");
        db.insert_comment("c1", "p1", "u1", "own comment", None).unwrap();
        db.toggle_vote(VoteTarget::Post, VoteKind::Like, "p1", "u2", "v1").unwrap();
        db.toggle_vote(VoteTarget::Post, VoteKind::Like, "p2", "u2", "v2").unwrap();

        let profile = db.get_user_profile("u1").unwrap().unwrap();
        assert_eq!(profile.post_count, 2);
        assert_eq!(profile.comment_count, 1);
        assert_eq!(db.count_likes_received("u1").unwrap(), 2);

        let recent = db.recent_posts_by_author("u1", 5).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, "p2");
        assert_eq!(recent[1].like_count, 1);
    }
}
