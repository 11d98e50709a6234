use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use agora_db::models::{CommentRow, PostRow};
use agora_db::queries::PostSort;
use agora_types::api::{
    Author, CommentFlat, LeaderboardResponse, MessageResponse, PostBody, PostCounts,
    PostDetailResponse, PostListResponse, PostResponse, PostSummary,
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::{parse_created_at, parse_uuid};

const MAX_PAGE_SIZE: u32 = 100;
const SUPER_BEST_LIMIT: u32 = 5;

#[derive(Debug, Deserialize)]
pub struct PostListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size", rename = "pageSize")]
    pub page_size: u32,
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub sort: Option<String>,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    10
}

impl PostListQuery {
    fn page(&self) -> u32 {
        self.page.max(1)
    }

    fn page_size(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    // u64 arithmetic: page * pageSize can exceed u32 for hostile page values
    fn offset(&self) -> u64 {
        (self.page() as u64 - 1) * self.page_size() as u64
    }

    fn sort(&self) -> PostSort {
        match self.sort.as_deref() {
            Some("likes") => PostSort::MostLiked,
            _ => PostSort::Latest,
        }
    }
}

fn total_pages(total: i64, page_size: u32) -> u32 {
    ((total as u64).div_ceil(page_size as u64)) as u32
}

pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PostListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page();
    let page_size = query.page_size();
    let offset = query.offset();
    let sort = query.sort();
    let search = query.search.clone();

    // Run blocking DB queries off the async runtime
    let db = state.clone();
    let (total, rows) = tokio::task::spawn_blocking(move || -> anyhow::Result<(i64, Vec<PostRow>)> {
        let total = db.db.count_posts(&search)?;
        let rows = db.db.list_posts(&search, sort, page_size, offset)?;
        Ok((total, rows))
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    Ok(Json(PostListResponse {
        posts: rows.into_iter().map(post_summary).collect(),
        total_pages: total_pages(total, page_size),
        current_page: page,
    }))
}

pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(body): Json<PostBody>,
) -> Result<impl IntoResponse, ApiError> {
    let (title, content) = validate_body(&body)?;

    let post_id = Uuid::new_v4();
    state
        .db
        .insert_post(&post_id.to_string(), &title, &content, &claims.sub.to_string())?;

    let row = state
        .db
        .get_post(&post_id.to_string())?
        .ok_or_else(|| anyhow::anyhow!("Post vanished after insert: {}", post_id))?;

    Ok((StatusCode::CREATED, Json(post_response(row))))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let pid = id.to_string();
    let (row, comment_rows) =
        tokio::task::spawn_blocking(move || -> anyhow::Result<(Option<PostRow>, Vec<CommentRow>)> {
            let row = db.db.get_post(&pid)?;
            let comments = match &row {
                Some(_) => db.db.comments_for_post(&pid)?,
                None => vec![],
            };
            Ok((row, comments))
        })
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    let row = row.ok_or_else(|| ApiError::NotFound("Post not found".into()))?;

    let comments = comment_rows.iter().map(comment_flat).collect();
    let author = post_author(&row);

    Ok(Json(PostDetailResponse {
        id: parse_uuid(&row.id, "post id"),
        title: row.title,
        content: row.content,
        author_id: author.id,
        created_at: parse_created_at(&row.created_at, &row.id),
        author,
        comments,
    }))
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AuthUser(claims): AuthUser,
    Json(body): Json<PostBody>,
) -> Result<impl IntoResponse + std::fmt::Debug, ApiError> {
    let pid = id.to_string();
    check_post_ownership(&state, &pid, claims.sub, "Only the author can edit this post")?;

    let (title, content) = validate_body(&body)?;
    state.db.update_post(&pid, &title, &content)?;

    let row = state
        .db
        .get_post(&pid)?
        .ok_or_else(|| ApiError::NotFound("Post not found".into()))?;

    Ok(Json(post_response(row)))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AuthUser(claims): AuthUser,
) -> Result<impl IntoResponse + std::fmt::Debug, ApiError> {
    let pid = id.to_string();
    check_post_ownership(&state, &pid, claims.sub, "Only the author can delete this post")?;

    state.db.delete_post(&pid)?;

    Ok(Json(MessageResponse {
        message: "Post deleted".into(),
    }))
}

pub async fn best_posts(
    State(state): State<AppState>,
    Query(query): Query<PostListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page();
    let page_size = query.page_size();
    let offset = query.offset();
    let search = query.search.clone();

    let db = state.clone();
    let (total, rows) = tokio::task::spawn_blocking(move || -> anyhow::Result<(i64, Vec<PostRow>)> {
        let total = db.db.count_best_posts(&search)?;
        let rows = db.db.list_best_posts(&search, page_size, offset)?;
        Ok((total, rows))
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    Ok(Json(PostListResponse {
        posts: rows.into_iter().map(post_summary).collect(),
        total_pages: total_pages(total, page_size),
        current_page: page,
    }))
}

/// Top 5 most-liked posts, no pagination.
pub async fn super_best_posts(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_best_posts("", SUPER_BEST_LIMIT, 0))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    Ok(Json(LeaderboardResponse {
        posts: rows.into_iter().map(post_summary).collect(),
    }))
}

fn validate_body(body: &PostBody) -> Result<(String, String), ApiError> {
    let title = body.title.trim();
    if title.is_empty() {
        return Err(ApiError::Validation("Title is required".into()));
    }
    let content = body.content.trim();
    if content.is_empty() {
        return Err(ApiError::Validation("Content is required".into()));
    }
    Ok((title.to_string(), content.to_string()))
}

/// Existence check then ownership check, in that order, so 404 vs 403 is
/// never inferred from a store error.
fn check_post_ownership(
    state: &AppState,
    post_id: &str,
    user_id: Uuid,
    denied: &str,
) -> Result<(), ApiError> {
    let author_id = state
        .db
        .get_post_author(post_id)?
        .ok_or_else(|| ApiError::NotFound("Post not found".into()))?;

    if author_id != user_id.to_string() {
        return Err(ApiError::Forbidden(denied.into()));
    }
    Ok(())
}

fn post_author(row: &PostRow) -> Author {
    Author {
        id: parse_uuid(&row.author_id, "author id"),
        name: row.author_name.clone(),
        email: row.author_email.clone(),
    }
}

pub(crate) fn post_summary(row: PostRow) -> PostSummary {
    let author = post_author(&row);
    PostSummary {
        id: parse_uuid(&row.id, "post id"),
        title: row.title,
        content: row.content,
        author_id: author.id,
        created_at: parse_created_at(&row.created_at, &row.id),
        author,
        count: PostCounts {
            comments: row.comment_count,
            likes: row.like_count,
            dislikes: row.dislike_count,
        },
    }
}

fn post_response(row: PostRow) -> PostResponse {
    let author = post_author(&row);
    PostResponse {
        id: parse_uuid(&row.id, "post id"),
        title: row.title,
        content: row.content,
        author_id: author.id,
        created_at: parse_created_at(&row.created_at, &row.id),
        author,
    }
}

fn comment_flat(row: &CommentRow) -> CommentFlat {
    CommentFlat {
        id: parse_uuid(&row.id, "comment id"),
        post_id: parse_uuid(&row.post_id, "post id"),
        author_id: parse_uuid(&row.author_id, "author id"),
        content: row.content.clone(),
        parent_id: row.parent_id.as_deref().map(|p| parse_uuid(p, "parent id")),
        created_at: parse_created_at(&row.created_at, &row.id),
        author: Author {
            id: parse_uuid(&row.author_id, "author id"),
            name: row.author_name.clone(),
            email: row.author_email.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AppStateInner;
    use agora_types::api::Claims;
    use std::sync::Arc;

    fn test_state() -> AppState {
        Arc::new(AppStateInner {
            db: agora_db::Database::open_in_memory().unwrap(),
            jwt_secret: "test-secret".into(),
        })
    }

    fn claims(user_id: Uuid) -> Claims {
        Claims {
            sub: user_id,
            name: "user".into(),
            exp: 0,
        }
    }

    fn seed_post(state: &AppState, author: Uuid) -> Uuid {
        state
            .db
            .create_user(
                &author.to_string(),
                &format!("{author}@example.com"),
                "user",
                "hash",
            )
            .unwrap();
        let post_id = Uuid::new_v4();
        state
            .db
            .insert_post(&post_id.to_string(), "title", "content", &author.to_string())
            .unwrap();
        post_id
    }

    #[tokio::test]
    async fn non_author_cannot_delete_post() {
        let state = test_state();
        let author = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let post_id = seed_post(&state, author);
        state
            .db
            .create_user(
                &stranger.to_string(),
                &format!("{stranger}@example.com"),
                "other",
                "hash",
            )
            .unwrap();

        let err = delete_post(State(state.clone()), Path(post_id), AuthUser(claims(stranger)))
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert!(state.db.get_post(&post_id.to_string()).unwrap().is_some());
    }

    #[tokio::test]
    async fn non_author_cannot_edit_post() {
        let state = test_state();
        let author = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let post_id = seed_post(&state, author);

        let err = update_post(
            State(state.clone()),
            Path(post_id),
            AuthUser(claims(stranger)),
            Json(PostBody {
                title: "hijacked".into(),
                content: "hijacked".into(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        let row = state.db.get_post(&post_id.to_string()).unwrap().unwrap();
        assert_eq!(row.title, "title");
    }

    #[tokio::test]
    async fn missing_post_is_not_found_before_ownership() {
        let state = test_state();
        let user = Uuid::new_v4();

        let err = delete_post(State(state), Path(Uuid::new_v4()), AuthUser(claims(user)))
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn page_math() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
    }

    #[test]
    fn query_clamping() {
        let q = PostListQuery {
            page: 0,
            page_size: 1000,
            search: String::new(),
            sort: Some("likes".into()),
        };
        assert_eq!(q.page(), 1);
        assert_eq!(q.page_size(), MAX_PAGE_SIZE);
        assert_eq!(q.offset(), 0);
        assert_eq!(q.sort(), PostSort::MostLiked);

        // Offsets past u32 range must not overflow
        let q = PostListQuery {
            page: u32::MAX,
            page_size: 100,
            search: String::new(),
            sort: None,
        };
        assert_eq!(q.offset(), (u32::MAX as u64 - 1) * 100);

        let q = PostListQuery {
            page: 3,
            page_size: 10,
            search: String::new(),
            sort: Some("garbage".into()),
        };
        assert_eq!(q.offset(), 20);
        assert_eq!(q.sort(), PostSort::Latest);
    }
}
