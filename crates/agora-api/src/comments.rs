use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use agora_db::models::CommentRow;
use agora_types::api::{CommentTreeResponse, CreateCommentRequest, MessageResponse};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::tree;

pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.db.post_exists(&post_id.to_string())? {
        return Err(ApiError::NotFound("Post not found".into()));
    }

    // One flat query; the tree is derived in memory
    let db = state.clone();
    let pid = post_id.to_string();
    let (rows, total_count) =
        tokio::task::spawn_blocking(move || -> anyhow::Result<(Vec<CommentRow>, i64)> {
            let rows = db.db.comments_for_post(&pid)?;
            let total = db.db.count_comments(&pid)?;
            Ok((rows, total))
        })
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    Ok(Json(CommentTreeResponse {
        comments: tree::build_tree(&rows),
        total_count,
    }))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    AuthUser(claims): AuthUser,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let pid = post_id.to_string();
    if !state.db.post_exists(&pid)? {
        return Err(ApiError::NotFound("Post not found".into()));
    }

    let content = req.content.trim();
    if content.is_empty() {
        return Err(ApiError::Validation("Comment content is required".into()));
    }

    // Replies must reference a comment on the same post
    if let Some(parent_id) = req.parent_id {
        let parent = state
            .db
            .get_comment_meta(&parent_id.to_string())?
            .ok_or_else(|| ApiError::NotFound("Parent comment not found".into()))?;
        if parent.post_id != pid {
            return Err(ApiError::Validation(
                "Parent comment belongs to another post".into(),
            ));
        }
    }

    let comment_id = Uuid::new_v4();
    state.db.insert_comment(
        &comment_id.to_string(),
        &pid,
        &claims.sub.to_string(),
        content,
        req.parent_id.map(|p| p.to_string()).as_deref(),
    )?;

    let row = state
        .db
        .get_comment(&comment_id.to_string())?
        .ok_or_else(|| anyhow::anyhow!("Comment vanished after insert: {}", comment_id))?;

    Ok((StatusCode::CREATED, Json(tree::node_from_row(&row))))
}

#[derive(Debug, Deserialize)]
pub struct DeleteCommentQuery {
    #[serde(rename = "commentId")]
    pub comment_id: Option<Uuid>,
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    AuthUser(claims): AuthUser,
    Query(query): Query<DeleteCommentQuery>,
) -> Result<impl IntoResponse + std::fmt::Debug, ApiError> {
    let comment_id = query
        .comment_id
        .ok_or_else(|| ApiError::Validation("commentId is required".into()))?;

    let comment = state
        .db
        .get_comment_meta(&comment_id.to_string())?
        .ok_or_else(|| ApiError::NotFound("Comment not found".into()))?;

    if comment.post_id != post_id.to_string() {
        return Err(ApiError::Validation(
            "Comment does not belong to this post".into(),
        ));
    }

    if comment.author_id != claims.sub.to_string() {
        return Err(ApiError::Forbidden(
            "Only the author can delete this comment".into(),
        ));
    }

    // Descendants and their votes cascade with this delete
    state.db.delete_comment(&comment.id)?;

    Ok(Json(MessageResponse {
        message: "Comment deleted".into(),
    }))
}
