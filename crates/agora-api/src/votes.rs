use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use agora_db::queries::{VoteKind, VoteTarget};
use agora_types::api::{Claims, DislikeState, LikeState};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::{AuthUser, MaybeUser};

/// Count of `kind` votes plus the caller's own state. Anonymous callers
/// get the count with `false` for the personal flag.
fn vote_state(
    state: &AppState,
    target: VoteTarget,
    kind: VoteKind,
    subject_id: &str,
    user: Option<&Claims>,
) -> Result<(i64, bool), ApiError> {
    let count = state.db.count_votes(target, kind, subject_id)?;
    let active = match user {
        Some(claims) => state
            .db
            .has_vote(target, kind, subject_id, &claims.sub.to_string())?,
        None => false,
    };
    Ok((count, active))
}

/// Toggle and report the authoritative post-mutation count, so clients can
/// reconcile optimistic UI updates.
fn toggle(
    state: &AppState,
    target: VoteTarget,
    kind: VoteKind,
    subject_id: &str,
    claims: &Claims,
) -> Result<(i64, bool), ApiError> {
    match target {
        VoteTarget::Post => {
            if !state.db.post_exists(subject_id)? {
                return Err(ApiError::NotFound("Post not found".into()));
            }
        }
        VoteTarget::Comment => {
            if state.db.get_comment_meta(subject_id)?.is_none() {
                return Err(ApiError::NotFound("Comment not found".into()));
            }
        }
    }

    let vote_id = Uuid::new_v4();
    let active = state.db.toggle_vote(
        target,
        kind,
        subject_id,
        &claims.sub.to_string(),
        &vote_id.to_string(),
    )?;
    let count = state.db.count_votes(target, kind, subject_id)?;
    Ok((count, active))
}

// -- Post votes --

pub async fn post_like_state(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    MaybeUser(user): MaybeUser,
) -> Result<impl IntoResponse, ApiError> {
    let (like_count, is_liked) =
        vote_state(&state, VoteTarget::Post, VoteKind::Like, &id.to_string(), user.as_ref())?;
    Ok(Json(LikeState { like_count, is_liked }))
}

pub async fn toggle_post_like(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AuthUser(claims): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let (like_count, is_liked) =
        toggle(&state, VoteTarget::Post, VoteKind::Like, &id.to_string(), &claims)?;
    Ok(Json(LikeState { like_count, is_liked }))
}

pub async fn post_dislike_state(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    MaybeUser(user): MaybeUser,
) -> Result<impl IntoResponse, ApiError> {
    let (dislike_count, is_disliked) = vote_state(
        &state,
        VoteTarget::Post,
        VoteKind::Dislike,
        &id.to_string(),
        user.as_ref(),
    )?;
    Ok(Json(DislikeState {
        dislike_count,
        is_disliked,
    }))
}

pub async fn toggle_post_dislike(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AuthUser(claims): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let (dislike_count, is_disliked) = toggle(
        &state,
        VoteTarget::Post,
        VoteKind::Dislike,
        &id.to_string(),
        &claims,
    )?;
    Ok(Json(DislikeState {
        dislike_count,
        is_disliked,
    }))
}

// -- Comment votes --

pub async fn comment_like_state(
    State(state): State<AppState>,
    Path((_post_id, comment_id)): Path<(Uuid, Uuid)>,
    MaybeUser(user): MaybeUser,
) -> Result<impl IntoResponse, ApiError> {
    let (like_count, is_liked) = vote_state(
        &state,
        VoteTarget::Comment,
        VoteKind::Like,
        &comment_id.to_string(),
        user.as_ref(),
    )?;
    Ok(Json(LikeState { like_count, is_liked }))
}

pub async fn toggle_comment_like(
    State(state): State<AppState>,
    Path((_post_id, comment_id)): Path<(Uuid, Uuid)>,
    AuthUser(claims): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let (like_count, is_liked) = toggle(
        &state,
        VoteTarget::Comment,
        VoteKind::Like,
        &comment_id.to_string(),
        &claims,
    )?;
    Ok(Json(LikeState { like_count, is_liked }))
}

pub async fn comment_dislike_state(
    State(state): State<AppState>,
    Path((_post_id, comment_id)): Path<(Uuid, Uuid)>,
    MaybeUser(user): MaybeUser,
) -> Result<impl IntoResponse, ApiError> {
    let (dislike_count, is_disliked) = vote_state(
        &state,
        VoteTarget::Comment,
        VoteKind::Dislike,
        &comment_id.to_string(),
        user.as_ref(),
    )?;
    Ok(Json(DislikeState {
        dislike_count,
        is_disliked,
    }))
}

pub async fn toggle_comment_dislike(
    State(state): State<AppState>,
    Path((_post_id, comment_id)): Path<(Uuid, Uuid)>,
    AuthUser(claims): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let (dislike_count, is_disliked) = toggle(
        &state,
        VoteTarget::Comment,
        VoteKind::Dislike,
        &comment_id.to_string(),
        &claims,
    )?;
    Ok(Json(DislikeState {
        dislike_count,
        is_disliked,
    }))
}
