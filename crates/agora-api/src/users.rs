use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use agora_types::api::{
    ProfileCounts, RecentPost, RecentPostCounts, UserProfileResponse,
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::{parse_created_at, parse_uuid};

const RECENT_POSTS: u32 = 5;

pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = id.to_string();

    let profile = state
        .db
        .get_user_profile(&uid)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let total_likes = state.db.count_likes_received(&uid)?;
    let recent = state.db.recent_posts_by_author(&uid, RECENT_POSTS)?;

    Ok(Json(UserProfileResponse {
        id: parse_uuid(&profile.id, "user id"),
        name: profile.name,
        created_at: parse_created_at(&profile.created_at, &profile.id),
        count: ProfileCounts {
            posts: profile.post_count,
            comments: profile.comment_count,
        },
        total_likes,
        recent_posts: recent
            .into_iter()
            .map(|row| RecentPost {
                id: parse_uuid(&row.id, "post id"),
                title: row.title,
                created_at: parse_created_at(&row.created_at, &row.id),
                count: RecentPostCounts {
                    comments: row.comment_count,
                    likes: row.like_count,
                },
            })
            .collect(),
    }))
}
