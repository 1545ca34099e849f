//! Follow graph, posts, likes and feed endpoints

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use crate::auth::AuthUser;
use crate::http::error::ApiError;
use crate::http::extractors::{ValidJson, ValidUuid};
use crate::http::server::AppState;
use crate::http::{data, message, Data};
use crate::models::{FeedPost, Post, UserSummary};
use crate::policy::SocialPolicy;

#[derive(Debug, Deserialize)]
pub struct PostRequest {
    pub content: Option<String>,
}

/// POST /api/social/follow/{userId}
async fn follow(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    ValidUuid(target): ValidUuid,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    SocialPolicy::new(state.store.as_ref())
        .follow(identity, target)
        .await?;
    Ok((StatusCode::CREATED, message("Now following user")))
}

/// DELETE /api/social/follow/{userId}
async fn unfollow(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    ValidUuid(target): ValidUuid,
) -> Result<Json<Value>, ApiError> {
    SocialPolicy::new(state.store.as_ref())
        .unfollow(identity, target)
        .await?;
    Ok(message("Unfollowed user"))
}

/// GET /api/social/following
async fn following(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Data<Vec<UserSummary>>>, ApiError> {
    let users = SocialPolicy::new(state.store.as_ref())
        .list_following(identity)
        .await?;
    Ok(data(users))
}

/// GET /api/social/followers
async fn followers(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Data<Vec<UserSummary>>>, ApiError> {
    let users = SocialPolicy::new(state.store.as_ref())
        .list_followers(identity)
        .await?;
    Ok(data(users))
}

/// POST /api/social/posts
async fn create_post(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    ValidJson(req): ValidJson<PostRequest>,
) -> Result<(StatusCode, Json<Data<Post>>), ApiError> {
    let post = SocialPolicy::new(state.store.as_ref())
        .create_post(identity, req.content)
        .await?;
    Ok((StatusCode::CREATED, data(post)))
}

/// GET /api/social/feed
async fn feed(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Data<Vec<FeedPost>>>, ApiError> {
    let posts = SocialPolicy::new(state.store.as_ref()).feed(identity).await?;
    Ok(data(posts))
}

/// POST /api/social/posts/{postId}/like
async fn like(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    ValidUuid(post_id): ValidUuid,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    SocialPolicy::new(state.store.as_ref())
        .like_post(identity, post_id)
        .await?;
    Ok((StatusCode::CREATED, message("Post liked")))
}

/// DELETE /api/social/posts/{postId}/like
async fn unlike(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    ValidUuid(post_id): ValidUuid,
) -> Result<Json<Value>, ApiError> {
    SocialPolicy::new(state.store.as_ref())
        .unlike_post(identity, post_id)
        .await?;
    Ok(message("Post unliked"))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/social/follow/{userId}", post(follow).delete(unfollow))
        .route("/social/following", get(following))
        .route("/social/followers", get(followers))
        .route("/social/posts", post(create_post))
        .route("/social/posts/{postId}/like", post(like).delete(unlike))
        .route("/social/feed", get(feed))
}
