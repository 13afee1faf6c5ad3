//! HTTP routes for the social service

use std::path::Path as FsPath;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::Request,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::json;
use tower::ServiceExt;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::{is_api_route, rate_limit, static_file_guard},
    models::ProfileUpdate,
    state::AppState,
};

/// Request body for registration and login
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

/// Request body naming the acting user
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UsernameRequest {
    pub username: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FriendRequest {
    pub friend_username: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PostRequest {
    pub username: String,
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PostsQuery {
    pub username: Option<String>,
}

type JsonBody<T> = WithRejection<Json<T>, ApiError>;

/// Create the router for the social service
///
/// Unmatched paths fall through to static files under `static_dir`, except
/// API paths, which answer a 404 envelope.
pub fn create_router(state: AppState, static_dir: &FsPath) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route_layer(middleware::from_fn_with_state(
            state.auth_limiter.clone(),
            rate_limit,
        ));

    let api_routes = Router::new()
        .route("/logout", post(logout))
        .route("/api/users", get(list_users))
        .route(
            "/api/users/:username",
            get(get_profile).put(update_profile),
        )
        .route(
            "/api/users/:username/friends",
            get(list_friends).post(add_friend),
        )
        .route("/api/posts", get(list_posts).post(create_post))
        .route("/api/posts/:post_id", delete(delete_post))
        .route("/api/posts/:post_id/likes", post(like_post))
        .route("/api/posts/:post_id/comments", post(comment_on_post))
        .route_layer(middleware::from_fn_with_state(
            state.api_limiter.clone(),
            rate_limit,
        ));

    let static_files = ServeDir::new(static_dir).append_index_html_on_directories(false);

    Router::new()
        .route("/api/health", get(health_check))
        .merge(auth_routes)
        .merge(api_routes)
        .fallback(move |req: Request<Body>| fallback(static_files.clone(), req))
        .layer(middleware::from_fn(static_file_guard))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn fallback(static_files: ServeDir, req: Request<Body>) -> Response {
    if is_api_route(req.uri().path()) {
        return ApiError::NotFound("Route not found".to_string()).into_response();
    }

    match static_files.oneshot(req).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = if state.users.health_check().await {
        "connected"
    } else {
        "disconnected"
    };

    Json(json!({
        "success": true,
        "message": "Server is running",
        "database": database,
    }))
}

pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): JsonBody<CredentialsRequest>,
) -> ApiResult<impl IntoResponse> {
    state
        .auth
        .register(&payload.username, &payload.password)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Registration successful",
    })))
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): JsonBody<CredentialsRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state.auth.login(&payload.username, &payload.password).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "user": user,
    })))
}

/// Logout endpoint; the body is optional
pub async fn logout(
    State(state): State<AppState>,
    payload: Option<Json<UsernameRequest>>,
) -> ApiResult<impl IntoResponse> {
    let username = payload.map(|Json(body)| body.username);
    state.auth.logout(username.as_deref()).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Logged out successfully",
    })))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let user = state.profiles.get_profile(&username).await?;
    Ok(Json(json!({ "success": true, "user": user })))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
    WithRejection(Json(update), _): JsonBody<ProfileUpdate>,
) -> ApiResult<impl IntoResponse> {
    let user = state.profiles.update_profile(&username, &update).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Profile updated",
        "user": user,
    })))
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let users = state.profiles.list_users().await?;
    Ok(Json(json!({ "success": true, "users": users })))
}

pub async fn add_friend(
    State(state): State<AppState>,
    Path(username): Path<String>,
    WithRejection(Json(payload), _): JsonBody<FriendRequest>,
) -> ApiResult<impl IntoResponse> {
    state
        .profiles
        .add_friend(&username, &payload.friend_username)
        .await?;

    Ok(Json(json!({ "success": true, "message": "Friend added" })))
}

pub async fn list_friends(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let friends = state.profiles.list_friends(&username).await?;
    Ok(Json(json!({ "success": true, "friends": friends })))
}

pub async fn create_post(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): JsonBody<PostRequest>,
) -> ApiResult<impl IntoResponse> {
    let post = state
        .posts
        .create_post(&payload.username, &payload.content)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Post created",
        "post": post,
    })))
}

pub async fn list_posts(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<PostsQuery>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let posts = state.posts.list_posts(query.username.as_deref()).await?;
    Ok(Json(json!({ "success": true, "posts": posts })))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    WithRejection(Json(payload), _): JsonBody<UsernameRequest>,
) -> ApiResult<impl IntoResponse> {
    state
        .posts
        .delete_post(parse_post_id(&post_id)?, &payload.username)
        .await?;

    Ok(Json(json!({ "success": true, "message": "Post deleted" })))
}

pub async fn like_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    WithRejection(Json(payload), _): JsonBody<UsernameRequest>,
) -> ApiResult<impl IntoResponse> {
    let post = state
        .posts
        .like_post(parse_post_id(&post_id)?, &payload.username)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Post liked",
        "post": post,
    })))
}

pub async fn comment_on_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    WithRejection(Json(payload), _): JsonBody<PostRequest>,
) -> ApiResult<impl IntoResponse> {
    let post = state
        .posts
        .comment_on_post(parse_post_id(&post_id)?, &payload.username, &payload.content)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Comment added",
        "post": post,
    })))
}

/// A malformed id cannot name a stored post
fn parse_post_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::post_not_found())
}
