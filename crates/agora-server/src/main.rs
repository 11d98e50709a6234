use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use agora_api::auth::{self, AppState, AppStateInner};
use agora_api::{comments, posts, users, votes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agora=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret = agora_api::middleware::jwt_secret();
    let db_path = std::env::var("AGORA_DB_PATH").unwrap_or_else(|_| "agora.db".into());
    let host = std::env::var("AGORA_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("AGORA_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = agora_db::Database::open(&PathBuf::from(&db_path))?;

    let state: AppState = Arc::new(AppStateInner { db, jwt_secret });

    // Routes. Mixed-auth paths (public GET, authenticated POST) share one
    // route entry; the handlers enforce auth via extractors.
    let app = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route("/posts/best", get(posts::best_posts))
        .route("/posts/super-best", get(posts::super_best_posts))
        .route(
            "/posts/{id}",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route(
            "/posts/{id}/like",
            get(votes::post_like_state).post(votes::toggle_post_like),
        )
        .route(
            "/posts/{id}/dislike",
            get(votes::post_dislike_state).post(votes::toggle_post_dislike),
        )
        .route(
            "/posts/{id}/comments",
            get(comments::list_comments)
                .post(comments::create_comment)
                .delete(comments::delete_comment),
        )
        .route(
            "/posts/{id}/comments/{comment_id}/like",
            get(votes::comment_like_state).post(votes::toggle_comment_like),
        )
        .route(
            "/posts/{id}/comments/{comment_id}/dislike",
            get(votes::comment_dislike_state).post(votes::toggle_comment_dislike),
        )
        .route("/users/{id}", get(users::get_profile))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Agora server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
