use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use slap_api::imgur::ImgurClient;
use slap_api::middleware::require_auth;
use slap_api::state::{AppState, AppStateInner};
use slap_api::{comments, messages, posts, upload, users};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slap=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("SLAP_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("SLAP_DB_PATH").unwrap_or_else(|_| "slap.db".into());
    let host = std::env::var("SLAP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("SLAP_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let imgur_client_id = std::env::var("IMGUR_CLIENT_ID").ok();
    if imgur_client_id.is_none() {
        info!("IMGUR_CLIENT_ID not set; image uploads will fail");
    }

    // Init database
    let db = slap_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let app_state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret,
        imgur: ImgurClient::new(imgur_client_id),
    });

    // Routes. Feeds, single posts and user lookups are public; everything
    // that writes or exposes a caller's own data requires the identity
    // provider's bearer token.
    let public_routes = Router::new()
        .route("/posts", get(posts::list_posts))
        .route("/posts/{post_id}", get(posts::get_post))
        .route("/users", get(users::resolve_users))
        .route("/users/{user_id}/posts", get(users::user_posts))
        .route("/users/{user_id}/replies", get(users::user_replies))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/posts", post(posts::create_post))
        .route("/posts/{post_id}", put(posts::update_post))
        .route("/posts/{post_id}", delete(posts::delete_post))
        .route("/posts/{post_id}/comments", post(comments::create_comment))
        .route("/messages", get(messages::list_contacts))
        .route("/messages", post(messages::send_message))
        .route("/messages/{user_id}", get(messages::get_conversation))
        .route("/users", post(users::upsert_profile))
        .route("/upload", post(upload::upload_image))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ))
        .with_state(app_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("slap server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
