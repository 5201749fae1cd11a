use axum::{
    Router,
    middleware::{self},
    routing::{get, post},
};
use clap::Parser;
use common::{AppState, Config, auth::auth_middleware};
use database::Database;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tower_sessions::{MemoryStore, SessionManagerLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod handlers;

use handlers::auth;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Environment
    dotenvy::dotenv().ok();

    // 2. Initialize Logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 3. Load Config from CLI args / env
    let config = Config::parse();

    // 4. Initialize Database
    let db = Database::new(&config.database_url).await?;
    db.run_migrations().await?;

    let state = Arc::new(AppState { db });

    // 5. Session Store
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store).with_secure(config.secure_cookies);

    // 6. Routing
    // Everything except register/login/logout needs a logged-in user.
    let protected_routes = Router::<Arc<AppState>>::new()
        .route("/auth/me", get(auth::me))
        .nest("/transactions", transactions::handler::transactions_router(state.clone()))
        .nest("/goals", goals::handler::goals_router(state.clone()))
        .nest("/reports", reports::handler::reports_router(state.clone()))
        .layer(middleware::from_fn(auth_middleware));

    let app = Router::<Arc<AppState>>::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .merge(protected_routes)
        .with_state(state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http());

    // 7. Start Server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);
    if !config.secure_cookies {
        tracing::warn!("SECURE_COOKIES is off. Session cookies will also be sent over plain HTTP.");
    }
    axum::serve(listener, app).await?;

    Ok(())
}
