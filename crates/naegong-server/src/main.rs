use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use naegong_api::middleware::require_auth;
use naegong_api::state::{AppState, AppStateInner};
use naegong_api::{applications, auth, chat, notifications, portfolios, profiles, stores, uploads};
use naegong_chat::ChatService;
use naegong_gateway::connection;
use naegong_gateway::dispatcher::Dispatcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "naegong=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("NAEGONG_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("NAEGONG_DB_PATH").unwrap_or_else(|_| "naegong.db".into());
    let upload_dir = std::env::var("NAEGONG_UPLOAD_DIR").unwrap_or_else(|_| "./uploads".into());
    let host = std::env::var("NAEGONG_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("NAEGONG_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = Arc::new(naegong_db::Database::open(&PathBuf::from(&db_path))?);

    // Shared state
    let dispatcher = Dispatcher::new();
    let chat_service = ChatService::new(db.clone(), dispatcher.clone());
    let app_state: AppState = Arc::new(AppStateInner {
        db,
        chat: chat_service,
        dispatcher: dispatcher.clone(),
        jwt_secret: jwt_secret.clone(),
        upload_dir: PathBuf::from(upload_dir),
    });

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/stores", get(stores::list_stores))
        .route("/stores/{store_id}", get(stores::get_store))
        .route("/portfolios", get(portfolios::list_portfolios))
        .route("/portfolios/{portfolio_id}", get(portfolios::get_portfolio))
        .route("/uploads/{*path}", get(uploads::download_file))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/profiles/me", get(profiles::get_me))
        .route("/profiles/me", patch(profiles::update_me))
        .route("/stores/me", get(stores::get_my_store))
        .route("/stores/me", put(stores::upsert_my_store))
        .route("/portfolios", post(portfolios::create_portfolio))
        .route("/portfolios/{portfolio_id}", patch(portfolios::update_portfolio))
        .route("/portfolios/{portfolio_id}", delete(portfolios::delete_portfolio))
        .route("/applications", post(applications::apply))
        .route("/admin/applications", get(applications::list_pending))
        .route(
            "/admin/applications/{application_id}/review",
            post(applications::review),
        )
        .route("/uploads", post(uploads::upload_file))
        .route("/chat/rooms", post(chat::open_room))
        .route("/chat/rooms", get(chat::my_rooms))
        .route("/chat/rooms/{room_id}/messages", get(chat::room_messages))
        .route("/chat/rooms/{room_id}/messages", post(chat::send_message))
        .route("/chat/rooms/{room_id}/read", post(chat::mark_read))
        .route("/notifications", get(notifications::list_mine))
        .route("/notifications/unread_count", get(notifications::unread_count))
        .route("/notifications/read", post(notifications::mark_all_read))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ))
        .with_state(app_state.clone());

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(app_state.clone());

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("naegong server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let dispatcher = state.dispatcher.clone();
    let jwt_secret = state.jwt_secret.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher, jwt_secret))
}
