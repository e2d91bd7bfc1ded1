pub mod auth;
pub mod chat;
pub mod config;
pub mod doc;
pub mod error;
pub mod files;
pub mod registry;
pub mod store;

use axum::extract::FromRef;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use registry::{ChatChannel, DocChannel};
pub use store::Store;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub config: Config,
    pub store: Store,
    pub chat: ChatChannel,
    pub docs: DocChannel,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            store: Store::new(&config.data_file),
            config,
            chat: ChatChannel::default(),
            docs: DocChannel::default(),
        }
    }
}

/// The whole routing surface: the two websocket channels at `/` (chat) and
/// `/doc` (documents), the REST api under `/api`, and static serving of
/// the upload directory.
pub fn app(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .route("/", get(chat::ws::chat_ws))
        .route("/doc", get(doc::ws::doc_ws))
        .nest("/api/auth", auth::router())
        .nest("/api/chat", chat::router())
        .nest("/api/doc", doc::router())
        .nest("/api/files", files::router())
        .nest_service("/uploads", uploads)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
