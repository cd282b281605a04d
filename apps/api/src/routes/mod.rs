pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::conversation::handlers as chat;
use crate::documents::handlers as documents;
use crate::rate_limit::middleware::enforce_rate_limit;
use crate::state::AppState;

// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let chat_routes = Router::new()
        .route(chat::ASK_ROUTE, post(chat::handle_ask))
        .route("/api/v1/chat/analyze/:id", get(chat::handle_analyze))
        .route_layer(middleware::from_fn_with_state(
            state.rate_limit.clone(),
            enforce_rate_limit,
        ))
        .route("/api/v1/chat/history/:id", get(chat::handle_history))
        .route("/api/v1/chat/quota", get(chat::handle_quota));

    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/documents",
            post(documents::handle_upload)
                .layer(DefaultBodyLimit::max(
                    state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES,
                ))
                .get(documents::handle_list),
        )
        .route("/api/v1/documents/filter", post(documents::handle_filter))
        .route(
            "/api/v1/documents/:id",
            get(documents::handle_get).delete(documents::handle_delete),
        )
        .route("/api/v1/documents/:id/skills", get(documents::handle_get_skills))
        .route(
            "/api/v1/documents/:id/reanalyze",
            post(documents::handle_reanalyze),
        )
        .merge(chat_routes)
        .with_state(state)
}
