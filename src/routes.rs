use crate::{
    errors::panic_response,
    handlers, // Import handlers module
    AppState,
};
use axum::{
    extract::DefaultBodyLimit,
    http,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::Level;

/// Creates the Axum router and associates routes with handlers.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/memes", get(handlers::list_memes).post(handlers::create_meme))
        .route(
            "/memes/{id}",
            get(handlers::get_meme)
                .put(handlers::update_meme)
                .delete(handlers::delete_meme),
        )
        .route("/users/{id}/memes", get(handlers::memes_by_user))
        .fallback(handlers::not_found)
        .method_not_allowed_fallback(handlers::not_found)
        // Middleware Layers
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            // Request log: method + path on the span, status + latency on completion
            TraceLayer::new_for_http()
                .make_span_with(|req: &http::Request<_>| {
                    let method = req.method().clone();
                    let path = req.uri().path().to_string();
                    tracing::span!(Level::INFO, "request", %method, %path)
                })
                .on_response(
                    |res: &http::Response<_>, latency: std::time::Duration, _span: &tracing::Span| {
                        tracing::info!(
                            status = %res.status(),
                            elapsed_ms = latency.as_millis() as u64,
                            "response"
                        );
                    },
                ),
        )
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .with_state(state) // Pass the application state
}
