use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Read-only pages. Visibility is decided per handler: listings go through the post
/// visibility filter, the detail page hides drafts from everyone but their author.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for the load balancer.
        .route("/health", get(|| async { "ok" }))
        // GET /?page=N
        .route("/", get(handlers::listings::index))
        // GET /posts/{id}/
        .route("/posts/{id}/", get(handlers::posts::post_detail))
        // GET /category/{slug}/?page=N
        // 404 for unknown and unpublished categories alike.
        .route("/category/{slug}/", get(handlers::listings::category_posts))
        // GET /profile/{username}/?page=N
        // The owner sees drafts and scheduled posts too.
        .route("/profile/{username}/", get(handlers::listings::profile))
}
