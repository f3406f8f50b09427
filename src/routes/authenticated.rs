use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Every create/edit/delete page. The GET side of each route is the form or confirmation
/// page, the POST side performs the change. Author-only checks happen in the handlers,
/// after the target has been loaded.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Posts ---
        .route(
            "/posts/create/",
            get(handlers::posts::create_post_form).post(handlers::posts::create_post),
        )
        // Non-authors are redirected back to the post.
        .route(
            "/posts/{id}/edit/",
            get(handlers::posts::edit_post_form).post(handlers::posts::edit_post),
        )
        // Non-authors get 403.
        .route(
            "/posts/{id}/delete/",
            get(handlers::posts::delete_post_confirm).post(handlers::posts::delete_post),
        )
        // --- Comments ---
        .route("/posts/{id}/comment/", post(handlers::comments::add_comment))
        .route(
            "/posts/{id}/comment/{cid}/edit",
            get(handlers::comments::edit_comment_form).post(handlers::comments::edit_comment),
        )
        .route(
            "/posts/{id}/comment/{cid}/delete",
            get(handlers::comments::delete_comment_confirm)
                .post(handlers::comments::delete_comment),
        )
        // --- Profile ---
        // Static segment, so it wins over the public `/profile/{username}/`.
        .route(
            "/profile/edit/",
            get(handlers::profile::edit_profile_form).post(handlers::profile::edit_profile),
        )
        // --- Media ---
        // POST /upload/presigned
        // Short-lived presigned PUT for a post image.
        .route("/upload/presigned", post(handlers::uploads::get_presigned_url))
}
