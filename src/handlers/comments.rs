use axum::{
    Form, Json,
    extract::{Path, State},
    response::Redirect,
};

use super::{CommentFormPage, posts::load_post};
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, Result},
    forms::{CommentForm, validate_form},
    models::Comment,
    permissions::{DenyPolicy, post_detail_path, require_author},
    repository::RepositoryState,
    visibility::can_view_detail,
};

/// A comment of `post_id`; 404 when missing or attached to another post.
async fn load_comment(repo: &RepositoryState, post_id: i64, comment_id: i64) -> Result<Comment> {
    repo.get_comment(post_id, comment_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Comment {comment_id}")))
}

/// add_comment
///
/// [Authenticated Route] Comments on a post the current user can see. Anonymous visitors
/// are sent to the login page and nothing is stored.
#[utoipa::path(
    post,
    path = "/posts/{id}/comment/",
    params(("id" = i64, Path, description = "Post ID")),
    request_body(content = CommentForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Created; redirect to the post, or login required"),
        (status = 404, description = "Post not found"),
        (status = 422, description = "Empty comment", body = crate::error::RejectedForm)
    )
)]
pub async fn add_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> Result<Redirect> {
    let post = load_post(&state.repo, post_id).await?;
    if !can_view_detail(&post, Some(user.id)) {
        return Err(AppError::not_found(format!("Post {post_id}")));
    }

    validate_form(&form)?;
    let comment = state.repo.add_comment(post_id, user.id, &form.text).await?;
    tracing::info!(post_id, comment_id = comment.id, user_id = %user.id, "Comment added");

    Ok(Redirect::to(&post_detail_path(post_id)))
}

/// edit_comment_form
///
/// [Author Route]
#[utoipa::path(
    get,
    path = "/posts/{id}/comment/{cid}/edit",
    params(
        ("id" = i64, Path, description = "Post ID"),
        ("cid" = i64, Path, description = "Comment ID")
    ),
    responses(
        (status = 200, description = "Edit form", body = CommentFormPage),
        (status = 303, description = "Not the author; redirect to the post"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn edit_comment_form(
    user: AuthUser,
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<Json<CommentFormPage>> {
    let comment = load_comment(&state.repo, post_id, comment_id).await?;
    require_author(&comment, &user, DenyPolicy::RedirectToPost(post_id))?;

    let form = CommentForm::from(&comment);
    Ok(Json(CommentFormPage { comment, form }))
}

/// edit_comment
///
/// [Author Route] Replaces the comment text and returns to the post.
#[utoipa::path(
    post,
    path = "/posts/{id}/comment/{cid}/edit",
    params(
        ("id" = i64, Path, description = "Post ID"),
        ("cid" = i64, Path, description = "Comment ID")
    ),
    request_body(content = CommentForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Updated, or not the author; redirect to the post"),
        (status = 404, description = "Comment not found"),
        (status = 422, description = "Empty comment", body = crate::error::RejectedForm)
    )
)]
pub async fn edit_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
    Form(form): Form<CommentForm>,
) -> Result<Redirect> {
    let comment = load_comment(&state.repo, post_id, comment_id).await?;
    require_author(&comment, &user, DenyPolicy::RedirectToPost(post_id))?;

    validate_form(&form)?;
    state
        .repo
        .update_comment(comment.id, user.id, &form.text)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Comment {comment_id}")))?;

    Ok(Redirect::to(&post_detail_path(post_id)))
}

/// delete_comment_confirm
///
/// [Author Route] The comment about to be deleted.
#[utoipa::path(
    get,
    path = "/posts/{id}/comment/{cid}/delete",
    params(
        ("id" = i64, Path, description = "Post ID"),
        ("cid" = i64, Path, description = "Comment ID")
    ),
    responses(
        (status = 200, description = "Confirmation", body = Comment),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn delete_comment_confirm(
    user: AuthUser,
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<Json<Comment>> {
    let comment = load_comment(&state.repo, post_id, comment_id).await?;
    require_author(&comment, &user, DenyPolicy::Forbidden)?;
    Ok(Json(comment))
}

/// delete_comment
///
/// [Author Route]
#[utoipa::path(
    post,
    path = "/posts/{id}/comment/{cid}/delete",
    params(
        ("id" = i64, Path, description = "Post ID"),
        ("cid" = i64, Path, description = "Comment ID")
    ),
    responses(
        (status = 303, description = "Deleted; redirect to the post"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn delete_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<Redirect> {
    let comment = load_comment(&state.repo, post_id, comment_id).await?;
    require_author(&comment, &user, DenyPolicy::Forbidden)?;

    if !state.repo.delete_comment(comment.id, user.id).await? {
        return Err(AppError::not_found(format!("Comment {comment_id}")));
    }

    Ok(Redirect::to(&post_detail_path(post_id)))
}
