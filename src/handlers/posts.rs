use axum::{
    Form, Json,
    extract::{Path, State},
    response::Redirect,
};
use chrono::Utc;

use super::{PostDetailPage, PostFormPage};
use crate::{
    AppState,
    auth::{AuthUser, Viewer},
    error::{AppError, Result},
    forms::{CommentForm, PostForm, validate_form},
    models::PostRecord,
    permissions::{DenyPolicy, post_detail_path, profile_path, require_author},
    repository::{NewPost, RepositoryState},
    visibility::can_view_detail,
};

const INVALID_CHOICE: &str = "Select a valid choice.";

/// Loads a post regardless of visibility; 404 when it does not exist.
pub(crate) async fn load_post(repo: &RepositoryState, post_id: i64) -> Result<PostRecord> {
    repo.get_post(post_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Post {post_id}")))
}

/// Validates the form, resolves its references and parses it into the write model.
async fn clean_post_form(repo: &RepositoryState, form: &PostForm) -> Result<NewPost> {
    validate_form(form)?;

    let category_id = choice_id(form, "category_id", form.category_id.as_deref())?;
    if let Some(id) = category_id {
        if repo.get_category(id).await?.is_none() {
            return Err(AppError::field_error(form, "category_id", INVALID_CHOICE));
        }
    }
    let location_id = choice_id(form, "location_id", form.location_id.as_deref())?;
    if let Some(id) = location_id {
        if repo.get_location(id).await?.is_none() {
            return Err(AppError::field_error(form, "location_id", INVALID_CHOICE));
        }
    }

    Ok(NewPost {
        title: form.title.trim().to_string(),
        text: form.text.clone(),
        pub_date: form.pub_date_value()?,
        image: form.image.clone(),
        is_published: form.is_published,
        location_id,
        category_id,
    })
}

/// A submitted choice that is not an integer id is reported like an unknown one.
fn choice_id(form: &PostForm, field: &str, raw: Option<&str>) -> Result<Option<i64>> {
    raw.map(|value| {
        value
            .parse::<i64>()
            .map_err(|_| AppError::field_error(form, field, INVALID_CHOICE))
    })
    .transpose()
}

async fn form_page(repo: &RepositoryState, form: PostForm) -> Result<PostFormPage> {
    Ok(PostFormPage {
        form,
        categories: repo.list_categories().await?,
        locations: repo.list_locations().await?,
    })
}

/// post_detail
///
/// [Public Route] A single post with its comments. Unpublished posts are only shown to
/// their author; scheduled posts and posts in hidden categories are reachable by link.
#[utoipa::path(
    get,
    path = "/posts/{id}/",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post detail", body = PostDetailPage),
        (status = 404, description = "Missing, or a draft of someone else")
    )
)]
pub async fn post_detail(
    viewer: Viewer,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<PostDetailPage>> {
    let post = load_post(&state.repo, post_id).await?;
    if !can_view_detail(&post, viewer.id()) {
        return Err(AppError::not_found(format!("Post {post_id}")));
    }

    let comments = state.repo.list_comments(post.id).await?;

    Ok(Json(PostDetailPage {
        post,
        comments,
        form: CommentForm::default(),
    }))
}

/// create_post_form
///
/// [Authenticated Route] The blank create form.
#[utoipa::path(
    get,
    path = "/posts/create/",
    responses(
        (status = 200, description = "Create form", body = PostFormPage),
        (status = 303, description = "Login required")
    )
)]
pub async fn create_post_form(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<PostFormPage>> {
    let page = form_page(&state.repo, PostForm::blank(Utc::now())).await?;
    Ok(Json(page))
}

/// create_post
///
/// [Authenticated Route] Creates a post owned by the current user, then sends them to
/// their profile.
#[utoipa::path(
    post,
    path = "/posts/create/",
    request_body(content = PostForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Created; redirect to the author's profile"),
        (status = 422, description = "Invalid form", body = crate::error::RejectedForm)
    )
)]
pub async fn create_post(
    user: AuthUser,
    State(state): State<AppState>,
    Form(form): Form<PostForm>,
) -> Result<Redirect> {
    let new_post = clean_post_form(&state.repo, &form).await?;
    state.repo.create_post(user.id, new_post).await?;
    Ok(Redirect::to(&profile_path(&user.username)))
}

/// edit_post_form
///
/// [Author Route] The edit form prefilled from the stored post. Anyone else is sent back
/// to the post.
#[utoipa::path(
    get,
    path = "/posts/{id}/edit/",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Edit form", body = PostFormPage),
        (status = 303, description = "Not the author; redirect to the post"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn edit_post_form(
    user: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<PostFormPage>> {
    let post = load_post(&state.repo, post_id).await?;
    require_author(&post, &user, DenyPolicy::RedirectToPost(post_id))?;

    let page = form_page(&state.repo, PostForm::from_post(&post)).await?;
    Ok(Json(page))
}

/// edit_post
///
/// [Author Route] Applies the edit and returns to the post.
#[utoipa::path(
    post,
    path = "/posts/{id}/edit/",
    params(("id" = i64, Path, description = "Post ID")),
    request_body(content = PostForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Updated, or not the author; redirect to the post"),
        (status = 404, description = "Post not found"),
        (status = 422, description = "Invalid form", body = crate::error::RejectedForm)
    )
)]
pub async fn edit_post(
    user: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Form(form): Form<PostForm>,
) -> Result<Redirect> {
    let post = load_post(&state.repo, post_id).await?;
    require_author(&post, &user, DenyPolicy::RedirectToPost(post_id))?;

    let changes = clean_post_form(&state.repo, &form).await?;
    state
        .repo
        .update_post(post_id, user.id, changes)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Post {post_id}")))?;

    Ok(Redirect::to(&post_detail_path(post_id)))
}

/// delete_post_confirm
///
/// [Author Route] The post about to be deleted.
#[utoipa::path(
    get,
    path = "/posts/{id}/delete/",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Confirmation", body = PostRecord),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn delete_post_confirm(
    user: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<PostRecord>> {
    let post = load_post(&state.repo, post_id).await?;
    require_author(&post, &user, DenyPolicy::Forbidden)?;
    Ok(Json(post))
}

/// delete_post
///
/// [Author Route] Deletes the post together with its comments.
#[utoipa::path(
    post,
    path = "/posts/{id}/delete/",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 303, description = "Deleted; redirect to the author's profile"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn delete_post(
    user: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Redirect> {
    let post = load_post(&state.repo, post_id).await?;
    require_author(&post, &user, DenyPolicy::Forbidden)?;

    if !state.repo.delete_post(post_id, user.id).await? {
        return Err(AppError::not_found(format!("Post {post_id}")));
    }
    tracing::info!(post_id, user_id = %user.id, "Post deleted");

    Ok(Redirect::to(&profile_path(&user.username)))
}
