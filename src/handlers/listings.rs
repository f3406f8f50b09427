use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;

use super::{CategoryPage, ProfilePage};
use crate::{
    AppState,
    auth::Viewer,
    error::{AppError, Result},
    models::PostRecord,
    pagination::{Page, PageParams},
    repository::RepositoryState,
    visibility::PostQuery,
};

/// Cuts the requested page out of the collection `query` describes.
pub async fn paginate(
    repo: &RepositoryState,
    query: &PostQuery,
    params: PageParams,
) -> Result<Page<PostRecord>> {
    let number = params.number()?;
    let (posts, total) = repo
        .list_posts(query, params.limit(), params.offset()?)
        .await?;
    Page::new(posts, number, total)
}

/// index
///
/// [Public Route] Every publicly visible post, newest first, with comment counts.
#[utoipa::path(
    get,
    path = "/",
    params(PageParams),
    responses(
        (status = 200, description = "Index listing", body = Page<PostRecord>),
        (status = 404, description = "Page out of range")
    )
)]
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<PostRecord>>> {
    let page = paginate(&state.repo, &PostQuery::public(Utc::now()), params).await?;
    Ok(Json(page))
}

/// category_posts
///
/// [Public Route] The visible posts of one published category. An unpublished category
/// is indistinguishable from a missing one.
#[utoipa::path(
    get,
    path = "/category/{slug}/",
    params(("slug" = String, Path, description = "Category slug"), PageParams),
    responses(
        (status = 200, description = "Category listing", body = CategoryPage),
        (status = 404, description = "Unknown or unpublished category")
    )
)]
pub async fn category_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<CategoryPage>> {
    let category = state
        .repo
        .get_category_by_slug(&slug)
        .await?
        .filter(|category| category.is_published)
        .ok_or_else(|| AppError::not_found(format!("Category {slug}")))?;

    let query = PostQuery::for_category(category.id, Utc::now());
    let page = paginate(&state.repo, &query, params).await?;

    Ok(Json(CategoryPage { category, page }))
}

/// profile
///
/// [Public Route] A user's posts. The owner sees everything they wrote, drafts and
/// scheduled posts included; everyone else gets the public filter.
#[utoipa::path(
    get,
    path = "/profile/{username}/",
    params(("username" = String, Path, description = "Username"), PageParams),
    responses(
        (status = 200, description = "Profile listing", body = ProfilePage),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn profile(
    viewer: Viewer,
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<ProfilePage>> {
    let profile = state
        .repo
        .get_user_by_username(&username)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {username}")))?;

    let query = PostQuery::for_profile(profile.id, viewer.id(), Utc::now());
    let page = paginate(&state.repo, &query, params).await?;

    Ok(Json(ProfilePage { profile, page }))
}
