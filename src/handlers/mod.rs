//! HTTP handlers.
//!
//! Reads answer with JSON page documents; mutations take urlencoded forms and answer with a
//! 303 redirect on success or a 422 `{ form, errors }` document when validation fails.

pub mod comments;
pub mod listings;
pub mod posts;
pub mod profile;
pub mod uploads;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{
    forms::{CommentForm, PostForm},
    models::{Category, Comment, Location, PostRecord, User},
    pagination::Page,
};

/// CategoryPage
///
/// `GET /category/{slug}/`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct CategoryPage {
    pub category: Category,
    pub page: Page<PostRecord>,
}

/// ProfilePage
///
/// `GET /profile/{username}/`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct ProfilePage {
    pub profile: User,
    pub page: Page<PostRecord>,
}

/// PostDetailPage
///
/// A post, its comment thread (oldest first) and the blank comment form.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostDetailPage {
    pub post: PostRecord,
    pub comments: Vec<Comment>,
    pub form: CommentForm,
}

/// PostFormPage
///
/// The create/edit page: the form plus the choices for its select inputs.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostFormPage {
    pub form: PostForm,
    pub categories: Vec<Category>,
    pub locations: Vec<Location>,
}

/// CommentFormPage
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentFormPage {
    pub comment: Comment,
    pub form: CommentForm,
}
