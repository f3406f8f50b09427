use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::Result,
    forms::ProfileForm,
    models::{Category, Comment, Location, NewCategory, NewLocation, NewUser, Post, PostRecord, User},
    visibility::PostQuery,
};

mod postgres;

pub use postgres::PostgresRepository;

/// NewPost
///
/// Validated, parsed post fields as the write paths take them.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub image: Option<String>,
    pub is_published: bool,
    pub location_id: Option<i64>,
    pub category_id: Option<i64>,
}

/// Repository
///
/// Persistence contract used by every handler. Mutations of owned rows take the acting
/// user's id and only touch rows that user authored; `None`/`false` then means "missing
/// or not yours".
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn create_user(&self, user: NewUser) -> Result<User>;
    /// Mirrors an identity-provider account unless its id is already known, returning the
    /// stored row. `None` when another account holds the username.
    async fn insert_user_if_absent(&self, user: NewUser) -> Result<Option<User>>;
    async fn update_profile(&self, id: Uuid, form: &ProfileForm) -> Result<Option<User>>;
    /// Removes the account; its posts and comments go with it.
    async fn delete_user(&self, id: Uuid) -> Result<bool>;

    // --- Categories & Locations ---
    async fn get_category(&self, id: i64) -> Result<Option<Category>>;
    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>>;
    async fn list_categories(&self) -> Result<Vec<Category>>;
    async fn create_category(&self, category: NewCategory) -> Result<Category>;
    /// Detaches the category's posts (category becomes null) rather than deleting them.
    async fn delete_category(&self, id: i64) -> Result<bool>;
    async fn get_location(&self, id: i64) -> Result<Option<Location>>;
    async fn list_locations(&self) -> Result<Vec<Location>>;
    async fn create_location(&self, location: NewLocation) -> Result<Location>;
    /// Detaches the location's posts (location becomes null) rather than deleting them.
    async fn delete_location(&self, id: i64) -> Result<bool>;

    // --- Posts ---
    /// One page of the collection described by `query`, plus the collection's total size.
    async fn list_posts(&self, query: &PostQuery, limit: i64, offset: i64)
    -> Result<(Vec<PostRecord>, i64)>;
    async fn get_post(&self, id: i64) -> Result<Option<PostRecord>>;
    async fn create_post(&self, author_id: Uuid, post: NewPost) -> Result<Post>;
    async fn update_post(&self, id: i64, author_id: Uuid, post: NewPost) -> Result<Option<Post>>;
    /// Deletes the post and, through the cascade, its comments.
    async fn delete_post(&self, id: i64, author_id: Uuid) -> Result<bool>;

    // --- Comments ---
    /// The thread of a post, oldest first.
    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>>;
    /// A comment, only if it belongs to `post_id`.
    async fn get_comment(&self, post_id: i64, comment_id: i64) -> Result<Option<Comment>>;
    async fn add_comment(&self, post_id: i64, author_id: Uuid, text: &str) -> Result<Comment>;
    async fn update_comment(&self, comment_id: i64, author_id: Uuid, text: &str)
    -> Result<Option<Comment>>;
    async fn delete_comment(&self, comment_id: i64, author_id: Uuid) -> Result<bool>;
}

/// RepositoryState
///
/// The shared handle stored in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;
