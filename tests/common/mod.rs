//! Shared fixtures for the integration tests: an in-process `Repository`.
#![allow(dead_code)]

use std::sync::{
    RwLock, RwLockReadGuard, RwLockWriteGuard,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use blogicum::{
    error::{AppError, Result},
    forms::ProfileForm,
    models::{Category, Comment, Location, NewCategory, NewLocation, NewUser, Post, PostRecord, User},
    repository::{NewPost, Repository},
    visibility::PostQuery,
};
use chrono::Utc;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    categories: Vec<Category>,
    locations: Vec<Location>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn record(&self, post: &Post, annotate: bool) -> PostRecord {
        let author = self.users.iter().find(|u| u.id == post.author_id);
        let location = post
            .location_id
            .and_then(|id| self.locations.iter().find(|l| l.id == id));
        let category = post
            .category_id
            .and_then(|id| self.categories.iter().find(|c| c.id == id));
        let comment_count = annotate.then(|| {
            self.comments
                .iter()
                .filter(|c| c.post_id == post.id)
                .count() as i64
        });

        PostRecord {
            id: post.id,
            title: post.title.clone(),
            text: post.text.clone(),
            pub_date: post.pub_date,
            image: post.image.clone(),
            is_published: post.is_published,
            created_at: post.created_at,
            author_id: post.author_id,
            author_username: author.map(|u| u.username.clone()).unwrap_or_default(),
            location_id: post.location_id,
            location_name: location.map(|l| l.name.clone()),
            category_id: post.category_id,
            category_title: category.map(|c| c.title.clone()),
            category_slug: category.map(|c| c.slug.clone()),
            category_is_published: category.map(|c| c.is_published),
            comment_count,
        }
    }

    fn with_username(&self, comment: &Comment) -> Comment {
        Comment {
            author_username: self
                .users
                .iter()
                .find(|u| u.id == comment.author_id)
                .map(|u| u.username.clone()),
            ..comment.clone()
        }
    }

    fn check_references(&self, post: &NewPost) -> Result<()> {
        if let Some(id) = post.category_id {
            if !self.categories.iter().any(|c| c.id == id) {
                return Err(AppError::BadRequest(format!("Unknown category {id}")));
            }
        }
        if let Some(id) = post.location_id {
            if !self.locations.iter().any(|l| l.id == id) {
                return Err(AppError::BadRequest(format!("Unknown location {id}")));
            }
        }
        Ok(())
    }
}

/// MemoryRepository
///
/// In-process `Repository` for handler and router tests. It honours the same contract as
/// `PostgresRepository`: listings go through `PostQuery::admits`/`sort`, owner-scoped
/// mutations, cascade on post/user delete, null-on-delete for categories and locations.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
    users_unavailable: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes every user lookup fail the way a lost database connection would.
    pub fn break_user_lookups(&self) {
        self.users_unavailable.store(true, Ordering::SeqCst);
    }

    fn check_users_available(&self) -> Result<()> {
        if self.users_unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    /// Makes a comment look older or newer than it was created.
    pub fn set_comment_created_at(&self, comment_id: i64, created_at: chrono::DateTime<Utc>) {
        let mut tables = self.write();
        if let Some(comment) = tables.comments.iter_mut().find(|c| c.id == comment_id) {
            comment.created_at = created_at;
        }
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.check_users_available()?;
        Ok(self.read().users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .read()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.write();
        if tables
            .users
            .iter()
            .any(|u| u.id == user.id || u.username == user.username)
        {
            return Err(AppError::BadRequest(format!(
                "User {} already exists",
                user.username
            )));
        }
        let created = User {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: String::new(),
            last_name: String::new(),
            created_at: Utc::now(),
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn insert_user_if_absent(&self, user: NewUser) -> Result<Option<User>> {
        self.check_users_available()?;
        let mut tables = self.write();
        if let Some(existing) = tables.users.iter().find(|u| u.id == user.id) {
            return Ok(Some(existing.clone()));
        }
        if tables.users.iter().any(|u| u.username == user.username) {
            return Ok(None);
        }
        let created = User {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: String::new(),
            last_name: String::new(),
            created_at: Utc::now(),
        };
        tables.users.push(created.clone());
        Ok(Some(created))
    }

    async fn update_profile(&self, id: Uuid, form: &ProfileForm) -> Result<Option<User>> {
        let mut tables = self.write();
        Ok(tables.users.iter_mut().find(|u| u.id == id).map(|user| {
            user.first_name = form.first_name.clone();
            user.last_name = form.last_name.clone();
            user.email = form.email.clone();
            user.clone()
        }))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.write();
        let before = tables.users.len();
        tables.users.retain(|u| u.id != id);
        if tables.users.len() == before {
            return Ok(false);
        }
        let removed_posts: Vec<i64> = tables
            .posts
            .iter()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        tables.posts.retain(|p| p.author_id != id);
        tables
            .comments
            .retain(|c| c.author_id != id && !removed_posts.contains(&c.post_id));
        Ok(true)
    }

    async fn get_category(&self, id: i64) -> Result<Option<Category>> {
        Ok(self.read().categories.iter().find(|c| c.id == id).cloned())
    }

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        Ok(self
            .read()
            .categories
            .iter()
            .find(|c| c.slug == slug)
            .cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let mut categories = self.read().categories.clone();
        categories.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn create_category(&self, category: NewCategory) -> Result<Category> {
        let mut tables = self.write();
        if tables.categories.iter().any(|c| c.slug == category.slug) {
            return Err(AppError::BadRequest(format!(
                "Slug {} already taken",
                category.slug
            )));
        }
        let created = Category {
            id: tables.next_id(),
            title: category.title,
            description: category.description,
            slug: category.slug,
            is_published: category.is_published,
            created_at: Utc::now(),
        };
        tables.categories.push(created.clone());
        Ok(created)
    }

    async fn delete_category(&self, id: i64) -> Result<bool> {
        let mut tables = self.write();
        let before = tables.categories.len();
        tables.categories.retain(|c| c.id != id);
        for post in tables.posts.iter_mut().filter(|p| p.category_id == Some(id)) {
            post.category_id = None;
        }
        Ok(tables.categories.len() < before)
    }

    async fn get_location(&self, id: i64) -> Result<Option<Location>> {
        Ok(self.read().locations.iter().find(|l| l.id == id).cloned())
    }

    async fn list_locations(&self) -> Result<Vec<Location>> {
        let mut locations = self.read().locations.clone();
        locations.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(locations)
    }

    async fn create_location(&self, location: NewLocation) -> Result<Location> {
        let mut tables = self.write();
        let created = Location {
            id: tables.next_id(),
            name: location.name,
            is_published: location.is_published,
            created_at: Utc::now(),
        };
        tables.locations.push(created.clone());
        Ok(created)
    }

    async fn delete_location(&self, id: i64) -> Result<bool> {
        let mut tables = self.write();
        let before = tables.locations.len();
        tables.locations.retain(|l| l.id != id);
        for post in tables.posts.iter_mut().filter(|p| p.location_id == Some(id)) {
            post.location_id = None;
        }
        Ok(tables.locations.len() < before)
    }

    async fn list_posts(
        &self,
        query: &PostQuery,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PostRecord>, i64)> {
        let tables = self.read();
        let mut posts: Vec<PostRecord> = tables
            .posts
            .iter()
            .map(|p| tables.record(p, query.annotate))
            .filter(|p| query.admits(p))
            .collect();
        query.sort(&mut posts);

        let total = posts.len() as i64;
        let page = posts
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn get_post(&self, id: i64) -> Result<Option<PostRecord>> {
        let tables = self.read();
        Ok(tables
            .posts
            .iter()
            .find(|p| p.id == id)
            .map(|p| tables.record(p, false)))
    }

    async fn create_post(&self, author_id: Uuid, post: NewPost) -> Result<Post> {
        let mut tables = self.write();
        tables.check_references(&post)?;
        let created = Post {
            id: tables.next_id(),
            title: post.title,
            text: post.text,
            pub_date: post.pub_date,
            image: post.image,
            is_published: post.is_published,
            created_at: Utc::now(),
            author_id,
            location_id: post.location_id,
            category_id: post.category_id,
        };
        tables.posts.push(created.clone());
        Ok(created)
    }

    async fn update_post(&self, id: i64, author_id: Uuid, post: NewPost) -> Result<Option<Post>> {
        let mut tables = self.write();
        tables.check_references(&post)?;
        Ok(tables
            .posts
            .iter_mut()
            .find(|p| p.id == id && p.author_id == author_id)
            .map(|stored| {
                stored.title = post.title;
                stored.text = post.text;
                stored.pub_date = post.pub_date;
                stored.image = post.image;
                stored.is_published = post.is_published;
                stored.location_id = post.location_id;
                stored.category_id = post.category_id;
                stored.clone()
            }))
    }

    async fn delete_post(&self, id: i64, author_id: Uuid) -> Result<bool> {
        let mut tables = self.write();
        let before = tables.posts.len();
        tables
            .posts
            .retain(|p| !(p.id == id && p.author_id == author_id));
        let deleted = tables.posts.len() < before;
        if deleted {
            tables.comments.retain(|c| c.post_id != id);
        }
        Ok(deleted)
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>> {
        let tables = self.read();
        let mut comments: Vec<Comment> = tables
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .map(|c| tables.with_username(c))
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn get_comment(&self, post_id: i64, comment_id: i64) -> Result<Option<Comment>> {
        let tables = self.read();
        Ok(tables
            .comments
            .iter()
            .find(|c| c.id == comment_id && c.post_id == post_id)
            .map(|c| tables.with_username(c)))
    }

    async fn add_comment(&self, post_id: i64, author_id: Uuid, text: &str) -> Result<Comment> {
        let mut tables = self.write();
        if !tables.posts.iter().any(|p| p.id == post_id) {
            return Err(AppError::not_found(format!("Post {post_id}")));
        }
        let created = Comment {
            id: tables.next_id(),
            text: text.to_string(),
            post_id,
            author_id,
            author_username: None,
            created_at: Utc::now(),
        };
        tables.comments.push(created.clone());
        Ok(tables.with_username(&created))
    }

    async fn update_comment(
        &self,
        comment_id: i64,
        author_id: Uuid,
        text: &str,
    ) -> Result<Option<Comment>> {
        let mut tables = self.write();
        let updated = tables
            .comments
            .iter_mut()
            .find(|c| c.id == comment_id && c.author_id == author_id)
            .map(|stored| {
                stored.text = text.to_string();
                stored.clone()
            });
        Ok(updated.map(|c| tables.with_username(&c)))
    }

    async fn delete_comment(&self, comment_id: i64, author_id: Uuid) -> Result<bool> {
        let mut tables = self.write();
        let before = tables.comments.len();
        tables
            .comments
            .retain(|c| !(c.id == comment_id && c.author_id == author_id));
        Ok(tables.comments.len() < before)
    }
}
