use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{NewPost, Repository};
use crate::{
    error::Result,
    forms::ProfileForm,
    models::{Category, Comment, Location, NewCategory, NewLocation, NewUser, Post, PostRecord, User},
    visibility::PostQuery,
};

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, created_at";
const CATEGORY_COLUMNS: &str = "id, title, description, slug, is_published, created_at";
const LOCATION_COLUMNS: &str = "id, name, is_published, created_at";
const POST_COLUMNS: &str =
    "id, title, text, pub_date, image, is_published, created_at, author_id, location_id, category_id";

/// PostgresRepository
///
/// `Repository` backed by Postgres. Cascades and null-on-delete are enforced by the
/// foreign keys in `migrations/0001_init.sql`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let sql = format!(
            "INSERT INTO users (id, username, email) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(user.username)
            .bind(user.email)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn insert_user_if_absent(&self, user: NewUser) -> Result<Option<User>> {
        let sql = format!(
            r#"
            WITH inserted AS (
                INSERT INTO users (id, username, email) VALUES ($1, $2, $3)
                ON CONFLICT DO NOTHING
                RETURNING {USER_COLUMNS}
            )
            SELECT {USER_COLUMNS} FROM inserted
            UNION ALL
            SELECT {USER_COLUMNS} FROM users WHERE id = $1
            LIMIT 1
            "#
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(user.username)
            .bind(user.email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_profile(&self, id: Uuid, form: &ProfileForm) -> Result<Option<User>> {
        let sql = format!(
            "UPDATE users SET first_name = $2, last_name = $3, email = $4 WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(&form.first_name)
            .bind(&form.last_name)
            .bind(&form.email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- CATEGORIES & LOCATIONS ---

    async fn get_category(&self, id: i64) -> Result<Option<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1");
        Ok(sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE slug = $1");
        Ok(sqlx::query_as::<_, Category>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY title, id");
        Ok(sqlx::query_as::<_, Category>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_category(&self, category: NewCategory) -> Result<Category> {
        let sql = format!(
            "INSERT INTO categories (title, description, slug, is_published) VALUES ($1, $2, $3, $4) RETURNING {CATEGORY_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Category>(&sql)
            .bind(category.title)
            .bind(category.description)
            .bind(category.slug)
            .bind(category.is_published)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn delete_category(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_location(&self, id: i64) -> Result<Option<Location>> {
        let sql = format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE id = $1");
        Ok(sqlx::query_as::<_, Location>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_locations(&self) -> Result<Vec<Location>> {
        let sql = format!("SELECT {LOCATION_COLUMNS} FROM locations ORDER BY name, id");
        Ok(sqlx::query_as::<_, Location>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_location(&self, location: NewLocation) -> Result<Location> {
        let sql = format!(
            "INSERT INTO locations (name, is_published) VALUES ($1, $2) RETURNING {LOCATION_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Location>(&sql)
            .bind(location.name)
            .bind(location.is_published)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn delete_location(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM locations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- POSTS ---

    /// list_posts
    ///
    /// Both statements are generated from the same `PostQuery`, so the total always
    /// describes the collection the page was cut from.
    async fn list_posts(
        &self,
        query: &PostQuery,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PostRecord>, i64)> {
        let mut count: QueryBuilder<Postgres> = QueryBuilder::new("");
        query.push_count(&mut count);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select: QueryBuilder<Postgres> = QueryBuilder::new("");
        query.push_select(&mut select, limit, offset);
        let posts = select
            .build_query_as::<PostRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok((posts, total))
    }

    async fn get_post(&self, id: i64) -> Result<Option<PostRecord>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("");
        PostQuery::push_single(&mut builder, id);
        Ok(builder
            .build_query_as::<PostRecord>()
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_post(&self, author_id: Uuid, post: NewPost) -> Result<Post> {
        let sql = format!(
            r#"INSERT INTO posts (title, text, pub_date, image, is_published, author_id, location_id, category_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING {POST_COLUMNS}"#
        );
        let created = sqlx::query_as::<_, Post>(&sql)
            .bind(post.title)
            .bind(post.text)
            .bind(post.pub_date)
            .bind(post.image)
            .bind(post.is_published)
            .bind(author_id)
            .bind(post.location_id)
            .bind(post.category_id)
            .fetch_one(&self.pool)
            .await?;
        tracing::info!(post_id = created.id, %author_id, "Post created");
        Ok(created)
    }

    async fn update_post(&self, id: i64, author_id: Uuid, post: NewPost) -> Result<Option<Post>> {
        let sql = format!(
            r#"UPDATE posts
               SET title = $3, text = $4, pub_date = $5, image = $6, is_published = $7,
                   location_id = $8, category_id = $9
               WHERE id = $1 AND author_id = $2
               RETURNING {POST_COLUMNS}"#
        );
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .bind(author_id)
            .bind(post.title)
            .bind(post.text)
            .bind(post.pub_date)
            .bind(post.image)
            .bind(post.is_published)
            .bind(post.location_id)
            .bind(post.category_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_post(&self, id: i64, author_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1 AND author_id = $2")
            .bind(id)
            .bind(author_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- COMMENTS ---

    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>> {
        Ok(sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.text, c.post_id, c.author_id, u.username AS author_username, c.created_at
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.post_id = $1
            ORDER BY c.created_at ASC, c.id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_comment(&self, post_id: i64, comment_id: i64) -> Result<Option<Comment>> {
        Ok(sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.text, c.post_id, c.author_id, u.username AS author_username, c.created_at
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.id = $1 AND c.post_id = $2
            "#,
        )
        .bind(comment_id)
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// add_comment
    ///
    /// Inserts and joins the author's username in one statement.
    async fn add_comment(&self, post_id: i64, author_id: Uuid, text: &str) -> Result<Comment> {
        Ok(sqlx::query_as::<_, Comment>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (post_id, author_id, text) VALUES ($1, $2, $3)
                RETURNING id, text, post_id, author_id, created_at
            )
            SELECT i.id, i.text, i.post_id, i.author_id, u.username AS author_username, i.created_at
            FROM inserted i JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(post_id)
        .bind(author_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_comment(
        &self,
        comment_id: i64,
        author_id: Uuid,
        text: &str,
    ) -> Result<Option<Comment>> {
        Ok(sqlx::query_as::<_, Comment>(
            r#"
            WITH updated AS (
                UPDATE comments SET text = $3 WHERE id = $1 AND author_id = $2
                RETURNING id, text, post_id, author_id, created_at
            )
            SELECT c.id, c.text, c.post_id, c.author_id, u.username AS author_username, c.created_at
            FROM updated c JOIN users u ON u.id = c.author_id
            "#,
        )
        .bind(comment_id)
        .bind(author_id)
        .bind(text)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_comment(&self, comment_id: i64, author_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1 AND author_id = $2")
            .bind(comment_id)
            .bind(author_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
