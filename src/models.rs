use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A blog account as stored in the `users` table. The id is the subject issued by the
/// external identity provider, so it is never generated here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Category
///
/// A thematic section. Unpublished categories hide their page and every post filed under them.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// Unique URL identifier used by `/category/{slug}/`.
    pub slug: String,
    pub is_published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Location
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub is_published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Post
///
/// Raw row of the `posts` table. Handlers mostly work with the joined `PostRecord`;
/// this shape is what the write paths return.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub text: String,
    /// Publication moment. A future value schedules the post.
    #[ts(type = "string")]
    pub pub_date: DateTime<Utc>,
    /// Object-store key of the attached image, if any.
    pub image: Option<String>,
    pub is_published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub author_id: Uuid,
    pub location_id: Option<i64>,
    pub category_id: Option<i64>,
}

/// PostRecord
///
/// A post joined with its author, location and category, as every listing and the detail
/// page need them. `comment_count` is the query-time annotation; it stays `None` when the
/// query did not ask for it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct PostRecord {
    pub id: i64,
    pub title: String,
    pub text: String,
    #[ts(type = "string")]
    pub pub_date: DateTime<Utc>,
    pub image: Option<String>,
    pub is_published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub author_id: Uuid,
    pub author_username: String,
    pub location_id: Option<i64>,
    pub location_name: Option<String>,
    pub category_id: Option<i64>,
    pub category_title: Option<String>,
    pub category_slug: Option<String>,
    pub category_is_published: Option<bool>,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<i64>,
}

/// Comment
///
/// A comment row joined with the author's username. Threads are always read oldest first.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub post_id: i64,
    pub author_id: Uuid,
    #[sqlx(default)]
    pub author_username: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Seed / Administrative Inputs ---

/// NewUser
///
/// Mirrors an identity-provider account into the local `users` table.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

/// NewCategory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
}

/// NewLocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLocation {
    pub name: String,
    pub is_published: bool,
}

// --- Upload Payloads ---

/// PresignedUrlRequest
///
/// Input payload for requesting a short-lived upload URL for a post image.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlRequest {
    /// The original filename, used to derive the file extension.
    #[schema(example = "sunset.jpg")]
    pub filename: String,
    /// The MIME type. Only `image/*` is accepted.
    #[schema(example = "image/jpeg")]
    pub file_type: String,
}

/// PresignedUrlResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlResponse {
    /// The time-limited URL for the PUT request.
    pub upload_url: String,
    /// Object key to submit as the post's `image` field once the upload succeeds.
    pub resource_key: String,
}
