use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{AppError, Result},
    models::{Comment, Post, PostRecord},
};

/// Anything owned by a single user that only that user may change.
pub trait Authored {
    fn author_id(&self) -> Uuid;
}

impl Authored for Post {
    fn author_id(&self) -> Uuid {
        self.author_id
    }
}

impl Authored for PostRecord {
    fn author_id(&self) -> Uuid {
        self.author_id
    }
}

impl Authored for Comment {
    fn author_id(&self) -> Uuid {
        self.author_id
    }
}

/// DenyPolicy
///
/// How a refused mutation is answered. Edit pages send the visitor back to the post;
/// deletes answer with a plain 403.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyPolicy {
    RedirectToPost(i64),
    Forbidden,
}

/// Author-only gate. Handlers call this after loading the target and before touching it.
pub fn require_author<E: Authored>(entity: &E, user: &AuthUser, policy: DenyPolicy) -> Result<()> {
    if entity.author_id() == user.id {
        return Ok(());
    }

    tracing::warn!(
        user_id = %user.id,
        author_id = %entity.author_id(),
        "Refused mutation by non-author"
    );

    Err(AppError::NotPermitted {
        redirect: match policy {
            DenyPolicy::RedirectToPost(post_id) => Some(post_detail_path(post_id)),
            DenyPolicy::Forbidden => None,
        },
    })
}

pub fn post_detail_path(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}

pub fn profile_path(username: &str) -> String {
    format!("/profile/{}/", username)
}
