//! Post visibility filter.
//!
//! `PostQuery` is the one description of "which posts, in which order, with or without
//! comment counts". It has two interpreters that must agree: `push_select`/`push_count`
//! emit SQL for `PostgresRepository`, `admits`/`sort` evaluate the same rules in memory
//! for in-process repositories.

use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::PostRecord;

/// Whether the public visibility rule is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// `is_published AND pub_date <= now AND (no category OR category published)`.
    Public,
    /// Everything in scope, including drafts and scheduled posts.
    Unfiltered,
}

/// PostQuery
///
/// Filtering and annotation are chosen independently. `annotate` adds the derived
/// `comment_count` and switches to newest-first ordering; without it the listing keeps the
/// default title order.
#[derive(Debug, Clone, PartialEq)]
pub struct PostQuery {
    pub visibility: Visibility,
    pub annotate: bool,
    pub author_id: Option<Uuid>,
    pub category_id: Option<i64>,
    pub now: DateTime<Utc>,
}

const SELECT_COLUMNS: &str = r#"
    SELECT
        p.id, p.title, p.text, p.pub_date, p.image, p.is_published, p.created_at,
        p.author_id, u.username AS author_username,
        p.location_id, l.name AS location_name,
        p.category_id, c.title AS category_title, c.slug AS category_slug,
        c.is_published AS category_is_published"#;

const COMMENT_COUNT_COLUMN: &str =
    ", (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id) AS comment_count";

const FROM_JOINS: &str = r#"
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN locations l ON l.id = p.location_id
    LEFT JOIN categories c ON c.id = p.category_id
    WHERE TRUE"#;

impl PostQuery {
    /// The index listing: every publicly visible post, annotated.
    pub fn public(now: DateTime<Utc>) -> Self {
        Self {
            visibility: Visibility::Public,
            annotate: true,
            author_id: None,
            category_id: None,
            now,
        }
    }

    /// A category page: publicly visible posts of one category, annotated.
    pub fn for_category(category_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            category_id: Some(category_id),
            ..Self::public(now)
        }
    }

    /// A profile page. The filter is bypassed when the viewer owns the profile, so authors
    /// see their own drafts and scheduled posts.
    pub fn for_profile(author_id: Uuid, viewer: Option<Uuid>, now: DateTime<Utc>) -> Self {
        let visibility = if viewer == Some(author_id) {
            Visibility::Unfiltered
        } else {
            Visibility::Public
        };
        Self {
            visibility,
            author_id: Some(author_id),
            ..Self::public(now)
        }
    }

    /// Same query without the comment-count annotation.
    pub fn without_annotations(mut self) -> Self {
        self.annotate = false;
        self
    }

    /// Same query without the visibility rule.
    pub fn unfiltered(mut self) -> Self {
        self.visibility = Visibility::Unfiltered;
        self
    }

    // --- SQL interpretation ---

    /// Pushes the full `SELECT ... ORDER BY ... LIMIT ... OFFSET ...` statement.
    pub fn push_select(&self, builder: &mut QueryBuilder<'_, Postgres>, limit: i64, offset: i64) {
        builder.push(SELECT_COLUMNS);
        if self.annotate {
            builder.push(COMMENT_COUNT_COLUMN);
        }
        builder.push(FROM_JOINS);
        self.push_filters(builder);
        if self.annotate {
            builder.push(" ORDER BY p.pub_date DESC, p.id DESC");
        } else {
            builder.push(" ORDER BY p.title ASC, p.id ASC");
        }
        builder.push(" LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);
    }

    /// Pushes a `SELECT COUNT(*)` over the same filtered collection.
    pub fn push_count(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push("SELECT COUNT(*)");
        builder.push(FROM_JOINS);
        self.push_filters(builder);
    }

    /// Pushes the statement loading one post by id, without filter or annotation.
    pub fn push_single(builder: &mut QueryBuilder<'_, Postgres>, id: i64) {
        builder.push(SELECT_COLUMNS);
        builder.push(FROM_JOINS);
        builder.push(" AND p.id = ");
        builder.push_bind(id);
    }

    fn push_filters(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        if let Some(author_id) = self.author_id {
            builder.push(" AND p.author_id = ");
            builder.push_bind(author_id);
        }
        if let Some(category_id) = self.category_id {
            builder.push(" AND p.category_id = ");
            builder.push_bind(category_id);
        }
        if self.visibility == Visibility::Public {
            builder.push(" AND p.is_published = TRUE AND p.pub_date <= ");
            builder.push_bind(self.now);
            builder.push(" AND (p.category_id IS NULL OR c.is_published = TRUE)");
        }
    }

    // --- In-memory interpretation ---

    /// Whether `post` belongs to the collection this query describes.
    pub fn admits(&self, post: &PostRecord) -> bool {
        if self.author_id.is_some_and(|id| id != post.author_id) {
            return false;
        }
        if self.category_id.is_some() && self.category_id != post.category_id {
            return false;
        }
        match self.visibility {
            Visibility::Unfiltered => true,
            Visibility::Public => is_publicly_visible(post, self.now),
        }
    }

    /// Orders `posts` the way the SQL `ORDER BY` does.
    pub fn sort(&self, posts: &mut [PostRecord]) {
        if self.annotate {
            posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        } else {
            posts.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        }
    }
}

/// The public visibility predicate for a single post.
pub fn is_publicly_visible(post: &PostRecord, now: DateTime<Utc>) -> bool {
    let category_ok = match post.category_id {
        None => true,
        Some(_) => post.category_is_published.unwrap_or(false),
    };
    post.is_published && post.pub_date <= now && category_ok
}

/// Detail-page rule: drafts are only shown to their author.
pub fn can_view_detail(post: &PostRecord, viewer: Option<Uuid>) -> bool {
    post.is_published || viewer == Some(post.author_id)
}
