use async_graphql::*;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::auth::SessionContext;
use crate::db;
use crate::state::DbPool;

use super::errors::storage_fault;

/// Snippet length for feed previews.
const SNIPPET_CHARS: usize = 50;

/// A registered account.
#[derive(Clone, Debug, SimpleObject)]
#[graphql(complex)]
pub struct User {
    /// Unique account identifier
    pub id: i64,

    /// Unique display name
    pub username: String,

    /// Email address; exposed through the resolver below, never directly
    #[graphql(skip)]
    pub email: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

#[ComplexObject]
impl User {
    /// Email is private: owners see their own, everyone else gets "".
    async fn email(&self, ctx: &Context<'_>) -> String {
        let is_owner = ctx
            .data_opt::<Arc<SessionContext>>()
            .is_some_and(|session| session.viewer() == Some(self.id));
        if is_owner {
            self.email.clone()
        } else {
            String::new()
        }
    }
}

/// A top-level post.
#[derive(Clone, Debug, SimpleObject)]
#[graphql(complex)]
pub struct Article {
    /// Unique article identifier
    pub id: i64,

    pub title: String,

    /// Full body text
    pub text: String,

    /// Running vote total, maintained by the voting engine
    pub points: i64,

    /// The viewer's own vote on this article (+1, -1, or null)
    pub vote_status: Option<i32>,

    pub creator_id: i64,

    /// The account that posted this article
    pub creator: User,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

#[ComplexObject]
impl Article {
    /// Leading slice of the body, for feed previews.
    async fn text_snippet(&self) -> String {
        self.text.chars().take(SNIPPET_CHARS).collect()
    }

    /// Comments under this article, oldest first.
    async fn comments(&self, ctx: &Context<'_>) -> Result<Vec<Comment>> {
        let pool = ctx.data::<DbPool>()?;
        let viewer = ctx
            .data_opt::<Arc<SessionContext>>()
            .and_then(|session| session.viewer());
        db::comments::list_for_article(pool, self.id, viewer).map_err(storage_fault)
    }
}

/// A comment on an article. Votable exactly like an article.
#[derive(Clone, Debug, SimpleObject)]
#[graphql(complex)]
pub struct Comment {
    /// Unique comment identifier
    pub id: i64,

    pub title: String,

    pub text: String,

    /// Running vote total, maintained by the voting engine
    pub points: i64,

    /// The viewer's own vote on this comment (+1, -1, or null)
    pub vote_status: Option<i32>,

    pub creator_id: i64,

    pub creator: User,

    /// The article this comment belongs to
    pub article_id: i64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

#[ComplexObject]
impl Comment {
    /// Leading slice of the body, for feed previews.
    async fn text_snippet(&self) -> String {
        self.text.chars().take(SNIPPET_CHARS).collect()
    }
}

/// A validation or credential failure scoped to one input field.
#[derive(Clone, Debug, SimpleObject)]
pub struct FieldError {
    /// Which input field the message is about
    pub field: String,

    /// Human-readable explanation
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Outcome of account operations: either a user or field-scoped errors,
/// never both.
#[derive(SimpleObject)]
pub struct UserResponse {
    pub errors: Option<Vec<FieldError>>,

    pub user: Option<User>,
}

impl UserResponse {
    pub fn from_user(user: User) -> Self {
        Self {
            errors: None,
            user: Some(user),
        }
    }

    pub fn from_errors(errors: Vec<FieldError>) -> Self {
        Self {
            errors: Some(errors),
            user: None,
        }
    }

    pub fn field_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::from_errors(vec![FieldError::new(field, message)])
    }
}

/// One page of the article feed.
#[derive(SimpleObject)]
pub struct PaginatedArticles {
    pub articles: Vec<Article>,

    /// Whether older articles remain past this page
    pub has_more: bool,
}

/// One page of the comment feed.
#[derive(SimpleObject)]
pub struct PaginatedComments {
    pub comments: Vec<Comment>,

    /// Whether older comments remain past this page
    pub has_more: bool,
}

/// Credentials for account creation.
#[derive(InputObject)]
pub struct RegisterInput {
    pub username: String,

    pub email: String,

    pub password: String,
}

/// Self-service profile update. Absent fields keep their current value.
#[derive(InputObject)]
pub struct ChangeUserInput {
    pub username: Option<String>,

    pub email: Option<String>,

    pub password: Option<String>,
}

/// Title and body for a new article.
#[derive(InputObject)]
pub struct ArticleInput {
    pub title: String,

    pub text: String,
}
