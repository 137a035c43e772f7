use async_graphql::*;
use std::sync::Arc;

use crate::auth::{password, session, validate, SessionContext};
use crate::config::Config;
use crate::db::{self, StoreError};
use crate::graphql::errors::{internal, not_found_or_fault, storage_fault, ApiError};
use crate::graphql::types::{
    Article, ArticleInput, ChangeUserInput, Comment, FieldError, RegisterInput, UserResponse,
};
use crate::state::DbPool;

/// GraphQL Mutation root
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Create an account. On success the new user is signed in immediately.
    async fn register(&self, ctx: &Context<'_>, options: RegisterInput) -> Result<UserResponse> {
        let pool = ctx.data::<DbPool>()?;
        let config = ctx.data::<Config>()?;
        let session_ctx = ctx.data::<Arc<SessionContext>>()?;

        let errors =
            validate::validate_registration(&options.username, &options.email, &options.password);
        if !errors.is_empty() {
            return Ok(UserResponse::from_errors(errors));
        }

        let hashed = password::hash(&options.password).map_err(|e| {
            tracing::error!(error = %e, "password hashing failed");
            internal()
        })?;

        let user = match db::users::create_user(pool, &options.username, &options.email, &hashed) {
            Ok(user) => user,
            Err(StoreError::Conflict(field)) => {
                return Ok(UserResponse::field_error(field, format!("{field} already taken")));
            }
            Err(e) => return Err(storage_fault(e)),
        };

        let token = session::create_session(pool, user.id, config.auth.session_hours)
            .map_err(storage_fault)?;
        session_ctx.sign_in(user.id, token);

        Ok(UserResponse::from_user(user))
    }

    /// Sign in with a username or an email address.
    async fn login(
        &self,
        ctx: &Context<'_>,
        username_or_email: String,
        password: String,
    ) -> Result<UserResponse> {
        let pool = ctx.data::<DbPool>()?;
        let config = ctx.data::<Config>()?;
        let session_ctx = ctx.data::<Arc<SessionContext>>()?;

        let Some(credentials) =
            db::users::find_credentials(pool, &username_or_email).map_err(storage_fault)?
        else {
            return Ok(UserResponse::field_error(
                "usernameOrEmail",
                "Could not find that username",
            ));
        };

        if !password::verify(&password, &credentials.password_hash) {
            return Ok(UserResponse::field_error("password", "invalid password"));
        }

        let user = credentials.user;
        let token = session::create_session(pool, user.id, config.auth.session_hours)
            .map_err(storage_fault)?;
        session_ctx.sign_in(user.id, token);

        Ok(UserResponse::from_user(user))
    }

    /// End the current session. The cookie is cleared regardless; the return
    /// value reports whether the server-side record was destroyed cleanly.
    async fn logout(&self, ctx: &Context<'_>) -> Result<bool> {
        let pool = ctx.data::<DbPool>()?;
        let session_ctx = ctx.data::<Arc<SessionContext>>()?;
        session_ctx.require_viewer()?;

        let destroyed = match session_ctx.token() {
            Some(token) => match session::destroy_session(pool, &token) {
                Ok(_) => true,
                Err(e) => {
                    tracing::error!(error = %e, "failed to destroy session");
                    false
                }
            },
            None => true,
        };

        session_ctx.sign_out();
        Ok(destroyed)
    }

    /// Update username, email, and/or password. Absent or empty fields keep
    /// their current value.
    async fn change_user(
        &self,
        ctx: &Context<'_>,
        options: ChangeUserInput,
    ) -> Result<UserResponse> {
        let pool = ctx.data::<DbPool>()?;
        let session_ctx = ctx.data::<Arc<SessionContext>>()?;
        let viewer = session_ctx.require_viewer()?;

        let mut errors = Vec::new();
        let mut update = db::users::UserUpdate::default();

        if let Some(email) = screen_change("email", options.email, &mut errors) {
            update.email = Some(email);
        }
        if let Some(username) = screen_change("username", options.username, &mut errors) {
            update.username = Some(username);
        }
        if let Some(new_password) = screen_change("password", options.password, &mut errors) {
            let hashed = password::hash(&new_password).map_err(|e| {
                tracing::error!(error = %e, "password hashing failed");
                internal()
            })?;
            update.password_hash = Some(hashed);
        }
        if !errors.is_empty() {
            return Ok(UserResponse::from_errors(errors));
        }

        match db::users::update_user(pool, viewer, &update) {
            Ok(user) => Ok(UserResponse::from_user(user)),
            Err(StoreError::Conflict(field)) => {
                Ok(UserResponse::field_error(field, format!("{field} already taken")))
            }
            Err(StoreError::NotFound) => Err(ApiError::NotFound("user").into()),
            Err(e) => Err(storage_fault(e)),
        }
    }

    /// Post a new article.
    async fn create_article(&self, ctx: &Context<'_>, input: ArticleInput) -> Result<Article> {
        let pool = ctx.data::<DbPool>()?;
        let viewer = ctx.data::<Arc<SessionContext>>()?.require_viewer()?;

        db::articles::create_article(pool, viewer, &input.title, &input.text)
            .map_err(storage_fault)
    }

    /// Retitle an article. Returns null if the article no longer exists.
    async fn update_article(
        &self,
        ctx: &Context<'_>,
        id: i64,
        title: Option<String>,
    ) -> Result<Option<Article>> {
        let pool = ctx.data::<DbPool>()?;
        let session_ctx = ctx.data::<Arc<SessionContext>>()?;
        let viewer = session_ctx.require_viewer()?;

        db::articles::update_title(pool, id, title.as_deref(), Some(viewer))
            .map_err(storage_fault)
    }

    /// Delete an article. Returns whether anything was deleted.
    async fn delete_article(&self, ctx: &Context<'_>, id: i64) -> Result<bool> {
        let pool = ctx.data::<DbPool>()?;
        ctx.data::<Arc<SessionContext>>()?.require_viewer()?;

        db::articles::delete(pool, id).map_err(storage_fault)
    }

    /// Up- or downvote an article. Any positive value counts as +1, any
    /// negative as -1; zero is rejected.
    async fn article_vote(&self, ctx: &Context<'_>, article_id: i64, value: i32) -> Result<bool> {
        let pool = ctx.data::<DbPool>()?;
        let viewer = ctx.data::<Arc<SessionContext>>()?.require_viewer()?;

        let Some(direction) = db::votes::normalize(value) else {
            return Err(ApiError::BadInput("vote value must be nonzero".to_string()).into());
        };
        db::votes::cast_vote(pool, &db::votes::ARTICLE_VOTES, viewer, article_id, direction)
            .map_err(not_found_or_fault("article"))?;
        Ok(true)
    }

    /// Comment on an article.
    async fn create_comment(
        &self,
        ctx: &Context<'_>,
        title: String,
        text: String,
        article_id: i64,
    ) -> Result<Comment> {
        let pool = ctx.data::<DbPool>()?;
        let viewer = ctx.data::<Arc<SessionContext>>()?.require_viewer()?;

        db::comments::create_comment(pool, viewer, article_id, &title, &text)
            .map_err(not_found_or_fault("article"))
    }

    /// Retitle a comment. Returns null if the comment no longer exists.
    async fn update_comment(
        &self,
        ctx: &Context<'_>,
        id: i64,
        title: Option<String>,
    ) -> Result<Option<Comment>> {
        let pool = ctx.data::<DbPool>()?;
        let session_ctx = ctx.data::<Arc<SessionContext>>()?;
        let viewer = session_ctx.require_viewer()?;

        db::comments::update_title(pool, id, title.as_deref(), Some(viewer))
            .map_err(storage_fault)
    }

    /// Delete a comment. Returns whether anything was deleted.
    async fn delete_comment(&self, ctx: &Context<'_>, id: i64) -> Result<bool> {
        let pool = ctx.data::<DbPool>()?;
        ctx.data::<Arc<SessionContext>>()?.require_viewer()?;

        db::comments::delete(pool, id).map_err(storage_fault)
    }

    /// Up- or downvote a comment. Same contract as `articleVote`.
    async fn vote(&self, ctx: &Context<'_>, comment_id: i64, value: i32) -> Result<bool> {
        let pool = ctx.data::<DbPool>()?;
        let viewer = ctx.data::<Arc<SessionContext>>()?.require_viewer()?;

        let Some(direction) = db::votes::normalize(value) else {
            return Err(ApiError::BadInput("vote value must be nonzero".to_string()).into());
        };
        db::votes::cast_vote(pool, &db::votes::COMMENT_VOTES, viewer, comment_id, direction)
            .map_err(not_found_or_fault("comment"))?;
        Ok(true)
    }
}

/// Screen one profile field: `None`/empty keeps the stored value, one or two
/// characters is a field error, anything longer is accepted.
fn screen_change(
    field: &'static str,
    value: Option<String>,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let value = value?;
    if value.is_empty() {
        return None;
    }
    if value.chars().count() < 3 {
        errors.push(FieldError::new(
            field,
            format!("Length of {field} must be at least 3 characters"),
        ));
        return None;
    }
    Some(value)
}
