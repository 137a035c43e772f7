use async_graphql::*;
use std::sync::Arc;

use crate::auth::SessionContext;
use crate::db;
use crate::db::pagination::Cursor;
use crate::graphql::errors::{storage_fault, ApiError};
use crate::graphql::types::{Article, Comment, PaginatedArticles, PaginatedComments, User};
use crate::state::DbPool;

/// GraphQL Query root
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// The currently signed-in account, or null.
    async fn me(&self, ctx: &Context<'_>) -> Result<Option<User>> {
        let session = ctx.data::<Arc<SessionContext>>()?;
        let Some(viewer) = session.viewer() else {
            return Ok(None);
        };

        let pool = ctx.data::<DbPool>()?;
        db::users::find_by_id(pool, viewer).map_err(storage_fault)
    }

    /// One article by id, with the viewer's vote annotated.
    async fn article(&self, ctx: &Context<'_>, id: i64) -> Result<Option<Article>> {
        let pool = ctx.data::<DbPool>()?;
        let viewer = ctx.data::<Arc<SessionContext>>()?.viewer();
        db::articles::find_by_id(pool, id, viewer).map_err(storage_fault)
    }

    /// The article feed, newest first. `cursor` is the `createdAt` of the
    /// last article already seen.
    async fn articles(
        &self,
        ctx: &Context<'_>,
        limit: i32,
        cursor: Option<String>,
    ) -> Result<PaginatedArticles> {
        let pool = ctx.data::<DbPool>()?;
        let viewer = ctx.data::<Arc<SessionContext>>()?.viewer();
        let cursor = decode_cursor(cursor)?;

        let page = db::articles::list(pool, i64::from(limit), cursor.as_ref(), viewer)
            .map_err(storage_fault)?;
        Ok(PaginatedArticles {
            articles: page.items,
            has_more: page.has_more,
        })
    }

    /// One comment by id, with the viewer's vote annotated.
    async fn comment(&self, ctx: &Context<'_>, id: i64) -> Result<Option<Comment>> {
        let pool = ctx.data::<DbPool>()?;
        let viewer = ctx.data::<Arc<SessionContext>>()?.viewer();
        db::comments::find_by_id(pool, id, viewer).map_err(storage_fault)
    }

    /// The comment feed, newest first, same cursor contract as `articles`.
    async fn comments(
        &self,
        ctx: &Context<'_>,
        limit: i32,
        cursor: Option<String>,
    ) -> Result<PaginatedComments> {
        let pool = ctx.data::<DbPool>()?;
        let viewer = ctx.data::<Arc<SessionContext>>()?.viewer();
        let cursor = decode_cursor(cursor)?;

        let page = db::comments::list(pool, i64::from(limit), cursor.as_ref(), viewer)
            .map_err(storage_fault)?;
        Ok(PaginatedComments {
            comments: page.items,
            has_more: page.has_more,
        })
    }
}

fn decode_cursor(raw: Option<String>) -> Result<Option<Cursor>> {
    match raw {
        None => Ok(None),
        Some(raw) => match Cursor::decode(&raw) {
            Some(cursor) => Ok(Some(cursor)),
            None => Err(ApiError::BadInput(format!("invalid cursor: {raw}")).into()),
        },
    }
}
