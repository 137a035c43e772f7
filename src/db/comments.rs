//! Comment storage. Comments hang off articles but are votable content in
//! their own right, with the same points counter and ledger shape.

use rusqlite::{params, Row};

use crate::graphql::types::Comment;
use crate::state::DbPool;

use super::pagination::{clamp_limit, Cursor, Page};
use super::users::user_at;
use super::{is_foreign_key_violation, now_timestamp, parse_timestamp, StoreError};

const SELECT_COMMENT: &str = "
    SELECT c.id, c.title, c.text, c.points, c.creator_id, c.article_id,
           c.created_at, c.updated_at,
           u.id, u.username, u.email, u.created_at, u.updated_at,
           (SELECT v.value FROM \"like\" v
             WHERE v.user_id = ?1 AND v.comment_id = c.id) AS vote_status
    FROM comment c
    JOIN \"user\" u ON u.id = c.creator_id";

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        title: row.get(1)?,
        text: row.get(2)?,
        points: row.get(3)?,
        creator_id: row.get(4)?,
        article_id: row.get(5)?,
        created_at: parse_timestamp(&row.get::<_, String>(6)?),
        updated_at: parse_timestamp(&row.get::<_, String>(7)?),
        creator: user_at(row, 8)?,
        vote_status: row.get(13)?,
    })
}

/// Create a comment under an article. A missing article surfaces as
/// `NotFound` rather than a raw constraint error.
pub fn create_comment(
    pool: &DbPool,
    creator_id: i64,
    article_id: i64,
    title: &str,
    text: &str,
) -> Result<Comment, StoreError> {
    let conn = pool.get()?;
    let now = now_timestamp();

    let result = conn.execute(
        "INSERT INTO comment (title, text, creator_id, article_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![title, text, creator_id, article_id, now],
    );
    if let Err(e) = result {
        if is_foreign_key_violation(&e) {
            return Err(StoreError::NotFound);
        }
        return Err(e.into());
    }
    let id = conn.last_insert_rowid();

    let query = format!("{SELECT_COMMENT} WHERE c.id = ?2");
    Ok(conn.query_row(&query, params![creator_id, id], comment_from_row)?)
}

pub fn find_by_id(
    pool: &DbPool,
    id: i64,
    viewer: Option<i64>,
) -> Result<Option<Comment>, StoreError> {
    let conn = pool.get()?;
    let query = format!("{SELECT_COMMENT} WHERE c.id = ?2");
    let result = conn.query_row(&query, params![viewer, id], comment_from_row);
    match result {
        Ok(comment) => Ok(Some(comment)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// One page of all comments, newest first, same cursor contract as the
/// article feed.
pub fn list(
    pool: &DbPool,
    limit: i64,
    cursor: Option<&Cursor>,
    viewer: Option<i64>,
) -> Result<Page<Comment>, StoreError> {
    let limit = clamp_limit(limit);
    let conn = pool.get()?;

    let query = format!(
        "{SELECT_COMMENT}
         WHERE ?2 IS NULL OR c.created_at < ?2
         ORDER BY c.created_at DESC, c.id DESC
         LIMIT ?3"
    );
    let mut stmt = conn.prepare(&query)?;
    let rows: Vec<Comment> = stmt
        .query_map(
            params![viewer, cursor.map(Cursor::as_sql), limit + 1],
            comment_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page::from_overfetch(rows, limit))
}

/// Every comment under one article, oldest first (reading order).
pub fn list_for_article(
    pool: &DbPool,
    article_id: i64,
    viewer: Option<i64>,
) -> Result<Vec<Comment>, StoreError> {
    let conn = pool.get()?;
    let query = format!(
        "{SELECT_COMMENT}
         WHERE c.article_id = ?2
         ORDER BY c.created_at ASC, c.id ASC"
    );
    let mut stmt = conn.prepare(&query)?;
    let rows = stmt
        .query_map(params![viewer, article_id], comment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_title(
    pool: &DbPool,
    id: i64,
    title: Option<&str>,
    viewer: Option<i64>,
) -> Result<Option<Comment>, StoreError> {
    if let Some(title) = title {
        let conn = pool.get()?;
        let rows = conn.execute(
            "UPDATE comment SET title = ?1, updated_at = ?2 WHERE id = ?3",
            params![title, now_timestamp(), id],
        )?;
        if rows == 0 {
            return Ok(None);
        }
    }
    find_by_id(pool, id, viewer)
}

/// Delete a comment and its vote rows in one transaction. Returns whether
/// the comment existed.
pub fn delete(pool: &DbPool, id: i64) -> Result<bool, StoreError> {
    let conn = pool.get()?;
    conn.execute("BEGIN IMMEDIATE", [])?;

    let result: Result<bool, StoreError> = (|| {
        conn.execute("DELETE FROM \"like\" WHERE comment_id = ?1", params![id])?;
        let rows = conn.execute("DELETE FROM comment WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    })();

    match result {
        Ok(deleted) => {
            conn.execute("COMMIT", [])?;
            Ok(deleted)
        }
        Err(e) => {
            conn.execute("ROLLBACK", [])?;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{seed_article, seed_user, test_pool};
    use super::*;

    #[test]
    fn create_requires_existing_article() {
        let pool = test_pool();
        let alice = seed_user(&pool, "alice");
        let article = seed_article(&pool, alice, "Hello");

        let comment = create_comment(&pool, alice, article, "Re: Hello", "nice").unwrap();
        assert_eq!(comment.article_id, article);
        assert_eq!(comment.creator.username, "alice");
        assert_eq!(comment.points, 0);

        let err = create_comment(&pool, alice, article + 99, "t", "x").unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn article_listing_reads_oldest_first() {
        let pool = test_pool();
        let alice = seed_user(&pool, "alice");
        let article = seed_article(&pool, alice, "Hello");
        let other = seed_article(&pool, alice, "Other");

        let conn = pool.get().unwrap();
        for (i, title) in ["first", "second", "third"].iter().enumerate() {
            conn.execute(
                "INSERT INTO comment (title, text, creator_id, article_id, created_at, updated_at)
                 VALUES (?1, 'x', ?2, ?3, ?4, ?4)",
                params![
                    title,
                    alice,
                    article,
                    format!("2026-01-01T00:00:0{i}.000000Z")
                ],
            )
            .unwrap();
        }
        drop(conn);

        create_comment(&pool, alice, other, "elsewhere", "x").unwrap();

        let comments = list_for_article(&pool, article, None).unwrap();
        let titles: Vec<&str> = comments.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["first", "second", "third"]);
    }

    #[test]
    fn feed_pages_like_articles() {
        let pool = test_pool();
        let alice = seed_user(&pool, "alice");
        let article = seed_article(&pool, alice, "Hello");

        let conn = pool.get().unwrap();
        for i in 0..3 {
            conn.execute(
                "INSERT INTO comment (title, text, creator_id, article_id, created_at, updated_at)
                 VALUES (?1, 'x', ?2, ?3, ?4, ?4)",
                params![
                    format!("c{i}"),
                    alice,
                    article,
                    format!("2026-01-01T00:00:0{i}.000000Z")
                ],
            )
            .unwrap();
        }
        drop(conn);

        let page = list(&pool, 2, None, None).unwrap();
        assert!(page.has_more);
        assert_eq!(page.items[0].title, "c2");

        let cursor = Cursor::decode("2026-01-01T00:00:01.000000Z").unwrap();
        let page = list(&pool, 2, Some(&cursor), None).unwrap();
        assert!(!page.has_more);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].title, "c0");
    }

    #[test]
    fn viewer_vote_annotation() {
        let pool = test_pool();
        let alice = seed_user(&pool, "alice");
        let bob = seed_user(&pool, "bob");
        let article = seed_article(&pool, alice, "Hello");
        let comment = create_comment(&pool, alice, article, "t", "x").unwrap();

        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO \"like\" (user_id, comment_id, value) VALUES (?1, ?2, -1)",
            params![bob, comment.id],
        )
        .unwrap();
        drop(conn);

        let seen = find_by_id(&pool, comment.id, Some(bob)).unwrap().unwrap();
        assert_eq!(seen.vote_status, Some(-1));
        let seen = find_by_id(&pool, comment.id, None).unwrap().unwrap();
        assert_eq!(seen.vote_status, None);
    }

    #[test]
    fn update_and_delete() {
        let pool = test_pool();
        let alice = seed_user(&pool, "alice");
        let article = seed_article(&pool, alice, "Hello");
        let comment = create_comment(&pool, alice, article, "before", "x").unwrap();

        let updated = update_title(&pool, comment.id, Some("after"), None)
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "after");
        assert!(update_title(&pool, 999, Some("x"), None).unwrap().is_none());

        // A voted comment still deletes cleanly; its ledger rows go with it
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO \"like\" (user_id, comment_id, value) VALUES (?1, ?2, 1)",
            params![alice, comment.id],
        )
        .unwrap();
        drop(conn);

        assert!(delete(&pool, comment.id).unwrap());
        assert!(!delete(&pool, comment.id).unwrap());

        let conn = pool.get().unwrap();
        let votes: i64 = conn
            .query_row("SELECT COUNT(*) FROM \"like\"", [], |row| row.get(0))
            .unwrap();
        assert_eq!(votes, 0);
    }
}
