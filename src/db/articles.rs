//! Article storage. Every read joins the creator row and, when a viewer is
//! present, annotates each article with that viewer's recorded vote.

use rusqlite::{params, Row};

use crate::graphql::types::Article;
use crate::state::DbPool;

use super::pagination::{clamp_limit, Cursor, Page};
use super::users::user_at;
use super::{now_timestamp, parse_timestamp, StoreError};

// Article columns, creator columns, then the viewer's vote. ?1 is always the
// viewer id (or NULL, which makes vote_status NULL for every row).
const SELECT_ARTICLE: &str = "
    SELECT a.id, a.title, a.text, a.points, a.creator_id, a.created_at, a.updated_at,
           u.id, u.username, u.email, u.created_at, u.updated_at,
           (SELECT v.value FROM article_like v
             WHERE v.user_id = ?1 AND v.article_id = a.id) AS vote_status
    FROM article a
    JOIN \"user\" u ON u.id = a.creator_id";

fn article_from_row(row: &Row<'_>) -> rusqlite::Result<Article> {
    Ok(Article {
        id: row.get(0)?,
        title: row.get(1)?,
        text: row.get(2)?,
        points: row.get(3)?,
        creator_id: row.get(4)?,
        created_at: parse_timestamp(&row.get::<_, String>(5)?),
        updated_at: parse_timestamp(&row.get::<_, String>(6)?),
        creator: user_at(row, 7)?,
        vote_status: row.get(12)?,
    })
}

pub fn create_article(
    pool: &DbPool,
    creator_id: i64,
    title: &str,
    text: &str,
) -> Result<Article, StoreError> {
    let conn = pool.get()?;
    let now = now_timestamp();

    conn.execute(
        "INSERT INTO article (title, text, creator_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![title, text, creator_id, now],
    )?;
    let id = conn.last_insert_rowid();

    let query = format!("{SELECT_ARTICLE} WHERE a.id = ?2");
    Ok(conn.query_row(&query, params![creator_id, id], article_from_row)?)
}

pub fn find_by_id(
    pool: &DbPool,
    id: i64,
    viewer: Option<i64>,
) -> Result<Option<Article>, StoreError> {
    let conn = pool.get()?;
    let query = format!("{SELECT_ARTICLE} WHERE a.id = ?2");
    let result = conn.query_row(&query, params![viewer, id], article_from_row);
    match result {
        Ok(article) => Ok(Some(article)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// One page of the feed, newest first. Ties on `created_at` break on `id`
/// so the order is deterministic. The cursor bounds strictly, so the page
/// after item X starts at the first article older than X.
pub fn list(
    pool: &DbPool,
    limit: i64,
    cursor: Option<&Cursor>,
    viewer: Option<i64>,
) -> Result<Page<Article>, StoreError> {
    let limit = clamp_limit(limit);
    let conn = pool.get()?;

    let query = format!(
        "{SELECT_ARTICLE}
         WHERE ?2 IS NULL OR a.created_at < ?2
         ORDER BY a.created_at DESC, a.id DESC
         LIMIT ?3"
    );
    let mut stmt = conn.prepare(&query)?;
    let rows: Vec<Article> = stmt
        .query_map(
            params![viewer, cursor.map(Cursor::as_sql), limit + 1],
            article_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page::from_overfetch(rows, limit))
}

/// Retitle an article. A `None` title leaves the row untouched and returns
/// the current state; a missing article returns `None`.
pub fn update_title(
    pool: &DbPool,
    id: i64,
    title: Option<&str>,
    viewer: Option<i64>,
) -> Result<Option<Article>, StoreError> {
    if let Some(title) = title {
        let conn = pool.get()?;
        let rows = conn.execute(
            "UPDATE article SET title = ?1, updated_at = ?2 WHERE id = ?3",
            params![title, now_timestamp(), id],
        )?;
        if rows == 0 {
            return Ok(None);
        }
    }
    find_by_id(pool, id, viewer)
}

/// Delete an article and everything hanging off it: its comments, their
/// vote rows, and its own vote rows. The schema has no cascades, so the
/// cleanup runs explicitly, in one transaction. Returns whether the
/// article existed.
pub fn delete(pool: &DbPool, id: i64) -> Result<bool, StoreError> {
    let conn = pool.get()?;
    conn.execute("BEGIN IMMEDIATE", [])?;

    let result: Result<bool, StoreError> = (|| {
        conn.execute(
            "DELETE FROM \"like\" WHERE comment_id IN
                (SELECT id FROM comment WHERE article_id = ?1)",
            params![id],
        )?;
        conn.execute("DELETE FROM comment WHERE article_id = ?1", params![id])?;
        conn.execute("DELETE FROM article_like WHERE article_id = ?1", params![id])?;
        let rows = conn.execute("DELETE FROM article WHERE id = ?1", params![id])?;
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
    use super::super::test_support::{seed_user, test_pool};
    use super::*;

    #[test]
    fn create_includes_creator_and_null_vote() {
        let pool = test_pool();
        let alice = seed_user(&pool, "alice");

        let article = create_article(&pool, alice, "Hello", "first article").unwrap();
        assert_eq!(article.title, "Hello");
        assert_eq!(article.points, 0);
        assert_eq!(article.creator.username, "alice");
        assert_eq!(article.vote_status, None);
    }

    #[test]
    fn find_annotates_viewer_vote_only() {
        let pool = test_pool();
        let alice = seed_user(&pool, "alice");
        let bob = seed_user(&pool, "bob");
        let article = create_article(&pool, alice, "Hello", "body").unwrap();

        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO article_like (user_id, article_id, value) VALUES (?1, ?2, 1)",
            params![bob, article.id],
        )
        .unwrap();
        drop(conn);

        let seen_by_bob = find_by_id(&pool, article.id, Some(bob)).unwrap().unwrap();
        assert_eq!(seen_by_bob.vote_status, Some(1));

        let seen_by_alice = find_by_id(&pool, article.id, Some(alice)).unwrap().unwrap();
        assert_eq!(seen_by_alice.vote_status, None);

        let seen_anonymously = find_by_id(&pool, article.id, None).unwrap().unwrap();
        assert_eq!(seen_anonymously.vote_status, None);
    }

    fn seed_article_at(pool: &DbPool, creator: i64, title: &str, created_at: &str) -> i64 {
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO article (title, text, creator_id, created_at, updated_at)
             VALUES (?1, 'body', ?2, ?3, ?3)",
            params![title, creator, created_at],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    #[test]
    fn list_pages_newest_first() {
        let pool = test_pool();
        let alice = seed_user(&pool, "alice");
        seed_article_at(&pool, alice, "oldest", "2026-01-01T00:00:00.000000Z");
        seed_article_at(&pool, alice, "middle", "2026-01-02T00:00:00.000000Z");
        seed_article_at(&pool, alice, "newest", "2026-01-03T00:00:00.000000Z");

        let page = list(&pool, 2, None, None).unwrap();
        assert!(page.has_more);
        let titles: Vec<&str> = page.items.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, ["newest", "middle"]);

        let cursor = Cursor::decode("2026-01-02T00:00:00.000000Z").unwrap();
        let page = list(&pool, 2, Some(&cursor), None).unwrap();
        assert!(!page.has_more);
        let titles: Vec<&str> = page.items.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, ["oldest"]);
    }

    #[test]
    fn list_breaks_timestamp_ties_by_id() {
        let pool = test_pool();
        let alice = seed_user(&pool, "alice");
        let same = "2026-01-01T00:00:00.000000Z";
        let first = seed_article_at(&pool, alice, "first", same);
        let second = seed_article_at(&pool, alice, "second", same);

        let page = list(&pool, 10, None, None).unwrap();
        let ids: Vec<i64> = page.items.iter().map(|a| a.id).collect();
        assert_eq!(ids, [second, first]);
    }

    #[test]
    fn list_clamps_oversized_limits() {
        let pool = test_pool();
        let alice = seed_user(&pool, "alice");
        for i in 0..55 {
            seed_article_at(
                &pool,
                alice,
                &format!("a{i}"),
                &format!("2026-01-01T00:00:{:02}.000000Z", i),
            );
        }

        let page = list(&pool, 1000, None, None).unwrap();
        assert_eq!(page.items.len(), 50);
        assert!(page.has_more);

        let page = list(&pool, 0, None, None).unwrap();
        assert!(page.items.is_empty());
        assert!(page.has_more);
    }

    #[test]
    fn update_title_only_touches_given_fields() {
        let pool = test_pool();
        let alice = seed_user(&pool, "alice");
        let article = create_article(&pool, alice, "Before", "body").unwrap();

        let updated = update_title(&pool, article.id, Some("After"), None)
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "After");
        assert_eq!(updated.text, "body");

        let untouched = update_title(&pool, article.id, None, None).unwrap().unwrap();
        assert_eq!(untouched.title, "After");

        assert!(update_title(&pool, 999, Some("X"), None).unwrap().is_none());
    }

    #[test]
    fn delete_reports_whether_row_existed() {
        let pool = test_pool();
        let alice = seed_user(&pool, "alice");
        let article = create_article(&pool, alice, "Hello", "body").unwrap();

        assert!(delete(&pool, article.id).unwrap());
        assert!(!delete(&pool, article.id).unwrap());
        assert!(find_by_id(&pool, article.id, None).unwrap().is_none());
    }

    #[test]
    fn delete_takes_comments_and_vote_rows_along() {
        let pool = test_pool();
        let alice = seed_user(&pool, "alice");
        let article = create_article(&pool, alice, "Hello", "body").unwrap();
        let survivor = create_article(&pool, alice, "Keep", "body").unwrap();

        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO comment (title, text, creator_id, article_id, created_at, updated_at)
             VALUES ('re', 'x', ?1, ?2, '2026-01-01T00:00:00.000000Z', '2026-01-01T00:00:00.000000Z')",
            params![alice, article.id],
        )
        .unwrap();
        let comment = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO article_like (user_id, article_id, value) VALUES (?1, ?2, 1)",
            params![alice, article.id],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO article_like (user_id, article_id, value) VALUES (?1, ?2, 1)",
            params![alice, survivor.id],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO \"like\" (user_id, comment_id, value) VALUES (?1, ?2, 1)",
            params![alice, comment],
        )
        .unwrap();
        drop(conn);

        assert!(delete(&pool, article.id).unwrap());

        let conn = pool.get().unwrap();
        for (table, expected) in [("comment", 0), ("\"like\"", 0), ("article_like", 1)] {
            let count: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                .unwrap();
            assert_eq!(count, expected, "unexpected rows left in {table}");
        }
        drop(conn);
        assert!(find_by_id(&pool, survivor.id, None).unwrap().is_some());
    }
}
