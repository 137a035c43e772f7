//! The voting engine. One ledger row per (voter, target) plus a denormalized
//! `points` counter on the target row. Every mutation runs inside a single
//! immediate transaction so the ledger and the counter can never drift:
//!
//!   no prior vote   -> insert ledger row, points += value
//!   same direction  -> no-op
//!   opposite        -> flip ledger row, points += 2 * value

use rusqlite::{params, Connection};

use crate::state::DbPool;

use super::{is_foreign_key_violation, is_primary_key_violation, StoreError};

/// One votable kind: its ledger table (already quoted for SQL) and the
/// ledger column naming the target.
pub struct VoteTarget {
    ledger: &'static str,
    target_table: &'static str,
    id_column: &'static str,
}

pub const ARTICLE_VOTES: VoteTarget = VoteTarget {
    ledger: "article_like",
    target_table: "article",
    id_column: "article_id",
};

pub const COMMENT_VOTES: VoteTarget = VoteTarget {
    ledger: "\"like\"",
    target_table: "comment",
    id_column: "comment_id",
};

/// Collapse a raw vote value to a direction. Zero is not a vote.
pub fn normalize(value: i32) -> Option<i32> {
    match value.signum() {
        0 => None,
        sign => Some(sign),
    }
}

/// Record `user_id`'s vote on a target, atomically. `value` must already be
/// normalized. A missing target surfaces as `NotFound` with no partial write.
pub fn cast_vote(
    pool: &DbPool,
    target: &VoteTarget,
    user_id: i64,
    target_id: i64,
    value: i32,
) -> Result<(), StoreError> {
    debug_assert!(value == 1 || value == -1);

    let conn = pool.get()?;
    conn.execute("BEGIN IMMEDIATE", [])?;

    let result = apply_vote(&conn, target, user_id, target_id, value);

    match result {
        Ok(()) => {
            conn.execute("COMMIT", [])?;
            Ok(())
        }
        Err(e) => {
            conn.execute("ROLLBACK", [])?;
            Err(e)
        }
    }
}

fn apply_vote(
    conn: &Connection,
    target: &VoteTarget,
    user_id: i64,
    target_id: i64,
    value: i32,
) -> Result<(), StoreError> {
    match current_vote(conn, target, user_id, target_id)? {
        Some(existing) if existing == value => Ok(()),
        Some(_) => switch_vote(conn, target, user_id, target_id, value),
        None => match first_vote(conn, target, user_id, target_id, value) {
            // The ledger row appeared between the read and the insert.
            // Fold it into the repeat/switch paths instead of failing.
            Err(StoreError::Sql(e)) if is_primary_key_violation(&e) => {
                match current_vote(conn, target, user_id, target_id)? {
                    Some(existing) if existing == value => Ok(()),
                    Some(_) => switch_vote(conn, target, user_id, target_id, value),
                    None => Err(e.into()),
                }
            }
            other => other,
        },
    }
}

fn current_vote(
    conn: &Connection,
    target: &VoteTarget,
    user_id: i64,
    target_id: i64,
) -> Result<Option<i32>, StoreError> {
    let query = format!(
        "SELECT value FROM {} WHERE user_id = ?1 AND {} = ?2",
        target.ledger, target.id_column
    );
    let result = conn.query_row(&query, params![user_id, target_id], |row| row.get(0));
    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn first_vote(
    conn: &Connection,
    target: &VoteTarget,
    user_id: i64,
    target_id: i64,
    value: i32,
) -> Result<(), StoreError> {
    let insert = format!(
        "INSERT INTO {} (user_id, {}, value) VALUES (?1, ?2, ?3)",
        target.ledger, target.id_column
    );
    if let Err(e) = conn.execute(&insert, params![user_id, target_id, value]) {
        // The ledger references the target, so a vote on a missing row
        // fails here before the counter is touched.
        if is_foreign_key_violation(&e) {
            return Err(StoreError::NotFound);
        }
        return Err(e.into());
    }
    bump_points(conn, target, target_id, i64::from(value))
}

fn switch_vote(
    conn: &Connection,
    target: &VoteTarget,
    user_id: i64,
    target_id: i64,
    value: i32,
) -> Result<(), StoreError> {
    let update = format!(
        "UPDATE {} SET value = ?1 WHERE user_id = ?2 AND {} = ?3",
        target.ledger, target.id_column
    );
    let rows = conn.execute(&update, params![value, user_id, target_id])?;
    if rows == 0 {
        return Err(StoreError::NotFound);
    }
    bump_points(conn, target, target_id, 2 * i64::from(value))
}

fn bump_points(
    conn: &Connection,
    target: &VoteTarget,
    target_id: i64,
    delta: i64,
) -> Result<(), StoreError> {
    let update = format!(
        "UPDATE {} SET points = points + ?1 WHERE id = ?2",
        target.target_table
    );
    let rows = conn.execute(&update, params![delta, target_id])?;
    if rows == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}
