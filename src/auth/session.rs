use rand::Rng;
use rusqlite::params;

use crate::db::StoreError;
use crate::state::DbPool;

/// Create a new session for a user. Returns the session token.
pub fn create_session(pool: &DbPool, user_id: i64, hours: u64) -> Result<String, StoreError> {
    let conn = pool.get()?;

    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![id, user_id, token, format!("+{} hours", hours)],
    )?;

    Ok(token)
}

/// Resolve a token to its user, ignoring expired sessions.
pub fn session_user(pool: &DbPool, token: &str) -> Result<Option<i64>, StoreError> {
    let conn = pool.get()?;

    let result = conn.query_row(
        "SELECT user_id FROM sessions WHERE token = ?1 AND expires_at > datetime('now')",
        params![token],
        |row| row.get(0),
    );
    match result {
        Ok(user_id) => Ok(Some(user_id)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Delete a session by token. Returns whether one existed.
pub fn destroy_session(pool: &DbPool, token: &str) -> Result<bool, StoreError> {
    let conn = pool.get()?;

    let rows = conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(rows > 0)
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{seed_user, test_pool};

    #[test]
    fn generate_token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generate_token_is_unique() {
        let t1 = generate_token();
        let t2 = generate_token();
        assert_ne!(t1, t2);
    }

    #[test]
    fn created_session_resolves_to_its_user() {
        let pool = test_pool();
        let alice = seed_user(&pool, "alice");

        let token = create_session(&pool, alice, 24).unwrap();
        assert_eq!(session_user(&pool, &token).unwrap(), Some(alice));
        assert_eq!(session_user(&pool, "bogus").unwrap(), None);
    }

    #[test]
    fn expired_sessions_do_not_resolve() {
        let pool = test_pool();
        let alice = seed_user(&pool, "alice");

        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO sessions (id, user_id, token, expires_at)
             VALUES ('s1', ?1, 'stale', datetime('now', '-1 hours'))",
            params![alice],
        )
        .unwrap();
        drop(conn);

        assert_eq!(session_user(&pool, "stale").unwrap(), None);
    }

    #[test]
    fn destroy_reports_whether_session_existed() {
        let pool = test_pool();
        let alice = seed_user(&pool, "alice");

        let token = create_session(&pool, alice, 24).unwrap();
        assert!(destroy_session(&pool, &token).unwrap());
        assert!(!destroy_session(&pool, &token).unwrap());
        assert_eq!(session_user(&pool, &token).unwrap(), None);
    }
}
