//! Account storage. Uniqueness of username and email is enforced by the
//! schema; violations surface as `StoreError::Conflict` naming the field.

use rusqlite::{params, Row};

use crate::graphql::types::User;
use crate::state::DbPool;

use super::{now_timestamp, parse_timestamp, unique_violation_field, StoreError};

const USER_COLUMNS: &str = "id, username, email, created_at, updated_at";

/// A stored account together with its password hash. Only the login path
/// sees this; the hash never reaches the API layer.
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
}

/// Map user columns starting at `base`. Shared with the article and comment
/// stores, which select the creator's columns after their own.
pub(crate) fn user_at(row: &Row<'_>, base: usize) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(base)?,
        username: row.get(base + 1)?,
        email: row.get(base + 2)?,
        created_at: parse_timestamp(&row.get::<_, String>(base + 3)?),
        updated_at: parse_timestamp(&row.get::<_, String>(base + 4)?),
    })
}

pub fn create_user(
    pool: &DbPool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, StoreError> {
    let conn = pool.get()?;
    let now = now_timestamp();

    let result = conn.execute(
        "INSERT INTO \"user\" (username, email, password_hash, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![username, email, password_hash, now],
    );
    if let Err(e) = result {
        if let Some(field) = unique_violation_field(&e) {
            return Err(StoreError::Conflict(field));
        }
        return Err(e.into());
    }

    let id = conn.last_insert_rowid();
    Ok(User {
        id,
        username: username.to_string(),
        email: email.to_string(),
        created_at: parse_timestamp(&now),
        updated_at: parse_timestamp(&now),
    })
}

pub fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<User>, StoreError> {
    let conn = pool.get()?;
    let result = conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM \"user\" WHERE id = ?1"),
        params![id],
        |row| user_at(row, 0),
    );
    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Look up login credentials. Inputs containing `@` are treated as an email
/// address, anything else as a username.
pub fn find_credentials(
    pool: &DbPool,
    username_or_email: &str,
) -> Result<Option<Credentials>, StoreError> {
    let column = if username_or_email.contains('@') {
        "email"
    } else {
        "username"
    };

    let conn = pool.get()?;
    let result = conn.query_row(
        &format!("SELECT {USER_COLUMNS}, password_hash FROM \"user\" WHERE {column} = ?1"),
        params![username_or_email],
        |row| {
            Ok(Credentials {
                user: user_at(row, 0)?,
                password_hash: row.get(5)?,
            })
        },
    );
    match result {
        Ok(creds) => Ok(Some(creds)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Partial account update. `None` fields keep their stored value.
#[derive(Debug, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

/// Apply all accepted changes in one statement, then return the fresh row.
pub fn update_user(pool: &DbPool, id: i64, update: &UserUpdate) -> Result<User, StoreError> {
    let conn = pool.get()?;
    let now = now_timestamp();

    let result = conn.execute(
        "UPDATE \"user\" SET
            username = COALESCE(?1, username),
            email = COALESCE(?2, email),
            password_hash = COALESCE(?3, password_hash),
            updated_at = ?4
         WHERE id = ?5",
        params![
            update.username,
            update.email,
            update.password_hash,
            now,
            id
        ],
    );
    match result {
        Ok(0) => return Err(StoreError::NotFound),
        Ok(_) => {}
        Err(e) => {
            if let Some(field) = unique_violation_field(&e) {
                return Err(StoreError::Conflict(field));
            }
            return Err(e.into());
        }
    }
    // Release the connection before re-fetching; find_by_id checks out its own.
    drop(conn);

    match find_by_id(pool, id)? {
        Some(user) => Ok(user),
        None => Err(StoreError::NotFound),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::test_pool;
    use super::*;

    #[test]
    fn create_and_find_user() {
        let pool = test_pool();
        let created = create_user(&pool, "alice", "alice@example.com", "hash").unwrap();

        let found = find_by_id(&pool, created.id).unwrap().unwrap();
        assert_eq!(found.username, "alice");
        assert_eq!(found.email, "alice@example.com");
        assert_eq!(found.created_at, created.created_at);

        assert!(find_by_id(&pool, created.id + 1).unwrap().is_none());
    }

    #[test]
    fn duplicate_username_is_a_conflict() {
        let pool = test_pool();
        create_user(&pool, "alice", "alice@example.com", "hash").unwrap();

        let err = create_user(&pool, "alice", "other@example.com", "hash").unwrap_err();
        assert!(matches!(err, StoreError::Conflict("username")));

        let err = create_user(&pool, "bob", "alice@example.com", "hash").unwrap_err();
        assert!(matches!(err, StoreError::Conflict("email")));
    }

    #[test]
    fn credentials_lookup_dispatches_on_at_sign() {
        let pool = test_pool();
        create_user(&pool, "alice", "alice@example.com", "secret-hash").unwrap();

        let by_name = find_credentials(&pool, "alice").unwrap().unwrap();
        assert_eq!(by_name.user.username, "alice");
        assert_eq!(by_name.password_hash, "secret-hash");

        let by_email = find_credentials(&pool, "alice@example.com").unwrap().unwrap();
        assert_eq!(by_email.user.id, by_name.user.id);

        // An email-shaped input never matches a username
        assert!(find_credentials(&pool, "alice@nowhere.test").unwrap().is_none());
        assert!(find_credentials(&pool, "nobody").unwrap().is_none());
    }

    #[test]
    fn update_changes_only_provided_fields() {
        let pool = test_pool();
        let user = create_user(&pool, "alice", "alice@example.com", "hash").unwrap();

        let updated = update_user(
            &pool,
            user.id,
            &UserUpdate {
                username: Some("alicia".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.username, "alicia");
        assert_eq!(updated.email, "alice@example.com");

        let conn = pool.get().unwrap();
        let hash: String = conn
            .query_row(
                "SELECT password_hash FROM \"user\" WHERE id = ?1",
                params![user.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(hash, "hash");
    }

    #[test]
    fn update_to_taken_username_is_a_conflict() {
        let pool = test_pool();
        create_user(&pool, "alice", "alice@example.com", "hash").unwrap();
        let bob = create_user(&pool, "bob", "bob@example.com", "hash").unwrap();

        let err = update_user(
            &pool,
            bob.id,
            &UserUpdate {
                username: Some("alice".to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::Conflict("username")));
    }

    #[test]
    fn update_of_missing_user_is_not_found() {
        let pool = test_pool();
        let err = update_user(&pool, 42, &UserUpdate::default()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
