//! User account persistence and the authenticate capability.

use crate::{hash_password, verify_password, AuthError, TokenKeys};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use uuid::Uuid;

/// A registered user. Never carries the password hash out of this module
/// boundary in API responses; handlers serialize this struct directly.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
}

/// Registration parameters.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Creates a new user account with a freshly hashed password.
///
/// Duplicate usernames and emails are detected up front so the caller
/// gets a specific error rather than a bare constraint violation.
pub fn create_user(conn: &Connection, new_user: &NewUser) -> Result<User, AuthError> {
    let username_taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
        [&new_user.username],
        |row| row.get(0),
    )?;
    if username_taken {
        return Err(AuthError::UsernameTaken);
    }

    let email_taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
        [&new_user.email],
        |row| row.get(0),
    )?;
    if email_taken {
        return Err(AuthError::EmailTaken);
    }

    let id = Uuid::new_v4().to_string();
    let password_hash = hash_password(&new_user.password)?;

    conn.execute(
        "INSERT INTO users (id, username, email, password_hash) VALUES (?1, ?2, ?3, ?4)",
        params![id, new_user.username, new_user.email, password_hash],
    )?;

    get_user(conn, &id)?.ok_or(AuthError::InvalidCredential)
}

/// Fetches a user by stable ID.
pub fn get_user(conn: &Connection, user_id: &str) -> Result<Option<User>, AuthError> {
    conn.query_row(
        "SELECT id, username, email, password_hash, created_at FROM users WHERE id = ?1",
        [user_id],
        map_row_to_user,
    )
    .optional()
    .map_err(AuthError::from)
}

/// Fetches a user by username.
pub fn find_user_by_username(
    conn: &Connection,
    username: &str,
) -> Result<Option<User>, AuthError> {
    conn.query_row(
        "SELECT id, username, email, password_hash, created_at FROM users WHERE username = ?1",
        [username],
        map_row_to_user,
    )
    .optional()
    .map_err(AuthError::from)
}

/// Verifies a username/password pair and issues an access token.
///
/// Unknown username and wrong password produce the identical
/// [`AuthError::InvalidLogin`].
pub fn login(
    conn: &Connection,
    keys: &TokenKeys,
    username: &str,
    password: &str,
) -> Result<String, AuthError> {
    let user = find_user_by_username(conn, username)?.ok_or(AuthError::InvalidLogin)?;

    if !verify_password(password, &user.password_hash)? {
        return Err(AuthError::InvalidLogin);
    }

    keys.issue(&user.id, &user.username)
}

/// The authenticate capability: given a bearer token, return the user it
/// proves, or fail closed.
///
/// Verifies the token cryptographically, then confirms the user still
/// exists. A valid token for a deleted account is as unauthenticated as
/// no token at all.
pub fn authenticate(conn: &Connection, keys: &TokenKeys, token: &str) -> Result<User, AuthError> {
    let claims = keys.verify(token)?;
    get_user(conn, &claims.sub)?.ok_or(AuthError::InvalidCredential)
}

fn map_row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        parley_db::run_migrations(&conn).expect("migrations");
        conn
    }

    fn alice() -> NewUser {
        NewUser {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "s3cret-passphrase".to_string(),
        }
    }

    #[test]
    fn register_login_authenticate_flow() {
        let conn = setup();
        let keys = TokenKeys::new("test-secret", 30);

        let user = create_user(&conn, &alice()).expect("create user");
        assert_eq!(user.username, "alice");

        let token = login(&conn, &keys, "alice", "s3cret-passphrase").expect("login");
        let authed = authenticate(&conn, &keys, &token).expect("authenticate");
        assert_eq!(authed.id, user.id);
    }

    #[test]
    fn duplicate_username_rejected() {
        let conn = setup();
        create_user(&conn, &alice()).expect("create user");

        let mut dup = alice();
        dup.email = "other@example.com".to_string();
        assert!(matches!(
            create_user(&conn, &dup),
            Err(AuthError::UsernameTaken)
        ));
    }

    #[test]
    fn duplicate_email_rejected() {
        let conn = setup();
        create_user(&conn, &alice()).expect("create user");

        let mut dup = alice();
        dup.username = "alice2".to_string();
        assert!(matches!(create_user(&conn, &dup), Err(AuthError::EmailTaken)));
    }

    #[test]
    fn wrong_password_and_unknown_user_are_indistinguishable() {
        let conn = setup();
        let keys = TokenKeys::new("test-secret", 30);
        create_user(&conn, &alice()).expect("create user");

        let wrong_pw = login(&conn, &keys, "alice", "nope").unwrap_err();
        let no_user = login(&conn, &keys, "mallory", "nope").unwrap_err();
        assert!(matches!(wrong_pw, AuthError::InvalidLogin));
        assert!(matches!(no_user, AuthError::InvalidLogin));
    }

    #[test]
    fn token_for_deleted_user_fails_closed() {
        let conn = setup();
        let keys = TokenKeys::new("test-secret", 30);
        let user = create_user(&conn, &alice()).expect("create user");
        let token = login(&conn, &keys, "alice", "s3cret-passphrase").expect("login");

        conn.execute("DELETE FROM users WHERE id = ?1", [&user.id])
            .expect("delete user");

        assert!(matches!(
            authenticate(&conn, &keys, &token),
            Err(AuthError::InvalidCredential)
        ));
    }

    #[test]
    fn user_serialization_omits_password_hash() {
        let conn = setup();
        let user = create_user(&conn, &alice()).expect("create user");
        let json = serde_json::to_value(&user).expect("serialize user");
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "alice");
    }
}
