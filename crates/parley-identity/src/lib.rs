//! Identity guard for the Parley backend.
//!
//! Owns user registration, password verification, and bearer-token
//! issue/verify. The rest of the system consumes exactly one capability
//! from this crate: given a token, return an authenticated user or fail
//! closed. No operation below the guard accepts an unauthenticated caller.

mod password;
mod token;
mod users;

pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenKeys};
pub use users::{
    authenticate, create_user, find_user_by_username, get_user, login, NewUser, User,
};

use thiserror::Error;

/// Errors that can occur during authentication and account management.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The presented credential is malformed, expired, or references an
    /// unknown user. All three look the same to the caller.
    #[error("invalid credential")]
    InvalidCredential,

    /// Login failed: unknown username or wrong password, reported
    /// identically to avoid confirming which usernames exist.
    #[error("incorrect username or password")]
    InvalidLogin,

    /// The username is already registered.
    #[error("username already registered")]
    UsernameTaken,

    /// The email is already registered.
    #[error("email already registered")]
    EmailTaken,

    /// Password hashing or verification failed internally.
    #[error("password hashing error: {0}")]
    Hash(String),

    /// Token encoding failed internally.
    #[error("token encoding error: {0}")]
    Token(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}
