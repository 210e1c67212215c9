//! User accounts and password checks
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension, Row};
use sha2::{Digest, Sha256};

use crate::db;
use crate::error::{Error, Result};
use crate::model::User;

const USER_COLUMNS: &str = "user_id, username, fname, hashed_password, salt";

fn from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        user_id: row.get(0)?,
        username: row.get(1)?,
        fname: row.get(2)?,
        hashed_password: row.get(3)?,
        salt: row.get(4)?,
    })
}

/// `N` random bytes, hex encoded; salts and session tokens
pub fn random_hex<const N: usize>() -> String {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill(&mut bytes[..]);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// SHA-256 over salt and password, hex encoded
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Create and return a new user
pub fn create_user(
    conn: &Connection,
    username: &str,
    fname: Option<&str>,
    password: &str,
) -> Result<User> {
    let username = username.trim();
    if username.is_empty() {
        return Err(Error::InvalidInput("username is required".into()));
    }
    if password.is_empty() {
        return Err(Error::InvalidInput("password is required".into()));
    }
    if does_user_exist_already(conn, username)? {
        return Err(Error::UsernameTaken(username.to_string()));
    }

    let salt = random_hex::<16>();
    let hashed_password = hash_password(password, &salt);
    let fname = fname.map(str::trim).filter(|f| !f.is_empty());

    conn.execute(
        "INSERT INTO users (username, fname, hashed_password, salt) VALUES (?1, ?2, ?3, ?4)",
        params![username, fname, hashed_password, salt],
    )?;

    Ok(User {
        user_id: conn.last_insert_rowid(),
        username: username.to_string(),
        fname: fname.map(str::to_string),
        hashed_password,
        salt,
    })
}

pub fn get_users(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY user_id"))?;
    let users = stmt
        .query_map([], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(users)
}

pub fn get_user_by_id(conn: &Connection, user_id: i64) -> Result<Option<User>> {
    Ok(conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
            [user_id],
            from_row,
        )
        .optional()?)
}

pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    Ok(conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            [username.trim()],
            from_row,
        )
        .optional()?)
}

pub fn does_user_exist_already(conn: &Connection, username: &str) -> Result<bool> {
    db::exists(
        conn,
        "SELECT 1 FROM users WHERE username = ?1",
        [username.trim()],
    )
}

pub fn does_password_match(user: &User, plain_text_password: &str) -> bool {
    let candidate = hash_password(plain_text_password, &user.salt);
    // Constant time over the whole digest
    candidate.len() == user.hashed_password.len()
        && candidate
            .bytes()
            .zip(user.hashed_password.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// Looks up the user and checks the password in one go
pub fn authenticate(conn: &Connection, username: &str, password: &str) -> Result<User> {
    let user = get_user_by_username(conn, username)?
        .ok_or_else(|| Error::Unauthorized("No one with that username found.".into()))?;
    if does_password_match(&user, password) {
        Ok(user)
    } else {
        Err(Error::Unauthorized("Oops, password didn't match.".into()))
    }
}

pub fn count_users(conn: &Connection) -> Result<i64> {
    db::get_count(conn, "users", "user_id", true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_lookup() {
        let conn = db::open_in_memory().unwrap();
        let user = create_user(&conn, "dj_fan", Some("Pat"), "hunter2").unwrap();

        assert_eq!(user.username, "dj_fan");
        assert_ne!(user.hashed_password, "hunter2");

        let found = get_user_by_username(&conn, "dj_fan").unwrap().unwrap();
        assert_eq!(found.user_id, user.user_id);
        assert_eq!(found.fname.as_deref(), Some("Pat"));
        assert_eq!(count_users(&conn).unwrap(), 1);
    }

    #[test]
    fn test_duplicate_username() {
        let conn = db::open_in_memory().unwrap();
        create_user(&conn, "dj_fan", None, "a").unwrap();
        let err = create_user(&conn, "dj_fan", None, "b").unwrap_err();
        assert!(matches!(err, Error::UsernameTaken(_)));
    }

    #[test]
    fn test_password_match() {
        let conn = db::open_in_memory().unwrap();
        let user = create_user(&conn, "dj_fan", None, "hunter2").unwrap();

        assert!(does_password_match(&user, "hunter2"));
        assert!(!does_password_match(&user, "hunter3"));
        assert!(authenticate(&conn, "dj_fan", "hunter2").is_ok());
        assert!(matches!(
            authenticate(&conn, "dj_fan", "nope"),
            Err(Error::Unauthorized(_))
        ));
        assert!(matches!(
            authenticate(&conn, "nobody", "hunter2"),
            Err(Error::Unauthorized(_))
        ));
    }

    #[test]
    fn test_salts_differ() {
        let conn = db::open_in_memory().unwrap();
        let a = create_user(&conn, "a", None, "same").unwrap();
        let b = create_user(&conn, "b", None, "same").unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.hashed_password, b.hashed_password);
    }

    #[test]
    fn test_empty_username_rejected() {
        let conn = db::open_in_memory().unwrap();
        assert!(matches!(
            create_user(&conn, "  ", None, "pw"),
            Err(Error::InvalidInput(_))
        ));
    }
}
