//! Credential store: user rows and their Argon2 hashes.

use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;
use tracing::{info, warn};

use super::password::{hash_password, verify_dummy, verify_password};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

impl User {
    pub async fn find_by_id(db: &SqlitePool, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_username(db: &SqlitePool, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, created_at
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Hash `password` and insert a new user. A taken username is reported
    /// as [`AppError::DuplicateUsername`] straight from the unique index.
    pub async fn create(db: &SqlitePool, username: &str, password: &str) -> Result<User> {
        let hash = hash_password(password)?;
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, created_at)
            VALUES (?, ?, ?)
            RETURNING id, username, password_hash, created_at
            "#,
        )
        .bind(username)
        .bind(&hash)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                warn!(%username, "username already registered");
                AppError::DuplicateUsername
            }
            other => AppError::Database(other),
        })?;

        info!(user_id = user.id, username = %user.username, "user created");
        Ok(user)
    }

    /// The user whose stored hash matches `password`. Unknown usernames and
    /// wrong passwords are indistinguishable to the caller.
    pub async fn verify(db: &SqlitePool, username: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = Self::find_by_username(db, username).await? else {
            verify_dummy(password);
            return Ok(None);
        };
        if verify_password(password, &user.password_hash)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn create_stores_hash_not_plaintext() {
        let db = test_pool().await;
        let user = User::create(&db, "alice", "password123").await.unwrap();
        assert_eq!(user.username, "alice");
        assert_ne!(user.password_hash, "password123");
        assert!(user.password_hash.starts_with("$argon2"));

        let found = User::find_by_id(&db, user.id).await.unwrap().unwrap();
        assert_eq!(found.username, "alice");
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected_without_second_row() {
        let db = test_pool().await;
        User::create(&db, "alice", "password123").await.unwrap();
        let err = User::create(&db, "alice", "another-password").await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateUsername));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = 'alice'")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn verify_matches_only_the_right_password() {
        let db = test_pool().await;
        let alice = User::create(&db, "alice", "password123").await.unwrap();

        let ok = User::verify(&db, "alice", "password123").await.unwrap();
        assert_eq!(ok.map(|u| u.id), Some(alice.id));

        assert!(User::verify(&db, "alice", "password124").await.unwrap().is_none());
        assert!(User::verify(&db, "mallory", "password123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn usernames_are_case_sensitive() {
        let db = test_pool().await;
        User::create(&db, "alice", "password123").await.unwrap();
        User::create(&db, "Alice", "password123").await.unwrap();
        assert!(User::verify(&db, "ALICE", "password123").await.unwrap().is_none());
    }
}
