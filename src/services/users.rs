// src/services/users.rs
use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::auth::models::User;
use crate::common::{generate_user_id, safe_email_log};
use crate::services::identity_provider::ProviderProfile;

/// Upper bound on reconcile attempts when a generated id collides
pub const MAX_RECONCILE_ATTEMPTS: usize = 3;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("user account is deactivated")]
    Deactivated,

    #[error("could not allocate a user id after {0} attempts")]
    RetriesExhausted(usize),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct UserService {
    db: SqlitePool,
}

impl UserService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create or update the local user for a provider profile, keyed by email.
    ///
    /// A single upsert statement: the unique email index decides between insert
    /// and update, so concurrent first sign-ins for one email converge on one row.
    /// Only the display name and update time change for an existing user.
    pub async fn reconcile(&self, profile: &ProviderProfile) -> Result<User, ReconcileError> {
        self.reconcile_with(profile, generate_user_id).await
    }

    async fn reconcile_with<F>(
        &self,
        profile: &ProviderProfile,
        mut next_id: F,
    ) -> Result<User, ReconcileError>
    where
        F: FnMut() -> String,
    {
        for attempt in 1..=MAX_RECONCILE_ATTEMPTS {
            let candidate_id = next_id();
            let now = Utc::now().to_rfc3339();

            let result = sqlx::query_as::<_, User>(
                r#"
                INSERT INTO users (id, email, name, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(email) DO UPDATE SET
                    name = excluded.name,
                    updated_at = excluded.updated_at
                WHERE users.deleted_at IS NULL
                RETURNING id, email, name, created_at, updated_at, deleted_at
                "#,
            )
            .bind(&candidate_id)
            .bind(&profile.email)
            .bind(&profile.name)
            .bind(&now)
            .bind(&now)
            .fetch_optional(&self.db)
            .await;

            match result {
                Ok(Some(user)) => {
                    if user.id == candidate_id {
                        info!(
                            user_id = %user.id,
                            email = %safe_email_log(&user.email),
                            "New user created"
                        );
                    } else {
                        info!(
                            user_id = %user.id,
                            email = %safe_email_log(&user.email),
                            "Existing user updated"
                        );
                    }
                    return Ok(user);
                }
                Ok(None) => {
                    warn!(
                        email = %safe_email_log(&profile.email),
                        "Sign-in refused for deactivated user"
                    );
                    return Err(ReconcileError::Deactivated);
                }
                Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                    warn!(
                        attempt = attempt,
                        candidate_id = %candidate_id,
                        "User id collision during reconcile, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ReconcileError::RetriesExhausted(MAX_RECONCILE_ATTEMPTS))
    }

    pub async fn find_by_id(&self, user_id: &str) -> Result<Option<User>, sqlx::Error> {
        debug!(user_id = %user_id, "Looking up user by id");

        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, created_at, updated_at, deleted_at
            FROM users
            WHERE id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
    }

    #[cfg(test)]
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, created_at, updated_at, deleted_at
            FROM users
            WHERE email = ? AND deleted_at IS NULL
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::migrations::{create_schema, setup_test_db};
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;

    fn profile(email: &str, name: &str) -> ProviderProfile {
        ProviderProfile {
            email: email.to_string(),
            name: name.to_string(),
        }
    }

    async fn count_users(pool: &SqlitePool, email: &str) -> i64 {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(pool)
            .await
            .unwrap();
        count
    }

    #[tokio::test]
    async fn test_first_sign_in_creates_user() {
        let pool = setup_test_db().await;
        let service = UserService::new(pool.clone());

        let user = service.reconcile(&profile("a@b.com", "A B")).await.unwrap();

        assert!(user.id.starts_with("U_"));
        assert_eq!(user.email, "a@b.com");
        assert_eq!(user.name, "A B");
        assert_eq!(user.created_at, user.updated_at);
        assert!(user.deleted_at.is_none());
        assert_eq!(count_users(&pool, "a@b.com").await, 1);
    }

    #[tokio::test]
    async fn test_second_sign_in_updates_name_only() {
        let pool = setup_test_db().await;
        let service = UserService::new(pool.clone());

        let first = service.reconcile(&profile("a@b.com", "A B")).await.unwrap();
        let second = service.reconcile(&profile("a@b.com", "A B2")).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.email, first.email);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.name, "A B2");
        assert_eq!(count_users(&pool, "a@b.com").await, 1);

        let stored = service.find_by_id(&first.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "A B2");
    }

    #[tokio::test]
    async fn test_email_match_ignores_case_and_keeps_original_email() {
        let pool = setup_test_db().await;
        let service = UserService::new(pool);

        let first = service.reconcile(&profile("a@b.com", "A")).await.unwrap();
        let second = service.reconcile(&profile("A@B.COM", "A2")).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.email, "a@b.com");
    }

    #[tokio::test]
    async fn test_deactivated_user_is_refused_and_untouched() {
        let pool = setup_test_db().await;
        let service = UserService::new(pool.clone());

        let user = service.reconcile(&profile("gone@b.com", "Gone")).await.unwrap();
        sqlx::query("UPDATE users SET deleted_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(&user.id)
            .execute(&pool)
            .await
            .unwrap();

        let result = service.reconcile(&profile("gone@b.com", "Back")).await;
        assert!(matches!(result, Err(ReconcileError::Deactivated)));

        let (name,): (String,) = sqlx::query_as("SELECT name FROM users WHERE id = ?")
            .bind(&user.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(name, "Gone");
        assert!(service.find_by_email("gone@b.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_id_collision_is_retried() {
        let pool = setup_test_db().await;
        let service = UserService::new(pool.clone());

        let existing = service.reconcile(&profile("first@b.com", "First")).await.unwrap();

        let mut ids = vec![existing.id.clone(), "U_FRESH0000001".to_string()].into_iter();
        let user = service
            .reconcile_with(&profile("second@b.com", "Second"), move || {
                ids.next().unwrap()
            })
            .await
            .unwrap();

        assert_eq!(user.id, "U_FRESH0000001");
        assert_eq!(user.email, "second@b.com");
    }

    #[tokio::test]
    async fn test_id_collision_retries_are_bounded() {
        let pool = setup_test_db().await;
        let service = UserService::new(pool.clone());

        let existing = service.reconcile(&profile("first@b.com", "First")).await.unwrap();
        let taken = existing.id.clone();

        let mut calls = 0;
        let result = service
            .reconcile_with(&profile("second@b.com", "Second"), || {
                calls += 1;
                taken.clone()
            })
            .await;

        assert!(matches!(
            result,
            Err(ReconcileError::RetriesExhausted(MAX_RECONCILE_ATTEMPTS))
        ));
        assert_eq!(calls, MAX_RECONCILE_ATTEMPTS);
        assert_eq!(count_users(&pool, "second@b.com").await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_first_sign_in_creates_one_user() {
        // A real file so several pooled connections share one database
        let path = std::env::temp_dir().join(format!("reconcile-{}.db", uuid::Uuid::new_v4()));
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))
            .unwrap()
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .unwrap();
        create_schema(&pool).await.unwrap();

        let service = UserService::new(pool.clone());
        let mut handles = Vec::new();
        for i in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service
                    .reconcile(&profile("race@b.com", &format!("Racer {}", i)))
                    .await
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }

        assert_eq!(count_users(&pool, "race@b.com").await, 1);
        assert!(ids.iter().all(|id| id == &ids[0]));

        pool.close().await;
        let _ = std::fs::remove_file(&path);
    }
}
