// src/common/migrations.rs
//! Database migration and schema management

use sqlx::SqlitePool;
use std::env;
use tracing::{info, warn};

use super::id_generator::{generate_post_id, generate_user_id};

/// Users created by `SEED_DB=true`
pub const SEED_USERS: usize = 10;

/// Posts created for every seeded user
pub const SEED_POSTS_PER_USER: usize = 5;

/// Rows written by one seeding run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub posts: usize,
}

/// Run all database migrations
///
/// Tables are created if missing. Setting `RESET_DB=true` drops them first.
/// `SEED_DB=true` then fills in sample users and posts unless
/// `APP_ENV=production`.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let should_reset_db = env::var("RESET_DB").unwrap_or_else(|_| "false".to_string()) == "true";

    if should_reset_db {
        warn!("RESET_DB=true - dropping all tables and recreating schema");
        drop_all_tables(pool).await?;
        info!("Dropped old tables");
    }

    create_schema(pool).await?;

    info!("Database migration completed successfully");

    let should_seed_db = env::var("SEED_DB").unwrap_or_else(|_| "false".to_string()) == "true";
    if should_seed_db {
        let app_env = env::var("APP_ENV").ok();
        if seeding_allowed(app_env.as_deref()) {
            seed(pool, SEED_USERS, SEED_POSTS_PER_USER).await?;
        } else {
            warn!("SEED_DB=true ignored - refusing to seed when APP_ENV=production");
        }
    }

    Ok(())
}

/// Sample data never goes into a production database
pub fn seeding_allowed(app_env: Option<&str>) -> bool {
    !matches!(app_env, Some(env) if env.trim().eq_ignore_ascii_case("production"))
}

/// Insert `users` sample users with `posts_per_user` posts each.
///
/// Every second post is private. Runs in one transaction.
pub async fn seed(
    pool: &SqlitePool,
    users: usize,
    posts_per_user: usize,
) -> Result<SeedSummary, sqlx::Error> {
    info!(users, posts_per_user, "Seeding database");

    let mut tx = pool.begin().await?;
    let now = chrono::Utc::now().to_rfc3339();

    for n in 1..=users {
        let user_id = generate_user_id();
        let email = format!("seed-{}@example.com", user_id.to_lowercase());

        sqlx::query(
            "INSERT INTO users (id, email, name, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user_id)
        .bind(&email)
        .bind(format!("Sample User {}", n))
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        for i in 0..posts_per_user {
            sqlx::query(
                r#"
                INSERT INTO posts (id, content, caption, is_public, user_id, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(generate_post_id())
            .bind(format!("Sample post {} from user {}", i + 1, n))
            .bind(format!("Caption {}", i + 1))
            .bind(i % 2 == 0)
            .bind(&user_id)
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;

    let summary = SeedSummary {
        users,
        posts: users * posts_per_user,
    };
    info!(users = summary.users, posts = summary.posts, "Database seeded");
    Ok(summary)
}

/// Create tables and indexes without touching existing data
pub async fn create_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    create_user_tables(pool).await?;
    create_post_tables(pool).await?;
    create_indexes(pool).await?;
    Ok(())
}

async fn drop_all_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Reverse dependency order
    for table in ["posts", "users"] {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await?;
    }

    Ok(())
}

async fn create_user_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE COLLATE NOCASE,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_post_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS posts (
            id TEXT PRIMARY KEY,
            content TEXT NOT NULL,
            caption TEXT NOT NULL DEFAULT '',
            is_public INTEGER NOT NULL DEFAULT 1,
            user_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_users_deleted_at ON users(deleted_at)",
        "CREATE INDEX IF NOT EXISTS idx_posts_user_id ON posts(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_posts_deleted_at ON posts(deleted_at)",
    ];

    for statement in indexes {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

#[cfg(test)]
pub(crate) async fn setup_test_db() -> SqlitePool {
    use sqlx::sqlite::SqlitePoolOptions;

    // A single connection: every `sqlite::memory:` connection is its own database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    create_schema(&pool).await.unwrap();
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let pool = setup_test_db().await;
        create_schema(&pool).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'posts') ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        assert_eq!(
            tables.into_iter().map(|(n,)| n).collect::<Vec<_>>(),
            vec!["posts".to_string(), "users".to_string()]
        );
    }

    #[tokio::test]
    async fn test_seed_inserts_users_and_alternating_posts() {
        let pool = setup_test_db().await;

        let summary = seed(&pool, SEED_USERS, SEED_POSTS_PER_USER).await.unwrap();
        assert_eq!(summary, SeedSummary { users: 10, posts: 50 });

        let (users,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        let (public,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts WHERE is_public = 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        let (private,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts WHERE is_public = 0")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert_eq!(users, 10);
        // Posts 1, 3 and 5 of every user are public
        assert_eq!(public, 30);
        assert_eq!(private, 20);

        let (prefixed,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE substr(id, 1, 2) = 'U_'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(prefixed, 10);
    }

    #[test]
    fn test_seeding_refused_in_production() {
        assert!(seeding_allowed(None));
        assert!(seeding_allowed(Some("development")));
        assert!(!seeding_allowed(Some("production")));
        assert!(!seeding_allowed(Some("Production")));
    }

    #[tokio::test]
    async fn test_email_is_unique_case_insensitively() {
        let pool = setup_test_db().await;
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query("INSERT INTO users (id, email, name, created_at, updated_at) VALUES (?, ?, ?, ?, ?)")
            .bind("U_1")
            .bind("a@b.com")
            .bind("A")
            .bind(&now)
            .bind(&now)
            .execute(&pool)
            .await
            .unwrap();

        let duplicate = sqlx::query(
            "INSERT INTO users (id, email, name, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind("U_2")
        .bind("A@B.COM")
        .bind("A")
        .bind(&now)
        .bind(&now)
        .execute(&pool)
        .await;

        assert!(duplicate.is_err());
    }
}
