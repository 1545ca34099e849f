//! User repository
//!
//! Emails are stored lowercased; uniqueness comes from the LOWER(email) index.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Credentials, Email, NewUser, ProfileStats, User};
use crate::store::StoreError;

/// User repository
pub struct UserRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new user. A taken email surfaces as `StoreError::Conflict`.
    pub async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (full_name, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, full_name, email, role, bio, institution, field_of_study,
                      avatar_url, created_at, updated_at
            "#,
        )
        .bind(&user.full_name)
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(self.pool)
        .await?;

        Ok(row)
    }

    pub async fn find_credentials(&self, email: &Email) -> Result<Option<Credentials>, StoreError> {
        let row = sqlx::query_as::<_, Credentials>(
            r#"
            SELECT id, full_name, email, role, bio, institution, field_of_study,
                   avatar_url, created_at, updated_at, password_hash
            FROM users
            WHERE LOWER(email) = $1
            "#,
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, User>(
            r#"
            SELECT id, full_name, email, role, bio, institution, field_of_study,
                   avatar_url, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Write the editable profile fields. Email and role are never touched.
    pub async fn save_profile(&self, user: &User) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET full_name = $1,
                bio = $2,
                institution = $3,
                field_of_study = $4,
                avatar_url = $5,
                updated_at = NOW()
            WHERE id = $6
            RETURNING id, full_name, email, role, bio, institution, field_of_study,
                      avatar_url, created_at, updated_at
            "#,
        )
        .bind(&user.full_name)
        .bind(user.bio.as_deref())
        .bind(user.institution.as_deref())
        .bind(user.field_of_study.as_deref())
        .bind(user.avatar_url.as_deref())
        .bind(user.id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Three independent aggregates in one round trip.
    pub async fn stats(&self, id: Uuid) -> Result<ProfileStats, StoreError> {
        let stats = sqlx::query_as::<_, ProfileStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM follows WHERE following_id = $1) AS followers_count,
                (SELECT COUNT(*) FROM follows WHERE follower_id = $1) AS following_count,
                (SELECT COUNT(*) FROM posts WHERE author_id = $1) AS posts_count
            "#,
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;

        Ok(stats)
    }
}
