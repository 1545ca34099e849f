//! Follow graph, posts and likes
//!
//! Edge inserts use ON CONFLICT DO NOTHING so repeating a follow or like is
//! a no-op rather than a unique violation.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{FeedPost, Post, PostContent, UserSummary};
use crate::store::StoreError;

/// Social graph repository
pub struct SocialRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> SocialRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn follow(&self, follower: Uuid, following: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO follows (follower_id, following_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(follower)
        .bind(following)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    pub async fn unfollow(&self, follower: Uuid, following: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
            .bind(follower)
            .bind(following)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    pub async fn following(&self, user: Uuid) -> Result<Vec<UserSummary>, StoreError> {
        let rows = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.full_name, u.role, u.avatar_url
            FROM follows f
            JOIN users u ON u.id = f.following_id
            WHERE f.follower_id = $1
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn followers(&self, user: Uuid) -> Result<Vec<UserSummary>, StoreError> {
        let rows = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.full_name, u.role, u.avatar_url
            FROM follows f
            JOIN users u ON u.id = f.follower_id
            WHERE f.following_id = $1
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn create_post(&self, author: Uuid, content: PostContent) -> Result<Post, StoreError> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (author_id, content)
            VALUES ($1, $2)
            RETURNING id, author_id, content, created_at, updated_at
            "#,
        )
        .bind(author)
        .bind(content.as_str())
        .fetch_one(self.pool)
        .await?;

        Ok(post)
    }

    pub async fn post_exists(&self, id: Uuid) -> Result<bool, StoreError> {
        let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)")
            .bind(id)
            .fetch_one(self.pool)
            .await?;

        Ok(exists.0)
    }

    /// Feed with like counters from a single aggregate query (no per-post
    /// lookups).
    pub async fn feed(&self, viewer: Uuid, limit: usize) -> Result<Vec<FeedPost>, StoreError> {
        let rows = sqlx::query_as::<_, FeedPost>(
            r#"
            SELECT p.id, p.author_id, p.content, p.created_at, p.updated_at,
                   u.full_name AS author_name, u.avatar_url,
                   COUNT(pl.user_id) AS likes_count,
                   COALESCE(BOOL_OR(pl.user_id = $1), FALSE) AS liked_by_me
            FROM posts p
            JOIN users u ON u.id = p.author_id
            LEFT JOIN post_likes pl ON pl.post_id = p.id
            WHERE p.author_id = $1
               OR p.author_id IN (SELECT following_id FROM follows WHERE follower_id = $1)
            GROUP BY p.id, u.full_name, u.avatar_url
            ORDER BY p.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(viewer)
        .bind(limit as i64)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn like(&self, user: Uuid, post: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO post_likes (user_id, post_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user)
        .bind(post)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    pub async fn unlike(&self, user: Uuid, post: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM post_likes WHERE user_id = $1 AND post_id = $2")
            .bind(user)
            .bind(post)
            .execute(self.pool)
            .await?;

        Ok(())
    }
}
