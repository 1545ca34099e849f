//! Bursary repository
//!
//! Mutations are scoped: `WHERE id = $n AND provider_id = $m`. Zero rows
//! affected means "absent or not yours" and the caller cannot tell which.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Bursary, BursaryListing, NewBursary};
use crate::store::StoreError;

/// Bursary repository
pub struct BursaryRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> BursaryRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Open bursaries with provider names, soonest deadline first.
    pub async fn list_open(&self) -> Result<Vec<BursaryListing>, StoreError> {
        let rows = sqlx::query_as::<_, BursaryListing>(
            r#"
            SELECT b.id, b.provider_id, b.title, b.description, b.amount::float8 AS amount,
                   b.deadline, b.status, b.created_at, b.updated_at,
                   u.full_name AS provider_name
            FROM bursaries b
            JOIN users u ON u.id = b.provider_id
            WHERE b.status = 'open'
            ORDER BY b.deadline ASC, b.created_at ASC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn create(&self, provider: Uuid, bursary: NewBursary) -> Result<Bursary, StoreError> {
        let row = sqlx::query_as::<_, Bursary>(
            r#"
            INSERT INTO bursaries (provider_id, title, description, amount, deadline)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, provider_id, title, description, amount::float8 AS amount,
                      deadline, status, created_at, updated_at
            "#,
        )
        .bind(provider)
        .bind(&bursary.title)
        .bind(&bursary.description)
        .bind(bursary.amount)
        .bind(bursary.deadline)
        .fetch_one(self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Bursary>, StoreError> {
        let row = sqlx::query_as::<_, Bursary>(
            r#"
            SELECT id, provider_id, title, description, amount::float8 AS amount,
                   deadline, status, created_at, updated_at
            FROM bursaries
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    pub async fn find_owned(&self, id: Uuid, provider: Uuid) -> Result<Option<Bursary>, StoreError> {
        let row = sqlx::query_as::<_, Bursary>(
            r#"
            SELECT id, provider_id, title, description, amount::float8 AS amount,
                   deadline, status, created_at, updated_at
            FROM bursaries
            WHERE id = $1 AND provider_id = $2
            "#,
        )
        .bind(id)
        .bind(provider)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Persist all mutable fields, still filtered by owner.
    pub async fn save(&self, provider: Uuid, bursary: &Bursary) -> Result<Option<Bursary>, StoreError> {
        let row = sqlx::query_as::<_, Bursary>(
            r#"
            UPDATE bursaries
            SET title = $1,
                description = $2,
                amount = $3,
                deadline = $4,
                status = $5,
                updated_at = NOW()
            WHERE id = $6 AND provider_id = $7
            RETURNING id, provider_id, title, description, amount::float8 AS amount,
                      deadline, status, created_at, updated_at
            "#,
        )
        .bind(&bursary.title)
        .bind(&bursary.description)
        .bind(bursary.amount)
        .bind(bursary.deadline)
        .bind(bursary.status.as_str())
        .bind(bursary.id)
        .bind(provider)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Unconditional close; closing twice is fine.
    pub async fn close(&self, id: Uuid, provider: Uuid) -> Result<Option<Bursary>, StoreError> {
        let row = sqlx::query_as::<_, Bursary>(
            r#"
            UPDATE bursaries
            SET status = 'closed', updated_at = NOW()
            WHERE id = $1 AND provider_id = $2
            RETURNING id, provider_id, title, description, amount::float8 AS amount,
                      deadline, status, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(provider)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }
}
