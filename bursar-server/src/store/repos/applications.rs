//! Application and document repository
//!
//! Provider-side operations reach the application through its bursary, so
//! the ownership predicate is a join condition rather than a second query.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    Application, ApplicationDocument, ApplicationStatus, LearnerApplication, Motivation,
    NewDocument, ProviderApplication,
};
use crate::store::StoreError;

/// Application repository
pub struct ApplicationRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ApplicationRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        learner: Uuid,
        bursary_id: Uuid,
        motivation: Motivation,
    ) -> Result<Application, StoreError> {
        let row = sqlx::query_as::<_, Application>(
            r#"
            INSERT INTO applications (bursary_id, learner_id, motivation)
            VALUES ($1, $2, $3)
            RETURNING id, bursary_id, learner_id, motivation, status, created_at, updated_at
            "#,
        )
        .bind(bursary_id)
        .bind(learner)
        .bind(motivation.as_str())
        .fetch_one(self.pool)
        .await?;

        Ok(row)
    }

    pub async fn find_owned(&self, id: Uuid, learner: Uuid) -> Result<Option<Application>, StoreError> {
        let row = sqlx::query_as::<_, Application>(
            r#"
            SELECT id, bursary_id, learner_id, motivation, status, created_at, updated_at
            FROM applications
            WHERE id = $1 AND learner_id = $2
            "#,
        )
        .bind(id)
        .bind(learner)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_for_learner(&self, learner: Uuid) -> Result<Vec<LearnerApplication>, StoreError> {
        let rows = sqlx::query_as::<_, LearnerApplication>(
            r#"
            SELECT a.id, a.bursary_id, a.status, a.created_at, a.updated_at,
                   b.title AS bursary_title
            FROM applications a
            JOIN bursaries b ON b.id = a.bursary_id
            WHERE a.learner_id = $1
            ORDER BY a.created_at DESC
            "#,
        )
        .bind(learner)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn list_for_bursary(
        &self,
        provider: Uuid,
        bursary_id: Uuid,
    ) -> Result<Vec<ProviderApplication>, StoreError> {
        let rows = sqlx::query_as::<_, ProviderApplication>(
            r#"
            SELECT a.id, a.motivation, a.status, a.created_at,
                   u.id AS learner_id, u.full_name, u.email
            FROM applications a
            JOIN users u ON u.id = a.learner_id
            JOIN bursaries b ON b.id = a.bursary_id
            WHERE b.provider_id = $1 AND b.id = $2
            ORDER BY a.created_at DESC
            "#,
        )
        .bind(provider)
        .bind(bursary_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Single UPDATE ... FROM: the row only matches when the caller owns
    /// the parent bursary.
    pub async fn set_status(
        &self,
        provider: Uuid,
        id: Uuid,
        status: ApplicationStatus,
    ) -> Result<Option<Application>, StoreError> {
        let row = sqlx::query_as::<_, Application>(
            r#"
            UPDATE applications a
            SET status = $1, updated_at = NOW()
            FROM bursaries b
            WHERE a.id = $2
              AND b.id = a.bursary_id
              AND b.provider_id = $3
            RETURNING a.id, a.bursary_id, a.learner_id, a.motivation, a.status,
                      a.created_at, a.updated_at
            "#,
        )
        .bind(status.as_str())
        .bind(id)
        .bind(provider)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    pub async fn create_document(&self, document: NewDocument) -> Result<ApplicationDocument, StoreError> {
        let row = sqlx::query_as::<_, ApplicationDocument>(
            r#"
            INSERT INTO application_documents
                (application_id, original_file_name, storage_file_name, mime_type, size_bytes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, application_id, original_file_name, storage_file_name,
                      mime_type, size_bytes, created_at
            "#,
        )
        .bind(document.application_id)
        .bind(&document.original_file_name)
        .bind(&document.storage_file_name)
        .bind(&document.mime_type)
        .bind(document.size_bytes)
        .fetch_one(self.pool)
        .await?;

        Ok(row)
    }

    /// Visibility predicate evaluated by the database: rows the viewer may
    /// not see never leave it.
    pub async fn list_visible_documents(
        &self,
        application_id: Uuid,
        viewer: Uuid,
    ) -> Result<Vec<ApplicationDocument>, StoreError> {
        let rows = sqlx::query_as::<_, ApplicationDocument>(
            r#"
            SELECT d.id, d.application_id, d.original_file_name, d.storage_file_name,
                   d.mime_type, d.size_bytes, d.created_at
            FROM application_documents d
            JOIN applications a ON a.id = d.application_id
            JOIN bursaries b ON b.id = a.bursary_id
            WHERE d.application_id = $1
              AND (a.learner_id = $2 OR b.provider_id = $2)
            ORDER BY d.created_at DESC
            "#,
        )
        .bind(application_id)
        .bind(viewer)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}
