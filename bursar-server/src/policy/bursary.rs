//! Bursary listing and provider-side management

use uuid::Uuid;

use super::{PolicyError, PolicyResult};
use crate::auth::Identity;
use crate::models::{parse_deadline, Bursary, BursaryChanges, BursaryListing, NewBursary};
use crate::store::Store;

/// Raw bursary fields as received; every field optional until validated
#[derive(Debug, Clone, Default)]
pub struct BursaryInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub deadline: Option<String>,
    pub status: Option<String>,
}

pub struct BursaryPolicy<'a> {
    store: &'a dyn Store,
}

impl<'a> BursaryPolicy<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Public listing of open bursaries, earliest deadline first.
    pub async fn list(&self) -> PolicyResult<Vec<BursaryListing>> {
        Ok(self.store.list_open_bursaries().await?)
    }

    pub async fn create(&self, provider: Identity, input: BursaryInput) -> PolicyResult<Bursary> {
        let new = NewBursary::new(
            input.title,
            input.description,
            input.amount,
            parse_deadline(input.deadline)?,
        )?;
        let bursary = self.store.insert_bursary(provider.subject, new).await?;
        tracing::info!(bursary_id = %bursary.id, provider = %provider.subject, "bursary created");
        Ok(bursary)
    }

    /// Merge a partial update onto a bursary the caller owns.
    pub async fn update(
        &self,
        provider: Identity,
        id: Uuid,
        input: BursaryInput,
    ) -> PolicyResult<Bursary> {
        let changes = BursaryChanges::new(
            input.title,
            input.description,
            input.amount,
            parse_deadline(input.deadline)?,
            input.status.as_deref(),
        )?;

        let Some(current) = self.store.find_owned_bursary(id, provider.subject).await? else {
            tracing::debug!(bursary_id = %id, provider = %provider.subject, "update on unowned or missing bursary");
            return Err(PolicyError::not_found("Bursary"));
        };

        let merged = changes.apply(current);
        self.store
            .save_bursary(provider.subject, &merged)
            .await?
            .ok_or_else(|| PolicyError::not_found("Bursary"))
    }

    /// Close a bursary. Closing an already closed bursary succeeds.
    pub async fn close(&self, provider: Identity, id: Uuid) -> PolicyResult<Bursary> {
        let closed = self.store.close_bursary(id, provider.subject).await?;
        closed.ok_or_else(|| {
            tracing::debug!(bursary_id = %id, provider = %provider.subject, "close on unowned or missing bursary");
            PolicyError::not_found("Bursary")
        })
    }
}
