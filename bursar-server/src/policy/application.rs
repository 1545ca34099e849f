//! Applications, their status and supporting documents

use uuid::Uuid;

use super::{PolicyError, PolicyResult};
use crate::auth::Identity;
use crate::models::validation::required;
use crate::models::{
    Application, ApplicationDocument, ApplicationStatus, BursaryStatus, LearnerApplication,
    Motivation, NewDocument, ProviderApplication,
};
use crate::store::Store;
use crate::uploads::{DocumentStore, IncomingFile};

pub struct ApplicationPolicy<'a> {
    store: &'a dyn Store,
}

impl<'a> ApplicationPolicy<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Apply to an open bursary. Repeat applications are allowed.
    pub async fn apply(
        &self,
        learner: Identity,
        bursary_id: Option<Uuid>,
        motivation: Option<String>,
    ) -> PolicyResult<Application> {
        let bursary_id = required(bursary_id, "bursaryId")?;
        let motivation = Motivation::new(motivation)?;

        let Some(bursary) = self.store.get_bursary(bursary_id).await? else {
            return Err(PolicyError::not_found("Bursary"));
        };
        if bursary.status != BursaryStatus::Open {
            return Err(PolicyError::InvalidState("Bursary is not accepting applications"));
        }

        let application = self
            .store
            .insert_application(learner.subject, bursary_id, motivation)
            .await?;
        tracing::info!(application_id = %application.id, %bursary_id, "application submitted");
        Ok(application)
    }

    /// Attach a document to one of the caller's applications.
    ///
    /// The file is validated before the ownership lookup and written only
    /// once ownership is confirmed. If the metadata insert fails the file is
    /// removed again.
    pub async fn upload_document(
        &self,
        learner: Identity,
        application_id: Uuid,
        file: Option<IncomingFile>,
        documents: &DocumentStore,
    ) -> PolicyResult<ApplicationDocument> {
        let file = documents.validate(file.as_ref()).map_err(|e| {
            tracing::warn!(%application_id, error = %e, "document rejected");
            e
        })?;

        if self
            .store
            .find_owned_application(application_id, learner.subject)
            .await?
            .is_none()
        {
            return Err(PolicyError::not_found("Application"));
        }

        let stored = documents.save(file).await?;
        let inserted = self
            .store
            .insert_document(NewDocument {
                application_id,
                original_file_name: file.original_name.clone(),
                storage_file_name: stored.storage_name.clone(),
                mime_type: file.mime_type.clone(),
                size_bytes: file.size() as i64,
            })
            .await;

        match inserted {
            Ok(document) => Ok(document),
            Err(e) => {
                documents.remove(&stored).await;
                Err(e.into())
            }
        }
    }

    pub async fn list_mine(&self, learner: Identity) -> PolicyResult<Vec<LearnerApplication>> {
        Ok(self.store.list_learner_applications(learner.subject).await?)
    }

    /// Applications to a bursary the caller owns; empty for anyone else.
    pub async fn list_for_provider(
        &self,
        provider: Identity,
        bursary_id: Uuid,
    ) -> PolicyResult<Vec<ProviderApplication>> {
        Ok(self
            .store
            .list_bursary_applications(provider.subject, bursary_id)
            .await?)
    }

    pub async fn update_status(
        &self,
        provider: Identity,
        application_id: Uuid,
        status: Option<String>,
    ) -> PolicyResult<Application> {
        let status: ApplicationStatus = required(status, "status")?.parse()?;

        let updated = self
            .store
            .set_application_status(provider.subject, application_id, status)
            .await?;
        updated.ok_or_else(|| {
            tracing::debug!(%application_id, provider = %provider.subject, "status update outside provider's bursaries");
            PolicyError::not_found("Application")
        })
    }

    /// Documents visible to the caller: the applying learner or the
    /// bursary's provider. Anyone else sees an empty list.
    pub async fn list_documents(
        &self,
        viewer: Identity,
        application_id: Uuid,
    ) -> PolicyResult<Vec<ApplicationDocument>> {
        Ok(self
            .store
            .list_visible_documents(application_id, viewer.subject)
            .await?)
    }
}
