//! PostgreSQL back end for [`Store`]

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repos::{ApplicationRepo, BursaryRepo, SocialRepo, UserRepo};
use super::{Store, StoreResult};
use crate::models::{
    Application, ApplicationDocument, ApplicationStatus, Bursary, BursaryListing, Credentials,
    Email, FeedPost, LearnerApplication, Motivation, NewBursary, NewDocument, NewUser, Post,
    PostContent, ProfileStats, ProviderApplication, User, UserSummary,
};

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        UserRepo::new(&self.pool).create(user).await
    }

    async fn find_credentials(&self, email: &Email) -> StoreResult<Option<Credentials>> {
        UserRepo::new(&self.pool).find_credentials(email).await
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        UserRepo::new(&self.pool).get(id).await
    }

    async fn save_profile(&self, user: &User) -> StoreResult<Option<User>> {
        UserRepo::new(&self.pool).save_profile(user).await
    }

    async fn profile_stats(&self, id: Uuid) -> StoreResult<ProfileStats> {
        UserRepo::new(&self.pool).stats(id).await
    }

    async fn list_open_bursaries(&self) -> StoreResult<Vec<BursaryListing>> {
        BursaryRepo::new(&self.pool).list_open().await
    }

    async fn insert_bursary(&self, provider: Uuid, bursary: NewBursary) -> StoreResult<Bursary> {
        BursaryRepo::new(&self.pool).create(provider, bursary).await
    }

    async fn get_bursary(&self, id: Uuid) -> StoreResult<Option<Bursary>> {
        BursaryRepo::new(&self.pool).get(id).await
    }

    async fn find_owned_bursary(&self, id: Uuid, provider: Uuid) -> StoreResult<Option<Bursary>> {
        BursaryRepo::new(&self.pool).find_owned(id, provider).await
    }

    async fn save_bursary(&self, provider: Uuid, bursary: &Bursary) -> StoreResult<Option<Bursary>> {
        BursaryRepo::new(&self.pool).save(provider, bursary).await
    }

    async fn close_bursary(&self, id: Uuid, provider: Uuid) -> StoreResult<Option<Bursary>> {
        BursaryRepo::new(&self.pool).close(id, provider).await
    }

    async fn insert_application(
        &self,
        learner: Uuid,
        bursary_id: Uuid,
        motivation: Motivation,
    ) -> StoreResult<Application> {
        ApplicationRepo::new(&self.pool)
            .create(learner, bursary_id, motivation)
            .await
    }

    async fn find_owned_application(
        &self,
        id: Uuid,
        learner: Uuid,
    ) -> StoreResult<Option<Application>> {
        ApplicationRepo::new(&self.pool).find_owned(id, learner).await
    }

    async fn list_learner_applications(
        &self,
        learner: Uuid,
    ) -> StoreResult<Vec<LearnerApplication>> {
        ApplicationRepo::new(&self.pool).list_for_learner(learner).await
    }

    async fn list_bursary_applications(
        &self,
        provider: Uuid,
        bursary_id: Uuid,
    ) -> StoreResult<Vec<ProviderApplication>> {
        ApplicationRepo::new(&self.pool)
            .list_for_bursary(provider, bursary_id)
            .await
    }

    async fn set_application_status(
        &self,
        provider: Uuid,
        id: Uuid,
        status: ApplicationStatus,
    ) -> StoreResult<Option<Application>> {
        ApplicationRepo::new(&self.pool)
            .set_status(provider, id, status)
            .await
    }

    async fn insert_document(&self, document: NewDocument) -> StoreResult<ApplicationDocument> {
        ApplicationRepo::new(&self.pool).create_document(document).await
    }

    async fn list_visible_documents(
        &self,
        application_id: Uuid,
        viewer: Uuid,
    ) -> StoreResult<Vec<ApplicationDocument>> {
        ApplicationRepo::new(&self.pool)
            .list_visible_documents(application_id, viewer)
            .await
    }

    async fn insert_follow(&self, follower: Uuid, following: Uuid) -> StoreResult<()> {
        SocialRepo::new(&self.pool).follow(follower, following).await
    }

    async fn delete_follow(&self, follower: Uuid, following: Uuid) -> StoreResult<()> {
        SocialRepo::new(&self.pool).unfollow(follower, following).await
    }

    async fn list_following(&self, user: Uuid) -> StoreResult<Vec<UserSummary>> {
        SocialRepo::new(&self.pool).following(user).await
    }

    async fn list_followers(&self, user: Uuid) -> StoreResult<Vec<UserSummary>> {
        SocialRepo::new(&self.pool).followers(user).await
    }

    async fn insert_post(&self, author: Uuid, content: PostContent) -> StoreResult<Post> {
        SocialRepo::new(&self.pool).create_post(author, content).await
    }

    async fn post_exists(&self, id: Uuid) -> StoreResult<bool> {
        SocialRepo::new(&self.pool).post_exists(id).await
    }

    async fn feed(&self, viewer: Uuid, limit: usize) -> StoreResult<Vec<FeedPost>> {
        SocialRepo::new(&self.pool).feed(viewer, limit).await
    }

    async fn insert_like(&self, user: Uuid, post: Uuid) -> StoreResult<()> {
        SocialRepo::new(&self.pool).like(user, post).await
    }

    async fn delete_like(&self, user: Uuid, post: Uuid) -> StoreResult<()> {
        SocialRepo::new(&self.pool).unlike(user, post).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::{BursaryChanges, BursaryStatus, Role};
    use crate::store::{create_pool, migrations, StoreError};

    // Integration tests - run with DATABASE_URL set
    // cargo test -p bursar-server -- --ignored

    async fn store() -> PgStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = create_pool(&url, 5).await.expect("pool creation failed");
        migrations::run(&pool).await.expect("migrations failed");
        PgStore::new(pool)
    }

    async fn user(store: &PgStore, role: Role) -> User {
        let email = Email::new(&format!("{}@example.test", Uuid::new_v4())).unwrap();
        store
            .create_user(NewUser {
                full_name: "Test User".into(),
                email,
                password_hash: "not-a-real-hash".into(),
                role,
            })
            .await
            .unwrap()
    }

    fn new_bursary() -> NewBursary {
        NewBursary {
            title: "Maths Bursary".into(),
            description: "For maths students".into(),
            amount: 1250.50,
            deadline: NaiveDate::from_ymd_opt(2031, 3, 1).unwrap(),
        }
    }

    /// Provider with a bursary, learner with an application to it.
    async fn applied(store: &PgStore) -> (User, User, Bursary, Application) {
        let provider = user(store, Role::Provider).await;
        let learner = user(store, Role::Learner).await;
        let bursary = store.insert_bursary(provider.id, new_bursary()).await.unwrap();
        let application = store
            .insert_application(
                learner.id,
                bursary.id,
                Motivation::new(Some("I need this".into())).unwrap(),
            )
            .await
            .unwrap();
        (provider, learner, bursary, application)
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn duplicate_email_is_conflict() {
        let store = store().await;
        let first = user(&store, Role::Learner).await;
        let err = store
            .create_user(NewUser {
                full_name: "Again".into(),
                email: Email::new(&first.email.to_uppercase()).unwrap(),
                password_hash: "x".into(),
                role: Role::Learner,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn amount_round_trips_through_numeric() {
        let store = store().await;
        let provider = user(&store, Role::Provider).await;
        let bursary = store.insert_bursary(provider.id, new_bursary()).await.unwrap();
        assert_eq!(bursary.amount, 1250.50);
        assert_eq!(bursary.status, BursaryStatus::Open);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn scoped_close_ignores_other_providers() {
        let store = store().await;
        let owner = user(&store, Role::Provider).await;
        let other = user(&store, Role::Provider).await;
        let bursary = store.insert_bursary(owner.id, new_bursary()).await.unwrap();

        assert!(store.close_bursary(bursary.id, other.id).await.unwrap().is_none());
        let closed = store.close_bursary(bursary.id, owner.id).await.unwrap().unwrap();
        assert_eq!(closed.status, BursaryStatus::Closed);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn follow_twice_keeps_one_edge() {
        let store = store().await;
        let a = user(&store, Role::Learner).await;
        let b = user(&store, Role::Provider).await;

        store.insert_follow(a.id, b.id).await.unwrap();
        store.insert_follow(a.id, b.id).await.unwrap();

        assert_eq!(store.list_following(a.id).await.unwrap().len(), 1);
        assert_eq!(store.profile_stats(b.id).await.unwrap().followers_count, 1);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn feed_reports_likes_in_one_query() {
        let store = store().await;
        let a = user(&store, Role::Learner).await;
        let post = store
            .insert_post(a.id, PostContent::new(Some("hello".into())).unwrap())
            .await
            .unwrap();
        store.insert_like(a.id, post.id).await.unwrap();

        let feed = store.feed(a.id, 100).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].likes_count, 1);
        assert!(feed[0].liked_by_me);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn closed_bursaries_leave_the_listing() {
        let store = store().await;
        let provider = user(&store, Role::Provider).await;
        let late = NewBursary {
            deadline: NaiveDate::from_ymd_opt(2032, 1, 1).unwrap(),
            ..new_bursary()
        };
        let later = store.insert_bursary(provider.id, late).await.unwrap();
        let sooner = store.insert_bursary(provider.id, new_bursary()).await.unwrap();
        let closed = store.insert_bursary(provider.id, new_bursary()).await.unwrap();
        store.close_bursary(closed.id, provider.id).await.unwrap();

        let ids: Vec<Uuid> = store
            .list_open_bursaries()
            .await
            .unwrap()
            .into_iter()
            .filter(|l| l.bursary.provider_id == provider.id)
            .map(|l| l.bursary.id)
            .collect();
        assert_eq!(ids, vec![sooner.id, later.id]);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn merged_save_keeps_omitted_fields() {
        let store = store().await;
        let owner = user(&store, Role::Provider).await;
        let other = user(&store, Role::Provider).await;
        let bursary = store.insert_bursary(owner.id, new_bursary()).await.unwrap();

        let changes = BursaryChanges {
            title: Some("Renamed".into()),
            ..BursaryChanges::default()
        };
        let merged = changes.apply(bursary.clone());

        assert!(store.save_bursary(other.id, &merged).await.unwrap().is_none());

        let saved = store.save_bursary(owner.id, &merged).await.unwrap().unwrap();
        assert_eq!(saved.title, "Renamed");
        assert_eq!(saved.description, bursary.description);
        assert_eq!(saved.amount, bursary.amount);
        assert_eq!(saved.deadline, bursary.deadline);
        assert_eq!(saved.status, BursaryStatus::Open);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn status_update_requires_bursary_ownership() {
        let store = store().await;
        let (provider, learner, _, application) = applied(&store).await;
        let stranger = user(&store, Role::Provider).await;

        let denied = store
            .set_application_status(stranger.id, application.id, ApplicationStatus::Approved)
            .await
            .unwrap();
        assert!(denied.is_none());
        // the applicant is not the owner either
        let denied = store
            .set_application_status(learner.id, application.id, ApplicationStatus::Approved)
            .await
            .unwrap();
        assert!(denied.is_none());

        let updated = store
            .set_application_status(provider.id, application.id, ApplicationStatus::UnderReview)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, ApplicationStatus::UnderReview);
        assert_eq!(updated.learner_id, learner.id);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn provider_listing_is_scoped_to_owner() {
        let store = store().await;
        let (provider, learner, bursary, application) = applied(&store).await;
        let stranger = user(&store, Role::Provider).await;

        assert!(store
            .list_bursary_applications(stranger.id, bursary.id)
            .await
            .unwrap()
            .is_empty());

        let rows = store
            .list_bursary_applications(provider.id, bursary.id)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, application.id);
        assert_eq!(rows[0].email, learner.email);
        assert_eq!(rows[0].status, ApplicationStatus::Submitted);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn documents_visible_to_learner_and_provider_only() {
        let store = store().await;
        let (provider, learner, _, application) = applied(&store).await;
        let stranger = user(&store, Role::Learner).await;

        let document = store
            .insert_document(NewDocument {
                application_id: application.id,
                original_file_name: "transcript.pdf".into(),
                storage_file_name: format!("{}.pdf", Uuid::new_v4()),
                mime_type: "application/pdf".into(),
                size_bytes: 42,
            })
            .await
            .unwrap();

        assert!(store
            .list_visible_documents(application.id, stranger.id)
            .await
            .unwrap()
            .is_empty());
        for viewer in [learner.id, provider.id] {
            let docs = store.list_visible_documents(application.id, viewer).await.unwrap();
            assert_eq!(docs, vec![document.clone()]);
        }
    }
}
