//! In-process back end for [`Store`]
//!
//! Honours the same scoped predicates as the PostgreSQL repositories. Rows
//! are kept in insertion order, which doubles as creation order for
//! "newest first" listings. Used by the test suite and `serve --in-memory`.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    Application, ApplicationDocument, ApplicationStatus, Bursary, BursaryListing, BursaryStatus,
    Credentials, Email, FeedPost, LearnerApplication, Motivation, NewBursary, NewDocument,
    NewUser, Post, PostContent, ProfileStats, ProviderApplication, User, UserSummary,
};

#[derive(Debug, Clone)]
struct UserRow {
    user: User,
    password_hash: String,
}

/// Follow or like edge; position in the vector is creation order
#[derive(Debug, Clone, Copy)]
struct Edge {
    from: Uuid,
    to: Uuid,
}

#[derive(Debug, Default)]
struct Tables {
    users: Vec<UserRow>,
    bursaries: Vec<Bursary>,
    applications: Vec<Application>,
    documents: Vec<ApplicationDocument>,
    follows: Vec<Edge>,
    posts: Vec<Post>,
    likes: Vec<Edge>,
}

impl Tables {
    fn user(&self, id: Uuid) -> Option<&User> {
        self.users.iter().map(|r| &r.user).find(|u| u.id == id)
    }

    fn bursary(&self, id: Uuid) -> Option<&Bursary> {
        self.bursaries.iter().find(|b| b.id == id)
    }

    fn require_user(&self, id: Uuid) -> StoreResult<&User> {
        self.user(id).ok_or(StoreError::MissingReference("user"))
    }
}

/// Store holding every table in process memory
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .iter()
            .any(|r| r.user.email.eq_ignore_ascii_case(new.email.as_str()))
        {
            return Err(StoreError::Conflict);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            full_name: new.full_name,
            email: new.email.as_str().to_owned(),
            role: new.role,
            bio: None,
            institution: None,
            field_of_study: None,
            avatar_url: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(UserRow {
            user: user.clone(),
            password_hash: new.password_hash,
        });
        Ok(user)
    }

    async fn find_credentials(&self, email: &Email) -> StoreResult<Option<Credentials>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|r| r.user.email.eq_ignore_ascii_case(email.as_str()))
            .map(|r| Credentials {
                user: r.user.clone(),
                password_hash: r.password_hash.clone(),
            }))
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.user(id).cloned())
    }

    async fn save_profile(&self, user: &User) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables.users.iter_mut().find(|r| r.user.id == user.id) else {
            return Ok(None);
        };

        let stored = &mut row.user;
        stored.full_name = user.full_name.clone();
        stored.bio = user.bio.clone();
        stored.institution = user.institution.clone();
        stored.field_of_study = user.field_of_study.clone();
        stored.avatar_url = user.avatar_url.clone();
        stored.updated_at = Utc::now();
        Ok(Some(stored.clone()))
    }

    async fn profile_stats(&self, id: Uuid) -> StoreResult<ProfileStats> {
        let tables = self.tables.read().await;
        Ok(ProfileStats {
            followers_count: tables.follows.iter().filter(|e| e.to == id).count() as i64,
            following_count: tables.follows.iter().filter(|e| e.from == id).count() as i64,
            posts_count: tables.posts.iter().filter(|p| p.author_id == id).count() as i64,
        })
    }

    async fn list_open_bursaries(&self) -> StoreResult<Vec<BursaryListing>> {
        let tables = self.tables.read().await;
        let mut listings: Vec<BursaryListing> = tables
            .bursaries
            .iter()
            .filter(|b| b.status == BursaryStatus::Open)
            .filter_map(|b| {
                tables.user(b.provider_id).map(|u| BursaryListing {
                    bursary: b.clone(),
                    provider_name: u.full_name.clone(),
                })
            })
            .collect();
        // stable: equal deadlines keep creation order
        listings.sort_by_key(|l| l.bursary.deadline);
        Ok(listings)
    }

    async fn insert_bursary(&self, provider: Uuid, new: NewBursary) -> StoreResult<Bursary> {
        let mut tables = self.tables.write().await;
        tables.require_user(provider)?;

        let now = Utc::now();
        let bursary = Bursary {
            id: Uuid::new_v4(),
            provider_id: provider,
            title: new.title,
            description: new.description,
            amount: new.amount,
            deadline: new.deadline,
            status: BursaryStatus::Open,
            created_at: now,
            updated_at: now,
        };
        tables.bursaries.push(bursary.clone());
        Ok(bursary)
    }

    async fn get_bursary(&self, id: Uuid) -> StoreResult<Option<Bursary>> {
        Ok(self.tables.read().await.bursary(id).cloned())
    }

    async fn find_owned_bursary(&self, id: Uuid, provider: Uuid) -> StoreResult<Option<Bursary>> {
        let tables = self.tables.read().await;
        Ok(tables
            .bursaries
            .iter()
            .find(|b| b.id == id && b.provider_id == provider)
            .cloned())
    }

    async fn save_bursary(&self, provider: Uuid, bursary: &Bursary) -> StoreResult<Option<Bursary>> {
        let mut tables = self.tables.write().await;
        let Some(stored) = tables
            .bursaries
            .iter_mut()
            .find(|b| b.id == bursary.id && b.provider_id == provider)
        else {
            return Ok(None);
        };

        stored.title = bursary.title.clone();
        stored.description = bursary.description.clone();
        stored.amount = bursary.amount;
        stored.deadline = bursary.deadline;
        stored.status = bursary.status;
        stored.updated_at = Utc::now();
        Ok(Some(stored.clone()))
    }

    async fn close_bursary(&self, id: Uuid, provider: Uuid) -> StoreResult<Option<Bursary>> {
        let mut tables = self.tables.write().await;
        let Some(stored) = tables
            .bursaries
            .iter_mut()
            .find(|b| b.id == id && b.provider_id == provider)
        else {
            return Ok(None);
        };

        stored.status = BursaryStatus::Closed;
        stored.updated_at = Utc::now();
        Ok(Some(stored.clone()))
    }

    async fn insert_application(
        &self,
        learner: Uuid,
        bursary_id: Uuid,
        motivation: Motivation,
    ) -> StoreResult<Application> {
        let mut tables = self.tables.write().await;
        tables.require_user(learner)?;
        if tables.bursary(bursary_id).is_none() {
            return Err(StoreError::MissingReference("bursary"));
        }

        let now = Utc::now();
        let application = Application {
            id: Uuid::new_v4(),
            bursary_id,
            learner_id: learner,
            motivation: motivation.into_string(),
            status: ApplicationStatus::Submitted,
            created_at: now,
            updated_at: now,
        };
        tables.applications.push(application.clone());
        Ok(application)
    }

    async fn find_owned_application(
        &self,
        id: Uuid,
        learner: Uuid,
    ) -> StoreResult<Option<Application>> {
        let tables = self.tables.read().await;
        Ok(tables
            .applications
            .iter()
            .find(|a| a.id == id && a.learner_id == learner)
            .cloned())
    }

    async fn list_learner_applications(
        &self,
        learner: Uuid,
    ) -> StoreResult<Vec<LearnerApplication>> {
        let tables = self.tables.read().await;
        Ok(tables
            .applications
            .iter()
            .rev()
            .filter(|a| a.learner_id == learner)
            .filter_map(|a| {
                tables.bursary(a.bursary_id).map(|b| LearnerApplication {
                    id: a.id,
                    bursary_id: a.bursary_id,
                    bursary_title: b.title.clone(),
                    status: a.status,
                    created_at: a.created_at,
                    updated_at: a.updated_at,
                })
            })
            .collect())
    }

    async fn list_bursary_applications(
        &self,
        provider: Uuid,
        bursary_id: Uuid,
    ) -> StoreResult<Vec<ProviderApplication>> {
        let tables = self.tables.read().await;
        let owned = tables
            .bursary(bursary_id)
            .is_some_and(|b| b.provider_id == provider);
        if !owned {
            return Ok(Vec::new());
        }

        Ok(tables
            .applications
            .iter()
            .rev()
            .filter(|a| a.bursary_id == bursary_id)
            .filter_map(|a| {
                tables.user(a.learner_id).map(|u| ProviderApplication {
                    id: a.id,
                    motivation: a.motivation.clone(),
                    status: a.status,
                    created_at: a.created_at,
                    learner_id: u.id,
                    full_name: u.full_name.clone(),
                    email: u.email.clone(),
                })
            })
            .collect())
    }

    async fn set_application_status(
        &self,
        provider: Uuid,
        id: Uuid,
        status: ApplicationStatus,
    ) -> StoreResult<Option<Application>> {
        let mut tables = self.tables.write().await;
        let owned_bursaries: HashSet<Uuid> = tables
            .bursaries
            .iter()
            .filter(|b| b.provider_id == provider)
            .map(|b| b.id)
            .collect();

        let Some(stored) = tables
            .applications
            .iter_mut()
            .find(|a| a.id == id && owned_bursaries.contains(&a.bursary_id))
        else {
            return Ok(None);
        };

        stored.status = status;
        stored.updated_at = Utc::now();
        Ok(Some(stored.clone()))
    }

    async fn insert_document(&self, new: NewDocument) -> StoreResult<ApplicationDocument> {
        let mut tables = self.tables.write().await;
        if !tables.applications.iter().any(|a| a.id == new.application_id) {
            return Err(StoreError::MissingReference("application"));
        }
        if tables
            .documents
            .iter()
            .any(|d| d.storage_file_name == new.storage_file_name)
        {
            return Err(StoreError::Conflict);
        }

        let document = ApplicationDocument {
            id: Uuid::new_v4(),
            application_id: new.application_id,
            original_file_name: new.original_file_name,
            storage_file_name: new.storage_file_name,
            mime_type: new.mime_type,
            size_bytes: new.size_bytes,
            created_at: Utc::now(),
        };
        tables.documents.push(document.clone());
        Ok(document)
    }

    async fn list_visible_documents(
        &self,
        application_id: Uuid,
        viewer: Uuid,
    ) -> StoreResult<Vec<ApplicationDocument>> {
        let tables = self.tables.read().await;
        let visible = tables
            .applications
            .iter()
            .find(|a| a.id == application_id)
            .is_some_and(|a| {
                a.learner_id == viewer
                    || tables
                        .bursary(a.bursary_id)
                        .is_some_and(|b| b.provider_id == viewer)
            });
        if !visible {
            return Ok(Vec::new());
        }

        Ok(tables
            .documents
            .iter()
            .rev()
            .filter(|d| d.application_id == application_id)
            .cloned()
            .collect())
    }

    async fn insert_follow(&self, follower: Uuid, following: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.require_user(follower)?;
        tables.require_user(following)?;
        if tables
            .follows
            .iter()
            .any(|e| e.from == follower && e.to == following)
        {
            return Ok(());
        }

        tables.follows.push(Edge {
            from: follower,
            to: following,
        });
        Ok(())
    }

    async fn delete_follow(&self, follower: Uuid, following: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .follows
            .retain(|e| !(e.from == follower && e.to == following));
        Ok(())
    }

    async fn list_following(&self, user: Uuid) -> StoreResult<Vec<UserSummary>> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .iter()
            .rev()
            .filter(|e| e.from == user)
            .filter_map(|e| tables.user(e.to).map(UserSummary::from))
            .collect())
    }

    async fn list_followers(&self, user: Uuid) -> StoreResult<Vec<UserSummary>> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .iter()
            .rev()
            .filter(|e| e.to == user)
            .filter_map(|e| tables.user(e.from).map(UserSummary::from))
            .collect())
    }

    async fn insert_post(&self, author: Uuid, content: PostContent) -> StoreResult<Post> {
        let mut tables = self.tables.write().await;
        tables.require_user(author)?;

        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            author_id: author,
            content: content.as_str().to_owned(),
            created_at: now,
            updated_at: now,
        };
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn post_exists(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.read().await.posts.iter().any(|p| p.id == id))
    }

    async fn feed(&self, viewer: Uuid, limit: usize) -> StoreResult<Vec<FeedPost>> {
        let tables = self.tables.read().await;
        let followed: HashSet<Uuid> = tables
            .follows
            .iter()
            .filter(|e| e.from == viewer)
            .map(|e| e.to)
            .collect();

        Ok(tables
            .posts
            .iter()
            .rev()
            .filter(|p| p.author_id == viewer || followed.contains(&p.author_id))
            .filter_map(|p| {
                let author = tables.user(p.author_id)?;
                let likes = tables.likes.iter().filter(|l| l.to == p.id);
                Some(FeedPost {
                    id: p.id,
                    author_id: p.author_id,
                    author_name: author.full_name.clone(),
                    avatar_url: author.avatar_url.clone(),
                    content: p.content.clone(),
                    created_at: p.created_at,
                    updated_at: p.updated_at,
                    likes_count: likes.clone().count() as i64,
                    liked_by_me: likes.clone().any(|l| l.from == viewer),
                })
            })
            .take(limit)
            .collect())
    }

    async fn insert_like(&self, user: Uuid, post: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.require_user(user)?;
        if !tables.posts.iter().any(|p| p.id == post) {
            return Err(StoreError::MissingReference("post"));
        }
        if tables.likes.iter().any(|l| l.from == user && l.to == post) {
            return Ok(());
        }

        tables.likes.push(Edge { from: user, to: post });
        Ok(())
    }

    async fn delete_like(&self, user: Uuid, post: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.likes.retain(|l| !(l.from == user && l.to == post));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::Role;

    async fn user(store: &MemoryStore, name: &str, role: Role) -> User {
        store
            .create_user(NewUser {
                full_name: name.into(),
                email: Email::new(&format!("{}@example.test", name.to_lowercase())).unwrap(),
                password_hash: "hash".into(),
                role,
            })
            .await
            .unwrap()
    }

    fn bursary(title: &str, deadline: (i32, u32, u32)) -> NewBursary {
        NewBursary {
            title: title.into(),
            description: "desc".into(),
            amount: 100.0,
            deadline: NaiveDate::from_ymd_opt(deadline.0, deadline.1, deadline.2).unwrap(),
        }
    }

    #[tokio::test]
    async fn email_uniqueness_ignores_case() {
        let store = MemoryStore::new();
        user(&store, "Ada", Role::Learner).await;
        let err = store
            .create_user(NewUser {
                full_name: "Imposter".into(),
                email: Email::new("ADA@example.test").unwrap(),
                password_hash: "hash".into(),
                role: Role::Provider,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict));
    }

    #[tokio::test]
    async fn open_bursaries_sorted_by_deadline() {
        let store = MemoryStore::new();
        let p = user(&store, "Prov", Role::Provider).await;
        store.insert_bursary(p.id, bursary("late", (2031, 6, 1))).await.unwrap();
        let early = store.insert_bursary(p.id, bursary("early", (2030, 1, 1))).await.unwrap();
        let closed = store.insert_bursary(p.id, bursary("closed", (2029, 1, 1))).await.unwrap();
        store.close_bursary(closed.id, p.id).await.unwrap();

        let listed = store.list_open_bursaries().await.unwrap();
        let titles: Vec<_> = listed.iter().map(|l| l.bursary.title.as_str()).collect();
        assert_eq!(titles, ["early", "late"]);
        assert_eq!(listed[0].bursary.id, early.id);
        assert_eq!(listed[0].provider_name, "Prov");
    }

    #[tokio::test]
    async fn insert_application_checks_references() {
        let store = MemoryStore::new();
        let learner = user(&store, "Lea", Role::Learner).await;
        let err = store
            .insert_application(
                learner.id,
                Uuid::new_v4(),
                Motivation::new(Some("please".into())).unwrap(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingReference("bursary")));
    }

    #[tokio::test]
    async fn follow_lists_newest_first() {
        let store = MemoryStore::new();
        let a = user(&store, "A", Role::Learner).await;
        let b = user(&store, "B", Role::Learner).await;
        let c = user(&store, "C", Role::Provider).await;

        store.insert_follow(a.id, b.id).await.unwrap();
        store.insert_follow(a.id, c.id).await.unwrap();
        store.insert_follow(a.id, b.id).await.unwrap();

        let following = store.list_following(a.id).await.unwrap();
        let ids: Vec<_> = following.iter().map(|u| u.id).collect();
        assert_eq!(ids, [c.id, b.id]);
        assert_eq!(store.list_followers(b.id).await.unwrap()[0].id, a.id);
    }

    #[tokio::test]
    async fn like_requires_post() {
        let store = MemoryStore::new();
        let a = user(&store, "A", Role::Learner).await;
        let err = store.insert_like(a.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingReference("post")));
    }
}
