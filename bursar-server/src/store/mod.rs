//! Storage layer - store contract, PostgreSQL and in-memory back ends
//!
//! # Design Principles
//!
//! - Every owner-restricted operation takes the caller's id and filters on it
//!   in the same statement (scoped operations)
//! - A scoped miss returns `None`; callers turn it into a generic not-found
//! - Edge inserts rely on uniqueness constraints, conflicts are no-ops
//! - List operations use JOINs - no N+1 queries

pub mod memory;
pub mod migrations;
pub mod pool;
pub mod postgres;
pub mod repos;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    Application, ApplicationDocument, ApplicationStatus, Bursary, BursaryListing, Credentials,
    Email, FeedPost, LearnerApplication, Motivation, NewBursary, NewDocument, NewUser, Post,
    PostContent, ProfileStats, ProviderApplication, User, UserSummary,
};

pub use memory::MemoryStore;
pub use pool::create_pool;
pub use postgres::PgStore;

/// PostgreSQL SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";
/// PostgreSQL SQLSTATE for foreign_key_violation
const FOREIGN_KEY_VIOLATION: &str = "23503";
/// PostgreSQL SQLSTATE for invalid_text_representation (bad uuid literal)
const INVALID_TEXT_REPRESENTATION: &str = "22P02";

/// Storage error type
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(sqlx::Error),

    /// Uniqueness constraint rejected the write
    #[error("resource already exists")]
    Conflict,

    /// Identifier could not be interpreted by the store
    #[error("invalid identifier format")]
    InvalidIdentifier,

    /// A foreign key pointed at a row that does not exist
    #[error("referenced {0} does not exist")]
    MissingReference(&'static str),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            match db.code().as_deref() {
                Some(UNIQUE_VIOLATION) => return Self::Conflict,
                Some(INVALID_TEXT_REPRESENTATION) => return Self::InvalidIdentifier,
                Some(FOREIGN_KEY_VIOLATION) => return Self::MissingReference("row"),
                _ => {}
            }
        }
        Self::Sqlx(e)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence contract shared by every back end.
///
/// Methods taking an owner id (`provider`, `learner`, `viewer`) apply it as a
/// filter; they never check ownership separately from the read or write.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    // ─── Health ───────────────────────────────────────────────────────────

    /// Verify the store is reachable.
    async fn ping(&self) -> StoreResult<()>;

    // ─── Users ────────────────────────────────────────────────────────────

    /// Create a user. Duplicate emails yield [`StoreError::Conflict`].
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    /// Look up login credentials by (lowercased) email.
    async fn find_credentials(&self, email: &Email) -> StoreResult<Option<Credentials>>;

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Persist the editable profile fields of `user` and bump `updated_at`.
    async fn save_profile(&self, user: &User) -> StoreResult<Option<User>>;

    /// Follower, following and post counts for a user.
    async fn profile_stats(&self, id: Uuid) -> StoreResult<ProfileStats>;

    // ─── Bursaries ────────────────────────────────────────────────────────

    /// Open bursaries ordered by deadline ascending.
    async fn list_open_bursaries(&self) -> StoreResult<Vec<BursaryListing>>;

    async fn insert_bursary(&self, provider: Uuid, bursary: NewBursary) -> StoreResult<Bursary>;

    /// Unscoped read, used to check a bursary before applying.
    async fn get_bursary(&self, id: Uuid) -> StoreResult<Option<Bursary>>;

    async fn find_owned_bursary(&self, id: Uuid, provider: Uuid) -> StoreResult<Option<Bursary>>;

    /// Write every mutable field of `bursary`, filtered by id and owner.
    async fn save_bursary(&self, provider: Uuid, bursary: &Bursary) -> StoreResult<Option<Bursary>>;

    async fn close_bursary(&self, id: Uuid, provider: Uuid) -> StoreResult<Option<Bursary>>;

    // ─── Applications ─────────────────────────────────────────────────────

    async fn insert_application(
        &self,
        learner: Uuid,
        bursary_id: Uuid,
        motivation: Motivation,
    ) -> StoreResult<Application>;

    async fn find_owned_application(
        &self,
        id: Uuid,
        learner: Uuid,
    ) -> StoreResult<Option<Application>>;

    /// The learner's applications, newest first.
    async fn list_learner_applications(&self, learner: Uuid)
        -> StoreResult<Vec<LearnerApplication>>;

    /// Applications to one of the provider's bursaries, newest first.
    async fn list_bursary_applications(
        &self,
        provider: Uuid,
        bursary_id: Uuid,
    ) -> StoreResult<Vec<ProviderApplication>>;

    /// Update status through a join on bursary ownership.
    async fn set_application_status(
        &self,
        provider: Uuid,
        id: Uuid,
        status: ApplicationStatus,
    ) -> StoreResult<Option<Application>>;

    async fn insert_document(&self, document: NewDocument) -> StoreResult<ApplicationDocument>;

    /// Documents of an application when `viewer` is its learner or the
    /// parent bursary's provider; empty otherwise. Newest first.
    async fn list_visible_documents(
        &self,
        application_id: Uuid,
        viewer: Uuid,
    ) -> StoreResult<Vec<ApplicationDocument>>;

    // ─── Social graph ─────────────────────────────────────────────────────

    /// Idempotent: an existing edge is left as is.
    async fn insert_follow(&self, follower: Uuid, following: Uuid) -> StoreResult<()>;

    /// Idempotent: a missing edge is not an error.
    async fn delete_follow(&self, follower: Uuid, following: Uuid) -> StoreResult<()>;

    /// Users `user` follows, newest edge first.
    async fn list_following(&self, user: Uuid) -> StoreResult<Vec<UserSummary>>;

    /// Users following `user`, newest edge first.
    async fn list_followers(&self, user: Uuid) -> StoreResult<Vec<UserSummary>>;

    // ─── Posts ────────────────────────────────────────────────────────────

    async fn insert_post(&self, author: Uuid, content: PostContent) -> StoreResult<Post>;

    async fn post_exists(&self, id: Uuid) -> StoreResult<bool>;

    /// Viewer's own posts plus posts of followed users, newest first,
    /// at most `limit` rows, with like counters.
    async fn feed(&self, viewer: Uuid, limit: usize) -> StoreResult<Vec<FeedPost>>;

    /// Idempotent like.
    async fn insert_like(&self, user: Uuid, post: Uuid) -> StoreResult<()>;

    /// Idempotent unlike.
    async fn delete_like(&self, user: Uuid, post: Uuid) -> StoreResult<()>;
}
