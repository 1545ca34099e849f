//! Follows, posts, likes and the feed

use uuid::Uuid;

use super::{PolicyError, PolicyResult};
use crate::auth::Identity;
use crate::models::{FeedPost, Post, PostContent, UserSummary, ValidationError, FEED_LIMIT};
use crate::store::Store;

pub struct SocialPolicy<'a> {
    store: &'a dyn Store,
}

impl<'a> SocialPolicy<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    pub async fn follow(&self, identity: Identity, target: Uuid) -> PolicyResult<()> {
        if target == identity.subject {
            return Err(ValidationError::Rejected {
                reason: "You cannot follow yourself",
            }
            .into());
        }
        if self.store.get_user(target).await?.is_none() {
            return Err(PolicyError::not_found("User"));
        }
        self.store.insert_follow(identity.subject, target).await?;
        Ok(())
    }

    pub async fn unfollow(&self, identity: Identity, target: Uuid) -> PolicyResult<()> {
        self.store.delete_follow(identity.subject, target).await?;
        Ok(())
    }

    pub async fn list_following(&self, identity: Identity) -> PolicyResult<Vec<UserSummary>> {
        Ok(self.store.list_following(identity.subject).await?)
    }

    pub async fn list_followers(&self, identity: Identity) -> PolicyResult<Vec<UserSummary>> {
        Ok(self.store.list_followers(identity.subject).await?)
    }

    pub async fn create_post(&self, identity: Identity, content: Option<String>) -> PolicyResult<Post> {
        let content = PostContent::new(content)?;
        Ok(self.store.insert_post(identity.subject, content).await?)
    }

    /// Caller's posts and posts of followed users, newest first.
    pub async fn feed(&self, identity: Identity) -> PolicyResult<Vec<FeedPost>> {
        Ok(self.store.feed(identity.subject, FEED_LIMIT).await?)
    }

    pub async fn like_post(&self, identity: Identity, post_id: Uuid) -> PolicyResult<()> {
        if !self.store.post_exists(post_id).await? {
            return Err(PolicyError::not_found("Post"));
        }
        self.store.insert_like(identity.subject, post_id).await?;
        Ok(())
    }

    pub async fn unlike_post(&self, identity: Identity, post_id: Uuid) -> PolicyResult<()> {
        self.store.delete_like(identity.subject, post_id).await?;
        Ok(())
    }
}
