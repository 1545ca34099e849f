//! Own and public profiles

use uuid::Uuid;

use super::{PolicyError, PolicyResult};
use crate::auth::Identity;
use crate::models::{ProfileChanges, PublicProfile, User};
use crate::store::Store;

/// Raw profile fields; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct ProfileInput {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub institution: Option<String>,
    pub field_of_study: Option<String>,
    pub avatar_url: Option<String>,
}

pub struct ProfilePolicy<'a> {
    store: &'a dyn Store,
}

impl<'a> ProfilePolicy<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    pub async fn get_mine(&self, identity: Identity) -> PolicyResult<User> {
        self.store
            .get_user(identity.subject)
            .await?
            .ok_or_else(|| PolicyError::not_found("Profile"))
    }

    pub async fn update_mine(&self, identity: Identity, input: ProfileInput) -> PolicyResult<User> {
        let changes = ProfileChanges::new(
            input.full_name,
            input.bio,
            input.institution,
            input.field_of_study,
            input.avatar_url,
        )?;

        let current = self.get_mine(identity).await?;
        self.store
            .save_profile(&changes.apply(current))
            .await?
            .ok_or_else(|| PolicyError::not_found("Profile"))
    }

    /// Profile without email, plus social counters. The counters are read
    /// separately from the profile row.
    pub async fn get_public(&self, user_id: Uuid) -> PolicyResult<PublicProfile> {
        let Some(user) = self.store.get_user(user_id).await? else {
            return Err(PolicyError::not_found("User"));
        };
        let stats = self.store.profile_stats(user_id).await?;
        Ok(PublicProfile::new(user, stats))
    }
}
