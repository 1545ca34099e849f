//! Resource access policies
//!
//! Each operation validates input, checks ownership or state, performs one
//! scoped store call and shapes the result. Resources the caller may not
//! touch are reported as not found, never as forbidden.

pub mod account;
pub mod application;
pub mod bursary;
pub mod profile;
pub mod social;

pub use account::{AccountPolicy, Session};
pub use application::ApplicationPolicy;
pub use bursary::{BursaryInput, BursaryPolicy};
pub use profile::{ProfileInput, ProfilePolicy};
pub use social::SocialPolicy;

use crate::auth::{PasswordError, TokenError};
use crate::models::ValidationError;
use crate::store::StoreError;
use crate::uploads::UploadError;

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Unauthorized(&'static str),

    /// Absent, or present but not visible to the caller
    #[error("{resource} not found")]
    NotFound { resource: &'static str },

    #[error("{0}")]
    InvalidState(&'static str),

    #[error("Resource already exists")]
    Conflict,

    #[error("Invalid identifier format")]
    InvalidIdentifier,

    #[error(transparent)]
    Upload(UploadError),

    #[error(transparent)]
    Store(StoreError),

    #[error("{0}")]
    Internal(String),
}

impl PolicyError {
    pub(crate) fn not_found(resource: &'static str) -> Self {
        Self::NotFound { resource }
    }
}

impl From<StoreError> for PolicyError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict => Self::Conflict,
            StoreError::InvalidIdentifier => Self::InvalidIdentifier,
            other => Self::Store(other),
        }
    }
}

impl From<UploadError> for PolicyError {
    fn from(e: UploadError) -> Self {
        Self::Upload(e)
    }
}

impl From<TokenError> for PolicyError {
    fn from(e: TokenError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<PasswordError> for PolicyError {
    fn from(e: PasswordError) -> Self {
        Self::Internal(e.to_string())
    }
}

pub type PolicyResult<T> = Result<T, PolicyError>;
