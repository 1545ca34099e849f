//! Applications and their attached documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::validation::{non_blank, required};
use super::ValidationError;

/// Maximum length for a motivation letter
pub const MAX_MOTIVATION_LEN: usize = 10_000;

/// Review status. Flat enum: any value may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Submitted,
    UnderReview,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn all() -> &'static [Self] {
        &[
            Self::Submitted,
            Self::UnderReview,
            Self::Approved,
            Self::Rejected,
        ]
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ApplicationStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidVariant {
                field: "status",
                value: s.to_owned(),
            })
    }
}

impl TryFrom<String> for ApplicationStatus {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// An application row
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: Uuid,
    pub bursary_id: Uuid,
    pub learner_id: Uuid,
    pub motivation: String,
    #[sqlx(try_from = "String")]
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A learner's own application, with the bursary title
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LearnerApplication {
    pub id: Uuid,
    pub bursary_id: Uuid,
    pub bursary_title: String,
    #[sqlx(try_from = "String")]
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An application as seen by the bursary's provider.
///
/// Discloses the learner's name and email to the provider.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProviderApplication {
    pub id: Uuid,
    pub motivation: String,
    #[sqlx(try_from = "String")]
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub learner_id: Uuid,
    pub full_name: String,
    pub email: String,
}

/// Validated motivation text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Motivation(String);

impl Motivation {
    pub fn new(value: Option<String>) -> Result<Self, ValidationError> {
        let value = non_blank(
            required(value, "motivation")?,
            "motivation",
            MAX_MOTIVATION_LEN,
        )?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Metadata for a stored document
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDocument {
    pub id: Uuid,
    pub application_id: Uuid,
    pub original_file_name: String,
    pub storage_file_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

/// Document metadata ready to persist; the bytes are already on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub application_id: Uuid,
    pub original_file_name: String,
    pub storage_file_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in ApplicationStatus::all() {
            assert_eq!(status.as_str().parse::<ApplicationStatus>().unwrap(), *status);
        }
    }

    #[test]
    fn status_rejects_unknown_values() {
        let err = "pending".parse::<ApplicationStatus>().unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidVariant {
                field: "status",
                value: "pending".into()
            }
        );
        assert!("UNDER_REVIEW".parse::<ApplicationStatus>().is_err());
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ApplicationStatus::UnderReview).unwrap(),
            "\"under_review\""
        );
    }

    #[test]
    fn motivation_required() {
        assert_eq!(
            Motivation::new(None).unwrap_err(),
            ValidationError::Required { field: "motivation" }
        );
        assert!(Motivation::new(Some("  ".into())).is_err());
        assert_eq!(Motivation::new(Some("I study hard".into())).unwrap().as_str(), "I study hard");
    }
}
