//! Posts and feed entries

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::validation::required;
use super::ValidationError;

/// Maximum length for post content
pub const MAX_POST_LEN: usize = 5_000;

/// Feed never returns more rows than this
pub const FEED_LIMIT: usize = 100;

/// A post row
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A post as it appears in a viewer's feed
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FeedPost {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub avatar_url: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub likes_count: i64,
    pub liked_by_me: bool,
}

/// Validated post content, stored trimmed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostContent(String);

impl PostContent {
    pub fn new(value: Option<String>) -> Result<Self, ValidationError> {
        let value = required(value, "content")?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "content" });
        }
        if trimmed.chars().count() > MAX_POST_LEN {
            return Err(ValidationError::TooLong {
                field: "content",
                max: MAX_POST_LEN,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PostContent {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_is_trimmed() {
        let content = PostContent::new(Some("  hello feed \n".into())).unwrap();
        assert_eq!(content.as_str(), "hello feed");
    }

    #[test]
    fn blank_content_rejected() {
        assert_eq!(
            PostContent::new(Some(" \n\t ".into())).unwrap_err(),
            ValidationError::Empty { field: "content" }
        );
        assert_eq!(
            PostContent::new(None).unwrap_err(),
            ValidationError::Required { field: "content" }
        );
    }

    #[test]
    fn max_length_applies_after_trim() {
        let padded = format!("  {}  ", "a".repeat(MAX_POST_LEN));
        assert!(PostContent::new(Some(padded)).is_ok());
        assert!(PostContent::new(Some("a".repeat(MAX_POST_LEN + 1))).is_err());
    }
}
