//! Users and profiles

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::validation::{non_blank, required};
use super::{Role, ValidationError};

/// Maximum length for display names
pub const MAX_NAME_LEN: usize = 120;

/// Maximum length for email addresses (RFC 5321 path limit)
pub const MAX_EMAIL_LEN: usize = 254;

/// Minimum password length accepted at registration
pub const MIN_PASSWORD_LEN: usize = 8;

const MAX_BIO_LEN: usize = 2_000;
const MAX_SHORT_TEXT_LEN: usize = 200;
const MAX_URL_LEN: usize = 2_048;

/// Loose shape check: one `@`, no whitespace, a dot in the domain
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("invalid email regex"));

/// Validated, lowercased email address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Email(String);

impl Email {
    /// Emails are unique case-insensitively, so they are stored lowercased.
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::Empty { field: "email" });
        }
        if s.len() > MAX_EMAIL_LEN {
            return Err(ValidationError::TooLong {
                field: "email",
                max: MAX_EMAIL_LEN,
            });
        }
        if !EMAIL_RE.is_match(s) {
            return Err(ValidationError::InvalidFormat {
                field: "email",
                reason: "must be a valid email address",
            });
        }
        Ok(Self(s.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A user as returned to its owner. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub bio: Option<String>,
    pub institution: Option<String>,
    pub field_of_study: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user together with the stored password hash, for login only
#[derive(Debug, Clone, FromRow)]
pub struct Credentials {
    #[sqlx(flatten)]
    pub user: User,
    pub password_hash: String,
}

/// Input for a new account; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: Email,
    pub password_hash: String,
    pub role: Role,
}

/// Follower/following/post counters for a public profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub followers_count: i64,
    pub following_count: i64,
    pub posts_count: i64,
}

/// Profile visible to any authenticated user (no email)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: Uuid,
    pub full_name: String,
    pub role: Role,
    pub bio: Option<String>,
    pub institution: Option<String>,
    pub field_of_study: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub stats: ProfileStats,
}

impl PublicProfile {
    pub fn new(user: User, stats: ProfileStats) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            role: user.role,
            bio: user.bio,
            institution: user.institution,
            field_of_study: user.field_of_study,
            avatar_url: user.avatar_url,
            created_at: user.created_at,
            stats,
        }
    }
}

/// Peer shown in follower/following lists
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub full_name: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub avatar_url: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            full_name: u.full_name.clone(),
            role: u.role,
            avatar_url: u.avatar_url.clone(),
        }
    }
}

/// Validate a display name
pub fn full_name(value: Option<String>) -> Result<String, ValidationError> {
    let name = non_blank(required(value, "fullName")?, "fullName", MAX_NAME_LEN)?;
    Ok(name.trim().to_owned())
}

/// Validate a plaintext password before hashing
pub fn password(value: Option<String>) -> Result<String, ValidationError> {
    let value = required(value, "password")?;
    if value.is_empty() {
        return Err(ValidationError::Empty { field: "password" });
    }
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::TooShort {
            field: "password",
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(value)
}

/// Validated self-service profile update.
///
/// `None` keeps the stored value. Optional text fields may be set to "".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub institution: Option<String>,
    pub field_of_study: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileChanges {
    pub fn new(
        full_name: Option<String>,
        bio: Option<String>,
        institution: Option<String>,
        field_of_study: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            full_name: full_name.map(|n| self::full_name(Some(n))).transpose()?,
            bio: bio.map(|b| bounded(b, "bio", MAX_BIO_LEN)).transpose()?,
            institution: institution
                .map(|i| bounded(i, "institution", MAX_SHORT_TEXT_LEN))
                .transpose()?,
            field_of_study: field_of_study
                .map(|f| bounded(f, "fieldOfStudy", MAX_SHORT_TEXT_LEN))
                .transpose()?,
            avatar_url: avatar_url
                .map(|a| bounded(a, "avatarUrl", MAX_URL_LEN))
                .transpose()?,
        })
    }

    /// Merge onto the current row.
    pub fn apply(self, current: User) -> User {
        User {
            full_name: self.full_name.unwrap_or(current.full_name),
            bio: self.bio.or(current.bio),
            institution: self.institution.or(current.institution),
            field_of_study: self.field_of_study.or(current.field_of_study),
            avatar_url: self.avatar_url.or(current.avatar_url),
            ..current
        }
    }
}

fn bounded(value: String, field: &'static str, max: usize) -> Result<String, ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            full_name: "Thandi Nkosi".into(),
            email: "thandi@example.org".into(),
            role: Role::Learner,
            bio: Some("Engineering student".into()),
            institution: None,
            field_of_study: Some("Civil".into()),
            avatar_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn email_is_lowercased() {
        let email = Email::new("  Thandi@Example.ORG ").unwrap();
        assert_eq!(email.as_str(), "thandi@example.org");
    }

    #[test]
    fn email_rejects_bad_shapes() {
        assert!(matches!(Email::new("").unwrap_err(), ValidationError::Empty { .. }));
        assert!(matches!(
            Email::new("no-at-sign").unwrap_err(),
            ValidationError::InvalidFormat { .. }
        ));
        assert!(Email::new("a@b").is_err());
        assert!(Email::new("a b@c.d").is_err());
    }

    #[test]
    fn password_minimum_length() {
        assert!(matches!(
            password(Some("short".into())).unwrap_err(),
            ValidationError::TooShort { min: 8, .. }
        ));
        assert!(password(Some("long enough".into())).is_ok());
        assert_eq!(
            password(None).unwrap_err(),
            ValidationError::Required { field: "password" }
        );
    }

    #[test]
    fn profile_merge_keeps_omitted_fields() {
        let current = sample();
        let changes = ProfileChanges::new(None, None, Some("UCT".into()), None, None).unwrap();
        let merged = changes.apply(current.clone());

        assert_eq!(merged.full_name, current.full_name);
        assert_eq!(merged.bio, current.bio);
        assert_eq!(merged.institution.as_deref(), Some("UCT"));
        assert_eq!(merged.email, current.email);
        assert_eq!(merged.role, Role::Learner);
    }

    #[test]
    fn profile_merge_can_clear_optional_text() {
        let changes = ProfileChanges::new(None, Some(String::new()), None, None, None).unwrap();
        let merged = changes.apply(sample());
        assert_eq!(merged.bio.as_deref(), Some(""));
    }

    #[test]
    fn profile_rejects_blank_name() {
        let err = ProfileChanges::new(Some("   ".into()), None, None, None, None).unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: "fullName" });
    }

    #[test]
    fn public_profile_has_no_email() {
        let profile = PublicProfile::new(
            sample(),
            ProfileStats {
                followers_count: 2,
                following_count: 1,
                posts_count: 7,
            },
        );
        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("email").is_none());
        assert_eq!(json["followersCount"], 2);
        assert_eq!(json["postsCount"], 7);
    }
}
