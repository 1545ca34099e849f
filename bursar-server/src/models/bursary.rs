//! Bursaries posted by providers

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::validation::{non_blank, required};
use super::ValidationError;

/// Maximum length for bursary titles
pub const MAX_TITLE_LEN: usize = 200;

/// Maximum length for bursary descriptions
pub const MAX_DESCRIPTION_LEN: usize = 20_000;

/// Amounts must stay below this to fit the NUMERIC(12, 2) column
pub const MAX_AMOUNT: f64 = 10_000_000_000.0;

/// Bursary lifecycle. `close` only ever moves to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BursaryStatus {
    Open,
    Closed,
}

impl BursaryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for BursaryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BursaryStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(ValidationError::InvalidVariant {
                field: "status",
                value: s.to_owned(),
            }),
        }
    }
}

impl TryFrom<String> for BursaryStatus {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// A bursary row
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Bursary {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub title: String,
    pub description: String,
    pub amount: f64,
    pub deadline: NaiveDate,
    #[sqlx(try_from = "String")]
    pub status: BursaryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public listing entry: bursary plus the provider's display name
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BursaryListing {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub bursary: Bursary,
    pub provider_name: String,
}

/// Validated input for a new bursary
#[derive(Debug, Clone, PartialEq)]
pub struct NewBursary {
    pub title: String,
    pub description: String,
    pub amount: f64,
    pub deadline: NaiveDate,
}

impl NewBursary {
    /// All four fields are required.
    pub fn new(
        title: Option<String>,
        description: Option<String>,
        amount: Option<f64>,
        deadline: Option<NaiveDate>,
    ) -> Result<Self, ValidationError> {
        let title = non_blank(required(title, "title")?, "title", MAX_TITLE_LEN)?;
        let description = non_blank(
            required(description, "description")?,
            "description",
            MAX_DESCRIPTION_LEN,
        )?;
        let amount = positive_amount(required(amount, "amount")?)?;
        let deadline = required(deadline, "deadline")?;

        Ok(Self {
            title,
            description,
            amount,
            deadline,
        })
    }
}

/// Validated partial update for a bursary.
///
/// `None` keeps the stored value; `Some` replaces it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BursaryChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub deadline: Option<NaiveDate>,
    pub status: Option<BursaryStatus>,
}

impl BursaryChanges {
    pub fn new(
        title: Option<String>,
        description: Option<String>,
        amount: Option<f64>,
        deadline: Option<NaiveDate>,
        status: Option<&str>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            title: title
                .map(|t| non_blank(t, "title", MAX_TITLE_LEN))
                .transpose()?,
            description: description
                .map(|d| non_blank(d, "description", MAX_DESCRIPTION_LEN))
                .transpose()?,
            amount: amount.map(positive_amount).transpose()?,
            deadline,
            status: status.map(str::parse).transpose()?,
        })
    }

    /// Merge onto the current row.
    pub fn apply(self, current: Bursary) -> Bursary {
        Bursary {
            title: self.title.unwrap_or(current.title),
            description: self.description.unwrap_or(current.description),
            amount: self.amount.unwrap_or(current.amount),
            deadline: self.deadline.unwrap_or(current.deadline),
            status: self.status.unwrap_or(current.status),
            ..current
        }
    }
}

/// Amounts are stored to the cent, so the check runs on the rounded value.
fn positive_amount(amount: f64) -> Result<f64, ValidationError> {
    if !amount.is_finite() {
        return Err(ValidationError::NotPositive { field: "amount" });
    }
    let rounded = (amount * 100.0).round() / 100.0;
    if rounded <= 0.0 {
        return Err(ValidationError::NotPositive { field: "amount" });
    }
    if rounded >= MAX_AMOUNT {
        return Err(ValidationError::OutOfRange {
            field: "amount",
            max: MAX_AMOUNT,
        });
    }
    Ok(rounded)
}

/// Parse a deadline given as `YYYY-MM-DD` or as an RFC 3339 timestamp
/// (only the calendar date is kept).
pub fn parse_deadline(value: Option<String>) -> Result<Option<NaiveDate>, ValidationError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let value = value.trim();
    if let Ok(date) = value.parse::<NaiveDate>() {
        return Ok(Some(date));
    }
    DateTime::parse_from_rfc3339(value)
        .map(|ts| Some(ts.date_naive()))
        .map_err(|_| ValidationError::InvalidFormat {
            field: "deadline",
            reason: "must be a date (YYYY-MM-DD)",
        })
}
