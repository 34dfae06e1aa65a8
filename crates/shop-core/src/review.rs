//! Customer reviews (append-only).

use crate::error::{ShopError, ShopResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Allowed rating range
pub const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// A stored review
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Review {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Author
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub comment: String,
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of `POST /review`; the author comes from the bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewReview {
    #[serde(default)]
    pub name: Option<String>,
    pub comment: String,
    pub rating: u8,
}

impl NewReview {
    pub fn validate(&self) -> ShopResult<()> {
        if self.comment.trim().is_empty() {
            return Err(ShopError::InvalidRequest(
                "review comment must not be empty".to_string(),
            ));
        }
        if !RATING_RANGE.contains(&self.rating) {
            return Err(ShopError::InvalidRequest(format!(
                "rating must be between {} and {}, got {}",
                RATING_RANGE.start(),
                RATING_RANGE.end(),
                self.rating
            )));
        }
        Ok(())
    }

    pub fn into_review(self, author: &str, now: DateTime<Utc>) -> Review {
        Review {
            id: None,
            email: author.to_string(),
            name: self.name,
            comment: self.comment,
            rating: self.rating,
            created_at: Some(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        let mut review = NewReview {
            name: None,
            comment: "Solid build".to_string(),
            rating: 5,
        };
        assert!(review.validate().is_ok());

        review.rating = 0;
        assert!(review.validate().is_err());

        review.rating = 6;
        assert!(review.validate().is_err());
    }

    #[test]
    fn test_author_from_token() {
        let review = NewReview {
            name: Some("Ann".to_string()),
            comment: "Fast shipping".to_string(),
            rating: 4,
        }
        .into_review("ann@x.com", Utc::now());

        assert_eq!(review.email, "ann@x.com");
        assert_eq!(review.rating, 4);
    }
}
