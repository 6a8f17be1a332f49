//! Review Model

use serde::{Deserialize, Serialize};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;
/// Comment limit in characters
pub const MAX_COMMENT_LEN: usize = 500;

/// Append-only review of one order party by the other
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    pub id: String,
    /// 1..=5
    pub rating: u8,
    pub comment: String,
    pub reviewer_id: String,
    pub reviewer_name: String,
    pub reviewed_user_id: String,
    pub order_id: String,
    pub created_at: i64,
}

/// Clamp any integer into the rating range
pub fn clamp_rating(raw: i64) -> u8 {
    raw.clamp(MIN_RATING as i64, MAX_RATING as i64) as u8
}

/// Submit review payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewCreate {
    pub order_id: String,
    pub reviewed_user_id: String,
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
}

/// Eligibility answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewEligibility {
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_rating() {
        assert_eq!(clamp_rating(0), 1);
        assert_eq!(clamp_rating(6), 5);
        assert_eq!(clamp_rating(-40), 1);
        assert_eq!(clamp_rating(i64::MAX), 5);
        assert_eq!(clamp_rating(3), 3);
    }
}
