use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Inclusive bounds for probability and impact ratings.
pub const RATING_MIN: i64 = 1;
pub const RATING_MAX: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Risk {
    pub id: i64,
    pub risk_name: String,
    pub risk_description: Option<String>,
    pub category: Option<String>,
    pub rbs_node_id: Option<i64>,
    pub probability: Option<i64>,
    pub impact: Option<i64>,
    pub status: String,
    pub risk_owner: Option<String>,
    pub latest_reviewed_date: Option<NaiveDate>,
    /// Free-text rationale for the probability rating.
    pub probability_basis: Option<String>,
    /// Free-text rationale for the impact rating.
    pub impact_basis: Option<String>,
    pub notes: Option<String>,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Risk {
    /// probability * impact, when both ratings are present.
    pub fn score(&self) -> Option<i64> {
        score(self.probability, self.impact)
    }

    pub fn risk_level(&self) -> &'static str {
        risk_level(self.score())
    }
}

pub fn score(probability: Option<i64>, impact: Option<i64>) -> Option<i64> {
    match (probability, impact) {
        (Some(p), Some(i)) => Some(p * i),
        _ => None,
    }
}

/// Band a score into a level. Unscored risks read "Not Assessed".
pub fn risk_level(score: Option<i64>) -> &'static str {
    match score {
        None => "Not Assessed",
        Some(s) if s <= 4 => "Low",
        Some(s) if s <= 8 => "Medium",
        Some(s) if s <= 15 => "High",
        Some(_) => "Critical",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_requires_both_ratings() {
        assert_eq!(score(Some(3), Some(4)), Some(12));
        assert_eq!(score(Some(3), None), None);
        assert_eq!(score(None, Some(4)), None);
        assert_eq!(score(None, None), None);
    }

    #[test]
    fn test_risk_level_banding() {
        assert_eq!(risk_level(None), "Not Assessed");
        assert_eq!(risk_level(Some(1)), "Low");
        assert_eq!(risk_level(Some(4)), "Low");
        assert_eq!(risk_level(Some(5)), "Medium");
        assert_eq!(risk_level(Some(8)), "Medium");
        assert_eq!(risk_level(Some(9)), "High");
        assert_eq!(risk_level(Some(15)), "High");
        assert_eq!(risk_level(Some(16)), "Critical");
        assert_eq!(risk_level(Some(25)), "Critical");
    }
}
