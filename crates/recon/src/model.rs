use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;
use uuid::Uuid;

use crate::rules::RuleName;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SourceCategory {
    Online,
    Offline,
}

impl SourceCategory {
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("online") {
            Some(Self::Online)
        } else if value.eq_ignore_ascii_case("offline") {
            Some(Self::Offline)
        } else {
            None
        }
    }

    /// Category implied by a free-text referral source, if any keyword matches.
    pub fn from_source(source: &str) -> Option<Self> {
        const ONLINE: [&str; 4] = ["user sign up", "app", "web", "online"];
        const OFFLINE: [&str; 3] = ["draft transaction", "lead", "walk"];

        let s = source.to_lowercase();
        if ONLINE.iter().any(|k| s.contains(k)) {
            Some(Self::Online)
        } else if OFFLINE.iter().any(|k| s.contains(k)) {
            Some(Self::Offline)
        } else {
            None
        }
    }
}

impl std::fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Online => write!(f, "Online"),
            Self::Offline => write!(f, "Offline"),
        }
    }
}

/// Referrer and referee as recorded on the referral row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonRef {
    pub referrer_id: Option<String>,
    pub referrer_name: String,
    pub referrer_phone_number: String,
    pub referrer_homeclub: String,
    pub referee_id: Option<String>,
    pub referee_name: String,
    pub referee_phone: String,
}

/// One referral event after schema validation and time normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferralRecord {
    pub referral_details_id: i64,
    pub referral_id: Uuid,
    pub referral_source: String,
    pub referral_source_category: SourceCategory,
    pub referral_at: Option<DateTime<FixedOffset>>,
    pub person: PersonRef,
    pub transaction_id: Option<String>,
    pub status_id: Option<String>,
    pub reward_id: Option<String>,
    pub is_reward_granted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub user_id: String,
    pub name: String,
    pub phone_number: String,
    pub homeclub: String,
    pub timezone: Option<String>,
    pub membership_expired_date: Option<NaiveDate>,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub transaction_id: String,
    pub status: String,
    pub kind: String,
    pub transaction_at: Option<DateTime<FixedOffset>>,
}

impl TransactionRecord {
    pub fn is_paid(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case("paid")
    }

    pub fn is_new(&self) -> bool {
        self.kind.trim().eq_ignore_ascii_case("new")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRecord {
    pub id: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RewardRecord {
    pub id: String,
    pub reward_value: f64,
}

/// Pre-loaded datasets. Optional ones are `None` when not configured.
#[derive(Debug, Clone, Default)]
pub struct ReferralInput {
    pub referrals: Vec<ReferralRecord>,
    pub users: Vec<UserRecord>,
    pub transactions: Option<Vec<TransactionRecord>>,
    pub statuses: Option<Vec<StatusRecord>>,
    pub rewards: Option<Vec<RewardRecord>>,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// One labeled report row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedReferral {
    pub referral_details_id: i64,
    pub referral_id: String,
    pub referral_source: String,
    pub referral_source_category: SourceCategory,
    pub referral_at: Option<DateTime<FixedOffset>>,
    pub referrer_id: String,
    pub referrer_name: String,
    pub referrer_phone_number: String,
    pub referrer_homeclub: String,
    pub referee_id: String,
    pub referee_name: String,
    pub referee_phone: String,
    pub is_business_logic_valid: bool,
    /// First rule that failed. Diagnostic only; not part of the CSV report.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_rule: Option<RuleName>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifySummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    /// Rule name → number of referrals it was the first failure for.
    pub rule_failures: BTreeMap<String, usize>,
    /// SHA-256 of the rendered CSV report.
    pub report_sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifyMeta {
    pub config_name: String,
    pub engine_version: String,
    pub rules: Vec<RuleName>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassifyResult {
    pub meta: ClassifyMeta,
    pub summary: ClassifySummary,
    pub rows: Vec<ClassifiedReferral>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_from_source_keywords() {
        assert_eq!(SourceCategory::from_source("User Sign Up"), Some(SourceCategory::Online));
        assert_eq!(SourceCategory::from_source("Mobile App"), Some(SourceCategory::Online));
        assert_eq!(
            SourceCategory::from_source("Draft Transaction"),
            Some(SourceCategory::Offline)
        );
        assert_eq!(SourceCategory::from_source("Walk-in"), Some(SourceCategory::Offline));
        assert_eq!(SourceCategory::from_source("Billboard"), None);
    }

    #[test]
    fn category_parse_is_case_insensitive() {
        assert_eq!(SourceCategory::parse("ONLINE"), Some(SourceCategory::Online));
        assert_eq!(SourceCategory::parse(" offline "), Some(SourceCategory::Offline));
        assert_eq!(SourceCategory::parse("Other"), None);
        assert_eq!(SourceCategory::Offline.to_string(), "Offline");
    }

    #[test]
    fn transaction_flags() {
        let tx = TransactionRecord {
            transaction_id: "t1".into(),
            status: "paid".into(),
            kind: "NEW".into(),
            transaction_at: None,
        };
        assert!(tx.is_paid());
        assert!(tx.is_new());
    }
}
