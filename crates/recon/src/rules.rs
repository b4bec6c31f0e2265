//! Business rules. Each rule is a named predicate over a joined referral;
//! the active list from config is evaluated in order and a referral is valid
//! only if every rule passes. New rules are appended to [`RuleName`].

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::config::RulesConfig;
use crate::join::JoinedReferral;
use crate::model::SourceCategory;
use crate::schema::DatasetKind;
use crate::time::TimezoneTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleName {
    /// Referrer and referee are different people (id and phone).
    DistinctIdentity,
    /// `referrer_id`, `referee_id` and `referral_at` are present.
    RequiredFields,
    /// Referral precedes its transaction by at most `max_days_to_transaction`.
    ReferralWindow,
    /// Recorded category agrees with the one implied by the source text.
    SourceCategory,
    /// A rewarded referral's transaction fell in the referral's calendar month
    /// (homeclub local time).
    TransactionSameMonth,
    /// A rewarded referral's referrer account is live and membership not expired.
    ReferrerActive,
    RewardRequiresSuccess,
    SuccessRequiresReward,
    RewardRequiresPaidTransaction,
    RewardGranted,
    /// A paid transaction after the referral should have earned a reward.
    PaidTransactionRequiresReward,
    /// Status settles the referral: success with a reward, or pending/failed without one.
    StatusResolved,
}

impl RuleName {
    pub const ALL: [RuleName; 12] = [
        Self::DistinctIdentity,
        Self::RequiredFields,
        Self::ReferralWindow,
        Self::SourceCategory,
        Self::TransactionSameMonth,
        Self::ReferrerActive,
        Self::RewardRequiresSuccess,
        Self::SuccessRequiresReward,
        Self::RewardRequiresPaidTransaction,
        Self::RewardGranted,
        Self::PaidTransactionRequiresReward,
        Self::StatusResolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DistinctIdentity => "distinct_identity",
            Self::RequiredFields => "required_fields",
            Self::ReferralWindow => "referral_window",
            Self::SourceCategory => "source_category",
            Self::TransactionSameMonth => "transaction_same_month",
            Self::ReferrerActive => "referrer_active",
            Self::RewardRequiresSuccess => "reward_requires_success",
            Self::SuccessRequiresReward => "success_requires_reward",
            Self::RewardRequiresPaidTransaction => "reward_requires_paid_transaction",
            Self::RewardGranted => "reward_granted",
            Self::PaidTransactionRequiresReward => "paid_transaction_requires_reward",
            Self::StatusResolved => "status_resolved",
        }
    }

    /// Optional datasets a rule cannot be judged without.
    pub fn required_datasets(&self) -> &'static [DatasetKind] {
        match self {
            Self::DistinctIdentity
            | Self::RequiredFields
            | Self::ReferralWindow
            | Self::SourceCategory
            | Self::ReferrerActive => &[],
            Self::TransactionSameMonth => &[DatasetKind::Transactions],
            Self::RewardRequiresSuccess | Self::SuccessRequiresReward | Self::StatusResolved => {
                &[DatasetKind::Rewards, DatasetKind::Statuses]
            }
            Self::RewardRequiresPaidTransaction | Self::PaidTransactionRequiresReward => {
                &[DatasetKind::Rewards, DatasetKind::Transactions]
            }
            Self::RewardGranted => &[DatasetKind::Rewards],
        }
    }

    pub fn check(&self, row: &JoinedReferral<'_>, ctx: &RuleContext<'_>) -> bool {
        match self {
            Self::DistinctIdentity => distinct_identity(row),
            Self::RequiredFields => required_fields(row),
            Self::ReferralWindow => referral_window(row, ctx),
            Self::SourceCategory => source_category(row),
            Self::TransactionSameMonth => transaction_same_month(row, ctx),
            Self::ReferrerActive => referrer_active(row, ctx),
            Self::RewardRequiresSuccess => !row.has_reward() || is_success(row, ctx),
            Self::SuccessRequiresReward => !is_success(row, ctx) || row.has_reward(),
            Self::RewardRequiresPaidTransaction => {
                !row.has_reward() || row.transaction.is_some_and(|t| t.is_paid() && t.is_new())
            }
            Self::RewardGranted => !row.has_reward() || row.referral.is_reward_granted,
            Self::PaidTransactionRequiresReward => paid_transaction_requires_reward(row, ctx),
            Self::StatusResolved => status_resolved(row, ctx),
        }
    }
}

impl std::fmt::Display for RuleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a rule may consult besides the row itself.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub rules: &'a RulesConfig,
    pub zones: &'a TimezoneTable,
}

/// Evaluate `active` in order; returns the first rule that fails.
pub fn first_failure(
    active: &[RuleName],
    row: &JoinedReferral<'_>,
    ctx: &RuleContext<'_>,
) -> Option<RuleName> {
    active.iter().copied().find(|rule| !rule.check(row, ctx))
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

fn is_success(row: &JoinedReferral<'_>, ctx: &RuleContext<'_>) -> bool {
    row.status_description().is_some_and(|s| ctx.rules.is_success_status(s))
}

fn is_pending(row: &JoinedReferral<'_>, ctx: &RuleContext<'_>) -> bool {
    row.status_description().is_some_and(|s| ctx.rules.is_pending_status(s))
}

fn phone_digits(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

fn distinct_identity(row: &JoinedReferral<'_>) -> bool {
    let p = &row.referral.person;
    if let (Some(a), Some(b)) = (&p.referrer_id, &p.referee_id) {
        if a == b {
            return false;
        }
    }
    let a = phone_digits(row.referrer_phone());
    let b = phone_digits(row.referee_phone());
    a.is_empty() || b.is_empty() || a != b
}

fn required_fields(row: &JoinedReferral<'_>) -> bool {
    let r = row.referral;
    r.person.referrer_id.is_some() && r.person.referee_id.is_some() && r.referral_at.is_some()
}

fn referral_window(row: &JoinedReferral<'_>, ctx: &RuleContext<'_>) -> bool {
    let Some(tx_at) = row.transaction.and_then(|t| t.transaction_at) else {
        return true;
    };
    let Some(referral_at) = row.referral.referral_at else {
        return false;
    };
    let gap = tx_at - referral_at;
    gap.num_seconds() >= 0
        && gap.num_seconds() <= i64::from(ctx.rules.max_days_to_transaction) * 86_400
}

fn source_category(row: &JoinedReferral<'_>) -> bool {
    let r = row.referral;
    match SourceCategory::from_source(&r.referral_source) {
        Some(expected) => expected == r.referral_source_category,
        None => true,
    }
}

fn transaction_same_month(row: &JoinedReferral<'_>, ctx: &RuleContext<'_>) -> bool {
    if !row.has_reward() {
        return true;
    }
    let Some(tx_at) = row.transaction.and_then(|t| t.transaction_at) else {
        return true;
    };
    let Some(referral_at) = row.referral.referral_at else {
        return false;
    };
    let a = row.local(&referral_at, ctx.zones);
    let b = row.local(&tx_at, ctx.zones);
    a.year() == b.year() && a.month() == b.month()
}

fn referrer_active(row: &JoinedReferral<'_>, ctx: &RuleContext<'_>) -> bool {
    if !row.has_reward() {
        return true;
    }
    let Some(referrer) = row.referrer else {
        return false;
    };
    if referrer.is_deleted {
        return false;
    }
    let as_of = match (ctx.rules.as_of, row.referral.referral_at) {
        (Some(date), _) => date,
        (None, Some(at)) => row.local(&at, ctx.zones).date_naive(),
        (None, None) => return false,
    };
    referrer
        .membership_expired_date
        .is_some_and(|expiry| expiry >= as_of)
}

fn paid_transaction_requires_reward(row: &JoinedReferral<'_>, ctx: &RuleContext<'_>) -> bool {
    if row.has_reward() {
        return true;
    }
    if is_pending(row, ctx) {
        return true;
    }
    let paid_after_referral = match (row.transaction, row.referral.referral_at) {
        (Some(tx), Some(referral_at)) => {
            tx.is_paid() && tx.transaction_at.is_some_and(|at| at >= referral_at)
        }
        _ => false,
    };
    !paid_after_referral
}

fn status_resolved(row: &JoinedReferral<'_>, ctx: &RuleContext<'_>) -> bool {
    if row.has_reward() {
        is_success(row, ctx)
    } else {
        is_pending(row, ctx)
    }
}
