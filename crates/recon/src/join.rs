use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};

use crate::error::ReferralError;
use crate::model::{
    ReferralInput, ReferralRecord, RewardRecord, StatusRecord, TransactionRecord, UserRecord,
};
use crate::time::TimezoneTable;

/// A referral with every reference resolved. Borrows from the input datasets.
#[derive(Debug, Clone, Copy)]
pub struct JoinedReferral<'a> {
    pub referral: &'a ReferralRecord,
    pub referrer: Option<&'a UserRecord>,
    pub referee: Option<&'a UserRecord>,
    pub transaction: Option<&'a TransactionRecord>,
    pub status: Option<&'a StatusRecord>,
    pub reward: Option<&'a RewardRecord>,
}

impl<'a> JoinedReferral<'a> {
    pub fn has_reward(&self) -> bool {
        self.reward.map(|r| r.reward_value > 0.0).unwrap_or(false)
    }

    pub fn status_description(&self) -> Option<&'a str> {
        self.status.map(|s| s.description.as_str())
    }

    // Contact fields: the referral's own text, else the joined user's.

    pub fn referrer_name(&self) -> &'a str {
        or_user(&self.referral.person.referrer_name, self.referrer, |u| &u.name)
    }

    pub fn referrer_phone(&self) -> &'a str {
        or_user(&self.referral.person.referrer_phone_number, self.referrer, |u| &u.phone_number)
    }

    pub fn referrer_homeclub(&self) -> &'a str {
        or_user(&self.referral.person.referrer_homeclub, self.referrer, |u| &u.homeclub)
    }

    pub fn referee_name(&self) -> &'a str {
        or_user(&self.referral.person.referee_name, self.referee, |u| &u.name)
    }

    pub fn referee_phone(&self) -> &'a str {
        or_user(&self.referral.person.referee_phone, self.referee, |u| &u.phone_number)
    }

    /// Zones to try, in order, when a timestamp must be read in homeclub local time.
    pub fn zone_candidates(&self) -> [Option<&'a str>; 2] {
        [
            self.referrer.and_then(|u| u.timezone.as_deref()),
            self.referee.and_then(|u| u.timezone.as_deref()),
        ]
    }

    pub fn local(
        &self,
        ts: &DateTime<FixedOffset>,
        zones: &TimezoneTable,
    ) -> DateTime<FixedOffset> {
        zones.to_local(ts, &self.zone_candidates())
    }
}

fn or_user<'a>(
    own: &'a str,
    user: Option<&'a UserRecord>,
    field: impl Fn(&'a UserRecord) -> &'a String,
) -> &'a str {
    match user {
        Some(u) if own.trim().is_empty() => field(u).as_str(),
        _ => own,
    }
}

/// First-occurrence index over a keyed dataset.
struct KeyIndex<'a, T> {
    map: HashMap<&'a str, &'a T>,
}

impl<'a, T> KeyIndex<'a, T> {
    fn build(items: &'a [T], key: impl Fn(&'a T) -> &'a str, dataset: &str) -> Self {
        let mut map = HashMap::with_capacity(items.len());
        for item in items {
            let k = key(item);
            if map.contains_key(k) {
                log::debug!("{dataset}: duplicate key '{k}', keeping first occurrence");
                continue;
            }
            map.insert(k, item);
        }
        Self { map }
    }

    fn resolve(
        &self,
        key: Option<&str>,
        referral: &ReferralRecord,
        role: &str,
    ) -> Result<Option<&'a T>, ReferralError> {
        let Some(key) = key else {
            return Ok(None);
        };
        self.map
            .get(key)
            .copied()
            .map(Some)
            .ok_or_else(|| ReferralError::MissingReference {
                referral_id: referral.referral_id.to_string(),
                role: role.into(),
                key: key.into(),
            })
    }
}

/// Resolve every referral's references, preserving input order.
///
/// A present key that the target dataset lacks is a `MissingReference` error.
/// Absent keys stay `None`. Link columns whose dataset is not configured are ignored.
pub fn join_referrals(input: &ReferralInput) -> Result<Vec<JoinedReferral<'_>>, ReferralError> {
    let users = KeyIndex::build(&input.users, |u| u.user_id.as_str(), "users");
    let transactions = input
        .transactions
        .as_deref()
        .map(|t| KeyIndex::build(t, |t| t.transaction_id.as_str(), "transactions"));
    let statuses = input
        .statuses
        .as_deref()
        .map(|s| KeyIndex::build(s, |s| s.id.as_str(), "statuses"));
    let rewards = input
        .rewards
        .as_deref()
        .map(|r| KeyIndex::build(r, |r| r.id.as_str(), "rewards"));

    let mut out = Vec::with_capacity(input.referrals.len());
    for referral in &input.referrals {
        let person = &referral.person;
        let referrer = users.resolve(person.referrer_id.as_deref(), referral, "referrer")?;
        let referee = users.resolve(person.referee_id.as_deref(), referral, "referee")?;

        let transaction = match &transactions {
            Some(idx) => idx.resolve(referral.transaction_id.as_deref(), referral, "transaction")?,
            None => None,
        };
        let status = match &statuses {
            Some(idx) => idx.resolve(referral.status_id.as_deref(), referral, "status")?,
            None => None,
        };
        let reward = match &rewards {
            Some(idx) => idx.resolve(referral.reward_id.as_deref(), referral, "reward")?,
            None => None,
        };

        out.push(JoinedReferral {
            referral,
            referrer,
            referee,
            transaction,
            status,
            reward,
        });
    }

    log::debug!("joined {} referrals", out.len());
    Ok(out)
}
