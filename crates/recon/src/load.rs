use std::collections::HashSet;

use crate::config::DatasetConfig;
use crate::error::ReferralError;
use crate::model::{
    PersonRef, ReferralRecord, RewardRecord, SourceCategory, StatusRecord, TransactionRecord,
    UserRecord,
};
use crate::schema::{self, Table};
use crate::time::{self, TimeSettings};

/// Load referral events: schema check, timestamp normalization, category
/// derivation, and the `referral_details_id` uniqueness check.
pub fn load_referrals(
    csv_data: &str,
    dataset: &DatasetConfig,
    settings: &TimeSettings,
) -> Result<Vec<ReferralRecord>, ReferralError> {
    let table = Table::read(&schema::REFERRALS, csv_data, dataset)?;
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(table.len());

    // Cells are checked row by row in column order, so the first bad cell is reported.
    for row in table.rows() {
        let referral_details_id = row
            .integer("referral_details_id")?
            .ok_or_else(|| row.invalid("referral_details_id"))?;
        if !seen.insert(referral_details_id) {
            return Err(ReferralError::DuplicateKey {
                dataset: "referrals".into(),
                key: referral_details_id.to_string(),
            });
        }

        let referral_id = row.uuid("referral_id")?.ok_or_else(|| row.invalid("referral_id"))?;
        let referral_source = row.text("referral_source")?;

        // Empty category is derived from the source text; it must end up Online or Offline.
        let category = row.parsed("referral_source_category", SourceCategory::parse)?;
        let referral_source_category = match category {
            Some(category) => category,
            None => SourceCategory::from_source(&referral_source)
                .ok_or_else(|| row.invalid("referral_source_category"))?,
        };
        let referral_at = row.parsed("referral_at", |v| time::normalize_timestamp(v, settings))?;

        out.push(ReferralRecord {
            referral_details_id,
            referral_id,
            referral_source,
            referral_source_category,
            referral_at,
            person: PersonRef {
                referrer_id: row.identifier("referrer_id")?,
                referrer_name: row.text("referrer_name")?,
                referrer_phone_number: row.text("referrer_phone_number")?,
                referrer_homeclub: row.text("referrer_homeclub")?,
                referee_id: row.identifier("referee_id")?,
                referee_name: row.text("referee_name")?,
                referee_phone: row.text("referee_phone")?,
            },
            transaction_id: row.identifier("transaction_id")?,
            status_id: row.identifier("user_referral_status_id")?,
            reward_id: row.identifier("referral_reward_id")?,
            is_reward_granted: row.boolean("is_reward_granted")?.unwrap_or(false),
        });
    }

    log::info!("loaded {} referrals", out.len());
    Ok(out)
}

pub fn load_users(
    csv_data: &str,
    dataset: &DatasetConfig,
    settings: &TimeSettings,
) -> Result<Vec<UserRecord>, ReferralError> {
    let table = Table::read(&schema::USERS, csv_data, dataset)?;
    let mut out = Vec::with_capacity(table.len());

    for row in table.rows() {
        out.push(UserRecord {
            user_id: row.required_identifier("user_id")?,
            name: row.text("name")?,
            phone_number: row.text("phone_number")?,
            homeclub: row.text("homeclub")?,
            timezone: row.opt_text("timezone_homeclub")?,
            membership_expired_date: row
                .parsed("membership_expired_date", |v| time::parse_date(v, settings))?,
            is_deleted: row.boolean("is_deleted")?.unwrap_or(false),
        });
    }

    log::info!("loaded {} users", out.len());
    Ok(out)
}

pub fn load_transactions(
    csv_data: &str,
    dataset: &DatasetConfig,
    settings: &TimeSettings,
) -> Result<Vec<TransactionRecord>, ReferralError> {
    let table = Table::read(&schema::TRANSACTIONS, csv_data, dataset)?;
    let mut out = Vec::with_capacity(table.len());
    for row in table.rows() {
        out.push(TransactionRecord {
            transaction_id: row.required_identifier("transaction_id")?,
            status: row.text("transaction_status")?,
            kind: row.text("transaction_type")?,
            transaction_at: row
                .parsed("transaction_at", |v| time::normalize_timestamp(v, settings))?,
        });
    }

    log::info!("loaded {} transactions", out.len());
    Ok(out)
}

pub fn load_statuses(
    csv_data: &str,
    dataset: &DatasetConfig,
) -> Result<Vec<StatusRecord>, ReferralError> {
    let table = Table::read(&schema::STATUSES, csv_data, dataset)?;
    table
        .rows()
        .map(|row| {
            Ok(StatusRecord {
                id: row.required_identifier("id")?,
                description: row.text("description")?,
            })
        })
        .collect()
}

pub fn load_rewards(
    csv_data: &str,
    dataset: &DatasetConfig,
) -> Result<Vec<RewardRecord>, ReferralError> {
    let table = Table::read(&schema::REWARDS, csv_data, dataset)?;
    table
        .rows()
        .map(|row| {
            Ok(RewardRecord {
                id: row.required_identifier("id")?,
                reward_value: row.decimal("reward_value")?.unwrap_or(0.0),
            })
        })
        .collect()
}
