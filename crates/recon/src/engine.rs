use std::collections::HashMap;

use crate::classify::classify_all;
use crate::config::RefcheckConfig;
use crate::error::ReferralError;
use crate::evidence::compute_summary;
use crate::join::join_referrals;
use crate::load::{load_referrals, load_rewards, load_statuses, load_transactions, load_users};
use crate::model::{ClassifyMeta, ClassifyResult, ReferralInput};
use crate::report::render_csv;
use crate::rules::RuleContext;
use crate::schema::DatasetKind;

/// Classify every referral per config. Returns labeled rows, summary, and the
/// rendered CSV report. Fails on the first unresolved reference; nothing is
/// partially produced.
pub fn run(
    config: &RefcheckConfig,
    input: &ReferralInput,
) -> Result<(ClassifyResult, String), ReferralError> {
    let settings = config.time_settings()?;
    let joined = join_referrals(input)?;

    let ctx = RuleContext {
        rules: &config.rules,
        zones: &settings.zones,
    };
    let rows = classify_all(
        &joined,
        &config.rules.active,
        &ctx,
        config.output.title_case_names,
    );

    let report = render_csv(&rows)?;
    let summary = compute_summary(&rows, &report);

    log::info!(
        "classified {} referrals: {} valid, {} invalid",
        summary.total,
        summary.valid,
        summary.invalid
    );

    let result = ClassifyResult {
        meta: ClassifyMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            rules: config.rules.active.clone(),
        },
        summary,
        rows,
    };
    Ok((result, report))
}

/// Parse raw CSV text for every configured dataset into typed records.
///
/// `sources` maps each configured dataset to its file contents.
pub fn load_input(
    config: &RefcheckConfig,
    sources: &HashMap<DatasetKind, String>,
) -> Result<ReferralInput, ReferralError> {
    let settings = config.time_settings()?;
    let datasets = &config.datasets;

    let text = |kind: DatasetKind| {
        sources.get(&kind).map(String::as_str).ok_or_else(|| {
            ReferralError::ConfigValidation(format!("no data supplied for dataset '{kind}'"))
        })
    };

    let referrals = load_referrals(text(DatasetKind::Referrals)?, &datasets.referrals, &settings)?;
    let users = load_users(text(DatasetKind::Users)?, &datasets.users, &settings)?;

    let transactions = match &datasets.transactions {
        Some(d) => Some(load_transactions(text(DatasetKind::Transactions)?, d, &settings)?),
        None => None,
    };
    let statuses = match &datasets.statuses {
        Some(d) => Some(load_statuses(text(DatasetKind::Statuses)?, d)?),
        None => None,
    };
    let rewards = match &datasets.rewards {
        Some(d) => Some(load_rewards(text(DatasetKind::Rewards)?, d)?),
        None => None,
    };

    Ok(ReferralInput {
        referrals,
        users,
        transactions,
        statuses,
        rewards,
    })
}
