use std::collections::HashMap;
use std::path::PathBuf;

use refcheck_recon::config::RefcheckConfig;
use refcheck_recon::engine::{load_input, run};
use refcheck_recon::model::ClassifyResult;
use refcheck_recon::profile::profile_csv;
use refcheck_recon::report::REPORT_HEADERS;
use refcheck_recon::{DatasetKind, ReferralError, RuleName};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn read_sources(config: &RefcheckConfig) -> HashMap<DatasetKind, String> {
    let dir = fixtures_dir();
    config
        .datasets
        .configured()
        .into_iter()
        .map(|(kind, dataset)| {
            let path = dir.join(&dataset.file);
            let text = std::fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
            (kind, text)
        })
        .collect()
}

fn load_and_run(config_toml: &str) -> (ClassifyResult, String) {
    let config = RefcheckConfig::from_toml(config_toml).unwrap();
    let input = load_input(&config, &read_sources(&config)).unwrap();
    run(&config, &input).unwrap()
}

fn fixture(name: &str) -> String {
    std::fs::read_to_string(fixtures_dir().join(name)).unwrap()
}

fn verdicts(result: &ClassifyResult) -> Vec<(i64, Option<RuleName>)> {
    result
        .rows
        .iter()
        .map(|r| (r.referral_details_id, r.failed_rule))
        .collect()
}

// -------------------------------------------------------------------------
// Default rules, referrals + users only
// -------------------------------------------------------------------------

#[test]
fn minimal_config_default_rules() {
    let (result, report) = load_and_run(&fixture("minimal.toml"));

    assert_eq!(result.summary.total, 16);
    assert_eq!(result.summary.valid, 12);
    assert_eq!(result.summary.invalid, 4);
    assert_eq!(result.summary.rule_failures["distinct_identity"], 2);
    assert_eq!(result.summary.rule_failures["required_fields"], 1);
    assert_eq!(result.summary.rule_failures["source_category"], 1);
    // no transactions configured, so the window cannot fail
    assert!(!result.summary.rule_failures.contains_key("referral_window"));

    assert_eq!(report.lines().count(), 17);
    assert_eq!(report.lines().next().unwrap(), REPORT_HEADERS.join(","));
}

#[test]
fn output_order_matches_input() {
    let (result, report) = load_and_run(&fixture("minimal.toml"));
    let ids: Vec<i64> = result.rows.iter().map(|r| r.referral_details_id).collect();
    assert_eq!(ids, (1001..=1016).collect::<Vec<_>>());

    let report_ids: Vec<&str> = report
        .lines()
        .skip(1)
        .map(|l| l.split(',').next().unwrap())
        .collect();
    assert_eq!(report_ids.first(), Some(&"1001"));
    assert_eq!(report_ids.last(), Some(&"1016"));
}

#[test]
fn timestamps_rendered_in_canonical_offset() {
    let (_, report) = load_and_run(&fixture("minimal.toml"));
    let first = report.lines().nth(1).unwrap();
    assert!(first.contains(",2024-05-05 09:00:00+07:00,"), "{first}");
    assert!(first.ends_with(",True"));

    // 1005 has no referral_at
    let missing = report.lines().find(|l| l.starts_with("1005,")).unwrap();
    assert!(missing.contains(",Online,,2,"), "{missing}");
    assert!(missing.ends_with(",False"));
}

#[test]
fn category_derived_from_source() {
    let (result, _) = load_and_run(&fixture("minimal.toml"));
    let row = result.rows.iter().find(|r| r.referral_details_id == 1007).unwrap();
    assert_eq!(row.referral_source_category.to_string(), "Offline");
    assert!(row.is_business_logic_valid);
}

// -------------------------------------------------------------------------
// Every rule, all datasets
// -------------------------------------------------------------------------

#[test]
fn full_config_all_rules() {
    let (result, _) = load_and_run(&fixture("refcheck.toml"));

    assert_eq!(result.summary.total, 16);
    assert_eq!(result.summary.valid, 2);
    assert_eq!(result.meta.rules.len(), 12);

    use RuleName::*;
    assert_eq!(
        verdicts(&result),
        vec![
            (1001, None),
            (1002, Some(DistinctIdentity)),
            (1003, Some(DistinctIdentity)),
            (1004, Some(SourceCategory)),
            (1005, Some(RequiredFields)),
            (1006, Some(ReferralWindow)),
            (1007, Some(ReferrerActive)),
            (1008, Some(ReferrerActive)),
            (1009, Some(RewardRequiresSuccess)),
            (1010, Some(SuccessRequiresReward)),
            (1011, Some(RewardRequiresPaidTransaction)),
            (1012, Some(RewardGranted)),
            (1013, Some(PaidTransactionRequiresReward)),
            (1014, Some(TransactionSameMonth)),
            (1015, None),
            (1016, Some(StatusResolved)),
        ]
    );

    let failures: usize = result.summary.rule_failures.values().sum();
    assert_eq!(failures, result.summary.invalid);
}

#[test]
fn full_config_title_cases_names() {
    let (result, report) = load_and_run(&fixture("refcheck.toml"));
    assert_eq!(result.rows[0].referrer_name, "Ana Sari");
    assert_eq!(result.rows[0].referee_name, "Budi Santoso");
    assert!(report.contains(",Ana Sari,0811-1000,Senayan,"));
}

#[test]
fn full_config_fills_blank_referrer_from_users() {
    let (result, report) = load_and_run(&fixture("refcheck.toml"));
    let row = result.rows.iter().find(|r| r.referral_details_id == 1015).unwrap();
    assert_eq!(row.referrer_name, "Dedi");
    assert_eq!(row.referrer_phone_number, "0814-4000");
    assert_eq!(row.referrer_homeclub, "Jayapura");
    assert!(report.contains(",4,Dedi,0814-4000,Jayapura,6,"), "{report}");
}

#[test]
fn pending_referral_valid_despite_expired_referrer() {
    // 1015: status Menunggu, no reward, referrer membership ended 2024-01-31
    let (result, _) = load_and_run(&fixture("refcheck.toml"));
    let row = result.rows.iter().find(|r| r.referral_details_id == 1015).unwrap();
    assert!(row.is_business_logic_valid, "{:?}", row.failed_rule);
}

#[test]
fn unresolved_status_is_invalid() {
    // 1016: no status, no reward, no transaction
    let (result, _) = load_and_run(&fixture("refcheck.toml"));
    let row = result.rows.iter().find(|r| r.referral_details_id == 1016).unwrap();
    assert_eq!(row.failed_rule, Some(RuleName::StatusResolved));
}

#[test]
fn as_of_overrides_referral_date() {
    // every membership in the fixture ends on or before 2025-12-31
    let toml = fixture("refcheck.toml").replace("[rules]\n", "[rules]\nas_of = \"2026-01-01\"\n");
    let (result, _) = load_and_run(&toml);
    let row = result.rows.iter().find(|r| r.referral_details_id == 1001).unwrap();
    assert_eq!(row.failed_rule, Some(RuleName::ReferrerActive));
    // unrewarded referrals are not held to membership
    let valid: Vec<i64> = result
        .rows
        .iter()
        .filter(|r| r.is_business_logic_valid)
        .map(|r| r.referral_details_id)
        .collect();
    assert_eq!(valid, vec![1015]);
}

#[test]
fn canonical_offset_changes_same_month_verdict() {
    // 1014 straddles midnight in Jakarta at +07:00; pinned to UTC it stays in May.
    let toml = fixture("refcheck.toml").replace(
        "[rules]\n",
        "[time]\ncanonical_offset = \"+00:00\"\n\n[timezones]\n\"Asia/Jakarta\" = \"+00:00\"\n\n[rules]\n",
    );
    let (result, _) = load_and_run(&toml);
    let row = result.rows.iter().find(|r| r.referral_details_id == 1014).unwrap();
    assert!(row.is_business_logic_valid, "{:?}", row.failed_rule);
}

// -------------------------------------------------------------------------
// Determinism
// -------------------------------------------------------------------------

#[test]
fn rerun_is_byte_identical() {
    let (a, report_a) = load_and_run(&fixture("refcheck.toml"));
    let (b, report_b) = load_and_run(&fixture("refcheck.toml"));
    assert_eq!(report_a, report_b);
    assert_eq!(a.summary.report_sha256, b.summary.report_sha256);
    assert_eq!(
        serde_json::to_string_pretty(&a).unwrap(),
        serde_json::to_string_pretty(&b).unwrap()
    );
}

// -------------------------------------------------------------------------
// Failures
// -------------------------------------------------------------------------

#[test]
fn unknown_transaction_is_missing_reference() {
    let config = RefcheckConfig::from_toml(&fixture("refcheck.toml")).unwrap();
    let mut sources = read_sources(&config);
    sources.insert(
        DatasetKind::Transactions,
        "transaction_id,transaction_status,transaction_type,transaction_at\nT1,PAID,NEW,2024-05-10 03:00:00\n".into(),
    );
    let input = load_input(&config, &sources).unwrap();
    let err = run(&config, &input).unwrap_err();
    match err {
        ReferralError::MissingReference { referral_id, role, key } => {
            assert_eq!(referral_id, "0b6f3c1e-2a41-4d7e-9a55-000000001006");
            assert_eq!(role, "transaction");
            assert_eq!(key, "T2");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn malformed_timestamp_aborts_load() {
    let config = RefcheckConfig::from_toml(&fixture("minimal.toml")).unwrap();
    let mut sources = read_sources(&config);
    let referrals = sources[&DatasetKind::Referrals].replace("2024-05-20 05:00:00", "20/05/2024");
    sources.insert(DatasetKind::Referrals, referrals);

    let err = load_input(&config, &sources).unwrap_err();
    assert!(matches!(err, ReferralError::Parse { row: 14, ref column, .. } if column == "referral_at"));
}

#[test]
fn rule_without_dataset_rejected() {
    let toml = fixture("minimal.toml") + "\n[rules]\nactive = [\"reward_granted\"]\n";
    let err = RefcheckConfig::from_toml(&toml).unwrap_err();
    assert!(err.to_string().contains("rewards"), "{err}");
}

#[test]
fn renamed_columns_resolve() {
    let toml = fixture("minimal.toml").replace(
        "file = \"user_logs.csv\"",
        "file = \"user_logs.csv\"\n[datasets.users.columns]\nuser_id = \"id\"",
    );
    let config = RefcheckConfig::from_toml(&toml).unwrap();
    let mut sources = read_sources(&config);
    let users = sources[&DatasetKind::Users].replacen("user_id,", "id,", 1);
    sources.insert(DatasetKind::Users, users);

    let input = load_input(&config, &sources).unwrap();
    let (result, _) = run(&config, &input).unwrap();
    assert_eq!(result.summary.total, 16);
}

// -------------------------------------------------------------------------
// Profiling
// -------------------------------------------------------------------------

#[test]
fn profile_referral_fixture() {
    let p = profile_csv("user_referrals", &fixture("user_referrals.csv")).unwrap();
    assert_eq!(p.row_count, 16);
    assert_eq!(p.column_count, 16);
    assert_eq!(p.duplicate_rows, 0);

    let referral_at = p.columns.iter().find(|c| c.name == "referral_at").unwrap();
    assert_eq!(referral_at.missing, 1);
    assert_eq!(referral_at.missing_pct, 6.25);

    let referrer = p.columns.iter().find(|c| c.name == "referrer_id").unwrap();
    assert_eq!(referrer.unique, 6);
}
