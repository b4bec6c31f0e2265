// Property-based tests for the referral classifier.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::HashMap;

use proptest::prelude::*;
use refcheck_recon::config::RefcheckConfig;
use refcheck_recon::engine::{load_input, run};
use refcheck_recon::time::{normalize_timestamps, TimeSettings};
use refcheck_recon::{DatasetKind, RuleName};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

const REFERRAL_HEADER: &str = "referral_details_id,referral_id,referral_source,referral_source_category,referral_at,referrer_id,referrer_name,referrer_phone_number,referrer_homeclub,referee_id,referee_name,referee_phone";

const USERS: &str = "\
user_id,name,phone_number,homeclub,timezone_homeclub,membership_expired_date
1,Ana,0811-1000,Senayan,Asia/Jakarta,2025-12-31
2,Budi,0812-2000,Kemang,Asia/Jakarta,2025-12-31
3,Citra,0813-3000,Makassar,Asia/Makassar,2025-12-31
4,Dedi,0814-4000,Jayapura,Asia/Jayapura,2025-12-31
5,Eka,0815-5000,Pontianak,,2025-12-31
";

#[derive(Debug, Clone)]
struct ArbReferral {
    referrer: u8,
    referee: u8,
    /// Referee reuses the referrer's phone.
    shared_phone: bool,
    source: &'static str,
    category: &'static str,
    referral_at: Option<(u32, u32)>,
}

fn arb_referral() -> impl Strategy<Value = ArbReferral> {
    (
        1u8..=5,
        1u8..=5,
        prop::bool::weighted(0.1),
        prop::sample::select(vec!["User Sign Up", "Draft Transaction", "Web", "Walk-in", "Billboard"]),
        prop::sample::select(vec!["Online", "Offline"]),
        prop::option::weighted(0.9, (1u32..=28, 0u32..=23)),
    )
        .prop_map(|(referrer, referee, shared_phone, source, category, referral_at)| ArbReferral {
            referrer,
            referee,
            shared_phone,
            source,
            category,
            referral_at,
        })
}

fn phone(user: u8) -> String {
    format!("081{user}-{user}000")
}

fn referrals_csv(rows: &[ArbReferral]) -> String {
    let mut out = String::from(REFERRAL_HEADER);
    out.push('\n');
    for (i, r) in rows.iter().enumerate() {
        let id = 5000 + i;
        let at = r
            .referral_at
            .map(|(day, hour)| format!("2024-05-{day:02} {hour:02}:00:00"))
            .unwrap_or_default();
        let referee_phone = if r.shared_phone { phone(r.referrer) } else { phone(r.referee) };
        out.push_str(&format!(
            "{id},00000000-0000-4000-8000-{id:012},{},{},{at},{},user{},{},Senayan,{},user{},{referee_phone}\n",
            r.source,
            r.category,
            r.referrer,
            r.referrer,
            phone(r.referrer),
            r.referee,
            r.referee,
        ));
    }
    out
}

fn classify(rows: &[ArbReferral]) -> (refcheck_recon::ClassifyResult, String) {
    let config = RefcheckConfig::with_files("referrals.csv", "users.csv");
    let sources = HashMap::from([
        (DatasetKind::Referrals, referrals_csv(rows)),
        (DatasetKind::Users, USERS.to_string()),
    ]);
    let input = load_input(&config, &sources).unwrap();
    run(&config, &input).unwrap()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn one_output_row_per_referral_in_order(rows in prop::collection::vec(arb_referral(), 0..40)) {
        let (result, report) = classify(&rows);
        prop_assert_eq!(result.rows.len(), rows.len());
        prop_assert_eq!(report.lines().count(), rows.len() + 1);

        let ids: Vec<i64> = result.rows.iter().map(|r| r.referral_details_id).collect();
        let expected: Vec<i64> = (0..rows.len()).map(|i| 5000 + i as i64).collect();
        prop_assert_eq!(ids, expected);
    }

    #[test]
    fn classification_is_deterministic(rows in prop::collection::vec(arb_referral(), 0..40)) {
        let (a, report_a) = classify(&rows);
        let (b, report_b) = classify(&rows);
        prop_assert_eq!(report_a, report_b);
        prop_assert_eq!(a.summary, b.summary);
    }

    #[test]
    fn self_referral_is_never_valid(rows in prop::collection::vec(arb_referral(), 1..40)) {
        let (result, _) = classify(&rows);
        for (input, output) in rows.iter().zip(&result.rows) {
            if input.referrer == input.referee || input.shared_phone {
                prop_assert!(!output.is_business_logic_valid);
                prop_assert_eq!(output.failed_rule, Some(RuleName::DistinctIdentity));
            }
            if input.referral_at.is_none() {
                prop_assert!(!output.is_business_logic_valid);
            }
        }
    }

    #[test]
    fn summary_accounts_for_every_row(rows in prop::collection::vec(arb_referral(), 0..40)) {
        let (result, _) = classify(&rows);
        let s = &result.summary;
        prop_assert_eq!(s.valid + s.invalid, s.total);
        prop_assert_eq!(s.rule_failures.values().sum::<usize>(), s.invalid);
        let valid = result.rows.iter().filter(|r| r.is_business_logic_valid).count();
        prop_assert_eq!(valid, s.valid);
    }

    #[test]
    fn normalized_timestamps_share_canonical_offset(
        cells in prop::collection::vec(
            prop::option::of((2000i32..2100, 1u32..=12, 1u32..=28, 0u32..=23, 0u32..=59)),
            0..30,
        )
    ) {
        let raw: Vec<String> = cells
            .iter()
            .map(|c| match c {
                Some((y, mo, d, h, mi)) => format!("{y}-{mo:02}-{d:02} {h:02}:{mi:02}:00"),
                None => String::new(),
            })
            .collect();
        let settings = TimeSettings::default();
        let out = normalize_timestamps(&raw, &settings).unwrap();

        prop_assert_eq!(out.len(), raw.len());
        for (cell, ts) in cells.iter().zip(&out) {
            prop_assert_eq!(cell.is_some(), ts.is_some());
            if let Some(ts) = ts {
                prop_assert_eq!(*ts.offset(), settings.canonical);
            }
        }
    }
}
