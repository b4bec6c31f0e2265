use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::model::{ClassifiedReferral, ClassifySummary};

/// Compute summary statistics from classified rows and the rendered report.
pub fn compute_summary(rows: &[ClassifiedReferral], report_csv: &str) -> ClassifySummary {
    let mut rule_failures: BTreeMap<String, usize> = BTreeMap::new();
    let mut valid = 0;

    for r in rows {
        if r.is_business_logic_valid {
            valid += 1;
        }
        if let Some(rule) = r.failed_rule {
            *rule_failures.entry(rule.to_string()).or_insert(0) += 1;
        }
    }

    ClassifySummary {
        total: rows.len(),
        valid,
        invalid: rows.len() - valid,
        rule_failures,
        report_sha256: fingerprint(report_csv),
    }
}

pub fn fingerprint(data: &str) -> String {
    let digest = Sha256::digest(data.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
