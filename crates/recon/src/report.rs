//! CSV report rendering. The report is built fully in memory so a failed run
//! never leaves a partial file behind.

use crate::error::ReferralError;
use crate::model::ClassifiedReferral;
use crate::time::format_timestamp;

pub const REPORT_HEADERS: [&str; 13] = [
    "referral_details_id",
    "referral_id",
    "referral_source",
    "referral_source_category",
    "referral_at",
    "referrer_id",
    "referrer_name",
    "referrer_phone_number",
    "referrer_homeclub",
    "referee_id",
    "referee_name",
    "referee_phone",
    "is_business_logic_valid",
];

pub fn render_csv(rows: &[ClassifiedReferral]) -> Result<String, ReferralError> {
    let write_err = |e: String| ReferralError::Csv {
        dataset: "report".into(),
        message: e,
    };

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(REPORT_HEADERS)
        .map_err(|e| write_err(e.to_string()))?;

    for row in rows {
        let id = row.referral_details_id.to_string();
        let category = row.referral_source_category.to_string();
        let referral_at = row.referral_at.as_ref().map(format_timestamp).unwrap_or_default();
        let record: [&str; 13] = [
            &id,
            &row.referral_id,
            &row.referral_source,
            &category,
            &referral_at,
            &row.referrer_id,
            &row.referrer_name,
            &row.referrer_phone_number,
            &row.referrer_homeclub,
            &row.referee_id,
            &row.referee_name,
            &row.referee_phone,
            if row.is_business_logic_valid { "True" } else { "False" },
        ];
        writer
            .write_record(record)
            .map_err(|e| write_err(e.to_string()))?;
    }

    let bytes = writer.into_inner().map_err(|e| write_err(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| write_err(e.to_string()))
}
