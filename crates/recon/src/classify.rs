use crate::join::JoinedReferral;
use crate::model::ClassifiedReferral;
use crate::rules::{first_failure, RuleContext, RuleName};

/// Label each joined referral. Output order matches input order.
pub fn classify_all(
    joined: &[JoinedReferral<'_>],
    active: &[RuleName],
    ctx: &RuleContext<'_>,
    title_case: bool,
) -> Vec<ClassifiedReferral> {
    joined
        .iter()
        .map(|row| classify_one(row, active, ctx, title_case))
        .collect()
}

pub fn classify_one(
    row: &JoinedReferral<'_>,
    active: &[RuleName],
    ctx: &RuleContext<'_>,
    title_case: bool,
) -> ClassifiedReferral {
    let failed_rule = first_failure(active, row, ctx);
    let r = row.referral;
    let p = &r.person;

    if let Some(rule) = failed_rule {
        log::debug!("referral {}: failed {rule}", r.referral_details_id);
    }

    let text = |s: &str| if title_case { title(s) } else { s.to_string() };

    ClassifiedReferral {
        referral_details_id: r.referral_details_id,
        referral_id: r.referral_id.to_string(),
        referral_source: text(&r.referral_source),
        referral_source_category: r.referral_source_category,
        referral_at: r.referral_at,
        referrer_id: p.referrer_id.clone().unwrap_or_default(),
        referrer_name: text(row.referrer_name()),
        referrer_phone_number: row.referrer_phone().to_string(),
        referrer_homeclub: row.referrer_homeclub().to_string(),
        referee_id: p.referee_id.clone().unwrap_or_default(),
        referee_name: text(row.referee_name()),
        referee_phone: row.referee_phone().to_string(),
        is_business_logic_valid: failed_rule.is_none(),
        failed_rule,
    }
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
pub fn title(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}
