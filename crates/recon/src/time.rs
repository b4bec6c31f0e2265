//! Time normalization: raw timestamp strings → canonical, offset-aware instants.
//!
//! Raw values are read as wall-clock time in a fixed source offset and
//! re-expressed in a fixed canonical offset. Every downstream delta is taken
//! between canonical instants. Calendar checks that depend on where the member
//! lives go through [`TimezoneTable`] instead.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};

use crate::error::ReferralError;

/// Resolved time settings (see `config::TimeConfig` for the textual form).
#[derive(Debug, Clone)]
pub struct TimeSettings {
    pub timestamp_format: String,
    pub date_format: String,
    pub source: FixedOffset,
    pub canonical: FixedOffset,
    pub zones: TimezoneTable,
}

impl Default for TimeSettings {
    fn default() -> Self {
        Self {
            timestamp_format: "%Y-%m-%d %H:%M:%S".into(),
            date_format: "%Y-%m-%d".into(),
            source: utc(),
            canonical: hours(7),
            zones: TimezoneTable::builtin(),
        }
    }
}

/// A non-empty timestamp cell that does not match the configured format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTimestamp {
    pub row: usize,
    pub value: String,
}

impl InvalidTimestamp {
    pub fn into_parse_error(self, dataset: &str, column: &str) -> ReferralError {
        ReferralError::parse(dataset, self.row, column, &self.value)
    }
}

/// Normalize a column of raw timestamps. Output has the same length as `raw`;
/// empty cells become `None`. The first malformed cell aborts the whole column.
pub fn normalize_timestamps<S: AsRef<str>>(
    raw: &[S],
    settings: &TimeSettings,
) -> Result<Vec<Option<DateTime<FixedOffset>>>, InvalidTimestamp> {
    raw.iter()
        .enumerate()
        .map(|(row, value)| {
            let value = value.as_ref().trim();
            if value.is_empty() {
                return Ok(None);
            }
            normalize_timestamp(value, settings)
                .map(Some)
                .ok_or_else(|| InvalidTimestamp {
                    row,
                    value: value.to_string(),
                })
        })
        .collect()
}

/// Normalize one non-empty cell; `None` if it does not match the configured format.
pub fn normalize_timestamp(value: &str, settings: &TimeSettings) -> Option<DateTime<FixedOffset>> {
    let naive = NaiveDateTime::parse_from_str(value.trim(), &settings.timestamp_format).ok()?;
    let local = settings.source.from_local_datetime(&naive).single()?;
    Some(local.with_timezone(&settings.canonical))
}

/// Parse a date-only cell under the configured date format.
pub fn parse_date(value: &str, settings: &TimeSettings) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), &settings.date_format).ok()
}

/// Parse `+HH:MM`, `-HH:MM`, `+HHMM` or `Z`.
pub fn parse_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") {
        return Some(utc());
    }

    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => return None,
    };

    let (h, m) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 && rest.is_ascii() => rest.split_at(2),
        None => return None,
    };
    if h.len() != 2 || m.len() != 2 {
        return None;
    }

    let hours: i32 = h.parse().ok()?;
    let minutes: i32 = m.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Render a canonical timestamp the way the report prints it.
pub fn format_timestamp(ts: &DateTime<FixedOffset>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%:z").to_string()
}

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).expect("zero offset is valid")
}

fn hours(h: i32) -> FixedOffset {
    FixedOffset::east_opt(h * 3600).expect("whole-hour offset within ±24h")
}

// ---------------------------------------------------------------------------
// Homeclub zones
// ---------------------------------------------------------------------------

/// Zone name → offset. Homeclub zones are fixed-offset (no DST), so a table is exact.
#[derive(Debug, Clone, Default)]
pub struct TimezoneTable {
    zones: HashMap<String, FixedOffset>,
}

impl TimezoneTable {
    pub fn builtin() -> Self {
        let mut table = Self::default();
        table.insert("UTC", utc());
        table.insert("Etc/UTC", utc());
        table.insert("Asia/Jakarta", hours(7));
        table.insert("Asia/Pontianak", hours(7));
        table.insert("Asia/Makassar", hours(8));
        table.insert("Asia/Jayapura", hours(9));
        table
    }

    pub fn insert(&mut self, name: &str, offset: FixedOffset) {
        self.zones.insert(name.to_string(), offset);
    }

    pub fn offset(&self, name: &str) -> Option<FixedOffset> {
        self.zones.get(name.trim()).copied()
    }

    /// Express `ts` in the first known zone among `candidates`, else leave it canonical.
    pub fn to_local(
        &self,
        ts: &DateTime<FixedOffset>,
        candidates: &[Option<&str>],
    ) -> DateTime<FixedOffset> {
        for name in candidates.iter().flatten() {
            match self.offset(name) {
                Some(offset) => return ts.with_timezone(&offset),
                None => log::warn!("unknown homeclub timezone '{name}', trying next candidate"),
            }
        }
        *ts
    }
}
