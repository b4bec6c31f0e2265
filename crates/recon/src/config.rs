use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::ReferralError;
use crate::rules::RuleName;
use crate::schema::DatasetKind;
use crate::time::{parse_offset, TimeSettings, TimezoneTable};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefcheckConfig {
    pub name: String,
    pub datasets: DatasetsConfig,
    #[serde(default)]
    pub time: TimeConfig,
    /// IANA zone name → fixed offset (`+07:00`). Merged over the built-in table.
    #[serde(default)]
    pub timezones: BTreeMap<String, String>,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Datasets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetsConfig {
    pub referrals: DatasetConfig,
    pub users: DatasetConfig,
    #[serde(default)]
    pub transactions: Option<DatasetConfig>,
    #[serde(default)]
    pub statuses: Option<DatasetConfig>,
    #[serde(default)]
    pub rewards: Option<DatasetConfig>,
}

impl DatasetsConfig {
    pub fn get(&self, kind: DatasetKind) -> Option<&DatasetConfig> {
        match kind {
            DatasetKind::Referrals => Some(&self.referrals),
            DatasetKind::Users => Some(&self.users),
            DatasetKind::Transactions => self.transactions.as_ref(),
            DatasetKind::Statuses => self.statuses.as_ref(),
            DatasetKind::Rewards => self.rewards.as_ref(),
        }
    }

    /// Configured datasets in load order.
    pub fn configured(&self) -> Vec<(DatasetKind, &DatasetConfig)> {
        DatasetKind::ALL
            .iter()
            .filter_map(|&kind| self.get(kind).map(|c| (kind, c)))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
    pub file: String,
    /// Field name → header name, for files whose headers differ from the schema.
    #[serde(default)]
    pub columns: HashMap<String, String>,
}

impl DatasetConfig {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            columns: HashMap::new(),
        }
    }

    /// Header name to look for when resolving `field`.
    pub fn header_for<'a>(&'a self, field: &'a str) -> &'a str {
        self.columns.get(field).map(String::as_str).unwrap_or(field)
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeConfig {
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// Offset the raw timestamps were recorded in.
    #[serde(default = "default_source_offset")]
    pub source_offset: String,
    /// Offset every normalized timestamp is expressed in.
    #[serde(default = "default_canonical_offset")]
    pub canonical_offset: String,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            timestamp_format: default_timestamp_format(),
            date_format: default_date_format(),
            source_offset: default_source_offset(),
            canonical_offset: default_canonical_offset(),
        }
    }
}

fn default_timestamp_format() -> String {
    "%Y-%m-%d %H:%M:%S".into()
}

fn default_date_format() -> String {
    "%Y-%m-%d".into()
}

fn default_source_offset() -> String {
    "+00:00".into()
}

fn default_canonical_offset() -> String {
    "+07:00".into()
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulesConfig {
    /// Ordered conjunction. A referral is valid only if every rule passes.
    #[serde(default = "default_active_rules")]
    pub active: Vec<RuleName>,
    #[serde(default = "default_max_days")]
    pub max_days_to_transaction: u32,
    /// Date membership expiry is checked against. Unset = the referral's own local date.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
    #[serde(default = "default_success_statuses")]
    pub success_statuses: Vec<String>,
    #[serde(default = "default_pending_statuses")]
    pub pending_statuses: Vec<String>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            active: default_active_rules(),
            max_days_to_transaction: default_max_days(),
            as_of: None,
            success_statuses: default_success_statuses(),
            pending_statuses: default_pending_statuses(),
        }
    }
}

impl RulesConfig {
    pub fn is_success_status(&self, description: &str) -> bool {
        contains_ignore_case(&self.success_statuses, description)
    }

    pub fn is_pending_status(&self, description: &str) -> bool {
        contains_ignore_case(&self.pending_statuses, description)
    }
}

fn contains_ignore_case(list: &[String], value: &str) -> bool {
    let value = value.trim();
    list.iter().any(|s| s.eq_ignore_ascii_case(value))
}

fn default_active_rules() -> Vec<RuleName> {
    vec![
        RuleName::DistinctIdentity,
        RuleName::RequiredFields,
        RuleName::ReferralWindow,
        RuleName::SourceCategory,
    ]
}

fn default_max_days() -> u32 {
    30
}

fn default_success_statuses() -> Vec<String> {
    vec!["Berhasil".into(), "Success".into()]
}

fn default_pending_statuses() -> Vec<String> {
    vec![
        "Menunggu".into(),
        "Pending".into(),
        "Tidak Berhasil".into(),
        "Failed".into(),
    ]
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Title-case names and referral sources in the report.
    #[serde(default)]
    pub title_case_names: bool,
    /// Default report path (relative to the config file) when `--output` is not given.
    #[serde(default)]
    pub report: Option<String>,
    /// Default summary JSON path.
    #[serde(default)]
    pub summary: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl RefcheckConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReferralError> {
        let config: RefcheckConfig =
            toml::from_str(input).map_err(|e| ReferralError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Config with every default and the two required datasets. Mostly for tests and embedding.
    pub fn with_files(referrals: &str, users: &str) -> Self {
        Self {
            name: "refcheck".into(),
            datasets: DatasetsConfig {
                referrals: DatasetConfig::new(referrals),
                users: DatasetConfig::new(users),
                transactions: None,
                statuses: None,
                rewards: None,
            },
            time: TimeConfig::default(),
            timezones: BTreeMap::new(),
            rules: RulesConfig::default(),
            output: OutputConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ReferralError> {
        if self.rules.active.is_empty() {
            return Err(ReferralError::ConfigValidation(
                "rules.active must name at least one rule".into(),
            ));
        }

        let mut seen = HashSet::new();
        for rule in &self.rules.active {
            if !seen.insert(*rule) {
                return Err(ReferralError::ConfigValidation(format!(
                    "rule '{rule}' listed more than once"
                )));
            }
            for needed in rule.required_datasets() {
                if self.datasets.get(*needed).is_none() {
                    return Err(ReferralError::ConfigValidation(format!(
                        "rule '{rule}' requires the '{needed}' dataset"
                    )));
                }
            }
        }

        for (kind, dataset) in self.datasets.configured() {
            if dataset.file.trim().is_empty() {
                return Err(ReferralError::ConfigValidation(format!(
                    "dataset '{kind}': file must not be empty"
                )));
            }
            let schema = kind.schema();
            for field in dataset.columns.keys() {
                if schema.field(field).is_none() {
                    return Err(ReferralError::ConfigValidation(format!(
                        "dataset '{kind}': unknown field '{field}' in column mapping"
                    )));
                }
            }
        }

        // Offsets and zone table must resolve.
        self.time_settings()?;
        Ok(())
    }

    /// Resolve the textual time config into the normalizer's settings.
    pub fn time_settings(&self) -> Result<TimeSettings, ReferralError> {
        let source = parse_offset(&self.time.source_offset).ok_or_else(|| {
            ReferralError::ConfigValidation(format!(
                "time.source_offset: invalid offset '{}'",
                self.time.source_offset
            ))
        })?;
        let canonical = parse_offset(&self.time.canonical_offset).ok_or_else(|| {
            ReferralError::ConfigValidation(format!(
                "time.canonical_offset: invalid offset '{}'",
                self.time.canonical_offset
            ))
        })?;

        let mut zones = TimezoneTable::builtin();
        for (name, offset) in &self.timezones {
            let parsed = parse_offset(offset).ok_or_else(|| {
                ReferralError::ConfigValidation(format!(
                    "timezones.{name}: invalid offset '{offset}'"
                ))
            })?;
            zones.insert(name, parsed);
        }

        Ok(TimeSettings {
            timestamp_format: self.time.timestamp_format.clone(),
            date_format: self.time.date_format.clone(),
            source,
            canonical,
            zones,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
