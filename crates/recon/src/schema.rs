//! Explicit ingestion schemas. Every input column has a declared type and
//! nullability, checked while the table is read, so type errors surface at
//! load time with a row and column instead of during rule evaluation.

use std::collections::HashMap;

use uuid::Uuid;

use crate::config::DatasetConfig;
use crate::error::ReferralError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DatasetKind {
    Referrals,
    Users,
    Transactions,
    Statuses,
    Rewards,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 5] = [
        Self::Referrals,
        Self::Users,
        Self::Transactions,
        Self::Statuses,
        Self::Rewards,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Referrals => "referrals",
            Self::Users => "users",
            Self::Transactions => "transactions",
            Self::Statuses => "statuses",
            Self::Rewards => "rewards",
        }
    }

    pub fn schema(&self) -> &'static DatasetSchema {
        match self {
            Self::Referrals => &REFERRALS,
            Self::Users => &USERS,
            Self::Transactions => &TRANSACTIONS,
            Self::Statuses => &STATUSES,
            Self::Rewards => &REWARDS,
        }
    }
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Text,
    /// Join key. Cleaned with [`clean_id`] before use.
    Identifier,
    Uuid,
    /// `Online` / `Offline`.
    Category,
    /// Raw timestamp text; parsed by the time normalizer, not here.
    Timestamp,
    Date,
    Bool,
    Decimal,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    /// Empty cells allowed.
    pub nullable: bool,
    /// Column must be present in the header.
    pub required: bool,
}

const fn field(name: &'static str, ty: FieldType, nullable: bool, required: bool) -> FieldSpec {
    FieldSpec {
        name,
        ty,
        nullable,
        required,
    }
}

#[derive(Debug)]
pub struct DatasetSchema {
    pub kind: DatasetKind,
    pub fields: &'static [FieldSpec],
}

impl DatasetSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

pub static REFERRALS: DatasetSchema = DatasetSchema {
    kind: DatasetKind::Referrals,
    fields: &[
        field("referral_details_id", FieldType::Integer, false, true),
        field("referral_id", FieldType::Uuid, false, true),
        field("referral_source", FieldType::Text, true, true),
        field("referral_source_category", FieldType::Category, true, true),
        field("referral_at", FieldType::Timestamp, true, true),
        field("referrer_id", FieldType::Identifier, true, true),
        field("referrer_name", FieldType::Text, true, true),
        field("referrer_phone_number", FieldType::Text, true, true),
        field("referrer_homeclub", FieldType::Text, true, true),
        field("referee_id", FieldType::Identifier, true, true),
        field("referee_name", FieldType::Text, true, true),
        field("referee_phone", FieldType::Text, true, true),
        field("transaction_id", FieldType::Identifier, true, false),
        field("user_referral_status_id", FieldType::Identifier, true, false),
        field("referral_reward_id", FieldType::Identifier, true, false),
        field("is_reward_granted", FieldType::Bool, true, false),
    ],
};

pub static USERS: DatasetSchema = DatasetSchema {
    kind: DatasetKind::Users,
    fields: &[
        field("user_id", FieldType::Identifier, false, true),
        field("name", FieldType::Text, true, false),
        field("phone_number", FieldType::Text, true, false),
        field("homeclub", FieldType::Text, true, false),
        field("timezone_homeclub", FieldType::Text, true, false),
        field("membership_expired_date", FieldType::Date, true, false),
        field("is_deleted", FieldType::Bool, true, false),
    ],
};

pub static TRANSACTIONS: DatasetSchema = DatasetSchema {
    kind: DatasetKind::Transactions,
    fields: &[
        field("transaction_id", FieldType::Identifier, false, true),
        field("transaction_status", FieldType::Text, true, true),
        field("transaction_type", FieldType::Text, true, true),
        field("transaction_at", FieldType::Timestamp, true, true),
    ],
};

pub static STATUSES: DatasetSchema = DatasetSchema {
    kind: DatasetKind::Statuses,
    fields: &[
        field("id", FieldType::Identifier, false, true),
        field("description", FieldType::Text, true, true),
    ],
};

pub static REWARDS: DatasetSchema = DatasetSchema {
    kind: DatasetKind::Rewards,
    fields: &[
        field("id", FieldType::Identifier, false, true),
        field("reward_value", FieldType::Decimal, true, true),
    ],
};

// ---------------------------------------------------------------------------
// Cell cleaning
// ---------------------------------------------------------------------------

/// Normalize an identifier cell: trim, map `nan`/`null`/`none`/empty to `None`,
/// and drop a trailing `.0` left behind by float-typed exports.
pub fn clean_id(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty()
        || value.eq_ignore_ascii_case("nan")
        || value.eq_ignore_ascii_case("null")
        || value.eq_ignore_ascii_case("none")
    {
        return None;
    }
    Some(value.strip_suffix(".0").unwrap_or(value).to_string())
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// A CSV table whose headers have been checked against a schema.
pub struct Table {
    schema: &'static DatasetSchema,
    /// Field name → column index, for fields whose column is present.
    index: HashMap<&'static str, usize>,
    records: Vec<csv::StringRecord>,
}

impl Table {
    pub fn read(
        schema: &'static DatasetSchema,
        csv_data: &str,
        dataset: &DatasetConfig,
    ) -> Result<Self, ReferralError> {
        let name = schema.kind.name();
        let csv_err = |e: csv::Error| ReferralError::Csv {
            dataset: name.into(),
            message: e.to_string(),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(csv_data.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut index = HashMap::new();
        for spec in schema.fields {
            let header = dataset.header_for(spec.name);
            match headers.iter().position(|h| h == header) {
                Some(i) => {
                    index.insert(spec.name, i);
                }
                None if spec.required => {
                    return Err(ReferralError::Schema {
                        dataset: name.into(),
                        column: header.into(),
                    });
                }
                None => {}
            }
        }

        let records = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(csv_err)?;

        log::debug!("{name}: {} rows, {} mapped columns", records.len(), index.len());

        Ok(Self {
            schema,
            index,
            records,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, field: &str) -> bool {
        self.index.contains_key(field)
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.records
            .iter()
            .enumerate()
            .map(move |(row, record)| Row {
                table: self,
                row,
                record,
            })
    }

    fn spec(&self, field: &str) -> &FieldSpec {
        self.schema
            .field(field)
            .unwrap_or_else(|| panic!("field '{field}' is not in the {} schema", self.schema.kind))
    }
}

/// Typed access to one data row. Accessors enforce the field's declared
/// nullability and type; `row` is the 0-based data row index.
pub struct Row<'a> {
    table: &'a Table,
    pub row: usize,
    record: &'a csv::StringRecord,
}

impl<'a> Row<'a> {
    fn raw(&self, field: &str) -> &'a str {
        self.table
            .index
            .get(field)
            .and_then(|&i| self.record.get(i))
            .unwrap_or("")
            .trim()
    }

    fn error(&self, field: &str, value: &str) -> ReferralError {
        let spec = self.table.spec(field);
        ReferralError::parse(self.table.schema.kind.name(), self.row, spec.name, value)
    }

    /// Enforce nullability; returns `None` for an allowed empty cell.
    fn present(&self, field: &str) -> Result<Option<&'a str>, ReferralError> {
        let spec = self.table.spec(field);
        let value = self.raw(field);
        if value.is_empty() {
            if spec.nullable {
                return Ok(None);
            }
            return Err(self.error(field, value));
        }
        Ok(Some(value))
    }

    pub fn text(&self, field: &str) -> Result<String, ReferralError> {
        Ok(self.present(field)?.unwrap_or("").to_string())
    }

    pub fn opt_text(&self, field: &str) -> Result<Option<String>, ReferralError> {
        Ok(self.present(field)?.map(str::to_string))
    }

    pub fn identifier(&self, field: &str) -> Result<Option<String>, ReferralError> {
        let raw = self.raw(field);
        match clean_id(raw) {
            Some(id) => Ok(Some(id)),
            None if self.table.spec(field).nullable => Ok(None),
            None => Err(self.error(field, raw)),
        }
    }

    pub fn required_identifier(&self, field: &str) -> Result<String, ReferralError> {
        let raw = self.raw(field);
        clean_id(raw).ok_or_else(|| self.error(field, raw))
    }

    pub fn integer(&self, field: &str) -> Result<Option<i64>, ReferralError> {
        match self.present(field)? {
            None => Ok(None),
            Some(v) => {
                let cleaned = v.strip_suffix(".0").unwrap_or(v);
                cleaned.parse().map(Some).map_err(|_| self.error(field, v))
            }
        }
    }

    pub fn uuid(&self, field: &str) -> Result<Option<Uuid>, ReferralError> {
        match self.present(field)? {
            None => Ok(None),
            Some(v) => Uuid::parse_str(v).map(Some).map_err(|_| self.error(field, v)),
        }
    }

    pub fn decimal(&self, field: &str) -> Result<Option<f64>, ReferralError> {
        match self.present(field)? {
            None => Ok(None),
            Some(v) if v.eq_ignore_ascii_case("nan") => Ok(None),
            Some(v) => v
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Some)
                .ok_or_else(|| self.error(field, v)),
        }
    }

    pub fn boolean(&self, field: &str) -> Result<Option<bool>, ReferralError> {
        match self.present(field)? {
            None => Ok(None),
            Some(v) => parse_bool(v).map(Some).ok_or_else(|| self.error(field, v)),
        }
    }

    /// Parse with a caller-supplied parser (dates, categories).
    pub fn parsed<T>(
        &self,
        field: &str,
        parse: impl FnOnce(&str) -> Option<T>,
    ) -> Result<Option<T>, ReferralError> {
        match self.present(field)? {
            None => Ok(None),
            Some(v) => parse(v).map(Some).ok_or_else(|| self.error(field, v)),
        }
    }

    /// Report a value that parsed but broke an invariant.
    pub fn invalid(&self, field: &str) -> ReferralError {
        self.error(field, self.raw(field))
    }
}
