use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReferralError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config validation error (unknown dataset, duplicate rule, bad offset, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),

    /// Missing required column in an input table.
    #[error("dataset '{dataset}': missing column '{column}'")]
    Schema { dataset: String, column: String },

    /// A cell could not be parsed as its declared type. `row` is the 0-based data row.
    #[error("dataset '{dataset}', row {row}, column '{column}': cannot parse '{value}'")]
    Parse {
        dataset: String,
        row: usize,
        column: String,
        value: String,
    },

    /// A referral points at a key that the auxiliary dataset does not contain.
    #[error("referral '{referral_id}': {role} '{key}' not found")]
    MissingReference {
        referral_id: String,
        role: String,
        key: String,
    },

    /// A key that must be unique appears more than once.
    #[error("dataset '{dataset}': duplicate key '{key}'")]
    DuplicateKey { dataset: String, key: String },

    /// Malformed CSV (ragged rows, bad quoting, unreadable headers).
    #[error("dataset '{dataset}': {message}")]
    Csv { dataset: String, message: String },
}

impl ReferralError {
    pub(crate) fn parse(dataset: &str, row: usize, column: &str, value: &str) -> Self {
        Self::Parse {
            dataset: dataset.into(),
            row,
            column: column.into(),
            value: value.into(),
        }
    }
}
