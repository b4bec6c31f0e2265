//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 60-69   | refcheck         | Config, schema, data and IO failures     |
//!
//! A run that finds invalid referrals still exits 0: invalid rows are
//! report content, not failures.
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into [`referral_exit_code`] or the command's error handling

use refcheck_recon::ReferralError;

// =============================================================================
// Universal (0, 2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Refcheck (60-69)
// =============================================================================

/// Config file is not valid TOML, or fails validation.
pub const EXIT_CONFIG_INVALID: u8 = 60;

/// An input file lacks a required column.
pub const EXIT_SCHEMA: u8 = 61;

/// A cell could not be parsed (timestamp, uuid, integer, category...).
pub const EXIT_PARSE: u8 = 62;

/// A referral names a user, transaction, status or reward that does not exist.
pub const EXIT_MISSING_REFERENCE: u8 = 63;

/// `referral_details_id` repeats in the referrals file.
pub const EXIT_DUPLICATE_KEY: u8 = 64;

/// Cannot read an input file or write an output file.
pub const EXIT_IO: u8 = 65;

/// Map an engine error to its exit code.
pub fn referral_exit_code(err: &ReferralError) -> u8 {
    match err {
        ReferralError::ConfigParse(_) | ReferralError::ConfigValidation(_) => EXIT_CONFIG_INVALID,
        ReferralError::Schema { .. } => EXIT_SCHEMA,
        ReferralError::Parse { .. } | ReferralError::Csv { .. } => EXIT_PARSE,
        ReferralError::MissingReference { .. } => EXIT_MISSING_REFERENCE,
        ReferralError::DuplicateKey { .. } => EXIT_DUPLICATE_KEY,
    }
}
