//! `refcheck-recon`: referral fraud classification engine.
//!
//! Pure engine crate: parses CSV text handed to it, normalizes timestamps,
//! joins referrals to their users and optional transaction/status/reward
//! data, and labels every referral valid or invalid. No filesystem or CLI
//! dependencies.

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod join;
pub mod load;
pub mod model;
pub mod profile;
pub mod report;
pub mod rules;
pub mod schema;
pub mod time;

pub use config::RefcheckConfig;
pub use engine::{load_input, run};
pub use error::ReferralError;
pub use model::{ClassifiedReferral, ClassifyResult, ReferralInput};
pub use rules::RuleName;
pub use schema::DatasetKind;
