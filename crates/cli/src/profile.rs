//! `refcheck profile`: data quality overview of raw CSV exports.

use std::path::PathBuf;

use refcheck_recon::profile::{profile_csv, DatasetProfile};

use crate::CliError;

pub fn cmd_profile(files: Vec<PathBuf>, output: Option<PathBuf>) -> Result<(), CliError> {
    let mut profiles: Vec<DatasetProfile> = Vec::with_capacity(files.len());

    for path in &files {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let profile = profile_csv(&name, &text).map_err(CliError::referral)?;
        eprintln!(
            "{}: {} rows, {} columns, {} duplicate rows",
            profile.name, profile.row_count, profile.column_count, profile.duplicate_rows,
        );
        profiles.push(profile);
    }

    let json = serde_json::to_string_pretty(&profiles)
        .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json)
                .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
            eprintln!("wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
