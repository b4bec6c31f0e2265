//! `refcheck run` / `refcheck validate`: config-driven referral classification.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use refcheck_recon::model::{ClassifyMeta, ClassifySummary};
use refcheck_recon::{DatasetKind, RefcheckConfig};
use serde::Serialize;

use crate::CliError;

/// Summary file contents: run metadata plus counts and the report fingerprint.
#[derive(Serialize)]
struct SummaryFile<'a> {
    meta: &'a ClassifyMeta,
    summary: &'a ClassifySummary,
}

fn read_config(config_path: &Path) -> Result<RefcheckConfig, CliError> {
    if !config_path.exists() {
        return Err(CliError::args(format!("config not found: {}", config_path.display()))
            .with_hint("pass the path to a refcheck.toml"));
    }
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| CliError::io(format!("cannot read config: {e}")))?;
    RefcheckConfig::from_toml(&config_str).map_err(CliError::referral)
}

/// Base directory that dataset and output paths in the config resolve against.
fn base_dir(config_path: &Path) -> &Path {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

fn read_sources(
    config: &RefcheckConfig,
    base: &Path,
) -> Result<HashMap<DatasetKind, String>, CliError> {
    let mut sources = HashMap::new();
    for (kind, dataset) in config.datasets.configured() {
        let path = base.join(&dataset.file);
        let text = std::fs::read_to_string(&path)
            .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
        log::debug!("read {kind} from {}", path.display());
        sources.insert(kind, text);
    }
    Ok(sources)
}

/// Write every file or none: each is staged beside its target, then renamed
/// into place once all stages succeeded.
fn write_all(files: &[(&Path, &str)]) -> Result<(), CliError> {
    let mut staged: Vec<PathBuf> = Vec::with_capacity(files.len());
    let discard = |staged: &[PathBuf]| {
        for tmp in staged {
            let _ = std::fs::remove_file(tmp);
        }
    };

    for (path, contents) in files {
        let tmp = staging_path(path);
        if let Err(e) = std::fs::write(&tmp, contents) {
            discard(&staged);
            return Err(CliError::io(format!("cannot write {}: {e}", path.display())));
        }
        staged.push(tmp);
    }

    for (tmp, (path, _)) in staged.iter().zip(files) {
        if let Err(e) = std::fs::rename(tmp, path) {
            discard(&staged);
            return Err(CliError::io(format!("cannot write {}: {e}", path.display())));
        }
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

pub fn cmd_run(
    config_path: PathBuf,
    output_file: Option<PathBuf>,
    json_output: bool,
    summary_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    let base = base_dir(&config_path);

    let sources = read_sources(&config, base)?;
    let input = refcheck_recon::load_input(&config, &sources).map_err(CliError::referral)?;
    let (result, report) = refcheck_recon::run(&config, &input).map_err(CliError::referral)?;

    // Flags override config; config paths are relative to the config file.
    let report_path = output_file.or_else(|| config.output.report.as_ref().map(|p| base.join(p)));
    let summary_path =
        summary_file.or_else(|| config.output.summary.as_ref().map(|p| base.join(p)));

    // Serialize everything before touching the filesystem.
    let summary_json = serde_json::to_string_pretty(&SummaryFile {
        meta: &result.meta,
        summary: &result.summary,
    })
    .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
    let result_json = if json_output {
        Some(
            serde_json::to_string_pretty(&result)
                .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?,
        )
    } else {
        None
    };

    let mut files: Vec<(&Path, &str)> = Vec::new();
    if let Some(ref path) = report_path {
        files.push((path.as_path(), report.as_str()));
    }
    if let Some(ref path) = summary_path {
        files.push((path.as_path(), summary_json.as_str()));
    }
    write_all(&files)?;

    match result_json {
        Some(json) => println!("{json}"),
        None if report_path.is_none() => print!("{report}"),
        None => {}
    }

    // Human summary to stderr
    let s = &result.summary;
    eprintln!(
        "'{}': {} referrals, {} valid, {} invalid",
        result.meta.config_name, s.total, s.valid, s.invalid,
    );
    for (rule, count) in &s.rule_failures {
        eprintln!("  {rule}: {count}");
    }

    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    eprintln!(
        "valid: '{}' with {} dataset(s), {} rule(s)",
        config.name,
        config.datasets.configured().len(),
        config.rules.active.len(),
    );
    Ok(())
}
