//! Domain allow-list normalization and storage.
//!
//! Each server index owns one allow-list text file, one domain per line,
//! which the worker is pointed at via its `--hosts` flag. Input lines are
//! normalized (trimmed, lowercased, scheme/path/port stripped) and an
//! invalid survivor rejects the whole batch, matching the panel's
//! all-or-nothing save semantics.

use crate::error::{FileError, RequestError};
use crate::servers::validate_index;
use crate::{Result, env};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

static DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-z0-9\-]+\.)+[a-z0-9\-]{2,}$").expect("domain regex is valid")
});

/// File the allow-list for `index` is stored in.
pub fn hosts_file_path(index: u8) -> PathBuf {
    env::SHAPERCTL_LISTS_DIR.join(format!("main_server_{index}_hosts.txt"))
}

/// Trim, lowercase, and strip any scheme, path, query, or port decoration,
/// leaving a bare hostname. Empty results are dropped by the caller.
fn normalize_line(line: &str) -> String {
    let lower = line.trim().to_lowercase();
    let mut s = lower.as_str();
    if let Some((_, rest)) = s.split_once("://") {
        s = rest;
    }
    if let Some((host, _)) = s.split_once('/') {
        s = host;
    }
    if let Some((host, _)) = s.split_once('?') {
        s = host;
    }
    if let Some((host, _)) = s.split_once(':') {
        s = host;
    }
    s.to_string()
}

/// Normalize, validate, and dedupe a batch of domain lines, preserving
/// first-occurrence order.
pub fn normalize_domains(
    lines: &[String],
) -> std::result::Result<Vec<String>, RequestError> {
    let validated = lines
        .iter()
        .map(|line| normalize_line(line))
        .filter(|domain| !domain.is_empty())
        .map(|domain| {
            if DOMAIN_RE.is_match(&domain) {
                Ok(domain)
            } else {
                Err(RequestError::BadDomain { domain })
            }
        });
    itertools::process_results(validated, |iter| iter.unique().collect())
}

/// Write the allow-list for `index`, replacing whatever was there.
/// Returns the number of domains saved.
pub fn save_domains(index: u8, lines: &[String]) -> Result<usize> {
    validate_index(index)?;
    let domains = normalize_domains(lines)?;
    let path = hosts_file_path(index);
    if let Some(parent) = path.parent() {
        xx::file::mkdirp(parent)?;
    }
    xx::file::write(&path, domains.join("\n")).map_err(|e| FileError::WriteError {
        path: path.clone(),
        details: Some(e.to_string()),
    })?;
    info!("saved {} domains for server {index}", domains.len());
    Ok(domains.len())
}

/// Read the allow-list for `index`; an absent file is an empty list.
pub fn load_domains(index: u8) -> Result<Vec<String>> {
    validate_index(index)?;
    let path = hosts_file_path(index);
    if !path.exists() {
        return Ok(vec![]);
    }
    let raw = xx::file::read_to_string(&path)?;
    Ok(raw
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect())
}
