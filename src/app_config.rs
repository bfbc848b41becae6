//! Config file loading and merging with CLI flags.
//!
//! Priority: CLI flag > config file > built-in default.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use specfetch_core::config::{
    CrawlConfig, DEFAULT_RELEASE, MAX_TIMEOUT_SECS, default_download_root, parse_base_url,
};
use specfetch_core::download::{MAX_CONCURRENCY, MIN_CONCURRENCY};

use crate::cli::Args;

/// File-backed defaults. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FileConfig {
    pub release: Option<String>,
    pub base_url: Option<String>,
    pub listings: Option<Vec<String>>,
    pub suffix: Option<String>,
    pub download_dir: Option<PathBuf>,
    pub state_dir: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub connect_timeout_secs: Option<u64>,
    pub read_timeout_secs: Option<u64>,
    pub keep_state: Option<bool>,
}

impl FileConfig {
    /// Validates ranges that can be checked without the rest of the config.
    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(concurrency) = self.concurrency
            && !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency)
        {
            bail!(
                "Invalid config value for `concurrency`: {concurrency}. Expected range: {MIN_CONCURRENCY}..={MAX_CONCURRENCY}"
            );
        }
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        if let Some(listings) = &self.listings
            && listings.is_empty()
        {
            bail!("Invalid config value for `listings`: expected at least one entry");
        }
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=MAX_TIMEOUT_SECS).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..={MAX_TIMEOUT_SECS}");
    }
    Ok(())
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/specfetch/config.toml`
/// 2. `$HOME/.config/specfetch/config.toml`
pub(crate) fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("specfetch")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("specfetch")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the explicit `--config` file, or the default file when it exists.
///
/// An explicit path must exist; a missing default file is not an error.
pub(crate) fn load_file_config(explicit: Option<&Path>) -> Result<Option<FileConfig>> {
    if let Some(path) = explicit {
        return read_file_config(path).map(Some);
    }
    match resolve_default_config_path() {
        Some(path) if path.exists() => read_file_config(&path).map(Some),
        _ => Ok(None),
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

/// Merges CLI flags over file values over defaults and validates the result.
pub(crate) fn resolve_crawl_config(args: &Args, file: Option<&FileConfig>) -> Result<CrawlConfig> {
    let file = file.cloned().unwrap_or_default();

    let release = args
        .release
        .clone()
        .or(file.release)
        .unwrap_or_else(|| DEFAULT_RELEASE.to_string());
    let mut config = CrawlConfig::for_release(&release)?;

    if let Some(base_url) = args.base_url.as_deref().or(file.base_url.as_deref()) {
        config.base_url = parse_base_url(base_url)?;
    }
    if !args.listings.is_empty() {
        config.listings.clone_from(&args.listings);
    } else if let Some(listings) = file.listings {
        config.listings = listings;
    }
    if let Some(suffix) = args.suffix.clone().or(file.suffix) {
        config.suffix = suffix;
    }
    config.download_root = args
        .output_dir
        .clone()
        .or(file.download_dir)
        .unwrap_or_else(|| default_download_root(&release));
    if let Some(state_dir) = args.state_dir.clone().or(file.state_dir) {
        config.state_dir = state_dir;
    }
    if let Some(concurrency) = args.concurrency.map(usize::from).or(file.concurrency) {
        config.concurrency = concurrency;
    }
    if let Some(secs) = args.connect_timeout.or(file.connect_timeout_secs) {
        config.connect_timeout_secs = secs;
    }
    if let Some(secs) = args.read_timeout.or(file.read_timeout_secs) {
        config.read_timeout_secs = secs;
    }
    config.keep_state = args.keep_state || file.keep_state.unwrap_or(false);

    config.validate()?;
    Ok(config)
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = || format!("Invalid `{key}` value on line {}", line_index + 1);

        match key {
            "release" => cfg.release = Some(parse_string_literal(value).with_context(invalid)?),
            "base_url" => cfg.base_url = Some(parse_string_literal(value).with_context(invalid)?),
            "listings" => cfg.listings = Some(parse_string_array(value).with_context(invalid)?),
            "suffix" => cfg.suffix = Some(parse_string_literal(value).with_context(invalid)?),
            "download_dir" => {
                cfg.download_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "state_dir" => {
                cfg.state_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "concurrency" => {
                let parsed = parse_integer_u64(value).with_context(invalid)?;
                cfg.concurrency = Some(
                    usize::try_from(parsed)
                        .map_err(|_| anyhow::anyhow!("concurrency out of range for usize"))?,
                );
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "keep_state" => cfg.keep_state = Some(parse_boolean(value).with_context(invalid)?),
            unknown => {
                bail!(
                    "Unknown configuration key: '{}' on line {}",
                    unknown,
                    line_index + 1
                );
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

/// Single-line array of double-quoted strings, e.g. `["21_series/", "22_series/"]`.
fn parse_string_array(raw_value: &str) -> Result<Vec<String>> {
    let Some(inner) = raw_value
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    else {
        bail!("Expected array of double-quoted strings");
    };
    inner
        .split(',')
        .map(str::trim)
        .filter(|element| !element.is_empty())
        .map(parse_string_literal)
        .collect()
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}
