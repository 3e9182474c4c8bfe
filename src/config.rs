use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GtfsConfig {
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
    #[serde(default = "default_export_path")]
    pub export_path: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub csv_options: CsvOptions,
    #[serde(default)]
    pub agencies: Vec<AgencyConfig>,
}

impl Default for GtfsConfig {
    fn default() -> Self {
        Self {
            sqlite_path: default_sqlite_path(),
            export_path: default_export_path(),
            request_timeout_secs: default_request_timeout_secs(),
            csv_options: CsvOptions::default(),
            agencies: Vec::new(),
        }
    }
}

impl GtfsConfig {
    pub fn sqlite_path(&self) -> PathBuf {
        expand_home(&self.sqlite_path)
    }

    pub fn export_path(&self) -> PathBuf {
        expand_home(&self.export_path)
    }
}

/// One feed source: where to fetch it and what to leave out
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgencyConfig {
    #[serde(default)]
    pub agency_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

/// Where a feed comes from, once the descriptor has been validated
#[derive(Debug, Clone, PartialEq)]
pub enum FeedSource<'a> {
    Url(&'a str),
    Path(PathBuf),
}

impl AgencyConfig {
    /// Check the descriptor: a key and exactly one of `url`/`path`
    pub fn source(&self) -> Result<FeedSource<'_>> {
        if self.agency_key.trim().is_empty() {
            return Err(Error::Configuration("No agency_key provided".to_string()));
        }
        match (self.url.as_deref(), self.path.as_deref()) {
            (Some(url), None) => Ok(FeedSource::Url(url)),
            (None, Some(path)) => Ok(FeedSource::Path(expand_home(path))),
            (None, None) => Err(Error::Configuration(format!(
                "{}: no url or path provided",
                self.agency_key
            ))),
            (Some(_), Some(_)) => Err(Error::Configuration(format!(
                "{}: provide either url or path, not both",
                self.agency_key
            ))),
        }
    }

    pub fn is_excluded(&self, entity: &str) -> bool {
        self.exclude.iter().any(|e| e == entity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CsvOptions {
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { delimiter: default_delimiter() }
    }
}

impl CsvOptions {
    /// The delimiter as the single byte the CSV reader and writer expect
    pub fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| Error::Configuration(format!("delimiter {:?} is not a single ASCII character", self.delimiter)))
    }
}

fn default_sqlite_path() -> String {
    "gtfs.db".to_string()
}

fn default_export_path() -> String {
    "gtfs-export".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_delimiter() -> char {
    ','
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("gtfsdb.toml")
}

/// Expand a leading `~/` against `$HOME`
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<GtfsConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: GtfsConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &GtfsConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
