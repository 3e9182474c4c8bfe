//! Feed acquisition: download, extraction and directory layout
//!
//! Whatever the source, the result is a directory holding the feed's `.txt`
//! files. Archives and downloads are unpacked into a temporary working
//! directory that lives as long as the [`FeedDirectory`].

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tempfile::TempDir;
use zip::ZipArchive;

use crate::config::{AgencyConfig, FeedSource};
use crate::{Error, Result};

/// Extracted feed ready for loading
#[derive(Debug)]
pub struct FeedDirectory {
    /// Directory containing the entity `.txt` files
    path: PathBuf,
    _workdir: Option<TempDir>,
}

impl FeedDirectory {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of `filename` inside the feed, if present
    pub fn file(&self, filename: &str) -> Option<PathBuf> {
        let path = self.path.join(filename);
        path.is_file().then_some(path)
    }
}

/// Acquire and unpack one agency's feed.
///
/// `log` receives one-line status messages ("Downloading GTFS from ...").
pub fn acquire(agency: &AgencyConfig, timeout: Duration, log: &dyn Fn(&str)) -> Result<FeedDirectory> {
    match agency.source()? {
        FeedSource::Url(url) => {
            let workdir = tempfile::tempdir()?;
            log(&format!("Downloading GTFS from {url}"));
            let archive = workdir.path().join(format!("{}-gtfs.zip", agency.agency_key));
            download(url, &agency.headers, timeout, &archive)?;
            log("Download successful");

            let extracted = workdir.path().join("feed");
            extract(&archive, &extracted)?;
            let path = resolve_layout(&extracted, &archive)?;
            Ok(FeedDirectory { path, _workdir: Some(workdir) })
        }
        FeedSource::Path(source) => {
            log(&format!("Importing GTFS from {}", source.display()));
            if !source.exists() {
                return Err(Error::Acquisition(format!("No feed found at {}", source.display())));
            }

            if source.is_dir() {
                let path = resolve_layout(&source, &source)?;
                return Ok(FeedDirectory { path, _workdir: None });
            }

            let workdir = tempfile::tempdir()?;
            extract(&source, workdir.path())?;
            let path = resolve_layout(workdir.path(), &source)?;
            Ok(FeedDirectory { path, _workdir: Some(workdir) })
        }
    }
}

fn header_map(headers: &std::collections::BTreeMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::Configuration(format!("invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::Configuration(format!("invalid value for header {name}: {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

fn download(
    url: &str,
    headers: &std::collections::BTreeMap<String, String>,
    timeout: Duration,
    destination: &Path,
) -> Result<()> {
    let client = blocking::Client::builder().timeout(timeout).build()?;

    let response = client.get(url).headers(header_map(headers)?).send()?;
    if !response.status().is_success() {
        return Err(Error::Acquisition(format!(
            "Couldn't download files from {url}: status {}",
            response.status()
        )));
    }

    let bytes = response.bytes()?;
    tracing::debug!(url, bytes = bytes.len(), "downloaded feed");
    std::fs::write(destination, &bytes)?;
    Ok(())
}

/// Unpack a zip archive into `destination`
pub fn extract(archive: &Path, destination: &Path) -> Result<()> {
    let file = File::open(archive)?;
    let mut zip = ZipArchive::new(file)?;
    std::fs::create_dir_all(destination)?;
    zip.extract(destination)?;
    tracing::debug!(archive = %archive.display(), files = zip.len(), "extracted feed");
    Ok(())
}

fn text_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let pattern = format!("{}/*.txt", escaped.trim_end_matches('/'));
    let paths = glob::glob(&pattern)
        .map_err(|e| Error::Configuration(format!("bad feed path {}: {e}", dir.display())))?;
    Ok(paths.filter_map(|p| p.ok()).filter(|p| p.is_file()).collect())
}

/// Find the directory holding the feed's `.txt` files.
///
/// They must sit directly in `dir` or in its single subdirectory; `origin`
/// names the source in the error otherwise.
pub fn resolve_layout(dir: &Path, origin: &Path) -> Result<PathBuf> {
    if !text_files(dir)?.is_empty() {
        return Ok(dir.to_path_buf());
    }

    let subdirs: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();

    match subdirs.as_slice() {
        [single] if !text_files(single)?.is_empty() => Ok(single.clone()),
        [_, _, ..] => Err(Error::Configuration(format!(
            "More than one subfolder found in {}. Ensure that .txt files are in the top level or in a single subdirectory.",
            origin.display()
        ))),
        _ => Err(Error::Configuration(format!(
            "No .txt files found in {}. Ensure that .txt files are in the top level or in a single subdirectory.",
            origin.display()
        ))),
    }
}
