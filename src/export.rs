//! Export Pipeline
//!
//! Writes every non-empty table back out as a GTFS text file under
//! `<export_path>/<agency_key>/`, in schema column order, without the
//! store-internal columns.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use csv::WriterBuilder;
use regex::Regex;

use crate::config::{AgencyConfig, GtfsConfig};
use crate::output::StatusSink;
use crate::query::SelectQuery;
use crate::schema::{EntitySchema, all_entities};
use crate::storage::GtfsStore;
use crate::{Error, Result};

static UNSAFE_PATH_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]").unwrap_or_else(|e| panic!("invalid pattern: {e}")));

/// Agency key made safe to use as a single directory name
pub fn sanitize_agency_key(agency_key: &str) -> String {
    let sanitized = UNSAFE_PATH_CHARS.replace_all(agency_key, "_").into_owned();
    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        return "_".to_string();
    }
    sanitized
}

/// Outcome of one agency's export
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExportSummary {
    pub agency_key: String,
    pub directory: PathBuf,
    /// Rows written per entity file
    pub files: Vec<(&'static str, usize)>,
}

impl ExportSummary {
    /// False when every table was empty and no file was written
    pub fn has_data(&self) -> bool {
        !self.files.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct BatchExport {
    pub exported: Vec<ExportSummary>,
    pub failed: Vec<Error>,
}

pub struct Exporter<'a> {
    store: &'a GtfsStore,
    root: PathBuf,
    delimiter: u8,
    progress: &'a dyn StatusSink,
}

impl<'a> Exporter<'a> {
    pub fn new(store: &'a GtfsStore, config: &GtfsConfig, progress: &'a dyn StatusSink) -> Result<Self> {
        Ok(Self {
            store,
            root: config.export_path(),
            delimiter: config.csv_options.delimiter_byte()?,
            progress,
        })
    }

    pub fn export_all(&self, agencies: &[AgencyConfig]) -> BatchExport {
        let mut batch = BatchExport::default();
        for agency in agencies {
            match self.export_agency(agency) {
                Ok(summary) => batch.exported.push(summary),
                Err(err) => {
                    tracing::error!(agency_key = %agency.agency_key, error = %err, "export failed");
                    batch.failed.push(err);
                }
            }
        }
        batch
    }

    pub fn export_agency(&self, agency: &AgencyConfig) -> Result<ExportSummary> {
        self.run(agency).map_err(|e| e.for_agency(&agency.agency_key))
    }

    fn run(&self, agency: &AgencyConfig) -> Result<ExportSummary> {
        let key = agency.agency_key.as_str();
        if key.trim().is_empty() {
            return Err(Error::Configuration("No agency_key provided".to_string()));
        }

        let directory = self.root.join(sanitize_agency_key(key));
        if directory.exists() {
            std::fs::remove_dir_all(&directory)?;
        }
        std::fs::create_dir_all(&directory)?;

        let mut files = Vec::new();
        for entity in all_entities() {
            let filename = entity.filename();

            if agency.is_excluded(entity.name) {
                self.progress.status(key, &format!("Skipping - {filename}"));
                continue;
            }

            let rows = self.export_entity(entity, &directory.join(&filename))?;
            if rows == 0 {
                self.progress.progress(key, &format!("Skipping (no data) - {filename}"));
                continue;
            }

            self.progress.progress(key, &format!("Exporting - {filename}"));
            tracing::debug!(agency_key = key, entity = entity.name, rows, "exported");
            files.push((entity.name, rows));
        }

        if files.is_empty() {
            self.progress.status(key, &format!("No data found for agency_key={key}"));
        } else {
            self.progress
                .status(key, &format!("Completed GTFS export to {}", directory.display()));
        }

        Ok(ExportSummary {
            agency_key: key.to_string(),
            directory,
            files,
        })
    }

    /// Write one table; returns the row count and writes nothing for an empty table
    fn export_entity(&self, entity: &EntitySchema, path: &Path) -> Result<usize> {
        if !self.store.table_exists(entity.name)? {
            return Ok(0);
        }

        let rows = self.store.select(&SelectQuery::new(entity.name).build())?;
        if rows.is_empty() {
            return Ok(0);
        }

        let columns = entity.exported_columns();
        let mut writer = WriterBuilder::new().delimiter(self.delimiter).from_path(path)?;
        writer.write_record(&columns)?;
        for row in &rows {
            writer.write_record(
                columns
                    .iter()
                    .map(|c| row.get(c).map(ToString::to_string).unwrap_or_default()),
            )?;
        }
        writer.flush()?;

        Ok(rows.len())
    }
}
