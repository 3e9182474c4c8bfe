//! Import Pipeline
//!
//! One run per agency: acquire the feed, reset every table, then stream each
//! entity file through [`transform::RecordTransformer`] into the store in
//! fixed-size batches. Agencies and entities are processed strictly one at a
//! time, in configuration and schema order.

pub mod source;
pub mod transform;

use std::path::Path;
use std::time::{Duration, Instant};

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::config::{AgencyConfig, GtfsConfig};
use crate::output::StatusSink;
use crate::schema::{EntitySchema, all_entities};
use crate::storage::GtfsStore;
use crate::{Error, Record, Result};

pub use source::FeedDirectory;
pub use transform::RecordTransformer;

/// Rows flushed to the store per insert statement
pub const CHUNK_SIZE: usize = 70;

/// Outcome of one agency's import
#[derive(Debug, Clone, serde::Serialize)]
pub struct ImportSummary {
    pub agency_key: String,
    /// Rows loaded per entity whose file was present
    pub entities: Vec<(&'static str, usize)>,
    #[serde(skip)]
    pub duration: Duration,
}

impl ImportSummary {
    pub fn total_rows(&self) -> usize {
        self.entities.iter().map(|(_, n)| n).sum()
    }
}

/// Outcome of a multi-agency run
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub imported: Vec<ImportSummary>,
    pub failed: Vec<Error>,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Importer<'a> {
    store: &'a mut GtfsStore,
    delimiter: u8,
    timeout: Duration,
    progress: &'a dyn StatusSink,
}

impl<'a> Importer<'a> {
    pub fn new(store: &'a mut GtfsStore, config: &GtfsConfig, progress: &'a dyn StatusSink) -> Result<Self> {
        Ok(Self {
            store,
            delimiter: config.csv_options.delimiter_byte()?,
            timeout: Duration::from_secs(config.request_timeout_secs),
            progress,
        })
    }

    /// Import every agency in order; a failed agency is logged and the rest continue
    pub fn import_all(&mut self, agencies: &[AgencyConfig]) -> BatchSummary {
        let mut batch = BatchSummary::default();

        for agency in agencies {
            match self.import_agency(agency) {
                Ok(summary) => batch.imported.push(summary),
                Err(err) => {
                    tracing::error!(agency_key = %agency.agency_key, error = %err, "import failed");
                    batch.failed.push(err);
                }
            }
        }

        batch
    }

    /// Import one agency, replacing whatever feed the store held
    pub fn import_agency(&mut self, agency: &AgencyConfig) -> Result<ImportSummary> {
        self.run(agency).map_err(|e| e.for_agency(&agency.agency_key))
    }

    fn run(&mut self, agency: &AgencyConfig) -> Result<ImportSummary> {
        let started = Instant::now();
        let key = agency.agency_key.as_str();
        let progress = self.progress;

        let feed = source::acquire(agency, self.timeout, &|message: &str| progress.status(key, message))?;

        self.store.reset_all_tables()?;
        tracing::debug!(agency_key = key, "tables reset");

        let mut entities = Vec::new();
        for entity in all_entities() {
            let filename = entity.filename();

            if agency.is_excluded(entity.name) {
                progress.status(key, &format!("Skipping - {filename}"));
                continue;
            }

            let Some(path) = feed.file(&filename) else {
                if !entity.nonstandard {
                    progress.status(key, &format!("Importing - {filename} - No file found"));
                }
                continue;
            };

            progress.progress(key, &format!("Importing - {filename}"));
            let rows = self.load_entity(key, entity, &path)?;
            tracing::info!(agency_key = key, entity = entity.name, rows, "imported");
            entities.push((entity.name, rows));
        }

        progress.status(key, "Completed GTFS import");
        Ok(ImportSummary {
            agency_key: key.to_string(),
            entities,
            duration: started.elapsed(),
        })
    }

    fn load_entity(&mut self, key: &str, entity: &'static EntitySchema, path: &Path) -> Result<usize> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_path(path)?;

        let transformer = RecordTransformer::new(entity, reader.headers()?);
        let filename = entity.filename();

        let mut batch: Vec<Record> = Vec::with_capacity(CHUNK_SIZE);
        let mut record = StringRecord::new();
        let mut count = 0usize;

        while reader.read_record(&mut record)? {
            if record.iter().all(str::is_empty) {
                continue;
            }

            let line = record.position().map(|p| p.line()).unwrap_or_default();
            batch.push(transformer.transform(&record, line)?);
            count += 1;

            if batch.len() >= CHUNK_SIZE {
                self.store.insert_records(entity, &batch)?;
                batch.clear();
                self.progress
                    .progress(key, &format!("Importing - {filename} - {count} lines imported"));
            }
        }

        self.store.insert_records(entity, &batch)?;
        self.progress
            .progress(key, &format!("Importing - {filename} - {count} lines imported"));

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Silent;
    use crate::query::{Filters, QueryEngine};
    use crate::Value;
    use std::cell::RefCell;

    const AGENCY: &str = "agency_id,agency_name,agency_url,agency_timezone\nCT,Caltrain,http://www.caltrain.com,America/Los_Angeles\n";
    const ROUTES: &str = "route_id,route_short_name,route_long_name,route_type,route_color\nLOCAL,1,Local,2,FFFFFF\nEXPRESS,2,Baby Bullet,2,E31837\n";
    const TRIPS: &str = "route_id,service_id,trip_id,direction_id,shape_id\nLOCAL,WK,T1,0,SH1\nEXPRESS,WK,T2,1,SH1\n";
    const STOP_TIMES: &str = "trip_id,arrival_time,departure_time,stop_id,stop_sequence\nT1,08:00:00,08:00:30,S1,1\nT1,08:10:00,08:10:30,S2,2\nT2,09:00:00,09:00:00,S1,1\n";
    const CALENDAR: &str = "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date\nWK,1,1,1,1,1,0,0,20240101,20241231\n";

    fn stops_csv(rows: usize) -> String {
        let mut csv = String::from("\u{feff}stop_id,stop_name,stop_lat,stop_lon,zone_id\n");
        for i in 0..rows {
            csv.push_str(&format!("S{},Stop {},37.{:03},-122.{:03},\n", i + 1, i + 1, i, i));
        }
        csv
    }

    fn write_feed(dir: &Path, stops: usize) {
        std::fs::write(dir.join("agency.txt"), AGENCY).unwrap();
        std::fs::write(dir.join("routes.txt"), ROUTES).unwrap();
        std::fs::write(dir.join("trips.txt"), TRIPS).unwrap();
        std::fs::write(dir.join("stop_times.txt"), STOP_TIMES).unwrap();
        std::fs::write(dir.join("calendar.txt"), CALENDAR).unwrap();
        std::fs::write(dir.join("stops.txt"), stops_csv(stops)).unwrap();
    }

    fn agency(key: &str, path: &Path) -> AgencyConfig {
        AgencyConfig {
            agency_key: key.to_string(),
            path: Some(path.to_string_lossy().into_owned()),
            ..Default::default()
        }
    }

    /// Records every status line
    #[derive(Default)]
    struct Recorder(RefCell<Vec<String>>);

    impl StatusSink for Recorder {
        fn status(&self, agency_key: &str, message: &str) {
            self.0.borrow_mut().push(format!("{agency_key}: {message}"));
        }
    }

    #[test]
    fn test_import_directory_feed() {
        let dir = tempfile::tempdir().unwrap();
        // More than two chunks of stops, ending in a partial chunk
        write_feed(dir.path(), CHUNK_SIZE * 2 + 5);

        let mut store = GtfsStore::open_in_memory().unwrap();
        let recorder = Recorder::default();
        let summary = Importer::new(&mut store, &GtfsConfig::default(), &recorder)
            .unwrap()
            .import_agency(&agency("caltrain", dir.path()))
            .unwrap();

        assert_eq!(summary.agency_key, "caltrain");
        assert!(summary.entities.contains(&("stops", CHUNK_SIZE * 2 + 5)));
        assert!(summary.entities.contains(&("stop_times", 3)));
        assert_eq!(store.count("stops").unwrap(), CHUNK_SIZE * 2 + 5);

        let engine = QueryEngine::new(&store);
        let stop_times = engine.get_stop_times(&Filters::new(), &[]).unwrap();
        assert_eq!(stop_times[0].get_i64("arrival_timestamp"), Some(8 * 3600));
        assert_eq!(stop_times[0].get_i64("departure_timestamp"), Some(8 * 3600 + 30));

        // BOM on the first header did not hide stop_id
        let stops = engine.find("stops", &[("stop_id".to_string(), Value::from("S1"))].into_iter().collect()).unwrap();
        assert_eq!(stops.len(), 1);
        assert_eq!(stops[0].get_str("zone_id"), Some(""));

        let lines = recorder.0.borrow();
        assert!(lines.iter().any(|l| l == "caltrain: Importing - shapes.txt - No file found"));
        assert!(!lines.iter().any(|l| l.contains("timetables.txt")));
        assert!(lines.iter().any(|l| l == &format!("caltrain: Importing - stops.txt - {} lines imported", CHUNK_SIZE)));
        assert_eq!(lines.last().map(String::as_str), Some("caltrain: Completed GTFS import"));
    }

    #[test]
    fn test_import_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        write_feed(dir.path(), 10);

        let mut store = GtfsStore::open_in_memory().unwrap();
        let config = GtfsConfig::default();
        let feed = agency("caltrain", dir.path());

        Importer::new(&mut store, &config, &Silent).unwrap().import_agency(&feed).unwrap();
        let first = store.stats().unwrap();
        Importer::new(&mut store, &config, &Silent).unwrap().import_agency(&feed).unwrap();
        let second = store.stats().unwrap();

        assert_eq!(first.tables, second.tables);
        assert_eq!(store.count("stops").unwrap(), 10);
    }

    #[test]
    fn test_excluded_entities_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_feed(dir.path(), 3);

        let mut store = GtfsStore::open_in_memory().unwrap();
        let recorder = Recorder::default();
        let mut feed = agency("caltrain", dir.path());
        feed.exclude = vec!["stops".to_string()];

        let summary = Importer::new(&mut store, &GtfsConfig::default(), &recorder)
            .unwrap()
            .import_agency(&feed)
            .unwrap();

        assert!(!summary.entities.iter().any(|(name, _)| *name == "stops"));
        assert_eq!(store.count("stops").unwrap(), 0);
        assert!(recorder.0.borrow().iter().any(|l| l == "caltrain: Skipping - stops.txt"));
    }

    #[test]
    fn test_zip_feed_in_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("caltrain.zip");
        source::tests::write_zip(&archive, &[("feed/agency.txt", AGENCY), ("feed/routes.txt", ROUTES)]);

        let mut store = GtfsStore::open_in_memory().unwrap();
        let summary = Importer::new(&mut store, &GtfsConfig::default(), &Silent)
            .unwrap()
            .import_agency(&agency("caltrain", &archive))
            .unwrap();

        assert_eq!(summary.entities, vec![("agency", 1), ("routes", 2)]);
    }

    #[test]
    fn test_invalid_latitude_fails_the_agency() {
        let dir = tempfile::tempdir().unwrap();
        write_feed(dir.path(), 2);
        std::fs::write(dir.path().join("stops.txt"), "stop_id,stop_lat,stop_lon\nS1,37.5,-122\nS2,95,-122\n").unwrap();

        let mut store = GtfsStore::open_in_memory().unwrap();
        let err = Importer::new(&mut store, &GtfsConfig::default(), &Silent)
            .unwrap()
            .import_agency(&agency("caltrain", dir.path()))
            .unwrap_err();

        let Error::Agency { agency_key, source } = err else {
            panic!("expected agency error");
        };
        assert_eq!(agency_key, "caltrain");
        assert!(matches!(*source, Error::Validation { ref field, line: 3, .. } if field == "stop_lat"));
        // The bad row aborts the whole entity
        assert_eq!(store.count("stops").unwrap(), 0);
    }

    #[test]
    fn test_batch_continues_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        write_feed(dir.path(), 4);

        let agencies = vec![
            AgencyConfig { agency_key: "broken".to_string(), ..Default::default() },
            agency("caltrain", &dir.path().join("missing")),
            agency("caltrain", dir.path()),
        ];

        let mut store = GtfsStore::open_in_memory().unwrap();
        let batch = Importer::new(&mut store, &GtfsConfig::default(), &Silent)
            .unwrap()
            .import_all(&agencies);

        assert_eq!(batch.failed.len(), 2);
        assert!(matches!(&batch.failed[0], Error::Agency { source, .. } if matches!(**source, Error::Configuration(_))));
        assert!(matches!(&batch.failed[1], Error::Agency { source, .. } if matches!(**source, Error::Acquisition(_))));
        assert_eq!(batch.imported.len(), 1);
        assert!(!batch.is_success());
        assert_eq!(store.count("stops").unwrap(), 4);
    }

    #[test]
    fn test_semicolon_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("agency.txt"), "agency_name;agency_url;agency_timezone\nCaltrain;http://x;UTC\n").unwrap();

        let mut config = GtfsConfig::default();
        config.csv_options.delimiter = ';';

        let mut store = GtfsStore::open_in_memory().unwrap();
        Importer::new(&mut store, &config, &Silent)
            .unwrap()
            .import_agency(&agency("semi", dir.path()))
            .unwrap();

        let agencies = QueryEngine::new(&store).get_agencies(&Filters::new()).unwrap();
        assert_eq!(agencies[0].get_str("agency_timezone"), Some("UTC"));
    }

    #[test]
    fn test_blank_and_whitespace_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_feed(dir.path(), 1);
        std::fs::write(
            dir.path().join("stops.txt"),
            "stop_id,stop_name,stop_lat,stop_lon\n  S1 , Main St ,37.5,-122\n\n   \n , , , \nS2,Oak,37.6,-122.1\n\n\n",
        )
        .unwrap();

        let mut store = GtfsStore::open_in_memory().unwrap();
        let summary = Importer::new(&mut store, &GtfsConfig::default(), &Silent)
            .unwrap()
            .import_agency(&agency("caltrain", dir.path()))
            .unwrap();

        assert!(summary.entities.contains(&("stops", 2)));
        assert_eq!(store.count("stops").unwrap(), 2);
        let stops = QueryEngine::new(&store).get_stops(&Filters::new(), &[]).unwrap();
        assert_eq!(stops[0].get_str("stop_id"), Some("S1"));
        assert_eq!(stops[0].get_str("stop_name"), Some("Main St"));
    }

    #[test]
    fn test_line_numbers_count_skipped_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        write_feed(dir.path(), 1);
        std::fs::write(
            dir.path().join("stops.txt"),
            "stop_id,stop_lat,stop_lon\nS1,37.5,-122\n\n   \nS2,37.6,-122\nS3,37.7,200\n\n",
        )
        .unwrap();

        let mut store = GtfsStore::open_in_memory().unwrap();
        let err = Importer::new(&mut store, &GtfsConfig::default(), &Silent)
            .unwrap()
            .import_agency(&agency("caltrain", dir.path()))
            .unwrap_err();

        let Error::Agency { source, .. } = err else {
            panic!("expected agency error");
        };
        assert!(
            matches!(*source, Error::Validation { ref field, line: 6, .. } if field == "stop_lon"),
            "{source}"
        );
    }
}
