use crate::{OutputMode, emit_success};
use gtfsdb::config::{self, AgencyConfig, GtfsConfig};
use gtfsdb::export::Exporter;
use gtfsdb::geometry;
use gtfsdb::import::Importer;
use gtfsdb::output::{Silent, StatusSink};
use gtfsdb::query::{Filters, QueryEngine, parse_columns, parse_order_by};
use gtfsdb::ui::{self, AgencyProgress, Icons};
use gtfsdb::{GtfsStore, Value};
use std::path::Path;
use std::time::Instant;

/// `column=value` from the command line
pub fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((column, value)) if !column.trim().is_empty() => {
            Ok((column.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected column=value, got {raw:?}")),
    }
}

fn to_filters(pairs: Vec<(String, String)>) -> Filters {
    pairs.into_iter().map(|(k, v)| (k, Value::Text(v))).collect()
}

fn load(config_path: Option<&Path>) -> anyhow::Result<GtfsConfig> {
    Ok(config::load_config(config_path)?.unwrap_or_default())
}

fn open_store(config: &GtfsConfig) -> anyhow::Result<GtfsStore> {
    let path = config.sqlite_path();
    if path.as_os_str() != ":memory:" {
        config::ensure_parent_dir(&path)?;
    }
    Ok(GtfsStore::open(&path)?)
}

/// Configured agencies, optionally narrowed to one key
fn select_agencies(config: &GtfsConfig, agency_key: Option<&str>) -> anyhow::Result<Vec<AgencyConfig>> {
    let agencies: Vec<AgencyConfig> = config
        .agencies
        .iter()
        .filter(|a| agency_key.is_none_or(|key| a.agency_key == key))
        .cloned()
        .collect();

    if agencies.is_empty() {
        match agency_key {
            Some(key) => anyhow::bail!("no agency {key:?} in config"),
            None => anyhow::bail!("no agencies configured (run `gtfsdb init` or pass --agency-key with --url/--path)"),
        }
    }
    Ok(agencies)
}

pub fn run_init(
    output_mode: OutputMode,
    config_path: Option<&Path>,
    force: bool,
    agency_key: Option<String>,
    url: Option<String>,
    path: Option<String>,
) -> anyhow::Result<()> {
    let target = config_path.map(Path::to_path_buf).unwrap_or_else(config::default_config_path);

    let mut config = GtfsConfig::default();
    if let Some(agency_key) = agency_key {
        let agency = AgencyConfig { agency_key, url, path, ..Default::default() };
        agency.source()?;
        config.agencies.push(agency);
    }

    config::write_config(&target, &config, force)?;

    if output_mode.is_human() {
        ui::success(&format!("Wrote {}", target.display()));
    } else {
        emit_success(output_mode, "init", serde_json::json!({ "path": target }))?;
    }
    Ok(())
}

pub fn run_import(
    output_mode: OutputMode,
    config_path: Option<&Path>,
    agency_key: Option<String>,
    url: Option<String>,
    path: Option<String>,
) -> anyhow::Result<()> {
    let config = load(config_path)?;
    let agencies = match (agency_key, url, path) {
        (Some(agency_key), url, path) if url.is_some() || path.is_some() => {
            vec![AgencyConfig { agency_key, url, path, ..Default::default() }]
        }
        (agency_key, _, _) => select_agencies(&config, agency_key.as_deref())?,
    };

    let mut store = open_store(&config)?;
    let started = Instant::now();

    if output_mode.is_human() {
        ui::header(&format!("Starting GTFS import for {} {}", agencies.len(), plural("feed", agencies.len())));
        ui::status(Icons::DATABASE, "Database", &config.sqlite_path().display().to_string());
    }

    let progress = output_mode.is_human().then(AgencyProgress::new);
    let sink: &dyn StatusSink = match &progress {
        Some(progress) => progress,
        None => &Silent,
    };
    let batch = Importer::new(&mut store, &config, sink)?.import_all(&agencies);

    if let Some(progress) = &progress {
        progress.finish(
            started.elapsed(),
            &format!("Imported {} of {} {}", batch.imported.len(), agencies.len(), plural("feed", agencies.len())),
        );
        for summary in &batch.imported {
            ui::summary_row(&summary.agency_key, &format!("{} rows", summary.total_rows()));
        }
        for err in &batch.failed {
            ui::error(&err.to_string());
        }
    } else {
        emit_success(
            output_mode,
            "import",
            serde_json::json!({
                "imported": batch.imported,
                "failed": batch.failed.iter().map(ToString::to_string).collect::<Vec<_>>(),
            }),
        )?;
    }

    store.close()?;
    if !batch.is_success() {
        anyhow::bail!("{} of {} feeds failed to import", batch.failed.len(), agencies.len());
    }
    Ok(())
}

pub fn run_export(output_mode: OutputMode, config_path: Option<&Path>, agency_key: Option<String>) -> anyhow::Result<()> {
    let config = load(config_path)?;
    let agencies = select_agencies(&config, agency_key.as_deref())?;
    let store = open_store(&config)?;
    let started = Instant::now();

    if output_mode.is_human() {
        ui::header(&format!("Starting GTFS export for {} {}", agencies.len(), plural("feed", agencies.len())));
    }

    let progress = output_mode.is_human().then(AgencyProgress::new);
    let sink: &dyn StatusSink = match &progress {
        Some(progress) => progress,
        None => &Silent,
    };
    let batch = Exporter::new(&store, &config, sink)?.export_all(&agencies);

    if let Some(progress) = &progress {
        progress.finish(started.elapsed(), "Export complete");
        for summary in &batch.exported {
            if summary.has_data() {
                ui::status(Icons::EXPORT, &summary.agency_key, &summary.directory.display().to_string());
            } else {
                ui::warn(&format!("{}: No data found. Check the import for this agency.", summary.agency_key));
            }
        }
        for err in &batch.failed {
            ui::error(&err.to_string());
        }
    } else {
        emit_success(
            output_mode,
            "export",
            serde_json::json!({
                "exported": batch.exported,
                "failed": batch.failed.iter().map(ToString::to_string).collect::<Vec<_>>(),
            }),
        )?;
    }

    if !batch.failed.is_empty() {
        anyhow::bail!("{} of {} feeds failed to export", batch.failed.len(), agencies.len());
    }
    Ok(())
}

pub fn run_query(
    output_mode: OutputMode,
    config_path: Option<&Path>,
    entity: &str,
    filters: Vec<(String, String)>,
    fields: Option<&str>,
    order_by: Option<&str>,
) -> anyhow::Result<()> {
    let config = load(config_path)?;
    let store = open_store(&config)?;
    let engine = QueryEngine::new(&store);

    let columns = fields.map(parse_columns).unwrap_or_default();
    let order = order_by.map(parse_order_by).unwrap_or_default();
    let rows = engine.query(entity, &to_filters(filters), &columns, &order)?;

    if output_mode.is_human() {
        if rows.is_empty() {
            ui::warn(&format!("No {entity} found."));
        } else {
            println!("{}", ui::rows_table(&rows));
            println!("{}", ui::dim(&format!("{} {}", rows.len(), plural("row", rows.len()))));
        }
    } else {
        emit_success(output_mode, "query", serde_json::to_value(&rows)?)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub enum GeojsonTarget {
    Shapes,
    Stops,
}

/// GeoJSON is the output itself, so both modes print the bare collection
pub fn run_geojson(
    output_mode: OutputMode,
    config_path: Option<&Path>,
    target: GeojsonTarget,
    filters: Vec<(String, String)>,
) -> anyhow::Result<()> {
    let config = load(config_path)?;
    let store = open_store(&config)?;
    let engine = QueryEngine::new(&store);
    let filters = to_filters(filters);

    let collection = match target {
        GeojsonTarget::Shapes => geometry::shapes_as_geojson(&engine, &filters)?,
        GeojsonTarget::Stops => geometry::stops_as_geojson(&engine, &filters)?,
    };

    if output_mode.is_human() {
        println!("{}", serde_json::to_string_pretty(&collection)?);
    } else {
        println!("{}", serde_json::to_string(&collection)?);
    }
    Ok(())
}

pub fn run_stats(output_mode: OutputMode, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load(config_path)?;
    let store = open_store(&config)?;
    let stats = store.stats()?;

    if output_mode.is_human() {
        ui::header("gtfsdb statistics");
        ui::info("Database", &config.sqlite_path().display().to_string());
        let table = ui::stats_table(&stats);
        if table.is_empty() {
            ui::warn("No data loaded. Run `gtfsdb import` first.");
        } else {
            println!("{table}");
        }
    } else {
        emit_success(output_mode, "stats", serde_json::to_value(&stats)?)?;
    }
    Ok(())
}

pub fn run_serve(config_path: Option<&Path>, port: u16) -> anyhow::Result<()> {
    let config = load(config_path)?;
    let store = open_store(&config)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(gtfsdb::server::start_server(port, store))
}

fn plural(word: &str, count: usize) -> String {
    if count == 1 { word.to_string() } else { format!("{word}s") }
}
