//! Attribute command

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use changefinder_core::logging_facility::{init, Profile};
use changefinder_core::{
    standard_rules, AttributionKind, CatalogueConfig, Change, ChangeFinderError, ExError,
    ExErrorKind, InMemoryReferenceData, Pipeline, ReferenceRecord, Snapshot,
};
use clap::{Args, ValueEnum};
use serde_json::json;
use tracing::info;

/// Attributions that are routine bookkeeping rather than events
const NOISE: [AttributionKind; 2] = [AttributionKind::CounterTracker, AttributionKind::ValueReset];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Args)]
pub struct AttributeArgs {
    /// Snapshot stream, one JSON record per line
    #[arg(long)]
    pub snapshots: PathBuf,

    /// Directory holding `<table>.json` reference tables
    #[arg(long)]
    pub reference: Option<PathBuf>,

    /// Catalogue YAML replacing the builtin one
    #[arg(long)]
    pub catalogue: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Also print changes that are only counter or reset chatter
    #[arg(long)]
    pub show_noise: bool,

    /// Logging profile (development or production)
    #[arg(long, default_value = "production")]
    pub log: Profile,
}

pub fn execute(args: AttributeArgs) -> Result<(), Box<dyn std::error::Error>> {
    init(args.log);

    let config = match &args.catalogue {
        Some(path) => CatalogueConfig::from_yaml_file(path)?,
        None => CatalogueConfig::builtin()?,
    };

    let reference = match &args.reference {
        Some(dir) => load_reference(dir, &config)?,
        None => InMemoryReferenceData::new(),
    };

    let snapshots = read_snapshots(&args.snapshots)?;
    let mut pipeline = Pipeline::new(standard_rules(&config), reference);
    info!(
        component = "changefinder_cli",
        run_id = pipeline.run_id().as_str(),
        snapshots_len = snapshots.len(),
        rules_len = pipeline.rule_names().len(),
        "attributing snapshot stream"
    );

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for (index, snapshot) in snapshots.into_iter().enumerate() {
        let change = pipeline.process(snapshot)?;
        if !args.show_noise && change.is_noise(&NOISE) {
            continue;
        }
        match args.format {
            OutputFormat::Text => writeln!(out, "{}", render_text(index, &change))?,
            OutputFormat::Json => writeln!(out, "{}", render_json(index, &change)?)?,
        }
    }
    out.flush()?;

    Ok(())
}

fn read_snapshots(path: &Path) -> Result<Vec<Snapshot>, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path).map_err(|e| io_error(path, e))?;

    let mut snapshots = Vec::new();
    for (n, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let snapshot = Snapshot::from_json_str(line).map_err(|e| match e {
            ChangeFinderError::InvalidSnapshot { reason } => ChangeFinderError::InvalidSnapshot {
                reason: format!("line {}: {}", n + 1, reason),
            },
            other => other,
        })?;
        snapshots.push(snapshot);
    }
    Ok(snapshots)
}

/// Load every table the catalogue consults; a missing file is an empty table
fn load_reference(
    dir: &Path,
    config: &CatalogueConfig,
) -> Result<InMemoryReferenceData, Box<dyn std::error::Error>> {
    let mut reference = InMemoryReferenceData::new();
    for table in config.reference_tables() {
        let path = dir.join(format!("{}.json", table));
        if !path.exists() {
            continue;
        }
        let content = fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
        let records: Vec<ReferenceRecord> = serde_json::from_str(&content)
            .map_err(ChangeFinderError::from)?;
        reference.insert_table(table, records);
    }
    Ok(reference)
}

fn io_error(path: &Path, err: io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op("read_input")
        .with_message(format!("{}: {}", path.display(), err))
}

fn display_name(change: &Change) -> &str {
    change
        .current
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or(&change.entity_id)
}

fn render_text(index: usize, change: &Change) -> String {
    let attributions: Vec<String> = change
        .attributions
        .iter()
        .map(|a| {
            let fields: Vec<&str> = a.fields.iter().map(String::as_str).collect();
            format!("{}{{{}}}", a.kind, fields.join(","))
        })
        .collect();
    format!(
        "{} {} {} {}",
        index,
        display_name(change),
        change.valid_from.to_rfc3339(),
        attributions.join(" ")
    )
}

fn render_json(index: usize, change: &Change) -> Result<String, ChangeFinderError> {
    let line = json!({
        "index": index,
        "name": display_name(change),
        "digest": change.digest()?,
        "change": change,
    });
    Ok(line.to_string())
}
