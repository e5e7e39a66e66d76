//! `shieldpost parse` command handler
//!
//! Runs the parse/filter/aggregate stages over a log file and prints the
//! records a report would contain. Never sends mail or writes the state file.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use shieldpost_core::LineParser;
use shieldpost_core::config::ShieldpostConfig;
use shieldpost_core::types::{AggregateRecord, TimestampKey, UtcOffset, human_timestamp};
use shieldpost_log_pipeline::{
    EventAggregator, EventFilter, FirewallLogParser, PortFilter, ScanStats, SourceFilter,
    StateStore, scan_log,
};

use crate::cli::ParseArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `parse` command.
pub async fn execute(
    args: ParseArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let mut config = ShieldpostConfig::from_file_or_default(config_path).await?;
    config.apply_env_overrides();

    let path = args
        .file
        .unwrap_or_else(|| PathBuf::from(&config.input.log_path));
    let ports = args.ports.as_deref().unwrap_or(&config.report.ports);
    let filter = EventFilter::new(
        PortFilter::parse(ports)?,
        SourceFilter::new(args.drop_private || config.report.drop_private_sources),
    );
    let offset = config.utc_offset()?;

    let cutoff = if args.since_cutoff {
        StateStore::new(&config.input.state_path).load().await
    } else {
        TimestampKey::epoch_floor()
    };

    let parser = FirewallLogParser::new()?.with_max_line_length(config.input.max_line_length);
    let mut aggregator =
        EventAggregator::new(cutoff.clone(), args.obfuscate || config.report.obfuscate);

    info!(path = %path.display(), cutoff = %cutoff, "parsing firewall log");
    let stats = scan_log(&path, &parser, &filter, &mut aggregator).await?;
    let outcome = aggregator.finish();

    let report = ParseReport {
        source: path.display().to_string(),
        format: parser.format_name().to_owned(),
        cutoff,
        stats,
        discarded_stale: outcome.discarded,
        newest: outcome.new_cutoff,
        records: outcome
            .records
            .iter()
            .map(|r| RecordRow::from_record(r, offset))
            .collect(),
    };
    writer.render(&report)?;

    Ok(())
}

/// One aggregated record, with its timestamp already rendered.
#[derive(Debug, Serialize)]
pub struct RecordRow {
    pub latest: String,
    pub count: u64,
    pub src_ip: String,
    pub src_port: u16,
    pub dst_ip: String,
    pub dst_port: u16,
    pub protocol: String,
}

impl RecordRow {
    fn from_record(record: &AggregateRecord, offset: UtcOffset) -> Self {
        Self {
            latest: human_timestamp(&record.latest, offset),
            count: record.occurrences,
            src_ip: record.src_ip.to_string(),
            src_port: record.src_port,
            dst_ip: record.dst_ip.to_string(),
            dst_port: record.dst_port,
            protocol: record.protocol.to_string(),
        }
    }
}

/// Result of a dry parse.
#[derive(Debug, Serialize)]
pub struct ParseReport {
    /// Log file path
    pub source: String,
    /// Parser format name
    pub format: String,
    /// Cutoff applied (epoch floor unless `--since-cutoff`)
    pub cutoff: TimestampKey,
    #[serde(flatten)]
    pub stats: ScanStats,
    pub discarded_stale: u64,
    /// Newest surviving timestamp, i.e. what a submit would persist
    pub newest: Option<TimestampKey>,
    pub records: Vec<RecordRow>,
}

impl Render for ParseReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Parsed {} ({})", self.source.bold(), self.format)?;
        writeln!(
            w,
            "  {} lines, {} events, {} malformed, {} port-filtered, {} source-filtered, {} before cutoff",
            self.stats.lines_read,
            self.stats.events_parsed,
            self.stats.parse_errors,
            self.stats.filtered_port,
            self.stats.filtered_source,
            self.discarded_stale,
        )?;
        writeln!(w)?;

        if self.records.is_empty() {
            writeln!(w, "No records.")?;
            return Ok(());
        }

        writeln!(
            w,
            "{:<27} {:>6}  {:<15} {:>5}  {:<15} {:>5}  {}",
            "Latest", "Count", "Source", "Port", "Destination", "Port", "Proto"
        )?;
        writeln!(w, "{}", "-".repeat(90))?;
        for row in &self.records {
            writeln!(
                w,
                "{:<27} {:>6}  {:<15} {:>5}  {:<15} {:>5}  {}",
                row.latest,
                row.count,
                row.src_ip,
                row.src_port,
                row.dst_ip,
                row.dst_port,
                row.protocol
            )?;
        }
        writeln!(w)?;
        writeln!(w, "{} record(s)", self.records.len())?;
        if let Some(newest) = &self.newest {
            writeln!(w, "Newest timestamp: {}", newest)?;
        }

        Ok(())
    }
}
