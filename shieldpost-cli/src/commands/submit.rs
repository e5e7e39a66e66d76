//! `shieldpost submit` command handler

use std::io::Write;
use std::path::Path;

use tracing::info;

use shieldpost_core::config::ShieldpostConfig;
use shieldpost_log_pipeline::{PipelineConfig, RelayTransport, ReportPipelineBuilder, RunSummary};

use crate::cli::SubmitArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `submit` command.
///
/// Configuration is layered: file (optional) -> environment -> command line,
/// then validated as a whole. Nothing is read or sent until validation passes.
pub async fn execute(
    args: SubmitArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let mut config = ShieldpostConfig::from_file_or_default(config_path).await?;
    config.apply_env_overrides();
    apply_overrides(&mut config, args);
    config.validate()?;

    let pipeline_config = PipelineConfig::from_core(&config)?;
    let transport = RelayTransport::from_config(&pipeline_config).await?;
    let pipeline = ReportPipelineBuilder::new()
        .config(pipeline_config)
        .sender(transport)
        .build()?;

    info!(
        log = %config.input.log_path,
        state = %config.input.state_path,
        relay = %config.relay.host,
        "submitting DShield report"
    );

    let summary = pipeline.run().await?;
    if summary.dry_run {
        // stdout already holds the report envelope
        writer.to_stderr().render(&summary)?;
    } else {
        writer.render(&summary)?;
    }

    Ok(())
}

/// Apply command-line flags on top of the loaded configuration.
///
/// Boolean flags can only switch features on.
pub fn apply_overrides(config: &mut ShieldpostConfig, args: SubmitArgs) {
    if let Some(log) = args.log {
        config.input.log_path = log.display().to_string();
    }
    if let Some(statefile) = args.statefile {
        config.input.state_path = statefile.display().to_string();
    }
    if let Some(userid) = args.userid {
        config.report.user_id = userid;
    }
    if let Some(from) = args.from {
        config.report.from = from;
    }
    if let Some(to) = args.to {
        config.report.to = to;
    }
    if let Some(ports) = args.ports {
        config.report.ports = ports;
    }
    if let Some(timezone) = args.timezone {
        config.report.timezone = timezone;
    }
    if let Some(mta) = args.mta {
        config.relay.host = mta;
    }
    if let Some(port) = args.mta_port {
        config.relay.port = port;
    }
    config.report.obfuscate |= args.obfuscate;
    config.report.drop_private_sources |= args.drop_private;
    config.report.dry_run |= args.test;
}

impl Render for RunSummary {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let outcome = match (self.submitted, self.dry_run) {
            (true, true) => "PRINTED (test mode)".yellow().bold(),
            (true, false) => "SUBMITTED".green().bold(),
            (false, _) => "NOTHING TO REPORT".dimmed(),
        };
        writeln!(w, "Report: {}", outcome)?;
        writeln!(w, "  Lines read:       {}", self.lines_read)?;
        writeln!(w, "  Events parsed:    {}", self.events_parsed)?;
        if self.parse_errors > 0 {
            writeln!(
                w,
                "  Malformed lines:  {}",
                self.parse_errors.to_string().red()
            )?;
        }
        writeln!(w, "  Port filtered:    {}", self.filtered_port)?;
        writeln!(w, "  Source filtered:  {}", self.filtered_source)?;
        writeln!(w, "  Already reported: {}", self.discarded_stale)?;
        writeln!(w, "  Records:          {}", self.records)?;
        writeln!(w, "  Previous cutoff:  {}", self.previous_cutoff)?;
        match &self.new_cutoff {
            Some(cutoff) => writeln!(w, "  New cutoff:       {}", cutoff.to_string().bold())?,
            None => writeln!(w, "  New cutoff:       (unchanged)")?,
        }
        Ok(())
    }
}
