//! Text/JSON rendering of command results
//!
//! Command handlers build a payload and hand it to [`OutputWriter`]. Results go to
//! stdout unless stdout already carries a report (`submit --test`), in which case
//! the run summary is routed to stderr so the report can be piped untouched.

use std::io::Write;

use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Where rendered results are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputTarget {
    #[default]
    Stdout,
    Stderr,
}

/// Renders command payloads in the format chosen with `--output`.
#[derive(Debug, Clone, Copy)]
pub struct OutputWriter {
    format: OutputFormat,
    target: OutputTarget,
}

impl OutputWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            target: OutputTarget::Stdout,
        }
    }

    /// Same format, results written to stderr.
    pub fn to_stderr(self) -> Self {
        Self {
            target: OutputTarget::Stderr,
            ..self
        }
    }

    pub fn target(&self) -> OutputTarget {
        self.target
    }

    /// Render a payload to the configured target.
    pub fn render<T: Render + Serialize>(&self, payload: &T) -> Result<(), CliError> {
        match self.target {
            OutputTarget::Stdout => self.render_to(&mut std::io::stdout().lock(), payload),
            OutputTarget::Stderr => self.render_to(&mut std::io::stderr().lock(), payload),
        }
    }

    /// Render a payload into `w`.
    ///
    /// JSON is pretty-printed and newline-terminated so that one result per
    /// cron run stays readable in mail or log output.
    pub fn render_to<T: Render + Serialize>(
        &self,
        w: &mut dyn Write,
        payload: &T,
    ) -> Result<(), CliError> {
        match self.format {
            OutputFormat::Text => payload.render_text(w)?,
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *w, payload)?;
                writeln!(w)?;
            }
        }
        w.flush()?;
        Ok(())
    }
}

/// Human-readable rendering, implemented next to each payload type.
pub trait Render {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct CutoffPayload {
        path: String,
        cutoff: String,
    }

    impl Render for CutoffPayload {
        fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
            writeln!(w, "{}: {}", self.path, self.cutoff)
        }
    }

    fn payload() -> CutoffPayload {
        CutoffPayload {
            path: "/var/ossec/logs/firewall/shieldpost.state".to_owned(),
            cutoff: "20240115120005".to_owned(),
        }
    }

    #[test]
    fn text_format_uses_render_impl() {
        let writer = OutputWriter::new(OutputFormat::Text);
        let mut buffer = Vec::new();
        writer
            .render_to(&mut buffer, &payload())
            .expect("text rendering should succeed");

        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert_eq!(
            output,
            "/var/ossec/logs/firewall/shieldpost.state: 20240115120005\n"
        );
    }

    #[test]
    fn json_format_is_newline_terminated() {
        let writer = OutputWriter::new(OutputFormat::Json);
        let mut buffer = Vec::new();
        writer
            .render_to(&mut buffer, &payload())
            .expect("json rendering should succeed");

        let parsed: serde_json::Value =
            serde_json::from_slice(&buffer).expect("should parse back to JSON");
        assert_eq!(parsed["cutoff"].as_str(), Some("20240115120005"));
        assert!(buffer.ends_with(b"\n"));
    }

    #[test]
    fn stderr_routing_keeps_format() {
        let writer = OutputWriter::new(OutputFormat::Json).to_stderr();
        assert_eq!(writer.target(), OutputTarget::Stderr);

        let mut buffer = Vec::new();
        writer
            .render_to(&mut buffer, &payload())
            .expect("json rendering should succeed");
        assert!(buffer.starts_with(b"{"));
    }
}
