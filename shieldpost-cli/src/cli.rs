//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Shieldpost -- report OSSEC firewall drops to DShield.
///
/// Use `shieldpost <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "shieldpost", version, about, long_about = None)]
pub struct Cli {
    /// Path to the shieldpost.toml configuration file.
    #[arg(short, long, global = true, default_value = "shieldpost.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read new firewall drops, submit a DShield report and advance the cutoff.
    Submit(SubmitArgs),

    /// Parse a firewall log and print the records a report would contain.
    Parse(ParseArgs),

    /// Inspect or reset the persisted cutoff.
    State(StateArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- submit ----

/// Every flag overrides the matching `shieldpost.toml` value.
#[derive(Args, Debug, Default)]
pub struct SubmitArgs {
    /// OSSEC firewall log to read.
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// DShield user ID.
    #[arg(long)]
    pub userid: Option<String>,

    /// Sender address of the report mail.
    #[arg(long)]
    pub from: Option<String>,

    /// Recipient address (default: reports@dshield.org).
    #[arg(long)]
    pub to: Option<String>,

    /// Mail relay host.
    #[arg(long)]
    pub mta: Option<String>,

    /// Mail relay port.
    #[arg(long)]
    pub mta_port: Option<u16>,

    /// File holding the last reported timestamp.
    #[arg(long)]
    pub statefile: Option<PathBuf>,

    /// Destination port filter, e.g. "!25,!80,445".
    #[arg(long)]
    pub ports: Option<String>,

    /// Rewrite the first octet of destination addresses to 10.
    #[arg(long)]
    pub obfuscate: bool,

    /// Skip events from 127.0.0.1 and RFC1918 sources.
    #[arg(long)]
    pub drop_private: bool,

    /// Print the report instead of mailing it (the cutoff is still advanced).
    #[arg(long)]
    pub test: bool,

    /// UTC offset to stamp on the report, e.g. "+09:00".
    #[arg(long, allow_hyphen_values = true)]
    pub timezone: Option<String>,
}

// ---- parse ----

/// Parse a firewall log without touching state or sending anything.
#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Log file to parse (default: input.log_path from the configuration).
    pub file: Option<PathBuf>,

    /// Destination port filter to apply.
    #[arg(long)]
    pub ports: Option<String>,

    /// Skip events from 127.0.0.1 and RFC1918 sources.
    #[arg(long)]
    pub drop_private: bool,

    /// Rewrite the first octet of destination addresses to 10.
    #[arg(long)]
    pub obfuscate: bool,

    /// Only count events newer than the persisted cutoff.
    #[arg(long)]
    pub since_cutoff: bool,
}

// ---- state ----

/// Inspect or reset the persisted cutoff.
#[derive(Args, Debug)]
pub struct StateArgs {
    /// Override the state file location.
    #[arg(long)]
    pub statefile: Option<PathBuf>,

    #[command(subcommand)]
    pub action: StateAction,
}

#[derive(Subcommand, Debug)]
pub enum StateAction {
    /// Print the persisted cutoff.
    Show,
    /// Forget the cutoff so the next run reports the whole log.
    Reset,
}

// ---- config ----

/// Manage shieldpost configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, input, report, relay).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_submit_defaults() {
        let cli = Cli::try_parse_from(["shieldpost", "submit"]).expect("parse succeeded");
        match cli.command {
            Commands::Submit(args) => {
                assert!(args.log.is_none());
                assert!(!args.obfuscate, "obfuscate should default to false");
                assert!(!args.drop_private, "drop_private should default to false");
                assert!(!args.test, "test should default to false");
            }
            _ => panic!("expected Submit command"),
        }
    }

    #[test]
    fn test_cli_parse_submit_all_flags() {
        let cli = Cli::try_parse_from([
            "shieldpost",
            "submit",
            "--log",
            "/var/ossec/logs/firewall/firewall.log",
            "--userid",
            "12345",
            "--from",
            "ossec@example.com",
            "--to",
            "test@dshield.org",
            "--mta",
            "mail.example.com",
            "--mta-port",
            "2525",
            "--statefile",
            "/tmp/cutoff.state",
            "--ports",
            "!25,!80,445",
            "--obfuscate",
            "--drop-private",
            "--test",
            "--timezone",
            "-05:00",
        ])
        .expect("parse succeeded");

        match cli.command {
            Commands::Submit(args) => {
                assert_eq!(args.userid.as_deref(), Some("12345"));
                assert_eq!(args.mta.as_deref(), Some("mail.example.com"));
                assert_eq!(args.mta_port, Some(2525));
                assert_eq!(args.ports.as_deref(), Some("!25,!80,445"));
                assert_eq!(args.timezone.as_deref(), Some("-05:00"));
                assert_eq!(args.to.as_deref(), Some("test@dshield.org"));
                assert!(args.obfuscate && args.drop_private && args.test);
            }
            _ => panic!("expected Submit command"),
        }
    }

    #[test]
    fn test_cli_parse_submit_rejects_bad_port_number() {
        let args = Cli::try_parse_from(["shieldpost", "submit", "--mta-port", "70000"]);
        assert!(args.is_err(), "mta-port above 65535 should be rejected");
    }

    #[test]
    fn test_cli_parse_parse_with_file() {
        let cli = Cli::try_parse_from(["shieldpost", "parse", "/tmp/firewall.log", "--ports", "22"])
            .expect("parse succeeded");
        match cli.command {
            Commands::Parse(args) => {
                assert_eq!(args.file, Some(PathBuf::from("/tmp/firewall.log")));
                assert_eq!(args.ports.as_deref(), Some("22"));
                assert!(!args.since_cutoff);
            }
            _ => panic!("expected Parse command"),
        }
    }

    #[test]
    fn test_cli_parse_state_show_and_reset() {
        let cli = Cli::try_parse_from(["shieldpost", "state", "show"]).expect("parse succeeded");
        assert!(matches!(
            cli.command,
            Commands::State(StateArgs {
                action: StateAction::Show,
                ..
            })
        ));

        let cli = Cli::try_parse_from(["shieldpost", "state", "--statefile", "/tmp/x", "reset"])
            .expect("parse succeeded");
        match cli.command {
            Commands::State(args) => {
                assert!(matches!(args.action, StateAction::Reset));
                assert_eq!(args.statefile, Some(PathBuf::from("/tmp/x")));
            }
            _ => panic!("expected State command"),
        }
    }

    #[test]
    fn test_cli_parse_config_show_section() {
        let cli = Cli::try_parse_from(["shieldpost", "config", "show", "--section", "relay"])
            .expect("parse succeeded");
        match cli.command {
            Commands::Config(config_args) => match config_args.action {
                ConfigAction::Show { section } => {
                    assert_eq!(section, Some("relay".to_owned()));
                }
                _ => panic!("expected Show action"),
            },
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn test_cli_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "shieldpost",
            "config",
            "validate",
            "-c",
            "/etc/shieldpost.toml",
            "--output",
            "json",
            "--log-level",
            "debug",
        ])
        .expect("parse succeeded");
        assert_eq!(cli.config, PathBuf::from("/etc/shieldpost.toml"));
        assert!(matches!(cli.output, OutputFormat::Json));
        assert_eq!(cli.log_level, Some("debug".to_owned()));
    }

    #[test]
    fn test_cli_parse_default_config_path() {
        let cli = Cli::try_parse_from(["shieldpost", "state", "show"]).expect("parse succeeded");
        assert_eq!(cli.config, PathBuf::from("shieldpost.toml"));
        assert!(matches!(cli.output, OutputFormat::Text));
    }

    #[test]
    fn test_cli_parse_invalid_output_format() {
        let args = Cli::try_parse_from(["shieldpost", "--output", "xml", "state", "show"]);
        assert!(args.is_err(), "unknown output format should fail");
    }

    #[test]
    fn test_cli_parse_missing_subcommand() {
        let args = Cli::try_parse_from(["shieldpost"]);
        assert!(args.is_err(), "should fail without subcommand");
    }

    #[test]
    fn test_cli_command_factory_is_consistent() {
        Cli::command().debug_assert();
    }
}
