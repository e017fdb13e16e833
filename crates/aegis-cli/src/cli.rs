use std::path::PathBuf;

use aegis_core::types::FailOn;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "aegis")]
#[command(about = "Rule-based security analyzer for JavaScript, TypeScript and Python")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan a file or directory
    Scan {
        /// File or directory to scan
        path: PathBuf,

        /// Config file (TOML, or JSON by extension). Default: <path>/aegis.toml
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Report format
        #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,

        /// Lowest severity that makes the scan fail (error, warning)
        #[arg(long)]
        fail_on: Option<FailOn>,

        /// Worker threads, 0 for one per core
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Disable colored text output
        #[arg(long)]
        no_color: bool,
    },

    /// List the built-in rules
    Rules {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable lines and a summary
    Text,
    /// The full scan result as JSON
    Json,
    /// SARIF 2.1.0
    Sarif,
}

impl ReportFormat {
    pub fn name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::Sarif => "sarif",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_scan_arguments() {
        let args = Args::parse_from([
            "aegis", "scan", "src", "--format", "sarif", "--fail-on", "warning", "-j", "4", "--no-color",
        ]);
        match args.command {
            Command::Scan {
                path,
                format,
                fail_on,
                threads,
                no_color,
                config,
            } => {
                assert_eq!(path, PathBuf::from("src"));
                assert_eq!(format, ReportFormat::Sarif);
                assert_eq!(fail_on, Some(FailOn::Warning));
                assert_eq!(threads, Some(4));
                assert!(no_color);
                assert!(config.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_bad_fail_on_rejected() {
        assert!(Args::try_parse_from(["aegis", "scan", ".", "--fail-on", "info"]).is_err());
    }
}
