//! `aegis` command-line entry point.
//!
//! Exit status: 0 when no diagnostic reaches the fail-on threshold, 1 when
//! one does, 2 on configuration errors and other fatal failures.

mod cli;

use std::io::{IsTerminal, Write};
use std::path::Path;
use std::process::ExitCode;

use aegis_analysis::pipeline::{FsProvider, ScanPipeline};
use aegis_analysis::reporters::create_reporter;
use aegis_analysis::rules::RuleRegistry;
use aegis_core::config::{AegisConfig, CliOverrides};
use aegis_core::constants::DEFAULT_LOG_DIRECTIVE;
use aegis_core::traits::CancellationToken;
use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::json;

use cli::{Args, Command, ReportFormat};

const EXIT_FATAL: u8 = 2;

fn main() -> ExitCode {
    aegis_core::tracing::init_tracing(DEFAULT_LOG_DIRECTIVE);
    let args = Args::parse();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("aegis: {e:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    match args.command {
        Command::Scan {
            path,
            config,
            format,
            fail_on,
            threads,
            no_color,
        } => {
            let overrides = CliOverrides { fail_on, threads };
            let use_color = format == ReportFormat::Text
                && !no_color
                && std::env::var_os("NO_COLOR").is_none()
                && std::io::stdout().is_terminal();
            scan(&path, config.as_deref(), &overrides, format, use_color)
        }
        Command::Rules { json } => {
            list_rules(json)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn scan(
    path: &Path,
    config_path: Option<&Path>,
    overrides: &CliOverrides,
    format: ReportFormat,
    use_color: bool,
) -> Result<ExitCode> {
    if !path.exists() {
        bail!("scan target '{}' does not exist", path.display());
    }
    let config = AegisConfig::load(path, config_path, Some(overrides)).context("invalid configuration")?;

    let provider = FsProvider::new(path, &[]);
    tracing::info!(root = %path.display(), files = provider.files().len(), "discovered files");

    let mut pipeline = ScanPipeline::default();
    let result = pipeline
        .run(&config, &provider, &CancellationToken::new())
        .context("scan failed")?;

    let reporter = create_reporter(format.name(), pipeline.registry(), use_color)
        .with_context(|| format!("no reporter for format '{}'", format.name()))?;
    let report = reporter.generate(&result).map_err(anyhow::Error::msg)?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(report.as_bytes())?;
    if !report.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;

    let code = result.exit_code(config.effective_fail_on());
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(EXIT_FATAL)))
}

fn list_rules(as_json: bool) -> Result<()> {
    let registry = RuleRegistry::builtin();
    let mut stdout = std::io::stdout().lock();

    if as_json {
        let rules: Vec<_> = registry
            .iter()
            .map(|rule| {
                let meta = rule.meta();
                json!({
                    "id": meta.id,
                    "category": meta.category.name(),
                    "defaultSeverity": meta.default_severity,
                    "description": meta.description,
                    "wholeProgram": meta.whole_program,
                    "messages": meta.message_ids().collect::<Vec<_>>(),
                })
            })
            .collect();
        writeln!(stdout, "{}", serde_json::to_string_pretty(&rules)?)?;
        return Ok(());
    }

    for rule in registry.iter() {
        let meta = rule.meta();
        writeln!(
            stdout,
            "{:<28} {:<18} {:<8} {}",
            meta.id,
            meta.category.name(),
            meta.default_severity.name(),
            meta.description
        )?;
    }
    Ok(())
}
