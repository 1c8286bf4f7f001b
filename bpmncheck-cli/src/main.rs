use anyhow::{Context as _, Result};
use bpmncheck_core::{Config, ValidationResult, Validator};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bpmncheck")]
#[command(about = "Validates BPMN process models and the files they import")]
struct Cli {
    /// Process model files to validate
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Enable debug output
    #[arg(long)]
    debug: bool,

    /// Rule definition file (defaults to the configured path)
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Emit results as JSON instead of a report
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::default();
    if let Some(rules) = &cli.rules {
        config = config.with_rules_path(rules);
    }
    let validator = Validator::from_config(config).context("could not load rule definitions")?;

    let mut results = Vec::with_capacity(cli.files.len());
    for file in &cli.files {
        let result = validator
            .validate(file)
            .with_context(|| format!("validation of {} failed", file.display()))?;
        results.push((file, result));
    }

    if cli.json {
        let reports: Vec<&ValidationResult> = results.iter().map(|(_, result)| result).collect();
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for (file, result) in &results {
            print_report(&file.display().to_string(), result);
        }
    }

    Ok(())
}

fn print_report(file: &str, result: &ValidationResult) {
    if result.is_valid() {
        println!("{file}: valid");
        return;
    }
    println!("{file}: {} violation(s)", result.violations.len());
    for violation in &result.violations {
        println!(
            "  [{}] {} (line {}): {}",
            violation.constraint, violation.file_name, violation.line, violation.message
        );
    }
}
