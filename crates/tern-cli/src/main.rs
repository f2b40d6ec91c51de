use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use tern_lang::{Analysis, AnnotationDescriptor, Error, ResolverConfig, Severity};

/// Resolve the annotations of a tern source file and print them.
#[derive(Parser)]
#[command(name = "tern", version, about)]
struct Cli {
    /// Source file to analyse
    file: PathBuf,

    /// Do not warn about annotation arguments that are not compile-time constants
    #[arg(long)]
    no_constant_warnings: bool,

    /// Deepest expression nesting scanned for annotations
    #[arg(long, default_value_t = ResolverConfig::DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Log resolution steps to stderr
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// `Ok(false)` when the file has syntax or semantic errors.
fn run(cli: &Cli) -> Result<bool> {
    let source = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("reading {}", cli.file.display()))?;

    let config = ResolverConfig::default()
        .with_non_constant_reporting(!cli.no_constant_warnings)
        .with_max_depth(cli.max_depth);

    let path = cli.file.display().to_string();
    let analysis = match tern_lang::analyze_with(&source, &config) {
        Ok(analysis) => analysis,
        Err(errors) => {
            for e in &errors {
                print_diagnostic(&path, e);
            }
            return Ok(false);
        }
    };

    debug!(file = %path, annotations = analysis.context.descriptor_count(), "analysis finished");
    print_annotations(&analysis);
    for e in analysis.diagnostics() {
        print_diagnostic(&path, e);
    }
    Ok(!analysis.has_errors())
}

fn print_annotations(analysis: &Analysis) {
    for (entry, desc) in analysis.resolved_annotations() {
        match desc {
            Some(desc) => println!("{}:{} @{}", entry.span.line, entry.span.column, render(desc)),
            None => println!("{}:{} @{} <not resolved>", entry.span.line, entry.span.column, entry.name),
        }
    }
}

/// `Type(arg, arg, <non-constant>)`
fn render(desc: &AnnotationDescriptor) -> String {
    let args: Vec<String> = desc
        .value_arguments
        .iter()
        .map(|v| v.as_ref().map_or_else(|| "<non-constant>".to_string(), ToString::to_string))
        .collect();
    format!("{}({})", desc.annotation_type, args.join(", "))
}

fn print_diagnostic(path: &str, e: &Error) {
    let severity = match e.severity() {
        Severity::Error => "error",
        Severity::Warning => "warning",
    };
    eprintln!("{path}:{}:{}: {severity} [{}]: {}", e.line, e.column, e.code, e.message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_lang::{ConstantValue, Type};

    #[test]
    fn render_marks_non_constant_arguments() {
        let desc = AnnotationDescriptor {
            annotation_type: Type::Class("Ann".into()),
            value_arguments: vec![Some(ConstantValue::Int(1)), None, Some(ConstantValue::String("s".into()))],
        };
        assert_eq!(render(&desc), "Ann(1, <non-constant>, \"s\")");
    }

    #[test]
    fn cli_flags() {
        let cli = Cli::parse_from(["tern", "a.tn", "--no-constant-warnings", "--max-depth", "8", "-v"]);
        assert!(cli.no_constant_warnings);
        assert_eq!(cli.max_depth, 8);
        assert!(cli.verbose);
        assert_eq!(cli.file, PathBuf::from("a.tn"));
    }
}
