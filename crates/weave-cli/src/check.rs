use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use weave::Template;
use weave::weave_view::{CompileOptions, Compiler, Directive, Plan};

use crate::cli::OutputFormat;
use crate::error::{CliError, Result};
use crate::load_json;

#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    /// JSON template to inspect.
    #[arg(long)]
    pub template: PathBuf,

    /// Interpolation delimiters as `OPEN,CLOSE`.
    #[arg(long, value_parser = parse_delimiters)]
    pub delimiters: Option<(String, String)>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

fn parse_delimiters(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once(',') {
        Some((open, close)) if !open.is_empty() && !close.is_empty() => Ok((open.to_owned(), close.to_owned())),
        _ => Err(format!("expected OPEN,CLOSE, got `{raw}`")),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BindingEntry {
    pub binding: String,
    pub kind: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub bindings: Vec<BindingEntry>,
    pub errors: usize,
}

/// Plan `args.template` and validate each binding's paths.
pub fn collect(args: &CheckArgs) -> Result<CheckReport> {
    let template: Template = load_json(&args.template)?;
    let mut options = CompileOptions::default();
    if let Some((open, close)) = &args.delimiters {
        options = options.with_delimiters(open.as_str(), close.as_str());
    }
    let compiler = Compiler::new(options)?;

    let bindings: Vec<BindingEntry> = compiler
        .plan(&template.to_dom())
        .iter()
        .map(|plan| {
            let error = match plan {
                Plan::Directive {
                    directive: Directive::Unknown(name),
                    ..
                } => Some(format!("unknown directive `v-{name}`")),
                _ => plan.validate().err().map(|e| e.to_string()),
            };
            BindingEntry {
                binding: plan.to_string(),
                kind: kind_of(plan),
                error,
            }
        })
        .collect();
    let errors = bindings.iter().filter(|entry| entry.error.is_some()).count();
    Ok(CheckReport { bindings, errors })
}

fn kind_of(plan: &Plan) -> String {
    match plan {
        Plan::Directive { directive, .. } => directive.to_string(),
        Plan::Text { .. } => "text".to_owned(),
    }
}

pub fn run_check(args: CheckArgs, out: &mut impl Write) -> Result<()> {
    let report = collect(&args)?;
    match args.format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &report)?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            for entry in &report.bindings {
                match &entry.error {
                    None => writeln!(out, "ok    {}", entry.binding)?,
                    Some(error) => writeln!(out, "error {}: {error}", entry.binding)?,
                }
            }
            writeln!(out, "{} bindings, {} errors", report.bindings.len(), report.errors)?;
        }
    }
    if report.errors > 0 {
        return Err(CliError::exit(
            2,
            format!("{} of {} bindings are invalid", report.errors, report.bindings.len()),
        ));
    }
    Ok(())
}
