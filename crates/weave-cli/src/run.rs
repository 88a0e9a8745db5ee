use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use weave::{Options, Template, Value, Vm};

use crate::cli::OutputFormat;
use crate::error::{CliError, Result};
use crate::{load_json, script};

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// JSON object used as the view-model data.
    #[arg(long)]
    pub data: PathBuf,

    /// JSON template to mount.
    #[arg(long)]
    pub template: PathBuf,

    /// JSON array of `set` and `event` steps applied in order.
    #[arg(long)]
    pub script: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// One rendered snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    /// `None` for the initial render.
    pub step: Option<usize>,
    pub action: String,
    pub html: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub bindings: usize,
    pub frames: Vec<Frame>,
    pub data: serde_json::Value,
}

/// Build the view-model, replay the script, and collect a frame per step.
pub fn collect(args: &RunArgs) -> Result<RunReport> {
    let data: serde_json::Value = load_json(&args.data)?;
    let template: Template = load_json(&args.template)?;
    let steps = script::load(args.script.as_deref())?;

    let vm = Vm::new(Options::new().with_data(data).with_template(template))?;
    let bindings = vm.binding_count();
    let render = |vm: &Vm| {
        vm.render()
            .ok_or_else(|| CliError::invalid("template was unmounted"))
    };

    let mut frames = vec![Frame {
        step: None,
        action: "mount".to_owned(),
        html: render(&vm)?,
    }];
    for (index, step) in steps.iter().enumerate() {
        let number = index + 1;
        step.apply(&vm).map_err(|e| e.at_step(number))?;
        tracing::debug!(step = number, action = %step, "script step applied");
        frames.push(Frame {
            step: Some(number),
            action: step.to_string(),
            html: render(&vm)?,
        });
    }

    Ok(RunReport {
        bindings,
        frames,
        data: Value::Object(vm.data().clone()).to_json(),
    })
}

pub fn run_run(args: RunArgs, out: &mut impl Write) -> Result<()> {
    let report = collect(&args)?;
    match args.format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &report)?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            for frame in &report.frames {
                match frame.step {
                    None => writeln!(out, "# {}", frame.action)?,
                    Some(step) => writeln!(out, "# {step}: {}", frame.action)?,
                }
                writeln!(out, "{}", frame.html)?;
            }
        }
    }
    Ok(())
}
