use std::cell::RefCell;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;

use clap::Args;
use serde::Serialize;
use weave::{Options, Value, Vm, WatchOptions};

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::{load_json, script};

#[derive(Debug, Clone, Args)]
pub struct WatchArgs {
    /// JSON object used as the view-model data.
    #[arg(long)]
    pub data: PathBuf,

    /// Dotted path to watch, e.g. `user.address.city`.
    #[arg(long)]
    pub path: String,

    /// JSON array of `set` steps applied in order.
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Report every write to the path, not only changes.
    #[arg(long)]
    pub always: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// One callback invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub step: usize,
    pub new: serde_json::Value,
    pub old: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct WatchReport {
    pub path: String,
    pub initial: serde_json::Value,
    pub changes: Vec<Change>,
}

/// Watch `args.path`, replay the script, and record every callback.
pub fn collect(args: &WatchArgs) -> Result<WatchReport> {
    let data: serde_json::Value = load_json(&args.data)?;
    let steps = script::load(args.script.as_deref())?;
    let vm = Vm::new(Options::new().with_data(data))?;

    let current_step = Rc::new(RefCell::new(0_usize));
    let changes = Rc::new(RefCell::new(Vec::new()));
    let options = WatchOptions::default()
        .with_always_fire(args.always)
        .with_label(args.path.clone());
    let watcher = {
        let current_step = Rc::clone(&current_step);
        let changes = Rc::clone(&changes);
        vm.watch_with_options(&args.path, options, move |new: &Value, old: &Value| {
            changes.borrow_mut().push(Change {
                step: *current_step.borrow(),
                new: new.to_json(),
                old: old.to_json(),
            });
        })?
    };
    let initial = watcher.value().to_json();

    for (index, step) in steps.iter().enumerate() {
        let number = index + 1;
        *current_step.borrow_mut() = number;
        step.apply(&vm).map_err(|e| e.at_step(number))?;
    }
    watcher.teardown();

    let changes = changes.take();
    Ok(WatchReport {
        path: args.path.clone(),
        initial,
        changes,
    })
}

pub fn run_watch(args: WatchArgs, out: &mut impl Write) -> Result<()> {
    let report = collect(&args)?;
    match args.format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &report)?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            writeln!(out, "{} = {}", report.path, report.initial)?;
            for change in &report.changes {
                writeln!(out, "#{}: ({}, {})", change.step, change.new, change.old)?;
            }
        }
    }
    Ok(())
}
