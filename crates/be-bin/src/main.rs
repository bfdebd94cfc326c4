//! Backedit entrypoint.
//!
//! Two modes, dispatched on the argument's file extension: a `.tmpl` path is
//! rendered forward (editable render, baseline render, trace), a recognized
//! render extension runs the reconciliation pipeline and writes suffixed
//! copies of the modified sources. Anything else prints usage.

use anyhow::{Context as _, Result};
use clap::Parser;
use core_config::Config;
use core_reconcile::FsLoader;
use core_template::Context;
use core_trace::Trace;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

const USAGE: &str = "usage: backedit <file.tmpl|file.html>";

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(
    name = "backedit",
    version,
    about = "Edit rendered templates, then push the edits back into the sources"
)]
struct Args {
    /// Template to render (`.tmpl`) or edited render to reconcile.
    pub path: Option<PathBuf>,
    /// Optional configuration file path (overrides discovery of `backedit.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let log_path = log_dir.join("backedit.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(log_dir, "backedit.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(_) => Some(guard),
        Err(_err) => {
            // Global tracing subscriber already installed; drop guard so writer shuts down.
            None
        }
    }
}

fn main() -> Result<()> {
    let _log_guard = configure_logging();
    let args = Args::parse();
    let config = core_config::load_from(args.config.clone())?;
    info!(
        target: "runtime",
        config_override = args.config.is_some(),
        "startup"
    );

    let Some(path) = args.path else {
        println!("{USAGE}");
        return Ok(());
    };

    if config.is_template_path(&path) {
        generate(&path, &config)
    } else if config.is_render_path(&path) {
        reconcile(&path, &config)
    } else {
        println!("{USAGE}");
        Ok(())
    }
}

/// Forward mode: render the template and write the editable render, the
/// baseline render, and the trace next to it.
fn generate(template: &Path, config: &Config) -> Result<()> {
    let source = std::fs::read_to_string(template)
        .with_context(|| format!("failed to read template {}", template.display()))?;
    let data_path = config.data_path(template);
    let ctx = Context::load(&data_path)
        .with_context(|| format!("failed to load data context {}", data_path.display()))?;

    let name = template.to_string_lossy();
    let rendered = core_template::render(name.as_ref(), &source, &ctx)?;

    let render_path = config.render_path(template);
    let baseline_path = config.baseline_path(&render_path);
    let trace_path = config.trace_path(&render_path);

    std::fs::write(&render_path, &rendered.output)
        .with_context(|| format!("failed to write render {}", render_path.display()))?;
    std::fs::write(&baseline_path, &rendered.output)
        .with_context(|| format!("failed to write baseline {}", baseline_path.display()))?;
    let trace_json = rendered.trace.to_json()?;
    std::fs::write(&trace_path, trace_json)
        .with_context(|| format!("failed to write trace {}", trace_path.display()))?;

    info!(
        target: "runtime",
        template = %template.display(),
        bytes = rendered.output.len(),
        segments = rendered.trace.segments.len(),
        "forward_complete"
    );
    println!(
        "Wrote {}, {} and {}",
        render_path.display(),
        baseline_path.display(),
        trace_path.display()
    );
    println!("Now edit {}", render_path.display());
    println!("Then run: backedit {}", render_path.display());
    Ok(())
}

/// Reconciliation mode: diff the edited render against its baseline, slice
/// the diff along the trace, and replay each slice onto its source file.
fn reconcile(render: &Path, config: &Config) -> Result<()> {
    let edited = std::fs::read_to_string(render)
        .with_context(|| format!("failed to read edited render {}", render.display()))?;
    let baseline_path = config.baseline_path(render);
    let baseline = std::fs::read_to_string(&baseline_path)
        .with_context(|| format!("failed to read baseline render {}", baseline_path.display()))?;
    let trace_path = config.trace_path(render);
    let trace_raw = std::fs::read_to_string(&trace_path)
        .with_context(|| format!("failed to read trace {}", trace_path.display()))?;
    let trace = Trace::from_json(&trace_raw)
        .with_context(|| format!("failed to parse trace {}", trace_path.display()))?;

    if trace.total_output_len() != baseline.len() {
        warn!(
            target: "runtime",
            trace_len = trace.total_output_len(),
            baseline_len = baseline.len(),
            "trace_baseline_length_mismatch"
        );
        println!(
            "warning: trace covers {} bytes but the baseline render has {}; results may be partial",
            trace.total_output_len(),
            baseline.len()
        );
    }

    let ops = core_diff::diff(&baseline, &edited);
    let outcome = core_diff::segment(&trace, ops);
    if !outcome.leftover.is_empty() {
        println!(
            "warning: {} diff operation(s) extend past the traced output and were not applied",
            outcome.leftover.len()
        );
    }

    let reports = core_reconcile::reapply(&trace, &outcome.segments, &FsLoader);
    for report in &reports {
        for err in &report.errors {
            println!("{}: {err}", report.name);
        }
    }

    let summary = core_reconcile::write_outputs(&reports, config.output_suffix());
    for path in &summary.written {
        println!("Wrote {}", path.display());
    }
    for name in &summary.unchanged {
        println!("File has not changed: {name}");
    }
    for name in &summary.skipped {
        println!("Skipped {name}: reconciliation failed");
    }
    for err in &summary.failures {
        println!("{err}");
    }
    Ok(())
}
