use core_config::Config;
use core_reconcile::{FileStatus, FsLoader};
use core_template::Context;
use core_trace::Trace;
use std::path::Path;

// Integration-adjacent test: run the full forward-then-reconcile pipeline
// through the core crates against a real temp directory, the way the binary
// wires them together.

fn forward(template_path: &Path, source: &str, ctx: &Context) -> (String, Trace) {
    let name = template_path.to_string_lossy().to_string();
    let rendered = core_template::render(&name, source, ctx).unwrap();
    (rendered.output, rendered.trace)
}

fn reconcile_to_disk(baseline: &str, edited: &str, trace: &Trace, suffix: &str) -> Vec<String> {
    let ops = core_diff::diff(baseline, edited);
    let outcome = core_diff::segment(trace, ops);
    assert!(outcome.leftover.is_empty(), "edit fits the traced output");
    let reports = core_reconcile::reapply(trace, &outcome.segments, &FsLoader);
    let summary = core_reconcile::write_outputs(&reports, suffix);
    assert!(summary.failures.is_empty());
    summary
        .written
        .iter()
        .map(|p| p.to_string_lossy().to_string())
        .collect()
}

#[test]
fn literal_edit_round_trips_into_the_template() {
    let dir = tempfile::tempdir().unwrap();
    let template_path = dir.path().join("page.tmpl");
    let source = "<h1>{{ title }}</h1>\n<p>Welcome to the site!</p>\n";
    std::fs::write(&template_path, source).unwrap();

    let mut ctx = Context::new();
    ctx.set_text("title", "Home");
    let (baseline, trace) = forward(&template_path, source, &ctx);
    assert_eq!(baseline, "<h1>Home</h1>\n<p>Welcome to the site!</p>\n");

    // The author edits literal text in the render. "blog" shares no
    // characters with "site", so the diff is one clean delete/insert pair.
    let edited = baseline.replace("site", "blog");
    let written = reconcile_to_disk(&baseline, &edited, &trace, ".new");
    assert_eq!(written.len(), 1);
    assert!(written[0].ends_with("page.tmpl.new"));

    let new_source = std::fs::read_to_string(&written[0]).unwrap();
    assert_eq!(
        new_source,
        "<h1>{{ title }}</h1>\n<p>Welcome to the blog!</p>\n"
    );
    // The original template is untouched.
    assert_eq!(std::fs::read_to_string(&template_path).unwrap(), source);
}

#[test]
fn editing_generated_text_is_reported_and_nothing_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let template_path = dir.path().join("page.tmpl");
    let source = "<h1>{{ title }}</h1>\n";
    std::fs::write(&template_path, source).unwrap();

    let mut ctx = Context::new();
    ctx.set_text("title", "Home");
    let (baseline, trace) = forward(&template_path, source, &ctx);

    // The edit stays strictly inside the expression's output.
    let edited = baseline.replace("Home", "Hxme");
    let ops = core_diff::diff(&baseline, &edited);
    let outcome = core_diff::segment(&trace, ops);
    let reports = core_reconcile::reapply(&trace, &outcome.segments, &FsLoader);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].status, FileStatus::Unchanged);
    assert!(
        reports[0]
            .errors
            .iter()
            .any(|e| matches!(e, core_reconcile::ReconcileError::UneditableSegmentModified { .. }))
    );

    let summary = core_reconcile::write_outputs(&reports, ".new");
    assert!(summary.written.is_empty());
    assert_eq!(summary.unchanged.len(), 1);
}

#[test]
fn unedited_render_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let template_path = dir.path().join("page.tmpl");
    let source = "static shell {{ if banner }}with banner{{ end }}\n";
    std::fs::write(&template_path, source).unwrap();

    let (baseline, trace) = forward(&template_path, source, &Context::new());
    assert_eq!(baseline, "static shell \n");

    let ops = core_diff::diff(&baseline, &baseline);
    assert_eq!(ops.len(), 1, "identical renders diff to one equal op");
    let outcome = core_diff::segment(&trace, ops);
    let reports = core_reconcile::reapply(&trace, &outcome.segments, &FsLoader);
    for report in &reports {
        assert_eq!(report.status, FileStatus::Unchanged);
        assert!(report.corrections.is_empty());
    }
    let summary = core_reconcile::write_outputs(&reports, ".new");
    assert!(summary.written.is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn range_render_reconciles_an_appended_literal_edit() {
    let dir = tempfile::tempdir().unwrap();
    let template_path = dir.path().join("list.tmpl");
    let source = "items:\n{{ range items }}* {{ . }}\n{{ end }}";
    std::fs::write(&template_path, source).unwrap();

    let mut ctx = Context::new();
    ctx.set_list("items", vec!["one".to_string(), "two".to_string()]);
    let (baseline, trace) = forward(&template_path, source, &ctx);
    assert_eq!(baseline, "items:\n* one\n* two\n");

    // Pure insertion into the heading literal; no later edits follow it.
    let edited = baseline.replace("items:", "items (2):");
    let written = reconcile_to_disk(&baseline, &edited, &trace, ".new");
    assert_eq!(written.len(), 1);
    let new_source = std::fs::read_to_string(&written[0]).unwrap();
    assert_eq!(
        new_source,
        "items (2):\n{{ range items }}* {{ . }}\n{{ end }}"
    );
}

#[test]
fn naming_conventions_compose_across_the_pipeline() {
    let config = Config::default();
    let template = Path::new("site/page.tmpl");
    let render = config.render_path(template);
    assert_eq!(render, Path::new("site/page.html"));
    assert!(config.is_render_path(&render));
    assert_eq!(
        config.baseline_path(&render),
        Path::new("site/page.orig.html")
    );
    assert_eq!(
        config.trace_path(&render),
        Path::new("site/page.trace.json")
    );
}
