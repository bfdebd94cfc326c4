//! AST rendering with origin tracing.

use crate::parse::{Node, parse};
use crate::{Context, TemplateError};
use core_trace::{Trace, TraceBuilder};
use tracing::{debug, warn};

/// A completed render: the output text plus the trace mapping its byte
/// ranges back to the template source.
#[derive(Debug)]
pub struct Rendered {
    pub output: String,
    pub trace: Trace,
}

struct Renderer<'a> {
    source: &'a str,
    ctx: &'a Context,
    file: usize,
    out: String,
    trace: TraceBuilder,
}

/// Render `source` against `ctx`, recording `name` as the traced source file.
///
/// Rendering is deterministic in the context, so a baseline and an editable
/// copy of the same render are byte-identical by construction.
pub fn render(name: &str, source: &str, ctx: &Context) -> Result<Rendered, TemplateError> {
    let nodes = parse(source)?;
    let mut trace = TraceBuilder::new();
    let file = trace.intern(name);
    let mut renderer = Renderer {
        source,
        ctx,
        file,
        out: String::new(),
        trace,
    };
    renderer.walk(&nodes, None)?;
    debug!(
        target: "template.render",
        template = name,
        bytes = renderer.out.len(),
        "render_complete"
    );
    Ok(Rendered {
        output: renderer.out,
        trace: renderer.trace.finish(),
    })
}

impl Renderer<'_> {
    fn walk(&mut self, nodes: &[Node], current: Option<&str>) -> Result<(), TemplateError> {
        let ctx = self.ctx;
        for node in nodes {
            match node {
                Node::Literal { start, end } => {
                    self.out.push_str(&self.source[*start..*end]);
                    self.trace.record_editable(self.file, *start, end - start);
                }
                Node::Expr { name } => self.expr(name, current)?,
                Node::If {
                    name,
                    then_body,
                    else_body,
                } => {
                    if ctx.truthy(name) {
                        self.walk(then_body, current)?;
                    } else {
                        self.walk(else_body, current)?;
                    }
                }
                Node::Range { name, body } => match ctx.list(name) {
                    Some(items) => {
                        for item in items {
                            self.walk(body, Some(item))?;
                        }
                    }
                    None => {
                        warn!(
                            target: "template.render",
                            name = name.as_str(),
                            "range_over_missing_list"
                        );
                    }
                },
            }
        }
        Ok(())
    }

    fn expr(&mut self, name: &str, current: Option<&str>) -> Result<(), TemplateError> {
        let ctx = self.ctx;
        let value = if name == "." {
            match current {
                Some(item) => item,
                None => return Err(TemplateError::NoCurrentItem),
            }
        } else {
            match ctx.text(name) {
                Some(value) => value,
                None => {
                    warn!(
                        target: "template.render",
                        name,
                        "expression_without_value"
                    );
                    ""
                }
            }
        };
        self.out.push_str(value);
        self.trace.record_opaque(self.file, value.len());
        Ok(())
    }
}
