#![forbid(unsafe_code)]

//! Template compiler: finds bindings in a document and wires them to
//! watchers.
//!
//! # Design
//!
//! Compilation runs in two passes. [`Compiler::plan`] walks the descendants
//! of a root depth-first and lists every binding without touching the tree;
//! [`Compiler::compile`] then binds each planned entry against a [`Scope`].
//! The root element's own attributes are left alone: it is the mount point,
//! not part of the template body.
//!
//! Each value binding renders its initial value straight from the watcher it
//! creates, then re-renders from the watcher callback.
//!
//! # Failure Modes
//!
//! - **Malformed path**: compilation stops with [`Error::Binding`].
//! - **Unknown directive, missing method, bare `v-on`**: the attribute is
//!   removed and the binding skipped with a log line.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use regex::Regex;
use weave_core::{PanicPolicy, Path, Scope, Value, WatchOptions, Watcher};

use crate::directive::Directive;
use crate::dom::DomNode;
use crate::error::{Error, Result};
use crate::event::{Event, MethodTable};
use crate::updater::{self, Updater};

/// Compiler configuration.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Opening and closing interpolation delimiters.
    pub delimiters: (String, String),
    /// Panic policy given to every binding watcher.
    pub panic_policy: PanicPolicy,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            delimiters: ("{{".to_owned(), "}}".to_owned()),
            panic_policy: PanicPolicy::default(),
        }
    }
}

impl CompileOptions {
    #[must_use]
    pub fn with_delimiters(mut self, open: impl Into<String>, close: impl Into<String>) -> Self {
        self.delimiters = (open.into(), close.into());
        self
    }

    #[must_use]
    pub fn with_panic_policy(mut self, policy: PanicPolicy) -> Self {
        self.panic_policy = policy;
        self
    }
}

/// One piece of an interpolated text node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Literal(String),
    Expr(String),
}

/// A text node split around its interpolations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpolation {
    parts: Vec<Part>,
}

impl Interpolation {
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn exprs(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|part| match part {
            Part::Expr(expr) => Some(expr.as_str()),
            Part::Literal(_) => None,
        })
    }
}

/// A binding found by [`Compiler::plan`].
#[derive(Debug, Clone)]
pub enum Plan {
    Directive {
        node: DomNode,
        attr: String,
        directive: Directive,
        expr: String,
    },
    Text {
        node: DomNode,
        interpolation: Interpolation,
    },
}

impl Plan {
    /// Parse every path the binding would watch.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Directive { directive, expr, .. } => match directive {
                Directive::On(_) | Directive::Unknown(_) => Ok(()),
                _ => Path::parse(expr)
                    .map(drop)
                    .map_err(|e| Error::binding(directive.to_string(), expr.as_str(), e)),
            },
            Self::Text { interpolation, .. } => {
                for expr in interpolation.exprs() {
                    Path::parse(expr).map_err(|e| Error::binding("text", expr, e))?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directive { node, directive, expr, .. } => {
                write!(f, "<{}> {directive}=\"{expr}\"", node.tag().unwrap_or("?"))
            }
            Self::Text { node, .. } => write!(f, "text {:?}", node.text_content()),
        }
    }
}

/// Binds templates to a scope.
#[derive(Debug, Clone)]
pub struct Compiler {
    mustache: Regex,
    options: CompileOptions,
}

impl Default for Compiler {
    fn default() -> Self {
        Self {
            mustache: Regex::new(r"\{\{(.*?)\}\}").expect("static regex is valid"),
            options: CompileOptions::default(),
        }
    }
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Result<Self> {
        let (open, close) = &options.delimiters;
        let invalid = || Error::Delimiters {
            open: open.clone(),
            close: close.clone(),
        };
        if open.is_empty() || close.is_empty() {
            return Err(invalid());
        }
        let pattern = format!("{}(.*?){}", regex::escape(open), regex::escape(close));
        let mustache = Regex::new(&pattern).map_err(|_| invalid())?;
        Ok(Self { mustache, options })
    }

    #[must_use]
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Split `text` around its interpolations. `None` when it has none.
    #[must_use]
    pub fn interpolation(&self, text: &str) -> Option<Interpolation> {
        let mut parts = Vec::new();
        let mut last = 0;
        for caps in self.mustache.captures_iter(text) {
            let (Some(whole), Some(expr)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > last {
                parts.push(Part::Literal(text[last..whole.start()].to_owned()));
            }
            parts.push(Part::Expr(expr.as_str().trim().to_owned()));
            last = whole.end();
        }
        if parts.is_empty() {
            return None;
        }
        if last < text.len() {
            parts.push(Part::Literal(text[last..].to_owned()));
        }
        Some(Interpolation { parts })
    }

    /// List the bindings under `root`, depth-first, attributes in order.
    #[must_use]
    pub fn plan(&self, root: &DomNode) -> Vec<Plan> {
        let mut plans = Vec::new();
        for node in root.descendants().into_iter().skip(1) {
            if node.is_text() {
                if let Some(interpolation) = self.interpolation(&node.text_content()) {
                    plans.push(Plan::Text { node, interpolation });
                }
                continue;
            }
            for (attr, expr) in node.attrs() {
                if let Some(directive) = Directive::parse(&attr) {
                    plans.push(Plan::Directive {
                        node: node.clone(),
                        attr,
                        directive,
                        expr: expr.trim().to_owned(),
                    });
                }
            }
        }
        plans
    }

    /// Bind every planned entry under `root` against `scope`. Directive
    /// attributes are removed from the tree. Returns the watchers, which
    /// must be kept alive for the bindings to stay live.
    ///
    /// Every plan is validated before the first mutation, so a failed
    /// compile leaves the document untouched.
    pub fn compile<S>(&self, root: &DomNode, scope: &S, methods: &MethodTable) -> Result<Vec<Watcher>>
    where
        S: Scope + Clone + 'static,
    {
        let plans = self.plan(root);
        for plan in &plans {
            plan.validate()?;
        }
        let mut watchers = Vec::with_capacity(plans.len());
        for plan in plans {
            match plan {
                Plan::Directive {
                    node,
                    attr,
                    directive,
                    expr,
                } => {
                    node.remove_attr(&attr);
                    if let Some(watcher) = self.bind_directive(&node, &directive, &expr, scope, methods)? {
                        watchers.push(watcher);
                    }
                }
                Plan::Text { node, interpolation } => {
                    watchers.push(self.bind_text(&node, &interpolation, scope)?);
                }
            }
        }
        tracing::debug!(root = root.id().raw(), bindings = watchers.len(), "template compiled");
        Ok(watchers)
    }

    fn watch_options(&self, label: String) -> WatchOptions {
        WatchOptions::default()
            .with_panic_policy(self.options.panic_policy)
            .with_label(label)
    }

    fn bind_directive<S>(
        &self,
        node: &DomNode,
        directive: &Directive,
        expr: &str,
        scope: &S,
        methods: &MethodTable,
    ) -> Result<Option<Watcher>>
    where
        S: Scope + Clone + 'static,
    {
        let updater = match directive {
            Directive::On(event) => {
                bind_event(node, event, expr, methods);
                return Ok(None);
            }
            Directive::Unknown(name) => {
                tracing::debug!(directive = name.as_str(), expr, "unknown directive ignored");
                return Ok(None);
            }
            other => match Updater::for_directive(other) {
                Some(updater) => updater,
                None => return Ok(None),
            },
        };

        let path = Path::parse(expr).map_err(|e| Error::binding(directive.to_string(), expr, e))?;
        let last_seen = Rc::new(RefCell::new(Value::Undefined));
        let target = node.clone();
        let seen = Rc::clone(&last_seen);
        let watcher = Watcher::with_options(
            scope,
            expr,
            self.watch_options(format!("{directive}={expr}")),
            move |new: &Value, old: &Value| {
                *seen.borrow_mut() = new.clone();
                updater.apply(&target, new, old);
            },
        )
        .map_err(|e| Error::binding(directive.to_string(), expr, e))?;

        let initial = watcher.value();
        updater.apply(node, &initial, &Value::Undefined);
        *last_seen.borrow_mut() = initial;

        if updater == Updater::Model {
            bind_model_input(node, path, scope.clone(), last_seen);
        }
        tracing::trace!(node = node.id().raw(), %directive, expr, "directive bound");
        Ok(Some(watcher))
    }

    fn bind_text<S>(&self, node: &DomNode, interpolation: &Interpolation, scope: &S) -> Result<Watcher>
    where
        S: Scope + Clone + 'static,
    {
        let mut pieces = Vec::with_capacity(interpolation.parts.len());
        for part in &interpolation.parts {
            pieces.push(match part {
                Part::Literal(text) => Piece::Literal(text.clone()),
                Part::Expr(expr) => {
                    Piece::Path(Path::parse(expr).map_err(|e| Error::binding("text", expr.as_str(), e))?)
                }
            });
        }

        let source = scope.clone();
        let target = node.clone();
        let label = interpolation.exprs().collect::<Vec<_>>().join(",");
        let watcher = Watcher::from_fn_with_options(
            move || {
                let text: String = pieces
                    .iter()
                    .map(|piece| match piece {
                        Piece::Literal(text) => text.clone(),
                        Piece::Path(path) => updater::display(&path.resolve(&source)),
                    })
                    .collect();
                Value::from(text)
            },
            self.watch_options(format!("text={label}")),
            move |new: &Value, old: &Value| Updater::Text.apply(&target, new, old),
        );
        Updater::Text.apply(node, &watcher.value(), &Value::Undefined);
        tracing::trace!(node = node.id().raw(), exprs = label.as_str(), "text bound");
        Ok(watcher)
    }
}

enum Piece {
    Literal(String),
    Path(Path),
}

fn bind_event(node: &DomNode, event: &str, method: &str, methods: &MethodTable) {
    if event.is_empty() {
        tracing::warn!(node = node.id().raw(), method, "v-on without an event name ignored");
        return;
    }
    match methods.get(method) {
        Some(handler) => node.add_listener(event, handler),
        None => tracing::warn!(node = node.id().raw(), event, method, "v-on handler not found"),
    }
}

/// Write typed text back through `path`, skipping repeats of the last value
/// seen by either side.
fn bind_model_input<S>(node: &DomNode, path: Path, scope: S, last_seen: Rc<RefCell<Value>>)
where
    S: Scope + 'static,
{
    node.add_listener(
        "input",
        Rc::new(move |event: &Event| {
            let unchanged = event.value.strict_eq(&last_seen.borrow());
            if unchanged {
                return;
            }
            *last_seen.borrow_mut() = event.value.clone();
            if let Err(error) = path.assign(&scope, event.value.clone()) {
                tracing::warn!(path = %path, %error, "v-model write failed");
            }
        }),
    );
}
