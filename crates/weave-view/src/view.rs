#![forbid(unsafe_code)]

//! A compiled document and the watchers keeping it live.

use std::fmt;

use weave_core::{Scope, Watcher};

use crate::compile::Compiler;
use crate::dom::DomNode;
use crate::error::{Error, Result};
use crate::event::{Event, MethodTable};
use crate::template::Template;
use crate::updater;

/// Owns a document root and its binding watchers. Dropping the view tears
/// every binding down.
pub struct View {
    root: DomNode,
    watchers: Vec<Watcher>,
}

impl View {
    /// Compile `root` in place against `scope`.
    pub fn mount<S>(root: DomNode, scope: &S, methods: &MethodTable, compiler: &Compiler) -> Result<Self>
    where
        S: Scope + Clone + 'static,
    {
        let watchers = compiler.compile(&root, scope, methods)?;
        tracing::debug!(root = root.id().raw(), bindings = watchers.len(), "view mounted");
        Ok(Self { root, watchers })
    }

    /// Build a fresh document from `template` and mount it.
    pub fn from_template<S>(template: &Template, scope: &S, methods: &MethodTable, compiler: &Compiler) -> Result<Self>
    where
        S: Scope + Clone + 'static,
    {
        Self::mount(template.to_dom(), scope, methods, compiler)
    }

    #[must_use]
    pub fn root(&self) -> &DomNode {
        &self.root
    }

    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.watchers.len()
    }

    #[must_use]
    pub fn watchers(&self) -> &[Watcher] {
        &self.watchers
    }

    /// Current markup of the whole document.
    #[must_use]
    pub fn render(&self) -> String {
        self.root.to_html()
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<DomNode> {
        self.root.find_by_id(id)
    }

    /// Deliver `event` to `node`. An `input` event first stores its value
    /// in the node, as typing would. Returns how many listeners ran.
    pub fn dispatch(&self, node: &DomNode, event: &Event) -> usize {
        dispatch(node, event)
    }

    /// [`dispatch`](Self::dispatch) to the element whose `id` attribute is
    /// `id`.
    pub fn dispatch_to(&self, id: &str, event: &Event) -> Result<usize> {
        let node = self.find(id).ok_or_else(|| Error::UnknownTarget { id: id.to_owned() })?;
        Ok(self.dispatch(&node, event))
    }

    /// Unsubscribe every binding. The document keeps its last rendering.
    pub fn teardown(&mut self) {
        for watcher in self.watchers.drain(..) {
            watcher.teardown();
        }
    }
}

/// Deliver `event` to `node` outside any view borrow. An `input` event first
/// stores its value in the node, as typing would.
pub fn dispatch(node: &DomNode, event: &Event) -> usize {
    if event.kind == "input" {
        node.set_value(updater::display(&event.value));
    }
    let ran = node.dispatch(event);
    tracing::trace!(node = node.id().raw(), event = event.kind.as_str(), listeners = ran, "event dispatched");
    ran
}

impl Drop for View {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("root", &self.root)
            .field("bindings", &self.watchers.len())
            .finish()
    }
}
