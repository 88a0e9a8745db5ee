#![forbid(unsafe_code)]

//! In-memory document tree targeted by bindings.
//!
//! [`DomNode`] is a shared handle: cloning it yields another handle to the
//! **same** node, so an updater captured by a watcher mutates the node the
//! view owns.
//!
//! # Invariants
//!
//! 1. A text node never has children, attributes, or listeners.
//! 2. Setting `inner_html` replaces every child with opaque markup; setting
//!    `text_content` replaces every child (and any markup) with one text
//!    node.
//! 3. Listeners fire in registration order. The listener list is snapshotted
//!    before dispatch, so a listener may add listeners without affecting the
//!    event in flight.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use crate::event::{Event, Handler};

static NEXT_DOM_ID: AtomicU64 = AtomicU64::new(1);

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input", "link", "meta"];

/// Process-unique identity of a document node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomId(u64);

impl DomId {
    fn next() -> Self {
        Self(NEXT_DOM_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

enum Content {
    Children(Vec<DomNode>),
    Markup(String),
}

enum Kind {
    Element {
        tag: String,
        attrs: RefCell<IndexMap<String, String>>,
        content: RefCell<Content>,
        value: RefCell<Option<String>>,
        listeners: RefCell<Vec<(String, Handler)>>,
    },
    Text(RefCell<String>),
}

struct DomInner {
    id: DomId,
    kind: Kind,
}

/// A document node: an element or a run of text.
#[derive(Clone)]
pub struct DomNode {
    inner: Rc<DomInner>,
}

impl DomNode {
    #[must_use]
    pub fn element(tag: impl Into<String>) -> Self {
        Self::from_kind(Kind::Element {
            tag: tag.into(),
            attrs: RefCell::new(IndexMap::new()),
            content: RefCell::new(Content::Children(Vec::new())),
            value: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
        })
    }

    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::from_kind(Kind::Text(RefCell::new(content.into())))
    }

    fn from_kind(kind: Kind) -> Self {
        Self {
            inner: Rc::new(DomInner { id: DomId::next(), kind }),
        }
    }

    #[must_use]
    pub fn id(&self) -> DomId {
        self.inner.id
    }

    /// Whether both handles point at the same node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    #[must_use]
    pub fn is_element(&self) -> bool {
        matches!(self.inner.kind, Kind::Element { .. })
    }

    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self.inner.kind, Kind::Text(_))
    }

    /// Element tag name, `None` for text.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        match &self.inner.kind {
            Kind::Element { tag, .. } => Some(tag),
            Kind::Text(_) => None,
        }
    }

    // ── Attributes ──────────────────────────────────────────────────────

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<String> {
        match &self.inner.kind {
            Kind::Element { attrs, .. } => attrs.borrow().get(name).cloned(),
            Kind::Text(_) => None,
        }
    }

    /// Set an attribute. Ignored on text nodes.
    pub fn set_attr(&self, name: impl Into<String>, value: impl Into<String>) {
        if let Kind::Element { attrs, .. } = &self.inner.kind {
            attrs.borrow_mut().insert(name.into(), value.into());
        }
    }

    pub fn remove_attr(&self, name: &str) -> Option<String> {
        match &self.inner.kind {
            Kind::Element { attrs, .. } => attrs.borrow_mut().shift_remove(name),
            Kind::Text(_) => None,
        }
    }

    /// Snapshot of the attributes, in insertion order.
    #[must_use]
    pub fn attrs(&self) -> Vec<(String, String)> {
        match &self.inner.kind {
            Kind::Element { attrs, .. } => attrs
                .borrow()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            Kind::Text(_) => Vec::new(),
        }
    }

    #[must_use]
    pub fn class_name(&self) -> String {
        self.attr("class").unwrap_or_default()
    }

    pub fn set_class_name(&self, class: impl Into<String>) {
        self.set_attr("class", class);
    }

    // ── Children ────────────────────────────────────────────────────────

    /// Append `child`. Ignored on text nodes; discards any opaque markup.
    pub fn append_child(&self, child: DomNode) {
        if let Kind::Element { content, .. } = &self.inner.kind {
            let mut content = content.borrow_mut();
            match &mut *content {
                Content::Children(children) => children.push(child),
                Content::Markup(_) => *content = Content::Children(vec![child]),
            }
        }
    }

    /// Snapshot of the child handles. Empty for text and raw markup.
    #[must_use]
    pub fn children(&self) -> Vec<DomNode> {
        match &self.inner.kind {
            Kind::Element { content, .. } => match &*content.borrow() {
                Content::Children(children) => children.clone(),
                Content::Markup(_) => Vec::new(),
            },
            Kind::Text(_) => Vec::new(),
        }
    }

    // ── Content ─────────────────────────────────────────────────────────

    /// Concatenated text of the subtree. Opaque markup is reported verbatim.
    #[must_use]
    pub fn text_content(&self) -> String {
        match &self.inner.kind {
            Kind::Text(text) => text.borrow().clone(),
            Kind::Element { content, .. } => match &*content.borrow() {
                Content::Markup(markup) => markup.clone(),
                Content::Children(children) => children.iter().map(Self::text_content).collect(),
            },
        }
    }

    pub fn set_text_content(&self, text: impl Into<String>) {
        let text = text.into();
        match &self.inner.kind {
            Kind::Text(current) => *current.borrow_mut() = text,
            Kind::Element { content, .. } => {
                let children = if text.is_empty() {
                    Vec::new()
                } else {
                    vec![DomNode::text(text)]
                };
                *content.borrow_mut() = Content::Children(children);
            }
        }
    }

    /// Serialized children.
    #[must_use]
    pub fn inner_html(&self) -> String {
        match &self.inner.kind {
            Kind::Text(text) => escape(&text.borrow()),
            Kind::Element { content, .. } => match &*content.borrow() {
                Content::Markup(markup) => markup.clone(),
                Content::Children(children) => children.iter().map(Self::to_html).collect(),
            },
        }
    }

    /// Replace the children with unparsed markup. On a text node this sets
    /// the text instead.
    pub fn set_inner_html(&self, markup: impl Into<String>) {
        let markup = markup.into();
        match &self.inner.kind {
            Kind::Text(current) => *current.borrow_mut() = markup,
            Kind::Element { content, .. } => *content.borrow_mut() = Content::Markup(markup),
        }
    }

    /// Form value. Falls back to the `value` attribute until first set.
    #[must_use]
    pub fn value(&self) -> String {
        match &self.inner.kind {
            Kind::Element { value, .. } => value
                .borrow()
                .clone()
                .or_else(|| self.attr("value"))
                .unwrap_or_default(),
            Kind::Text(_) => String::new(),
        }
    }

    pub fn set_value(&self, new: impl Into<String>) {
        if let Kind::Element { value, .. } = &self.inner.kind {
            *value.borrow_mut() = Some(new.into());
        }
    }

    // ── Events ──────────────────────────────────────────────────────────

    /// Register `handler` for events of kind `event`. Ignored on text nodes.
    pub fn add_listener(&self, event: impl Into<String>, handler: Handler) {
        if let Kind::Element { listeners, .. } = &self.inner.kind {
            listeners.borrow_mut().push((event.into(), handler));
        }
    }

    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        match &self.inner.kind {
            Kind::Element { listeners, .. } => {
                listeners.borrow().iter().filter(|(kind, _)| kind == event).count()
            }
            Kind::Text(_) => 0,
        }
    }

    /// Fire every listener registered for `event.kind`. Returns how many
    /// ran.
    pub fn dispatch(&self, event: &Event) -> usize {
        let Kind::Element { listeners, .. } = &self.inner.kind else {
            return 0;
        };
        let matching: Vec<Handler> = listeners
            .borrow()
            .iter()
            .filter(|(kind, _)| *kind == event.kind)
            .map(|(_, handler)| Rc::clone(handler))
            .collect();
        for handler in &matching {
            handler(event);
        }
        matching.len()
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Depth-first search for the element whose `id` attribute is `id`.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<DomNode> {
        if self.attr("id").as_deref() == Some(id) {
            return Some(self.clone());
        }
        self.children().iter().find_map(|child| child.find_by_id(id))
    }

    /// Depth-first list of this node and its descendants.
    #[must_use]
    pub fn descendants(&self) -> Vec<DomNode> {
        let mut out = Vec::new();
        let mut stack = vec![self.clone()];
        while let Some(node) = stack.pop() {
            stack.extend(node.children().into_iter().rev());
            out.push(node);
        }
        out
    }

    // ── Serialization ───────────────────────────────────────────────────

    /// Serialize the subtree. Text and attribute values are escaped; raw
    /// markup set through [`set_inner_html`](Self::set_inner_html) is not.
    #[must_use]
    pub fn to_html(&self) -> String {
        let tag = match &self.inner.kind {
            Kind::Text(text) => return escape(&text.borrow()),
            Kind::Element { tag, .. } => tag,
        };

        let mut html = format!("<{tag}");
        let mut attrs = self.attrs();
        if let Kind::Element { value, .. } = &self.inner.kind {
            if let Some(value) = value.borrow().as_ref() {
                match attrs.iter_mut().find(|(name, _)| name == "value") {
                    Some((_, current)) => current.clone_from(value),
                    None => attrs.push(("value".to_owned(), value.clone())),
                }
            }
        }
        for (name, value) in &attrs {
            html.push_str(&format!(" {name}=\"{}\"", escape(value)));
        }
        html.push('>');

        if VOID_ELEMENTS.contains(&tag.as_str()) {
            return html;
        }
        html.push_str(&self.inner_html());
        html.push_str(&format!("</{tag}>"));
        html
    }
}

fn escape(value: &str) -> String {
    v_htmlescape::escape(value).to_string()
}

impl fmt::Debug for DomNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner.kind {
            Kind::Text(text) => f.debug_tuple("Text").field(&text.borrow()).finish(),
            Kind::Element { tag, .. } => f
                .debug_struct("Element")
                .field("id", &self.inner.id.raw())
                .field("tag", tag)
                .field("attrs", &self.attrs())
                .field("children", &self.children().len())
                .finish(),
        }
    }
}
