#![forbid(unsafe_code)]

//! Serializable markup trees.
//!
//! A template is JSON: a bare string is a text node, an object is an element.
//!
//! ```json
//! {"tag": "div", "attrs": {"id": "app"}, "children": [
//!     {"tag": "input", "attrs": {"v-model": "name"}},
//!     {"tag": "p", "children": ["Hello {{ name }}!"]}
//! ]}
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::dom::DomNode;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Template {
    Text(String),
    Element {
        tag: String,
        #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
        attrs: IndexMap<String, String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<Template>,
    },
}

impl Template {
    #[must_use]
    pub fn element(tag: impl Into<String>) -> Self {
        Self::Element {
            tag: tag.into(),
            attrs: IndexMap::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    /// Add an attribute. No effect on text.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Self::Element { attrs, .. } = &mut self {
            attrs.insert(name.into(), value.into());
        }
        self
    }

    /// Append a child. No effect on text.
    #[must_use]
    pub fn with_child(mut self, child: Template) -> Self {
        if let Self::Element { children, .. } = &mut self {
            children.push(child);
        }
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(json)?)
    }

    /// Build a fresh document tree.
    #[must_use]
    pub fn to_dom(&self) -> DomNode {
        match self {
            Self::Text(content) => DomNode::text(content.as_str()),
            Self::Element { tag, attrs, children } => {
                let node = DomNode::element(tag.as_str());
                for (name, value) in attrs {
                    node.set_attr(name.as_str(), value.as_str());
                }
                for child in children {
                    node.append_child(child.to_dom());
                }
                node
            }
        }
    }
}
