#![forbid(unsafe_code)]

//! weave public facade crate.
//!
//! [`Vm`] ties the pieces together: it observes the data given in
//! [`Options`], exposes computed properties and methods next to it, and
//! mounts a template whose bindings re-render whenever the data they read
//! changes.
//!
//! ```
//! use weave::prelude::*;
//!
//! let template = Template::element("div").with_child(
//!     Template::element("p").with_attr("id", "msg").with_child(Template::text("{{ greeting }}, {{ name }}")),
//! );
//! let vm = Vm::new(
//!     Options::new()
//!         .with_data(serde_json::json!({"greeting": "Hello", "name": "world"}))
//!         .with_template(template),
//! )
//! .unwrap();
//!
//! vm.set("name", "weave").unwrap();
//! assert_eq!(vm.render().unwrap(), "<div><p id=\"msg\">Hello, weave</p></div>");
//! ```

pub mod error;
pub mod options;
pub mod vm;

pub use error::{Error, Result};
pub use options::Options;
pub use vm::{Vm, VmScope};
pub use weave_core::{Computed, Node, Value, WatchOptions, Watcher};
pub use weave_view::{Event, Template};

pub use weave_core;
pub use weave_view;

pub mod prelude {
    pub use crate::{Error, Options, Vm};
    pub use weave_core as core;
    pub use weave_core::{Computed, Node, PanicPolicy, Path, Scope, Value, WatchOptions, Watcher, observe};
    pub use weave_view as view;
    pub use weave_view::{CompileOptions, DomNode, Event, Template};
}
