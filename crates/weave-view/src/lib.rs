#![forbid(unsafe_code)]

//! View: binding observed data to an in-memory document.
//!
//! A [`Template`] becomes a [`DomNode`] tree; the [`Compiler`] finds
//! directive attributes and `{{ }}` interpolations in it and creates one
//! [`weave_core::Watcher`] per binding. The [`View`] keeps those watchers
//! alive next to the document they update.

pub mod compile;
pub mod directive;
pub mod dom;
pub mod error;
pub mod event;
pub mod template;
pub mod updater;
pub mod view;

pub use compile::{CompileOptions, Compiler, Interpolation, Part, Plan};
pub use directive::Directive;
pub use dom::{DomId, DomNode};
pub use error::{Error, Result};
pub use event::{Event, Handler, MethodTable};
pub use template::Template;
pub use updater::Updater;
pub use view::{View, dispatch};
