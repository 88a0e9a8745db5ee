//! Scripted interactions: a JSON array of data writes and DOM events.
//!
//! ```json
//! [
//!   {"set": "user.name", "value": "lucy"},
//!   {"event": "input", "target": "name-input", "value": "ann"},
//!   {"event": "click", "target": "reset"}
//! ]
//! ```

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use weave::{Event, Value, Vm};

use crate::error::{CliError, Result};
use crate::load_json;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged, deny_unknown_fields)]
pub enum Step {
    /// Write `value` through the dotted path `set`.
    Set { set: String, value: serde_json::Value },
    /// Fire `event` on the element whose `id` is `target`.
    Event {
        event: String,
        target: String,
        #[serde(default)]
        value: Option<serde_json::Value>,
    },
}

impl Step {
    /// Apply to `vm`. Event steps need a mounted template.
    pub fn apply(&self, vm: &Vm) -> Result<()> {
        match self {
            Self::Set { set, value } => {
                vm.set_path(set, Value::from_json(value.clone()))?;
            }
            Self::Event { event, target, value } => {
                if !vm.is_mounted() {
                    return Err(CliError::invalid(format!(
                        "event `{event}` on `{target}` needs a template"
                    )));
                }
                let mut dom_event = Event::new(event.as_str());
                if let Some(value) = value {
                    dom_event = dom_event.with_value(Value::from_json(value.clone()));
                }
                let ran = vm.dispatch_to(target, &dom_event)?;
                if ran == 0 {
                    tracing::warn!(event = event.as_str(), target = target.as_str(), "no listener ran");
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set { set, value } => write!(f, "set {set} = {value}"),
            Self::Event { event, target, value: None } => write!(f, "{event} #{target}"),
            Self::Event {
                event,
                target,
                value: Some(value),
            } => write!(f, "{event} #{target} {value}"),
        }
    }
}

/// Load a script file. No path means no steps.
pub fn load(path: Option<&Path>) -> Result<Vec<Step>> {
    match path {
        Some(path) => load_json(path),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_both_step_kinds() {
        let steps: Vec<Step> = serde_json::from_value(json!([
            {"set": "a.b", "value": 3},
            {"event": "click", "target": "btn"},
            {"event": "input", "target": "name", "value": "x"}
        ]))
        .unwrap();
        assert_eq!(steps[0], Step::Set { set: "a.b".into(), value: json!(3) });
        assert_eq!(steps[1].to_string(), "click #btn");
        assert_eq!(steps[2].to_string(), "input #name \"x\"");
    }

    #[test]
    fn rejects_unknown_shapes() {
        assert!(serde_json::from_value::<Step>(json!({"set": "a"})).is_err());
        assert!(serde_json::from_value::<Step>(json!({"poke": "a"})).is_err());
    }

    #[test]
    fn event_without_template_fails() {
        let vm = Vm::new(weave::Options::new().with_data(json!({"a": 1}))).unwrap();
        let step = Step::Event {
            event: "click".into(),
            target: "x".into(),
            value: None,
        };
        assert!(matches!(step.apply(&vm), Err(CliError::InvalidArgument { .. })));

        Step::Set { set: "a".into(), value: json!(2) }.apply(&vm).unwrap();
        assert_eq!(vm.get("a"), Value::from(2));
    }
}
