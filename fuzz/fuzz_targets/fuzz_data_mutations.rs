#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use weave_core::{Path, Value, Watcher, observe};

const KEYS: [&str; 3] = ["a", "b", "c"];
const WATCHED: [&str; 3] = ["a.b.c", "a.a", "b"];

#[derive(Arbitrary, Debug)]
enum Op {
    SetNumber { path: Vec<u8>, value: i8 },
    SetObject { path: Vec<u8> },
}

fn expr(path: &[u8]) -> String {
    let keys: Vec<&str> = path.iter().take(3).map(|b| KEYS[usize::from(*b) % KEYS.len()]).collect();
    if keys.is_empty() { "a".to_owned() } else { keys.join(".") }
}

// Every object written carries all keys a watched path can step through,
// so no watched key is ever added after the watcher first reads it.
fuzz_target!(|ops: Vec<Op>| {
    let root = observe(&Value::from_json(serde_json::json!({
        "a": {"a": 1, "b": {"c": 2}},
        "b": 3
    })))
    .expect("object data");

    let watched: Vec<(Path, Watcher)> = WATCHED
        .iter()
        .map(|expr| {
            let watcher = Watcher::new(&root, expr, |_: &Value, _: &Value| {}).expect("valid path");
            (Path::parse(expr).expect("valid path"), watcher)
        })
        .collect();

    for op in ops.iter().take(64) {
        let (target, value) = match op {
            Op::SetNumber { path, value } => (expr(path), Value::from(i32::from(*value))),
            Op::SetObject { path } => (
                expr(path),
                Value::from_json(serde_json::json!({"a": 0, "b": {"c": 1}, "c": {"a": 1}})),
            ),
        };
        if let Ok(path) = Path::parse(&target) {
            let _ = path.assign(&root, value);
        }

        for (path, watcher) in &watched {
            assert!(watcher.value().strict_eq(&path.resolve(&root)), "watcher on {path} is stale");
        }
    }
});
