#![no_main]

use libfuzzer_sys::fuzz_target;
use weave_core::{Value, observe};
use weave_view::{Compiler, MethodTable, Template};

fuzz_target!(|data: &[u8]| {
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(template) = Template::from_json_str(json) else {
        return;
    };
    let scope = observe(&Value::from_json(serde_json::json!({
        "a": {"b": "text", "c": 1},
        "cls": "x",
        "list": [1, 2]
    })))
    .expect("object data");

    let root = template.to_dom();
    let compiler = Compiler::default();
    let planned = compiler.plan(&root).len();
    if let Ok(watchers) = compiler.compile(&root, &scope, &MethodTable::new()) {
        assert!(watchers.len() <= planned);
        scope.set("cls", "y");
        let _ = root.to_html();
        for watcher in &watchers {
            watcher.teardown();
        }
    }
});
