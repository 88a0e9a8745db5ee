#![no_main]

use libfuzzer_sys::fuzz_target;
use weave_core::Path;

fuzz_target!(|data: &[u8]| {
    let Ok(expr) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(path) = Path::parse(expr) {
        assert!(!path.is_empty());
        let reparsed = Path::parse(&path.to_string()).expect("display output parses");
        assert_eq!(reparsed, path);
    }
});
