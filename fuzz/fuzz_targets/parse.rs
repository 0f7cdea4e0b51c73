#![no_main]

use libfuzzer_sys::fuzz_target;
use thicket::grammars::statements;
use thicket_core::{Parser, ParserConfig, StrSource};

fuzz_target!(|data: &[u8]| {
    // Convert bytes to UTF-8 string (ignore invalid UTF-8)
    if let Ok(s) = std::str::from_utf8(data) {
        let Ok(grammar) = statements::grammar() else {
            return;
        };
        let Ok(root) = grammar.root(statements::ROOT) else {
            return;
        };
        let config = ParserConfig::new().with_recover(true);
        let _ = Parser::new(&grammar, root, StrSource::new(s)).with_config(config).parse();
    }
});
