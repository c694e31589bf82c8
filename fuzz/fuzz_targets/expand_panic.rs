#![no_main]
use libfuzzer_sys::fuzz_target;
use matex_algebra::SymbolicEngine;
use matex_core::expand::expand;
use matex_syntax::{MacroTable, read_command};

fuzz_target!(|data: &[u8]| {
    // Panic freedom over arbitrary almost-text input. Errors are expected;
    // crashes are not.
    let s = String::from_utf8_lossy(data);
    let _ = read_command(&s, 0);
    let table = MacroTable::parse(&s);
    let _ = expand(&s, &table, &SymbolicEngine::new(), true);
});
