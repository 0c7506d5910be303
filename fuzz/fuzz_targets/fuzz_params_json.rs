#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // A record that parses must serialize and parse back to itself.
    if let Ok(p) = psu_config::load_params_json(data) {
        let json = p.to_json().expect("serialize parsed record");
        let back = psu_config::load_params_json(&json).expect("reparse own output");
        assert_eq!(p, back);
    }
});
