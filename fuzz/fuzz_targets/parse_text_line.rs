#![no_main]
use libfuzzer_sys::fuzz_target;
use pretty_assertions::assert_eq;
use wthor::database::text;

fuzz_target!(|data: &[u8]| {
    if let Ok(line) = std::str::from_utf8(data) {
        if let Ok(game) = text::decode(line) {
            assert_eq!(text::decode(&text::encode(&game)).ok(), Some(game));
        }
    }
});
