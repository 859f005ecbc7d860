#![no_main]
use libfuzzer_sys::fuzz_target;
use wthor::database::wthor::{read_archive, FILE_HEADER_SIZE, RECORD_SIZE};

fuzz_target!(|data: &[u8]| {
    if let Ok(database) = read_archive(data) {
        let records = (data.len() - FILE_HEADER_SIZE) / RECORD_SIZE;
        assert_eq!(database.len() + database.inconsistencies(), records);
        for game in database.games() {
            assert_eq!(game.result() % 2, 0);
        }
    }
});
