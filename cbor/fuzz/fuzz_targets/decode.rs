#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    cbor_tags_fuzz::decode_all(data);
});
