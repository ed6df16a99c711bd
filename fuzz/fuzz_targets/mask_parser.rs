#![no_main]

use bytesift::features::MAX_FEATURE_INDEX;
use bytesift::mask::FeatureMask;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Short inputs are padded with '0' so the slot parser gets exercised too
    let mut bytes = data.to_vec();
    if bytes.len() < MAX_FEATURE_INDEX {
        bytes.resize(MAX_FEATURE_INDEX, b'0');
    }
    if let Ok(mask) = FeatureMask::parse(&bytes) {
        let again = FeatureMask::parse(&mask.to_bytes()).expect("dumped mask parses");
        assert_eq!(again, mask);
    }
});
