//! Fuzz target: `AdvertisingPayload::build`
//!
//! Arbitrary device names must either produce a well-formed legacy payload
//! of at most 31 bytes or a clean error.
//!
//! cargo fuzz run fuzz_adv_payload

#![no_main]

use cheapensor::csc::advertising::{AdvertisingError, AdvertisingPayload, MAX_ADV_PAYLOAD};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(name) = core::str::from_utf8(data) else {
        return;
    };
    match AdvertisingPayload::build(name, 0x1816, 1157) {
        Ok(p) => {
            let bytes = p.as_bytes();
            assert!(bytes.len() <= MAX_ADV_PAYLOAD);
            assert_eq!(&bytes[..3], &[0x02, 0x01, 0x06]);
            // Walk the AD structures: lengths must tile the buffer exactly.
            let mut i = 0;
            while i < bytes.len() {
                let len = bytes[i] as usize;
                assert!(len > 0);
                i += 1 + len;
            }
            assert_eq!(i, bytes.len());
        }
        Err(AdvertisingError::EmptyName) => assert!(name.is_empty()),
        Err(AdvertisingError::TooLong(n)) => assert!(n > MAX_ADV_PAYLOAD),
    }
});
