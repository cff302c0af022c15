//! Legacy advertising payload.
//!
//! Built once at start-up and re-sent unchanged on every advertising
//! restart.  AD structures, in order:
//!
//! | AD type | Meaning                         | Value                       |
//! |---------|---------------------------------|-----------------------------|
//! | `0x01`  | Flags                           | `0x06` (LE general, no BR/EDR) |
//! | `0x09`  | Complete local name             | device name bytes           |
//! | `0x03`  | Complete list of 16-bit UUIDs   | service UUID (LE)           |
//! | `0x19`  | Appearance                      | appearance code (LE)        |

use core::fmt;

/// Legacy advertising data limit.
pub const MAX_ADV_PAYLOAD: usize = 31;

/// Default advertising interval.
pub const DEFAULT_ADV_INTERVAL_US: u32 = 500_000;

const AD_TYPE_FLAGS: u8 = 0x01;
const AD_TYPE_UUID16_COMPLETE: u8 = 0x03;
const AD_TYPE_COMPLETE_NAME: u8 = 0x09;
const AD_TYPE_APPEARANCE: u8 = 0x19;

const FLAG_LE_GENERAL_DISCOVERABLE: u8 = 0x02;
const FLAG_BR_EDR_NOT_SUPPORTED: u8 = 0x04;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertisingError {
    EmptyName,
    /// Encoded payload would exceed 31 bytes; carries the required length.
    TooLong(usize),
}

impl fmt::Display for AdvertisingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "device name is empty"),
            Self::TooLong(n) => write!(f, "payload needs {n} bytes (max {MAX_ADV_PAYLOAD})"),
        }
    }
}

impl std::error::Error for AdvertisingError {}

/// Immutable advertising data buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisingPayload {
    bytes: heapless::Vec<u8, MAX_ADV_PAYLOAD>,
}

impl AdvertisingPayload {
    pub fn build(name: &str, service_uuid: u16, appearance: u16) -> Result<Self, AdvertisingError> {
        if name.is_empty() {
            return Err(AdvertisingError::EmptyName);
        }
        let needed = 3 + (2 + name.len()) + 4 + 4;
        if needed > MAX_ADV_PAYLOAD {
            return Err(AdvertisingError::TooLong(needed));
        }

        let mut bytes = heapless::Vec::new();
        let mut push = |ad_type: u8, value: &[u8]| {
            // Length already checked above; the extends cannot fail.
            let _ = bytes.push(value.len() as u8 + 1);
            let _ = bytes.push(ad_type);
            let _ = bytes.extend_from_slice(value);
        };
        push(
            AD_TYPE_FLAGS,
            &[FLAG_LE_GENERAL_DISCOVERABLE | FLAG_BR_EDR_NOT_SUPPORTED],
        );
        push(AD_TYPE_COMPLETE_NAME, name.as_bytes());
        push(AD_TYPE_UUID16_COMPLETE, &service_uuid.to_le_bytes());
        push(AD_TYPE_APPEARANCE, &appearance.to_le_bytes());

        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
