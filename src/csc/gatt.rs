//! GATT service description for the CSC profile.
//!
//! ## Service layout
//!
//! | Characteristic   | UUID     | Props        | Value              |
//! |------------------|----------|--------------|--------------------|
//! | CSC Feature      | `0x2A5C` | Read         | `0x0003` (u16 LE)  |
//! | CSC Measurement  | `0x2A5B` | Read+Notify  | 11-byte measurement|
//!
//! The descriptor is handed to the stack as-is; the stack answers with one
//! attribute handle per characteristic, in declaration order.

/// Cycling Speed and Cadence service.
pub const CSC_SERVICE_UUID: u16 = 0x1816;
/// CSC Feature characteristic.
pub const CSC_FEATURE_UUID: u16 = 0x2A5C;
/// CSC Measurement characteristic.
pub const CSC_MEASUREMENT_UUID: u16 = 0x2A5B;

/// GAP appearance: cycling speed and cadence sensor.
pub const APPEARANCE_CYCLING_SPEED_CADENCE: u16 = 1157;

/// Characteristic property: readable.
pub const PROP_READ: u8 = 0x02;
/// Characteristic property: notifiable.
pub const PROP_NOTIFY: u8 = 0x10;

/// Maximum characteristics a single service descriptor may carry.
pub const MAX_CHARACTERISTICS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicDescriptor {
    pub uuid: u16,
    /// Bitwise OR of `PROP_*` flags.
    pub properties: u8,
    /// Longest value the stack must reserve room for.
    pub max_len: u16,
}

impl CharacteristicDescriptor {
    pub const fn is_notify(&self) -> bool {
        self.properties & PROP_NOTIFY != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub uuid: u16,
    pub characteristics: &'static [CharacteristicDescriptor],
}

/// The CSC service: feature first, measurement second.
pub const CSC_SERVICE: ServiceDescriptor = ServiceDescriptor {
    uuid: CSC_SERVICE_UUID,
    characteristics: &[
        CharacteristicDescriptor {
            uuid: CSC_FEATURE_UUID,
            properties: PROP_READ,
            max_len: 2,
        },
        CharacteristicDescriptor {
            uuid: CSC_MEASUREMENT_UUID,
            properties: PROP_READ | PROP_NOTIFY,
            max_len: super::codec::MEASUREMENT_LEN as u16,
        },
    ],
};
