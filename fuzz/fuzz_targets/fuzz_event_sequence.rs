//! Fuzz target: `CscPeripheral::handle_event`
//!
//! Decodes arbitrary bytes into a sequence of connects, disconnects and
//! revolutions and asserts that the controller never panics, that its
//! state always agrees with the registry, and that counters never go
//! backwards.
//!
//! cargo fuzz run fuzz_event_sequence

#![no_main]

use cheapensor::app::events::StackEvent;
use cheapensor::app::ports::{AttrHandle, AttrHandles, BleStackPort, ConnHandle, NullSink};
use cheapensor::app::service::{CscPeripheral, PeripheralState};
use cheapensor::config::PeripheralConfig;
use cheapensor::csc::gatt::ServiceDescriptor;
use cheapensor::error::StackError;
use cheapensor::events::Event;
use cheapensor::registry::MAX_CONNECTIONS;
use libfuzzer_sys::fuzz_target;

struct FlakyStack {
    /// Connections whose notify fails.
    fail_mask: u8,
}

impl BleStackPort for FlakyStack {
    fn register_service(&mut self, service: &ServiceDescriptor) -> Result<AttrHandles, StackError> {
        Ok((0..service.characteristics.len() as u16).map(AttrHandle).collect())
    }

    fn write_attribute(&mut self, _: AttrHandle, _: &[u8]) -> Result<(), StackError> {
        Ok(())
    }

    fn notify(&mut self, conn: ConnHandle, _: AttrHandle, value: &[u8]) -> Result<(), StackError> {
        assert_eq!(value.len(), 11);
        if self.fail_mask & (1 << (conn.0 % 8)) != 0 {
            Err(StackError::NotifyFailed(-1))
        } else {
            Ok(())
        }
    }

    fn start_advertising(&mut self, _: u32, payload: &[u8]) -> Result<(), StackError> {
        assert!(payload.len() <= 31);
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    let Some((&mask, ops)) = data.split_first() else {
        return;
    };
    let mut stack = FlakyStack { fail_mask: mask };
    let Ok(mut csc) = CscPeripheral::activate(&PeripheralConfig::default(), &mut stack, &mut NullSink) else {
        return;
    };

    let mut now: u32 = 0;
    for chunk in ops.chunks_exact(2) {
        let (op, arg) = (chunk[0], chunk[1]);
        let conn = ConnHandle(u16::from(arg % 32));
        let event = match op % 4 {
            0 => Event::Stack(StackEvent::CentralConnect { conn }),
            1 => Event::Stack(StackEvent::CentralDisconnect { conn }),
            2 => {
                now = now.wrapping_add(u32::from(arg) * 4);
                Event::WheelRevolution { at_ms: now }
            }
            _ => {
                now = now.wrapping_add(u32::from(arg) * 4);
                Event::CrankRevolution { at_ms: now }
            }
        };

        let before = (csc.wheel().cumulative_count, csc.crank().cumulative_count);
        csc.handle_event(event, &mut stack, &mut NullSink);
        let after = (csc.wheel().cumulative_count, csc.crank().cumulative_count);

        assert!(after.0 - before.0 <= 1 && after.1 - before.1 <= 1);
        let links = csc.connections().len();
        assert!(links <= MAX_CONNECTIONS);
        assert_eq!(
            csc.state() == PeripheralState::Connected,
            links > 0,
            "state must follow registry occupancy"
        );
    }
});
