//! Demo revolution source using ESP-IDF's esp_timer API.
//!
//! With [`SensorSource::Simulated`](crate::config::SensorSource) the board
//! needs no magnets: a periodic timer fires one wheel and one crank
//! revolution every `period_ms`, so a central sees a steady cadence and
//! speed on the bench.
//!
//! Timer callbacks execute in the ESP timer task context (not ISR), and
//! only push to the event queue.

use crate::sensors::{crank_isr_handler, wheel_isr_handler};

use super::hw_init::HwInitError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
static mut SIM_TIMER: esp_timer_handle_t = core::ptr::null_mut();

/// One simulated pedal stroke: a wheel and a crank revolution at `now_ms`.
pub fn fire_simulated_revolution(now_ms: u32) {
    wheel_isr_handler(now_ms);
    crank_isr_handler(now_ms);
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn sim_tick_cb(_arg: *mut core::ffi::c_void) {
    fire_simulated_revolution(crate::adapters::time::uptime_ms());
}

/// Start the periodic demo timer.
#[cfg(target_os = "espidf")]
pub fn start(period_ms: u32) -> Result<(), HwInitError> {
    // SAFETY: SIM_TIMER is written here once at boot from the main task
    // before the callback can fire.
    unsafe {
        let args = esp_timer_create_args_t {
            callback: Some(sim_tick_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"csc_sim\0".as_ptr() as *const _,
            skip_unhandled_events: true,
        };
        let ret = esp_timer_create(&args, &raw mut SIM_TIMER);
        if ret != ESP_OK {
            return Err(HwInitError::TimerFailed(ret));
        }
        let ret = esp_timer_start_periodic(SIM_TIMER, u64::from(period_ms) * 1_000);
        if ret != ESP_OK {
            return Err(HwInitError::TimerFailed(ret));
        }
    }
    log::info!("sim_timer: wheel+crank every {} ms", period_ms);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn start(period_ms: u32) -> Result<(), HwInitError> {
    log::info!("sim_timer(sim): not started (period {} ms)", period_ms);
    Ok(())
}
