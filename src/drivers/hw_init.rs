//! One-shot hardware peripheral initialization.
//!
//! Configures the wheel and crank sensor GPIOs as pulled-up inputs and
//! registers their rising-edge ISRs, using raw ESP-IDF sys calls.  Called
//! once from `main()` before the event loop starts, and only when the
//! sensor source is [`SensorSource::Gpio`](crate::config::SensorSource).

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
    IsrAddFailed(i32),
    TimerFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
            Self::IsrAddFailed(rc) => write!(f, "GPIO ISR handler add failed (rc={})", rc),
            Self::TimerFailed(rc) => write!(f, "esp_timer setup failed (rc={})", rc),
        }
    }
}

impl std::error::Error for HwInitError {}

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;

/// Configure both sensor inputs.
#[cfg(target_os = "espidf")]
pub fn init_sensor_inputs() -> Result<(), HwInitError> {
    for &pin in &pins::SENSOR_GPIOS {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_POSEDGE,
        };
        // SAFETY: called once from main() before the event loop.
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
    }
    info!(
        "hw_init: sensor inputs configured (wheel=GPIO{}, crank=GPIO{})",
        pins::WHEEL_SENSOR_GPIO,
        pins::CRANK_SENSOR_GPIO
    );
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_sensor_inputs() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): sensor inputs skipped");
    Ok(())
}

// ── GPIO ISR Service ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn wheel_gpio_isr(_arg: *mut core::ffi::c_void) {
    // esp_timer_get_time is an RTC counter read; safe in ISR context.
    crate::sensors::wheel_isr_handler(crate::adapters::time::uptime_ms());
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn crank_gpio_isr(_arg: *mut core::ffi::c_void) {
    crate::sensors::crank_isr_handler(crate::adapters::time::uptime_ms());
}

/// Install the per-pin GPIO ISR service and register both sensor handlers.
/// Call after [`init_sensor_inputs`] and before the event loop.
#[cfg(target_os = "espidf")]
pub fn init_isr_service() -> Result<(), HwInitError> {
    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed (acceptable). The handlers are static
    // functions that only timestamp and push to the event queue.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
            return Err(HwInitError::IsrInstallFailed(ret));
        }

        let handlers: [(i32, unsafe extern "C" fn(*mut core::ffi::c_void)); 2] = [
            (pins::WHEEL_SENSOR_GPIO, wheel_gpio_isr),
            (pins::CRANK_SENSOR_GPIO, crank_gpio_isr),
        ];
        for (pin, isr) in handlers {
            let ret = gpio_isr_handler_add(pin, Some(isr), core::ptr::null_mut());
            if ret != ESP_OK {
                return Err(HwInitError::IsrAddFailed(ret));
            }
            gpio_intr_enable(pin);
        }

        info!("hw_init: ISR service installed (wheel, crank)");
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): ISR service skipped");
    Ok(())
}
