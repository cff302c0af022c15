//! BLE GATT server adapter.
//!
//! Implements [`BleStackPort`], the hexagonal boundary between the CSC
//! peripheral and the radio.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid GATT server via `esp_idf_svc::sys`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## Callback bridge
//!
//! Bluedroid answers every request asynchronously from its own task.  The
//! GATTS/GAP handlers below publish results through atomics, and the
//! adapter methods poll those with a timeout, which keeps the port
//! synchronous.  Connection lifecycle callbacks are turned into
//! [`StackEvent`](crate::app::events::StackEvent)s and pushed onto the
//! main event queue; nothing else touches peripheral state from the
//! Bluedroid task.
//!
//! | Callback                 | Queue event                 |
//! |--------------------------|-----------------------------|
//! | `ESP_GATTS_CONNECT_EVT`  | `CentralConnect { conn }`   |
//! | `ESP_GATTS_DISCONNECT_EVT` | `CentralDisconnect { conn }` |
//! | `ESP_GATTS_CONF_EVT`     | `IndicateDone { .. }`       |

use log::info;

use crate::app::events::StackEvent;
use crate::app::ports::{AttrHandle, AttrHandles, BleStackPort, ConnHandle};
use crate::csc::gatt::ServiceDescriptor;
use crate::error::StackError;
use crate::events::{Event, push_event};

// ───────────────────────────────────────────────────────────────
// Constants
// ───────────────────────────────────────────────────────────────

/// Client Characteristic Configuration descriptor, added to every
/// notifiable characteristic.
pub const CCCD_UUID: u16 = 0x2902;

/// Advertising interval unit (0.625 ms).
const ADV_UNIT_US: u32 = 625;
/// Range of the HCI advertising interval field, in units.
const ADV_UNITS_MIN: u32 = 0x0020;
const ADV_UNITS_MAX: u32 = 0x4000;

/// How long to wait for an asynchronous stack reply.
#[cfg(target_os = "espidf")]
const STACK_TIMEOUT_MS: u32 = 2_000;

/// Convert an interval in microseconds to 0.625 ms advertising units,
/// clamped to what the controller accepts.
pub fn adv_interval_units(interval_us: u32) -> u16 {
    (interval_us / ADV_UNIT_US).clamp(ADV_UNITS_MIN, ADV_UNITS_MAX) as u16
}

/// Attribute handles a service descriptor needs: the declaration, one
/// declaration + value per characteristic, and a CCCD per notifiable one.
pub fn attr_handle_budget(service: &ServiceDescriptor) -> u16 {
    service.characteristics.iter().fold(1u16, |n, c| {
        n + 2 + u16::from(c.is_notify())
    })
}

/// Hand a lifecycle callback to the main loop.  A full queue drops the
/// event with a warning; returns whether it was queued.
pub fn forward_stack_event(event: StackEvent) -> bool {
    let queued = push_event(Event::Stack(event));
    if !queued {
        log::warn!("BLE GATTS: event queue full, {:?} dropped", event);
    }
    queued
}

// ───────────────────────────────────────────────────────────────
// Adapter state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleState {
    /// Stack not brought up yet.
    Idle,
    /// Controller and host running, GATT app registered.
    Ready,
    /// Advertising data set and advertising requested.
    Advertising,
    Failed,
}

// ── ESP-IDF BLE static state (callback-safe atomics) ──────────
//
// Bluedroid callbacks are C function pointers that cannot capture Rust
// closures. These atomics bridge the callback context to the adapter.

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

/// Slot value meaning "no reply yet".
#[cfg(any(target_os = "espidf", test))]
const UNSET: u32 = u32::MAX;
/// Set in a slot when the stack replied with an error status
/// (low 16 bits carry the status).
#[cfg(any(target_os = "espidf", test))]
const FAILED_BIT: u32 = 0x1_0000;

#[cfg(target_os = "espidf")]
static BLE_GATTS_IF: AtomicU32 = AtomicU32::new(UNSET);
#[cfg(target_os = "espidf")]
static BLE_SVC_HANDLE: AtomicU32 = AtomicU32::new(UNSET);
#[cfg(target_os = "espidf")]
static BLE_ATTR_HANDLE: AtomicU32 = AtomicU32::new(UNSET);
/// Advertising interval (0.625 ms units) applied once raw data is set.
#[cfg(target_os = "espidf")]
static BLE_ADV_UNITS: AtomicU32 = AtomicU32::new(ADV_UNITS_MIN);

#[cfg(target_os = "espidf")]
fn uuid16_to_esp(uuid: u16) -> esp_idf_svc::sys::esp_bt_uuid_t {
    let mut t: esp_idf_svc::sys::esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    t.len = 2;
    t.uuid.uuid16 = uuid;
    t
}

#[cfg(target_os = "espidf")]
fn reply_slot_value(status: esp_idf_svc::sys::esp_gatt_status_t, handle: u16) -> u32 {
    if status == esp_idf_svc::sys::esp_gatt_status_t_ESP_GATT_OK {
        u32::from(handle)
    } else {
        FAILED_BIT | (status as u32 & 0xFFFF)
    }
}

/// Interpret a reply slot.  `None` while the callback has not run yet;
/// error statuses are wrapped with `wrap`.
#[cfg(any(target_os = "espidf", test))]
fn decode_reply(v: u32, wrap: fn(i32) -> StackError) -> Option<Result<u16, StackError>> {
    if v == UNSET {
        None
    } else if v & FAILED_BIT != 0 {
        Some(Err(wrap((v & 0xFFFF) as i32)))
    } else {
        Some(Ok(v as u16))
    }
}

/// Poll `slot` until the callback fills it in.
#[cfg(target_os = "espidf")]
fn wait_for_reply(slot: &AtomicU32, wrap: fn(i32) -> StackError) -> Result<u16, StackError> {
    let start = super::time::uptime_ms();
    loop {
        if let Some(reply) = decode_reply(slot.load(AtomicOrdering::Acquire), wrap) {
            return reply;
        }
        if super::time::uptime_ms().wrapping_sub(start) > STACK_TIMEOUT_MS {
            return Err(StackError::Timeout);
        }
        std::thread::sleep(core::time::Duration::from_millis(1));
    }
}

#[cfg(target_os = "espidf")]
fn check(rc: esp_idf_svc::sys::esp_err_t, wrap: fn(i32) -> StackError) -> Result<(), StackError> {
    if rc == esp_idf_svc::sys::ESP_OK as i32 {
        Ok(())
    } else {
        Err(wrap(rc))
    }
}

#[cfg(target_os = "espidf")]
unsafe fn start_advertising_now() {
    use esp_idf_svc::sys::*;
    let units = BLE_ADV_UNITS.load(AtomicOrdering::Relaxed) as u16;
    let mut adv_params = esp_ble_adv_params_t {
        adv_int_min: units,
        adv_int_max: units,
        adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
        own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
        channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
        adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
        ..unsafe { core::mem::zeroed() }
    };
    let rc = unsafe { esp_ble_gap_start_advertising(&mut adv_params) };
    if rc != ESP_OK as i32 {
        log::warn!("BLE GAP: start_advertising failed ({})", rc);
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gap_event_handler(
    event: esp_idf_svc::sys::esp_gap_ble_cb_event_t,
    param: *mut esp_idf_svc::sys::esp_ble_gap_cb_param_t,
) {
    use esp_idf_svc::sys::*;
    match event {
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_DATA_RAW_SET_COMPLETE_EVT => {
            unsafe { start_advertising_now() };
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
            let status = unsafe { (*param).adv_start_cmpl.status };
            if status == esp_bt_status_t_ESP_BT_STATUS_SUCCESS {
                log::debug!("BLE GAP: advertising started");
            } else {
                log::warn!("BLE GAP: advertising start failed (status={})", status);
            }
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => {
            log::debug!("BLE GAP: advertising stopped");
        }
        _ => {}
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gatts_event_handler(
    event: esp_idf_svc::sys::esp_gatts_cb_event_t,
    gatts_if: esp_idf_svc::sys::esp_gatt_if_t,
    param: *mut esp_idf_svc::sys::esp_ble_gatts_cb_param_t,
) {
    use esp_idf_svc::sys::*;

    match event {
        esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
            log::info!("BLE GATTS: app registered (if={})", gatts_if);
            BLE_GATTS_IF.store(u32::from(gatts_if), AtomicOrdering::Release);
        }
        esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
            let p = unsafe { &(*param).create };
            BLE_SVC_HANDLE.store(reply_slot_value(p.status, p.service_handle), AtomicOrdering::Release);
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
            let p = unsafe { &(*param).add_char };
            BLE_ATTR_HANDLE.store(reply_slot_value(p.status, p.attr_handle), AtomicOrdering::Release);
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_DESCR_EVT => {
            let p = unsafe { &(*param).add_char_descr };
            BLE_ATTR_HANDLE.store(reply_slot_value(p.status, p.attr_handle), AtomicOrdering::Release);
        }
        esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
            let p = unsafe { &(*param).connect };
            log::info!("BLE GATTS: central connected (conn_id={})", p.conn_id);
            forward_stack_event(StackEvent::CentralConnect {
                conn: ConnHandle(p.conn_id),
            });
        }
        esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
            let p = unsafe { &(*param).disconnect };
            log::info!(
                "BLE GATTS: central disconnected (conn_id={}, reason=0x{:02x})",
                p.conn_id,
                p.reason
            );
            forward_stack_event(StackEvent::CentralDisconnect {
                conn: ConnHandle(p.conn_id),
            });
        }
        esp_gatts_cb_event_t_ESP_GATTS_CONF_EVT => {
            let p = unsafe { &(*param).conf };
            forward_stack_event(StackEvent::IndicateDone {
                conn: ConnHandle(p.conn_id),
                handle: AttrHandle(p.handle),
                status: p.status as u8,
            });
        }
        _ => {}
    }
}

// ───────────────────────────────────────────────────────────────
// BLE adapter
// ───────────────────────────────────────────────────────────────

pub struct BleAdapter {
    state: BleState,
    device_name: heapless::String<24>,
    /// Simulation: next attribute handle to hand out.
    #[cfg(not(target_os = "espidf"))]
    sim_next_handle: u16,
    /// Simulation: notifications "sent".
    #[cfg(not(target_os = "espidf"))]
    sim_notifications: u32,
    /// Simulation: last advertising payload length.
    #[cfg(not(target_os = "espidf"))]
    sim_adv_len: usize,
}

impl BleAdapter {
    pub fn new(device_name: heapless::String<24>) -> Self {
        Self {
            state: BleState::Idle,
            device_name,
            #[cfg(not(target_os = "espidf"))]
            sim_next_handle: 1,
            #[cfg(not(target_os = "espidf"))]
            sim_notifications: 0,
            #[cfg(not(target_os = "espidf"))]
            sim_adv_len: 0,
        }
    }

    pub fn state(&self) -> BleState {
        self.state
    }

    /// Bring up the controller and host and register the GATT app.
    /// Must succeed before any [`BleStackPort`] call.
    pub fn init(&mut self) -> Result<(), StackError> {
        match self.platform_init() {
            Ok(()) => {
                self.state = BleState::Ready;
                info!("BLE: stack ready as '{}'", self.device_name);
                Ok(())
            }
            Err(e) => {
                self.state = BleState::Failed;
                log::error!("BLE: init failed: {}", e);
                Err(e)
            }
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_init(&mut self) -> Result<(), StackError> {
        use esp_idf_svc::sys::*;
        unsafe {
            // Release classic BT memory (BLE-only mode saves ~30 KB).
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            check(esp_bt_controller_init(&mut bt_cfg), StackError::InitFailed)?;
            check(
                esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE),
                StackError::InitFailed,
            )?;
            check(esp_bluedroid_init(), StackError::InitFailed)?;
            check(esp_bluedroid_enable(), StackError::InitFailed)?;

            check(
                esp_ble_gap_register_callback(Some(ble_gap_event_handler)),
                StackError::InitFailed,
            )?;
            check(
                esp_ble_gatts_register_callback(Some(ble_gatts_event_handler)),
                StackError::InitFailed,
            )?;

            let name = std::ffi::CString::new(self.device_name.as_str())
                .map_err(|_| StackError::InitFailed(ESP_ERR_INVALID_ARG as i32))?;
            check(esp_ble_gap_set_device_name(name.as_ptr()), StackError::InitFailed)?;

            BLE_GATTS_IF.store(UNSET, AtomicOrdering::Release);
            check(esp_ble_gatts_app_register(0), StackError::InitFailed)?;
        }
        wait_for_reply(&BLE_GATTS_IF, StackError::InitFailed).map(|_| ())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_init(&mut self) -> Result<(), StackError> {
        info!("BLE(sim): controller + host up");
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_register(&mut self, service: &ServiceDescriptor) -> Result<AttrHandles, StackError> {
        use esp_idf_svc::sys::*;

        let gatts_if = wait_for_reply(&BLE_GATTS_IF, StackError::InitFailed)? as esp_gatt_if_t;
        let mut svc_id = esp_gatt_srvc_id_t {
            id: esp_gatt_id_t {
                uuid: uuid16_to_esp(service.uuid),
                inst_id: 0,
            },
            is_primary: true,
        };
        BLE_SVC_HANDLE.store(UNSET, AtomicOrdering::Release);
        check(
            unsafe { esp_ble_gatts_create_service(gatts_if, &mut svc_id, attr_handle_budget(service)) },
            StackError::RegisterFailed,
        )?;
        let svc_handle = wait_for_reply(&BLE_SVC_HANDLE, StackError::RegisterFailed)?;
        check(unsafe { esp_ble_gatts_start_service(svc_handle) }, StackError::RegisterFailed)?;
        info!("BLE GATTS: service 0x{:04x} created (handle={})", service.uuid, svc_handle);

        let mut handles = AttrHandles::new();
        for ch in service.characteristics {
            let mut uuid = uuid16_to_esp(ch.uuid);
            let mut value = esp_attr_value_t {
                attr_max_len: ch.max_len,
                attr_len: 0,
                attr_value: core::ptr::null_mut(),
            };
            let mut control = esp_attr_control_t {
                auto_rsp: ESP_GATT_AUTO_RSP as u8,
            };
            BLE_ATTR_HANDLE.store(UNSET, AtomicOrdering::Release);
            check(
                unsafe {
                    esp_ble_gatts_add_char(
                        svc_handle,
                        &mut uuid,
                        ESP_GATT_PERM_READ as esp_gatt_perm_t,
                        ch.properties as esp_gatt_char_prop_t,
                        &mut value,
                        &mut control,
                    )
                },
                StackError::RegisterFailed,
            )?;
            let handle = wait_for_reply(&BLE_ATTR_HANDLE, StackError::RegisterFailed)?;
            info!("BLE GATTS: char 0x{:04x} (handle={})", ch.uuid, handle);
            handles
                .push(AttrHandle(handle))
                .map_err(|_| StackError::RegisterFailed(ESP_ERR_NO_MEM as i32))?;

            if ch.is_notify() {
                let mut cccd_uuid = uuid16_to_esp(CCCD_UUID);
                let mut cccd_init = [0u8; 2];
                let mut cccd_value = esp_attr_value_t {
                    attr_max_len: 2,
                    attr_len: 2,
                    attr_value: cccd_init.as_mut_ptr(),
                };
                BLE_ATTR_HANDLE.store(UNSET, AtomicOrdering::Release);
                check(
                    unsafe {
                        esp_ble_gatts_add_char_descr(
                            svc_handle,
                            &mut cccd_uuid,
                            (ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE) as esp_gatt_perm_t,
                            &mut cccd_value,
                            &mut control,
                        )
                    },
                    StackError::RegisterFailed,
                )?;
                wait_for_reply(&BLE_ATTR_HANDLE, StackError::RegisterFailed)?;
            }
        }
        Ok(handles)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_register(&mut self, service: &ServiceDescriptor) -> Result<AttrHandles, StackError> {
        // Mirror the on-target layout: declaration, then decl + value
        // (+ CCCD) per characteristic.
        let mut handles = AttrHandles::new();
        let mut next = self.sim_next_handle + 1;
        for ch in service.characteristics {
            let value = next + 1;
            handles
                .push(AttrHandle(value))
                .map_err(|_| StackError::RegisterFailed(-1))?;
            next = value + 1 + u16::from(ch.is_notify());
        }
        self.sim_next_handle = next;
        info!(
            "BLE(sim): service 0x{:04x} registered ({} chars)",
            service.uuid,
            handles.len()
        );
        Ok(handles)
    }

    #[cfg(target_os = "espidf")]
    fn platform_write(&mut self, handle: AttrHandle, value: &[u8]) -> Result<(), StackError> {
        use esp_idf_svc::sys::*;
        check(
            unsafe { esp_ble_gatts_set_attr_value(handle.0, value.len() as u16, value.as_ptr()) },
            StackError::WriteFailed,
        )
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_write(&mut self, handle: AttrHandle, value: &[u8]) -> Result<(), StackError> {
        log::trace!("BLE(sim): attr {} <- {:02x?}", handle.0, value);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_notify(&mut self, conn: ConnHandle, handle: AttrHandle, value: &[u8]) -> Result<(), StackError> {
        use esp_idf_svc::sys::*;
        let gatts_if = BLE_GATTS_IF.load(AtomicOrdering::Acquire);
        if gatts_if == UNSET {
            return Err(StackError::NotifyFailed(ESP_ERR_INVALID_STATE as i32));
        }
        // Bluedroid copies the buffer before returning.
        let mut buf = heapless::Vec::<u8, 32>::new();
        buf.extend_from_slice(value)
            .map_err(|_| StackError::NotifyFailed(ESP_ERR_INVALID_SIZE as i32))?;
        check(
            unsafe {
                esp_ble_gatts_send_indicate(
                    gatts_if as esp_gatt_if_t,
                    conn.0,
                    handle.0,
                    buf.len() as u16,
                    buf.as_mut_ptr(),
                    false,
                )
            },
            StackError::NotifyFailed,
        )
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_notify(&mut self, conn: ConnHandle, handle: AttrHandle, value: &[u8]) -> Result<(), StackError> {
        self.sim_notifications = self.sim_notifications.wrapping_add(1);
        log::debug!("BLE(sim): notify conn={} attr={} {:02x?}", conn.0, handle.0, value);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_advertise(&mut self, interval_us: u32, payload: &[u8]) -> Result<(), StackError> {
        use esp_idf_svc::sys::*;
        BLE_ADV_UNITS.store(u32::from(adv_interval_units(interval_us)), AtomicOrdering::Relaxed);
        let mut raw = heapless::Vec::<u8, { crate::csc::advertising::MAX_ADV_PAYLOAD }>::new();
        raw.extend_from_slice(payload)
            .map_err(|_| StackError::AdvertiseFailed(ESP_ERR_INVALID_SIZE as i32))?;
        // Advertising itself starts from the GAP callback once the data is set.
        check(
            unsafe { esp_ble_gap_config_adv_data_raw(raw.as_mut_ptr(), raw.len() as u32) },
            StackError::AdvertiseFailed,
        )
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_advertise(&mut self, interval_us: u32, payload: &[u8]) -> Result<(), StackError> {
        self.sim_adv_len = payload.len();
        info!(
            "BLE(sim): advertising '{}' every {} units ({} bytes)",
            self.device_name,
            adv_interval_units(interval_us),
            payload.len()
        );
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// BleStackPort implementation
// ───────────────────────────────────────────────────────────────

impl BleStackPort for BleAdapter {
    fn register_service(&mut self, service: &ServiceDescriptor) -> Result<AttrHandles, StackError> {
        self.platform_register(service)
    }

    fn write_attribute(&mut self, handle: AttrHandle, value: &[u8]) -> Result<(), StackError> {
        self.platform_write(handle, value)
    }

    fn notify(&mut self, conn: ConnHandle, handle: AttrHandle, value: &[u8]) -> Result<(), StackError> {
        self.platform_notify(conn, handle, value)
    }

    fn start_advertising(&mut self, interval_us: u32, payload: &[u8]) -> Result<(), StackError> {
        let result = self.platform_advertise(interval_us, payload);
        if result.is_ok() {
            self.state = BleState::Advertising;
        }
        result
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
