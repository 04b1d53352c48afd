//! BLE PM Sense adapter.
//!
//! Implements [`NotificationSink`]: each interval average is written to the
//! count characteristic and notified to the connected central.  GATT server
//! callbacks are translated into [`Event`]s for the main loop; nothing in
//! the callback path touches the sampling controller.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid BLE GATT server via `esp_idf_svc::sys`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## GATT Service Layout
//!
//! | Characteristic | UUID                                     | Perms        | Value          |
//! |----------------|------------------------------------------|--------------|----------------|
//! | PM counts      | `20220214-1515-1515-1515-f8f381aa84ed`   | Read+Notify  | 2×u16 LE (A,B) |
//! | Interval       | `20220214-1616-1616-1616-f8f381aa84ed`   | Read+Write   | u8 ticks       |

use log::{debug, info, warn};

use crate::app::ports::NotificationSink;
use crate::error::CommsError;
#[cfg(target_os = "espidf")]
use crate::events::{Event, push_event};

// ───────────────────────────────────────────────────────────────
// Constants
// ───────────────────────────────────────────────────────────────

pub const SERVICE_UUID: u128 = 0x20220214_1313_1313_1313_f8f381aa84ed;
pub const CHAR_PM_COUNTS: u128 = 0x20220214_1515_1515_1515_f8f381aa84ed;
pub const CHAR_INTERVAL: u128 = 0x20220214_1616_1616_1616_f8f381aa84ed;

/// Count characteristic payload: channel A then channel B, little-endian.
pub const COUNTS_PAYLOAD_LEN: usize = 4;

/// Client configuration descriptor value at registration: notify off.
pub const CCCD_INITIAL: [u8; 2] = [0x00, 0x00];
const CCCD_NOTIFY_BIT: u16 = 0x0001;

// ───────────────────────────────────────────────────────────────
// Payload helpers
// ───────────────────────────────────────────────────────────────

pub fn encode_counts(channel_a: u16, channel_b: u16) -> [u8; COUNTS_PAYLOAD_LEN] {
    let mut out = [0u8; COUNTS_PAYLOAD_LEN];
    out[..2].copy_from_slice(&channel_a.to_le_bytes());
    out[2..].copy_from_slice(&channel_b.to_le_bytes());
    out
}

/// Interval writes must be exactly one byte.  Range checking is left to the
/// controller so that every rejection goes through the same path.
pub fn parse_interval_write(raw: &[u8]) -> Option<u8> {
    match raw {
        [value] => Some(*value),
        _ => None,
    }
}

/// Decode a client configuration write.  `Some(true)` when the central
/// subscribed to notifications, `None` for a value that is not 2 bytes.
pub fn parse_cccd_write(raw: &[u8]) -> Option<bool> {
    match raw {
        [lo, hi] => Some(u16::from_le_bytes([*lo, *hi]) & CCCD_NOTIFY_BIT != 0),
        _ => None,
    }
}

// ───────────────────────────────────────────────────────────────
// BLE state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleState {
    Idle,
    Advertising,
    Connected,
    Failed,
}

// ── ESP-IDF BLE static state ──────────────────────────────────
//
// Bluedroid callbacks are C function pointers that cannot capture Rust
// closures. These atomics bridge the callback context to the adapter.

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering as AtomicOrdering};

#[cfg(target_os = "espidf")]
static BLE_GATTS_IF: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_CONN_ID: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_CONNECTED: AtomicBool = AtomicBool::new(false);
#[cfg(target_os = "espidf")]
static BLE_SVC_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_COUNTS_CHAR_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_INTERVAL_CHAR_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_CCCD_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_CHAR_STEP: AtomicU32 = AtomicU32::new(0);
/// Initial interval characteristic value, set before the stack starts.
#[cfg(target_os = "espidf")]
static BLE_INITIAL_INTERVAL: AtomicU8 = AtomicU8::new(0);

#[cfg(target_os = "espidf")]
fn uuid128_to_esp(uuid: u128) -> esp_idf_svc::sys::esp_bt_uuid_t {
    let mut t: esp_idf_svc::sys::esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    t.len = 16;
    unsafe {
        t.uuid.uuid128 = uuid.to_le_bytes();
    }
    t
}

/// Add a characteristic whose value the stack stores and answers reads for.
#[cfg(target_os = "espidf")]
unsafe fn add_gatt_char(svc_handle: u16, uuid: u128, perm: u32, prop: u32, initial: &mut [u8]) {
    use esp_idf_svc::sys::*;
    let mut char_uuid = uuid128_to_esp(uuid);
    let mut value = esp_attr_value_t {
        attr_max_len: initial.len() as u16,
        attr_len: initial.len() as u16,
        attr_value: initial.as_mut_ptr(),
    };
    let mut control = esp_attr_control_t {
        auto_rsp: ESP_GATT_AUTO_RSP as u8,
    };
    unsafe {
        esp_ble_gatts_add_char(
            svc_handle,
            &mut char_uuid,
            perm as esp_gatt_perm_t,
            prop as esp_gatt_char_prop_t,
            &mut value,
            &mut control,
        );
    }
}

/// Add the client configuration descriptor to the last added characteristic.
/// The stack stores the value and answers the central's write request itself.
#[cfg(target_os = "espidf")]
unsafe fn add_cccd(svc_handle: u16) {
    use esp_idf_svc::sys::*;
    let mut cccd_uuid: esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    cccd_uuid.len = 2;
    cccd_uuid.uuid.uuid16 = ESP_GATT_UUID_CHAR_CLIENT_CONFIG as u16;
    let mut initial = CCCD_INITIAL;
    let mut value = esp_attr_value_t {
        attr_max_len: initial.len() as u16,
        attr_len: initial.len() as u16,
        attr_value: initial.as_mut_ptr(),
    };
    let mut control = esp_attr_control_t {
        auto_rsp: ESP_GATT_AUTO_RSP as u8,
    };
    // SAFETY: the stack copies `value` before returning.
    unsafe {
        esp_ble_gatts_add_char_descr(
            svc_handle,
            &mut cccd_uuid,
            (ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE) as esp_gatt_perm_t,
            &mut value,
            &mut control,
        );
    }
}

#[cfg(target_os = "espidf")]
unsafe fn start_advertising() {
    use esp_idf_svc::sys::*;
    let mut adv_params = esp_ble_adv_params_t {
        adv_int_min: 0x20,
        adv_int_max: 0x40,
        adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
        own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
        channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
        adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
        ..unsafe { core::mem::zeroed() }
    };
    unsafe {
        esp_ble_gap_start_advertising(&mut adv_params);
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gap_event_handler(
    event: esp_idf_svc::sys::esp_gap_ble_cb_event_t,
    _param: *mut esp_idf_svc::sys::esp_ble_gap_cb_param_t,
) {
    use esp_idf_svc::sys::*;
    match event {
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_DATA_SET_COMPLETE_EVT => unsafe {
            start_advertising();
        },
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
            log::info!("BLE GAP: advertising started");
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => {
            log::info!("BLE GAP: advertising stopped");
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

    BLE_GATTS_IF.store(gatts_if as u32, AtomicOrdering::Relaxed);

    match event {
        esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
            log::info!("BLE GATTS: app registered (if={})", gatts_if);
            let svc_uuid = uuid128_to_esp(SERVICE_UUID);
            let mut svc_id = esp_gatt_srvc_id_t {
                id: esp_gatt_id_t {
                    uuid: svc_uuid,
                    inst_id: 0,
                },
                is_primary: true,
            };
            // service decl + 2 × (decl + value) + CCCD
            unsafe {
                esp_ble_gatts_create_service(gatts_if, &mut svc_id, 8);
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
            let p = unsafe { &(*param).create };
            let svc_handle = p.service_handle;
            BLE_SVC_HANDLE.store(svc_handle as u32, AtomicOrdering::Relaxed);
            log::info!("BLE GATTS: service created (handle={})", svc_handle);
            BLE_CHAR_STEP.store(1, AtomicOrdering::Relaxed);
            let mut initial = encode_counts(0, 0);
            unsafe {
                esp_ble_gatts_start_service(svc_handle);
                add_gatt_char(
                    svc_handle,
                    CHAR_PM_COUNTS,
                    ESP_GATT_PERM_READ,
                    ESP_GATT_CHAR_PROP_BIT_READ | ESP_GATT_CHAR_PROP_BIT_NOTIFY,
                    &mut initial,
                );
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
            let p = unsafe { &(*param).add_char };
            let handle = p.attr_handle;
            let step = BLE_CHAR_STEP.load(AtomicOrdering::Relaxed);
            let svc_handle = BLE_SVC_HANDLE.load(AtomicOrdering::Relaxed) as u16;
            match step {
                1 => {
                    BLE_COUNTS_CHAR_HANDLE.store(handle as u32, AtomicOrdering::Relaxed);
                    log::info!("BLE GATTS: counts char (handle={})", handle);
                    unsafe {
                        add_cccd(svc_handle);
                    }
                    BLE_CHAR_STEP.store(2, AtomicOrdering::Relaxed);
                    let mut initial = [BLE_INITIAL_INTERVAL.load(AtomicOrdering::Relaxed)];
                    unsafe {
                        add_gatt_char(
                            svc_handle,
                            CHAR_INTERVAL,
                            ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE,
                            ESP_GATT_CHAR_PROP_BIT_READ | ESP_GATT_CHAR_PROP_BIT_WRITE,
                            &mut initial,
                        );
                    }
                }
                2 => {
                    BLE_INTERVAL_CHAR_HANDLE.store(handle as u32, AtomicOrdering::Relaxed);
                    BLE_CHAR_STEP.store(3, AtomicOrdering::Relaxed);
                    log::info!("BLE GATTS: interval char (handle={}), all registered", handle);
                }
                _ => {}
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_DESCR_EVT => {
            let p = unsafe { &(*param).add_char_descr };
            BLE_CCCD_HANDLE.store(p.attr_handle as u32, AtomicOrdering::Relaxed);
            log::info!("BLE GATTS: counts CCCD (handle={})", p.attr_handle);
        }
        esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
            let p = unsafe { &(*param).connect };
            BLE_CONN_ID.store(p.conn_id as u32, AtomicOrdering::Relaxed);
            BLE_CONNECTED.store(true, AtomicOrdering::Release);
            log::info!("BLE GATTS: client connected (conn_id={})", p.conn_id);
            push_event(Event::PeerConnected);
        }
        esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
            BLE_CONNECTED.store(false, AtomicOrdering::Release);
            log::info!("BLE GATTS: client disconnected");
            push_event(Event::PeerDisconnected);
            // Single connection: advertise again only once the slot is free.
            unsafe {
                start_advertising();
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
            let p = unsafe { &(*param).write };
            let data = unsafe { core::slice::from_raw_parts(p.value, p.len as usize) };
            let handle = u32::from(p.handle);
            if handle == BLE_CCCD_HANDLE.load(AtomicOrdering::Relaxed) {
                match parse_cccd_write(data) {
                    Some(on) => log::info!("BLE GATTS: notifications {}", if on { "on" } else { "off" }),
                    None => log::warn!("BLE GATTS: CCCD write ignored (len={})", data.len()),
                }
                return;
            }
            if handle != BLE_INTERVAL_CHAR_HANDLE.load(AtomicOrdering::Relaxed) {
                return;
            }
            match parse_interval_write(data) {
                Some(value) => {
                    push_event(Event::IntervalWritten(value));
                }
                None => log::warn!("BLE GATTS: interval write ignored (len={})", data.len()),
            }
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
    /// Simulation: last count payload written to the characteristic.
    #[cfg(not(target_os = "espidf"))]
    sim_counts_value: [u8; COUNTS_PAYLOAD_LEN],
    /// Simulation: current interval characteristic value.
    #[cfg(not(target_os = "espidf"))]
    sim_interval_value: u8,
    /// Simulation: notifications delivered to the central.
    #[cfg(not(target_os = "espidf"))]
    sim_notifications: u32,
}

impl BleAdapter {
    pub fn new(device_name: heapless::String<24>) -> Self {
        Self {
            state: BleState::Idle,
            device_name,
            #[cfg(not(target_os = "espidf"))]
            sim_counts_value: [0; COUNTS_PAYLOAD_LEN],
            #[cfg(not(target_os = "espidf"))]
            sim_interval_value: 0,
            #[cfg(not(target_os = "espidf"))]
            sim_notifications: 0,
        }
    }

    pub fn state(&self) -> BleState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == BleState::Connected
    }

    /// Bring up the stack, register the service and start advertising.
    /// `interval` seeds the interval characteristic.
    pub fn start(&mut self, interval: u8) -> Result<(), CommsError> {
        info!("BLE: starting advertising as '{}'", self.device_name);
        if let Err(e) = self.platform_start(interval) {
            self.state = BleState::Failed;
            return Err(e);
        }
        self.state = BleState::Advertising;
        Ok(())
    }

    pub fn on_central_connected(&mut self) {
        info!("BLE: central connected");
        self.state = BleState::Connected;
    }

    pub fn on_central_disconnected(&mut self) {
        info!("BLE: central disconnected");
        if self.state != BleState::Idle {
            self.state = BleState::Advertising;
        }
    }

    /// Overwrite the interval characteristic, e.g. after a rejected write.
    pub fn set_interval_value(&mut self, interval: u8) {
        self.platform_set_interval(interval);
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_start(&mut self, interval: u8) -> Result<(), CommsError> {
        use esp_idf_svc::sys::*;
        BLE_INITIAL_INTERVAL.store(interval, AtomicOrdering::Relaxed);

        // Null-terminated copy for the C API.
        let mut name = heapless::Vec::<u8, 25>::new();
        let _ = name.extend_from_slice(self.device_name.as_bytes());
        let _ = name.push(0);

        unsafe {
            // Release classic BT memory (BLE-only mode saves ~30 KB).
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            let ret = esp_bt_controller_init(&mut bt_cfg);
            if ret != ESP_OK as i32 {
                log::error!("BLE: bt_controller_init failed ({})", ret);
                return Err(CommsError::BleInitFailed);
            }

            let ret = esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE);
            if ret != ESP_OK as i32 {
                log::error!("BLE: bt_controller_enable failed ({})", ret);
                return Err(CommsError::BleInitFailed);
            }

            let ret = esp_bluedroid_init();
            if ret != ESP_OK as i32 {
                log::error!("BLE: bluedroid_init failed ({})", ret);
                return Err(CommsError::BleInitFailed);
            }

            let ret = esp_bluedroid_enable();
            if ret != ESP_OK as i32 {
                log::error!("BLE: bluedroid_enable failed ({})", ret);
                return Err(CommsError::BleInitFailed);
            }

            esp_ble_gap_register_callback(Some(ble_gap_event_handler));
            esp_ble_gatts_register_callback(Some(ble_gatts_event_handler));
            esp_ble_gatts_app_register(0);

            esp_ble_gap_set_device_name(name.as_ptr() as *const _);

            // Advertise the name and the service UUID; advertising starts
            // from the GAP callback once the data is set.
            let mut service_uuid = SERVICE_UUID.to_le_bytes();
            let mut adv_data = esp_ble_adv_data_t {
                set_scan_rsp: false,
                include_name: true,
                include_txpower: false,
                min_interval: 0x0006,
                max_interval: 0x0010,
                flag: (ESP_BLE_ADV_FLAG_GEN_DISC | ESP_BLE_ADV_FLAG_BREDR_NOT_SPT) as u8,
                ..core::mem::zeroed()
            };
            let mut scan_rsp = esp_ble_adv_data_t {
                set_scan_rsp: true,
                service_uuid_len: service_uuid.len() as u16,
                p_service_uuid: service_uuid.as_mut_ptr(),
                ..core::mem::zeroed()
            };
            esp_ble_gap_config_adv_data(&mut adv_data);
            esp_ble_gap_config_adv_data(&mut scan_rsp);
        }

        info!(
            "BLE(espidf): Bluedroid stack initialized, advertising as '{}'",
            self.device_name
        );
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&mut self, interval: u8) -> Result<(), CommsError> {
        self.sim_interval_value = interval;
        info!(
            "BLE(sim): advertising '{}' (service {:032x})",
            self.device_name, SERVICE_UUID
        );
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_publish(&mut self, payload: &[u8; COUNTS_PAYLOAD_LEN]) -> Result<(), CommsError> {
        use esp_idf_svc::sys::*;
        let handle = BLE_COUNTS_CHAR_HANDLE.load(AtomicOrdering::Relaxed) as u16;
        if handle == 0 {
            return Err(CommsError::NotifyFailed);
        }
        let mut value = *payload;
        unsafe {
            esp_ble_gatts_set_attr_value(handle, value.len() as u16, value.as_ptr());
            if !BLE_CONNECTED.load(AtomicOrdering::Acquire) {
                return Ok(());
            }
            let ret = esp_ble_gatts_send_indicate(
                BLE_GATTS_IF.load(AtomicOrdering::Relaxed) as esp_gatt_if_t,
                BLE_CONN_ID.load(AtomicOrdering::Relaxed) as u16,
                handle,
                value.len() as u16,
                value.as_mut_ptr(),
                false,
            );
            if ret != ESP_OK as i32 {
                return Err(CommsError::NotifyFailed);
            }
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_publish(&mut self, payload: &[u8; COUNTS_PAYLOAD_LEN]) -> Result<(), CommsError> {
        self.sim_counts_value = *payload;
        if self.state == BleState::Connected {
            self.sim_notifications += 1;
        }
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_set_interval(&mut self, interval: u8) {
        let handle = BLE_INTERVAL_CHAR_HANDLE.load(AtomicOrdering::Relaxed) as u16;
        if handle == 0 {
            BLE_INITIAL_INTERVAL.store(interval, AtomicOrdering::Relaxed);
            return;
        }
        let value = [interval];
        unsafe {
            esp_idf_svc::sys::esp_ble_gatts_set_attr_value(handle, 1, value.as_ptr());
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_set_interval(&mut self, interval: u8) {
        self.sim_interval_value = interval;
    }
}

#[cfg(not(target_os = "espidf"))]
impl BleAdapter {
    pub fn sim_counts_value(&self) -> [u8; COUNTS_PAYLOAD_LEN] {
        self.sim_counts_value
    }

    pub fn sim_interval_value(&self) -> u8 {
        self.sim_interval_value
    }

    pub fn sim_notifications(&self) -> u32 {
        self.sim_notifications
    }
}

// ───────────────────────────────────────────────────────────────
// NotificationSink implementation
// ───────────────────────────────────────────────────────────────

impl NotificationSink for BleAdapter {
    fn publish(&mut self, channel_a: u16, channel_b: u16) {
        let payload = encode_counts(channel_a, channel_b);
        match self.platform_publish(&payload) {
            Ok(()) => debug!("BLE: counts notified A={} B={}", channel_a, channel_b),
            Err(e) => warn!("BLE: {}", e),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
