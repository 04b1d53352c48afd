//! PMSense Firmware: Main Entry Point
//!
//! Hexagonal architecture with event-driven execution.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  Sngcja5 (I2C)       BleAdapter          PlatformAdapter       │
//! │  (ParticleSensor)    (NotificationSink)  (Timer+Indicator)     │
//! │  NvsAdapter (ConfigPort)                                       │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │          SamplingController (pure logic)               │    │
//! │  │  connection gate · aggregator · interval config        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  GATTS + esp_timer callbacks ──▶ event queue ──▶ main loop     │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::{Result, anyhow};
use log::{info, warn};

use esp_idf_hal::delay::Ets;
use esp_idf_hal::peripherals::Peripherals;

use pmsense::adapters::ble::BleAdapter;
use pmsense::adapters::nvs::NvsAdapter;
use pmsense::adapters::platform::PlatformAdapter;
use pmsense::app::ports::{ConfigPort, IndicatorPort};
use pmsense::app::service::SamplingController;
use pmsense::config::SystemConfig;
use pmsense::drivers::hw_init;
use pmsense::error::Error;
use pmsense::drivers::hw_timer::HwTimers;
use pmsense::drivers::indicator::IndicatorLed;
use pmsense::events::{self, Event};
use pmsense::sensors::Sngcja5;

/// Main-loop idle sleep between queue drains.
const LOOP_IDLE_MS: u64 = 10;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  PMSense v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Initialise hardware peripherals ────────────────────
    hw_init::init_peripherals().map_err(|e| anyhow!("{}: {e}", Error::from(e)))?;

    // ── 3. Load config from NVS (or defaults) ─────────────────
    let nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults and no persistence", e);
            NvsAdapter::default()
        }
    };
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    };
    info!(
        "Config: interval={} ticks, tick={} ms, sensor @0x{:02x}",
        config.interval_ticks, config.sample_period_ms, config.i2c_address
    );

    // ── 4. Indicator: blink until a central connects ──────────
    let timers = HwTimers::new().map_err(|e| anyhow!("{}: {e}", Error::from(e)))?;
    let mut platform = PlatformAdapter::new(timers, IndicatorLed::new());
    platform.start_blink(config.blink_toggle_ms);

    // ── 5. Sensor bus + warm-up ───────────────────────────────
    let peripherals = Peripherals::take()?;
    let i2c = hw_init::init_sensor_bus(peripherals.i2c0, config.i2c_frequency_hz)
        .map_err(|e| anyhow!("{}: {e}", Error::from(e)))?;
    let mut sensor = Sngcja5::with_config(i2c, Ets, config.i2c_address, config.settle_delay_us);

    info!("SN-GCJA5: warming up for {} s", config.warmup_secs);
    std::thread::sleep(Duration::from_secs(u64::from(config.warmup_secs)));

    match sensor.read_full_status() {
        Ok(pc) => info!(
            "SN-GCJA5: PM1.0={} PM2.5={} PM10={} counts 0.3={} 0.5={} 1.0={} 2.5={} 5.0={} 7.5={}",
            pc.pm1_0,
            pc.pm2_5,
            pc.pm10,
            pc.count_0_3,
            pc.count_0_5,
            pc.count_1_0,
            pc.count_2_5,
            pc.count_5_0,
            pc.count_7_5
        ),
        Err(e) => warn!("SN-GCJA5: initial status read failed ({})", Error::from(e)),
    }

    // ── 6. BLE GATT server ────────────────────────────────────
    let mut ble = BleAdapter::new(config.device_name.clone());
    ble.start(config.interval_ticks)
        .map_err(|e| anyhow!("{}", Error::from(e)))?;

    // ── 7. Sampling controller ────────────────────────────────
    let mut controller = SamplingController::new(config);

    info!("System ready. Entering event loop.");

    // ── 8. Event loop ─────────────────────────────────────────
    loop {
        events::drain_events(|event| match event {
            Event::PeerConnected => {
                ble.on_central_connected();
                controller.on_connect(&mut platform);
            }

            Event::PeerDisconnected => {
                ble.on_central_disconnected();
                controller.on_disconnect(&mut platform);
            }

            Event::IntervalWritten(value) => {
                if controller.on_interval_config_write(value).is_err() {
                    // Put the accepted value back so reads stay truthful.
                    ble.set_interval_value(controller.interval());
                }
            }

            Event::SampleTick => controller.on_tick(&mut sensor, &mut ble),

            Event::BlinkTick => platform.on_blink_tick(),
        });

        controller.save_if_dirty(&nvs);

        std::thread::sleep(Duration::from_millis(LOOP_IDLE_MS));
    }
}
