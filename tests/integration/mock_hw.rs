//! Mock hardware for integration tests.
//!
//! A register-mapped SN-GCJA5 on a mock I2C bus, a recording delay, and a
//! platform mock that records every timer/indicator call so tests can
//! assert on the full command history without touching real peripherals.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

use pmsense::app::ports::{
    ConfigError, ConfigPort, IndicatorPort, NotificationSink, ParticleSensorPort, TimerPort,
};
use pmsense::config::SystemConfig;
use pmsense::error::SensorError;
use pmsense::sensors::ChannelSample;

pub const SENSOR_ADDR: u8 = 0x33;

// ── I2C bus fault injection ───────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusFault {
    /// NACK the register-select write.
    NackWrite,
    /// Fail the payload read.
    FailRead,
}

// ── MockBus ───────────────────────────────────────────────────

/// Register file of one SN-GCJA5.  A write selects, a read copies from the
/// selection.  Queued faults are consumed one transaction at a time.
pub struct MockBus {
    pub regs: [u8; 0x40],
    selected: usize,
    faults: VecDeque<Option<BusFault>>,
    fail_next_read: bool,
    pub log: Vec<(u8, BusOpRecord)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusOpRecord {
    Write(u8),
    Read(usize),
}

#[allow(dead_code)]
impl MockBus {
    pub fn new() -> Self {
        Self {
            regs: [0; 0x40],
            selected: 0,
            faults: VecDeque::new(),
            fail_next_read: false,
            log: Vec::new(),
        }
    }

    pub fn set_u16(&mut self, reg: usize, v: u16) {
        self.regs[reg..reg + 2].copy_from_slice(&v.to_le_bytes());
    }

    pub fn set_u32(&mut self, reg: usize, v: u32) {
        self.regs[reg..reg + 4].copy_from_slice(&v.to_le_bytes());
    }

    pub fn set_status(&mut self, status: u8) {
        self.regs[0x26] = status;
    }

    /// Load the five bins that make up the published channels.
    pub fn set_bins(&mut self, c0_5: u16, c1_0: u16, c2_5: u16, c5_0: u16, c7_5: u16) {
        self.set_u16(0x0E, c0_5);
        self.set_u16(0x10, c1_0);
        self.set_u16(0x14, c2_5);
        self.set_u16(0x16, c5_0);
        self.set_u16(0x18, c7_5);
    }

    /// Queue the outcome of the next register transaction (`None` = healthy).
    pub fn queue_fault(&mut self, fault: Option<BusFault>) {
        self.faults.push_back(fault);
    }

    pub fn reads(&self) -> usize {
        self.log
            .iter()
            .filter(|(_, op)| matches!(op, BusOpRecord::Read(_)))
            .count()
    }

    pub fn selected_registers(&self) -> Vec<u8> {
        self.log
            .iter()
            .filter_map(|(_, op)| match op {
                BusOpRecord::Write(r) => Some(*r),
                BusOpRecord::Read(_) => None,
            })
            .collect()
    }
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorType for MockBus {
    type Error = ErrorKind;
}

impl I2c for MockBus {
    fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), ErrorKind> {
        if address != SENSOR_ADDR {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        for op in operations {
            match op {
                Operation::Write(bytes) => {
                    // A select starts a new register transaction.
                    let fault = self.faults.pop_front().flatten();
                    self.log.push((address, BusOpRecord::Write(bytes[0])));
                    if fault == Some(BusFault::NackWrite) {
                        return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data));
                    }
                    self.fail_next_read = fault == Some(BusFault::FailRead);
                    self.selected = bytes[0] as usize;
                }
                Operation::Read(buf) => {
                    self.log.push((address, BusOpRecord::Read(buf.len())));
                    if core::mem::take(&mut self.fail_next_read) {
                        return Err(ErrorKind::ArbitrationLoss);
                    }
                    let n = buf.len();
                    buf.copy_from_slice(&self.regs[self.selected..self.selected + n]);
                }
            }
        }
        Ok(())
    }
}

// ── MockDelay ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockDelay {
    pub total_ns: u64,
    pub calls: usize,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
        self.calls += 1;
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub published: Vec<(u16, u16)>,
}

impl NotificationSink for RecordingSink {
    fn publish(&mut self, channel_a: u16, channel_b: u16) {
        self.published.push((channel_a, channel_b));
    }
}

// ── ScriptedSensor ────────────────────────────────────────────

/// Sensor port that replays a fixed script, then reports "not ready".
#[derive(Default)]
pub struct ScriptedSensor {
    script: VecDeque<Result<ChannelSample, SensorError>>,
    pub reads: usize,
}

#[allow(dead_code)]
impl ScriptedSensor {
    pub fn new(script: impl IntoIterator<Item = Result<ChannelSample, SensorError>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            reads: 0,
        }
    }

    pub fn ok(a: u16, b: u16) -> Result<ChannelSample, SensorError> {
        Ok(ChannelSample {
            channel_a: a,
            channel_b: b,
        })
    }
}

impl ParticleSensorPort for ScriptedSensor {
    fn read_channels(&mut self) -> Result<ChannelSample, SensorError> {
        self.reads += 1;
        self.script
            .pop_front()
            .unwrap_or(Err(SensorError::NotReady(0x01)))
    }
}

// ── MockPlatform ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    StartSampling(u32),
    CancelSampling,
    StartBlink(u32),
    StopBlink,
}

#[derive(Default)]
pub struct MockPlatform {
    pub calls: Vec<PlatformCall>,
}

#[allow(dead_code)]
impl MockPlatform {
    pub fn sampling_active(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                PlatformCall::StartSampling(_) => Some(true),
                PlatformCall::CancelSampling => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn blinking(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                PlatformCall::StartBlink(_) => Some(true),
                PlatformCall::StopBlink => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }
}

impl TimerPort for MockPlatform {
    fn start_sampling(&mut self, period_ms: u32) {
        self.calls.push(PlatformCall::StartSampling(period_ms));
    }

    fn cancel_sampling(&mut self) {
        self.calls.push(PlatformCall::CancelSampling);
    }
}

impl IndicatorPort for MockPlatform {
    fn start_blink(&mut self, toggle_ms: u32) {
        self.calls.push(PlatformCall::StartBlink(toggle_ms));
    }

    fn stop_blink(&mut self) {
        self.calls.push(PlatformCall::StopBlink);
    }
}

// ── MockNvs ───────────────────────────────────────────────────

/// In-memory ConfigPort for integration tests.
#[derive(Default)]
pub struct MockNvs {
    pub store: RefCell<HashMap<&'static str, SystemConfig>>,
    pub fail_saves: bool,
}

#[allow(dead_code)]
impl MockNvs {
    pub fn saved(&self) -> Option<SystemConfig> {
        self.store.borrow().get("syscfg").cloned()
    }
}

impl ConfigPort for MockNvs {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        self.saved().ok_or(ConfigError::NotFound)
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        if self.fail_saves {
            return Err(ConfigError::IoError);
        }
        config.validate()?;
        self.store.borrow_mut().insert("syscfg", config.clone());
        Ok(())
    }
}
