//! Integration tests for the SamplingController connection lifecycle,
//! interval closing and interval configuration.

use crate::mock_hw::{MockNvs, MockPlatform, PlatformCall, RecordingSink, ScriptedSensor};

use pmsense::app::service::{ControllerState, SamplingController};
use pmsense::config::SystemConfig;
use pmsense::error::{BusError, Error, SensorError};

use embedded_hal::i2c::ErrorKind;

fn controller_with_interval(interval: u8) -> SamplingController {
    SamplingController::new(SystemConfig {
        interval_ticks: interval,
        ..SystemConfig::default()
    })
}

fn bus_error() -> Result<pmsense::sensors::ChannelSample, SensorError> {
    Err(SensorError::Bus(BusError::write(ErrorKind::Other)))
}

// ── Connection lifecycle ──────────────────────────────────────

#[test]
fn connect_starts_one_hz_tick_and_holds_led() {
    let mut c = SamplingController::new(SystemConfig::default());
    let mut hw = MockPlatform::default();

    c.on_connect(&mut hw);

    assert_eq!(c.state(), ControllerState::Sampling);
    assert_eq!(
        hw.calls,
        vec![PlatformCall::StopBlink, PlatformCall::StartSampling(1000)]
    );
}

#[test]
fn connect_then_disconnect_publishes_nothing() {
    let mut c = controller_with_interval(10);
    let mut hw = MockPlatform::default();
    let mut sink = RecordingSink::default();
    let mut sensor = ScriptedSensor::new((0..5).map(|_| ScriptedSensor::ok(9, 9)));

    c.on_connect(&mut hw);
    for _ in 0..5 {
        c.on_tick(&mut sensor, &mut sink);
    }
    c.on_disconnect(&mut hw);

    assert!(sink.published.is_empty());
    assert_eq!(c.state(), ControllerState::Idle);
    assert!(!hw.sampling_active());
    assert!(hw.blinking());
    assert_eq!(hw.calls.last(), Some(&PlatformCall::StartBlink(1000)));
}

#[test]
fn zero_tick_session_leaves_aggregator_reset() {
    let mut c = controller_with_interval(10);
    let mut hw = MockPlatform::default();
    let mut sink = RecordingSink::default();
    let mut sensor = ScriptedSensor::new([ScriptedSensor::ok(7, 7), ScriptedSensor::ok(7, 7)]);

    // Leave samples dormant from an earlier session.
    c.on_connect(&mut hw);
    c.on_tick(&mut sensor, &mut sink);
    c.on_tick(&mut sensor, &mut sink);
    c.on_disconnect(&mut hw);
    assert_eq!(c.aggregator().sample_count(), 2);

    c.on_connect(&mut hw);
    c.on_disconnect(&mut hw);

    assert!(c.aggregator().is_empty());
    assert_eq!(c.ticks_in_interval(), 0);
    assert!(sink.published.is_empty());
    assert_eq!(sensor.reads, 2);
    assert_eq!(c.state(), ControllerState::Idle);

    // A tick that raced the disconnect is dropped.
    c.on_tick(&mut sensor, &mut sink);
    assert_eq!(sensor.reads, 2);
    assert!(sink.published.is_empty());
}

#[test]
fn duplicate_connect_and_disconnect_are_noops() {
    let mut c = controller_with_interval(3);
    let mut hw = MockPlatform::default();
    let mut sink = RecordingSink::default();
    let mut sensor = ScriptedSensor::new([ScriptedSensor::ok(4, 4)]);

    c.on_connect(&mut hw);
    c.on_tick(&mut sensor, &mut sink);
    c.on_connect(&mut hw);

    // Second connect must not reset the running interval.
    assert_eq!(c.aggregator().sample_count(), 1);
    assert_eq!(hw.calls.len(), 2);

    c.on_disconnect(&mut hw);
    c.on_disconnect(&mut hw);
    assert_eq!(hw.calls.len(), 4);
}

#[test]
fn ticks_while_idle_never_touch_the_sensor() {
    let mut c = controller_with_interval(1);
    let mut sink = RecordingSink::default();
    let mut sensor = ScriptedSensor::new([ScriptedSensor::ok(1, 1)]);

    c.on_tick(&mut sensor, &mut sink);

    assert_eq!(sensor.reads, 0);
    assert!(sink.published.is_empty());
}

#[test]
fn reconnect_starts_from_a_clean_interval() {
    let mut c = controller_with_interval(2);
    let mut hw = MockPlatform::default();
    let mut sink = RecordingSink::default();
    let mut sensor = ScriptedSensor::new([
        ScriptedSensor::ok(100, 100),
        ScriptedSensor::ok(2, 4),
        ScriptedSensor::ok(4, 6),
    ]);

    c.on_connect(&mut hw);
    c.on_tick(&mut sensor, &mut sink);
    c.on_disconnect(&mut hw);

    c.on_connect(&mut hw);
    assert!(c.aggregator().is_empty());
    assert_eq!(c.ticks_in_interval(), 0);
    c.on_tick(&mut sensor, &mut sink);
    c.on_tick(&mut sensor, &mut sink);

    assert_eq!(sink.published, vec![(3, 5)]);
}

// ── Interval closing ──────────────────────────────────────────

#[test]
fn three_tick_interval_publishes_truncated_mean() {
    let mut c = controller_with_interval(3);
    let mut hw = MockPlatform::default();
    let mut sink = RecordingSink::default();
    let mut sensor = ScriptedSensor::new([
        ScriptedSensor::ok(2, 1),
        ScriptedSensor::ok(4, 3),
        ScriptedSensor::ok(3, 2),
    ]);

    c.on_connect(&mut hw);
    for _ in 0..3 {
        c.on_tick(&mut sensor, &mut sink);
    }

    assert_eq!(sink.published, vec![(3, 2)]);
    assert_eq!(c.aggregator().sample_count(), 0);
    assert_eq!(c.aggregator().sums(), (0, 0));
}

#[test]
fn interval_of_one_with_bus_error_publishes_zero() {
    let mut c = controller_with_interval(1);
    let mut hw = MockPlatform::default();
    let mut sink = RecordingSink::default();
    let mut sensor = ScriptedSensor::new([bus_error()]);

    c.on_connect(&mut hw);
    c.on_tick(&mut sensor, &mut sink);

    assert_eq!(sink.published, vec![(0, 0)]);
    assert_eq!(c.stats().skipped_ticks, 1);
    assert_eq!(c.stats().empty_intervals, 1);
    assert_eq!(c.state(), ControllerState::Sampling);
}

#[test]
fn failed_ticks_are_excluded_from_the_mean() {
    let mut c = controller_with_interval(4);
    let mut hw = MockPlatform::default();
    let mut sink = RecordingSink::default();
    let mut sensor = ScriptedSensor::new([
        ScriptedSensor::ok(10, 1),
        bus_error(),
        Err(SensorError::NotReady(0x80)),
        ScriptedSensor::ok(20, 3),
    ]);

    c.on_connect(&mut hw);
    for _ in 0..4 {
        c.on_tick(&mut sensor, &mut sink);
    }

    assert_eq!(sink.published, vec![(15, 2)]);
    assert_eq!(c.stats().ticks, 4);
    assert_eq!(c.stats().skipped_ticks, 2);
}

#[test]
fn empty_interval_repeats_previous_average() {
    let mut c = controller_with_interval(2);
    let mut hw = MockPlatform::default();
    let mut sink = RecordingSink::default();
    let mut sensor = ScriptedSensor::new([
        ScriptedSensor::ok(6, 2),
        ScriptedSensor::ok(8, 4),
        bus_error(),
        bus_error(),
    ]);

    c.on_connect(&mut hw);
    for _ in 0..4 {
        c.on_tick(&mut sensor, &mut sink);
    }

    assert_eq!(sink.published, vec![(7, 3), (7, 3)]);
}

#[test]
fn previous_average_is_forgotten_on_reconnect() {
    let mut c = controller_with_interval(1);
    let mut hw = MockPlatform::default();
    let mut sink = RecordingSink::default();
    let mut sensor = ScriptedSensor::new([ScriptedSensor::ok(6, 2), bus_error()]);

    c.on_connect(&mut hw);
    c.on_tick(&mut sensor, &mut sink);
    c.on_disconnect(&mut hw);
    c.on_connect(&mut hw);
    c.on_tick(&mut sensor, &mut sink);

    assert_eq!(sink.published, vec![(6, 2), (0, 0)]);
}

// ── Interval configuration ────────────────────────────────────

#[test]
fn interval_change_applies_from_next_interval() {
    let mut c = controller_with_interval(3);
    let mut hw = MockPlatform::default();
    let mut sink = RecordingSink::default();
    let mut sensor = ScriptedSensor::new((1..=5).map(|v| ScriptedSensor::ok(v, v)));

    c.on_connect(&mut hw);
    c.on_tick(&mut sensor, &mut sink);
    c.on_interval_config_write(2).unwrap();
    assert_eq!(c.interval(), 2);
    assert_eq!(c.active_interval(), 3);

    c.on_tick(&mut sensor, &mut sink);
    assert!(sink.published.is_empty());
    c.on_tick(&mut sensor, &mut sink);
    assert_eq!(sink.published, vec![(2, 2)]);
    assert_eq!(c.active_interval(), 2);

    c.on_tick(&mut sensor, &mut sink);
    c.on_tick(&mut sensor, &mut sink);
    assert_eq!(sink.published, vec![(2, 2), (4, 4)]);
}

#[test]
fn interval_write_while_idle_applies_on_next_connect() {
    let mut c = controller_with_interval(10);
    let mut hw = MockPlatform::default();
    let mut sink = RecordingSink::default();
    let mut sensor = ScriptedSensor::new([ScriptedSensor::ok(5, 7)]);

    c.on_interval_config_write(1).unwrap();
    c.on_connect(&mut hw);
    c.on_tick(&mut sensor, &mut sink);

    assert_eq!(sink.published, vec![(5, 7)]);
}

#[test]
fn zero_interval_write_is_rejected() {
    let mut c = controller_with_interval(5);

    let err = c.on_interval_config_write(0).unwrap_err();

    assert!(matches!(err, Error::Config(_)));
    assert_eq!(c.interval(), 5);
    assert_eq!(c.config().interval_ticks, 5);
}

#[test]
fn accepted_interval_is_persisted_once() {
    let mut c = controller_with_interval(10);
    let nvs = MockNvs::default();

    assert!(!c.save_if_dirty(&nvs));
    c.on_interval_config_write(30).unwrap();
    assert!(c.is_config_dirty());

    assert!(c.save_if_dirty(&nvs));
    assert!(!c.is_config_dirty());
    assert_eq!(nvs.saved().map(|cfg| cfg.interval_ticks), Some(30));
    assert!(!c.save_if_dirty(&nvs));
}

#[test]
fn failed_save_stays_dirty() {
    let mut c = controller_with_interval(10);
    let nvs = MockNvs {
        fail_saves: true,
        ..MockNvs::default()
    };

    c.on_interval_config_write(20).unwrap();
    assert!(!c.save_if_dirty(&nvs));
    assert!(c.is_config_dirty());
}
