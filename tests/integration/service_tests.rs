//! Integration tests for the TrackerService → estimator → listeners pipeline.
//!
//! Every scenario drives the public service API with explicit timestamps
//! and asserts on both the resulting state and the emitted events.

use super::mock_ports::{MockObservations, MockStorage, RecordingSink};

use pelletgauge::app::commands::TrackerCommand;
use pelletgauge::app::events::TrackerEvent;
use pelletgauge::estimator::{CalibrationSkip, IntegrationOutcome, PowerLevel, Timestamp};
use pelletgauge::{Error, Lifecycle, TrackerConfig, TrackerService};

const HOUR_MS: i64 = 3_600_000;

fn t0() -> Timestamp {
    Timestamp::from_secs(1_700_000_000)
}

fn hours(h: f64) -> Timestamp {
    t0().offset_millis((h * HOUR_MS as f64) as i64)
}

fn make_service() -> (TrackerService, RecordingSink) {
    let mut svc = TrackerService::new(TrackerConfig::default()).unwrap();
    let sink = RecordingSink::new();
    svc.add_listener(sink.clone()).unwrap();
    svc.initialize(t0(), &MockStorage::new()).unwrap();
    (svc, sink)
}

/// Burn at `power` with one update per hour for `count` hours, starting
/// at hour `from`.
fn burn_hourly(svc: &mut TrackerService, power: &str, from: u32, count: u32) {
    let mut obs = MockObservations::burning(power);
    for h in from + 1..=from + count {
        svc.update(hours(f64::from(h)), &mut obs).unwrap();
    }
}

fn factor(svc: &TrackerService, level: i64) -> f64 {
    svc.state().corrections().get(&PowerLevel::Numeric(level))
}

// ── Integration ───────────────────────────────────────────────

#[test]
fn half_hour_at_level_three_burns_540_grams() {
    let (mut svc, sink) = make_service();
    let outcome = svc
        .update(hours(0.5), &mut MockObservations::burning("3"))
        .unwrap();

    assert_eq!(outcome.consumed_g(), 540.0);
    assert_eq!(svc.state().current_level_g(), 14_460.0);
    assert_eq!(svc.snapshot().remaining_kg, 14.46);
    assert_eq!(sink.kinds(), vec!["started", "state_changed"]);
}

#[test]
fn idle_and_missing_updates_emit_nothing() {
    let (mut svc, sink) = make_service();
    sink.clear();

    svc.update(hours(1.0), &mut MockObservations::off()).unwrap();
    let missing = svc
        .update(hours(2.0), &mut MockObservations::unavailable())
        .unwrap();

    assert_eq!(missing, IntegrationOutcome::MissingObservation);
    assert!(sink.events().is_empty());
    assert_eq!(svc.state().current_level_g(), 15_000.0);
}

#[test]
fn missing_observation_still_advances_the_watermark() {
    let (mut svc, _) = make_service();
    svc.update(hours(1.0), &mut MockObservations::unavailable())
        .unwrap();
    let outcome = svc
        .update(hours(2.0), &mut MockObservations::burning("5"))
        .unwrap();

    // Only the second hour counts.
    assert_eq!(outcome.consumed_g(), 1_800.0);
}

#[test]
fn unknown_power_level_burns_at_fallback_rate() {
    let (mut svc, _) = make_service();
    let outcome = svc
        .update(hours(1.0), &mut MockObservations::burning("turbo"))
        .unwrap();

    assert_eq!(
        outcome,
        IntegrationOutcome::Burned {
            level: PowerLevel::Named("turbo".into()),
            grams: 360.0,
            used_fallback_rate: true,
        }
    );
    assert_eq!(
        svc.state().session_consumed_by_level()[&PowerLevel::Named("turbo".into())],
        360.0
    );
}

#[test]
fn clock_going_backwards_consumes_nothing() {
    let (mut svc, _) = make_service();
    burn_hourly(&mut svc, "5", 0, 1);
    let level = svc.state().current_level_g();

    let outcome = svc
        .update(hours(0.5), &mut MockObservations::burning("5"))
        .unwrap();
    assert_eq!(outcome, IntegrationOutcome::NoElapsedTime);
    assert_eq!(svc.state().current_level_g(), level);
    assert_eq!(svc.state().last_update(), hours(0.5));
}

#[test]
fn empty_tank_clamps_at_zero_while_session_keeps_counting() {
    let (mut svc, _) = make_service();
    burn_hourly(&mut svc, "5", 0, 10);

    assert_eq!(svc.state().current_level_g(), 0.0);
    assert_eq!(svc.state().session_consumed_g(), 18_000.0);
    assert_eq!(svc.snapshot().level_percent, 0);
}

// ── Refill ────────────────────────────────────────────────────

#[test]
fn refill_near_empty_calibrates_and_refills() {
    let (mut svc, sink) = make_service();
    burn_hourly(&mut svc, "5", 0, 8); // 14.4 kg estimated, 0.6 kg left
    sink.clear();

    let outcome = svc.refill(hours(8.0)).unwrap();
    let report = outcome.calibration.unwrap();

    assert_eq!(outcome.previous_level_g, 600.0);
    assert_eq!(report.estimated_g, 14_400.0);
    assert_eq!(report.actual_g, 15_000.0);
    // 1 + 0.15 * (15000 / 14400 - 1)
    assert!((factor(&svc, 5) - 1.00625).abs() < 1e-9);

    assert_eq!(svc.state().current_level_g(), 15_000.0);
    assert_eq!(svc.state().session_consumed_g(), 0.0);
    assert!(svc.state().session_consumed_by_level().is_empty());
    assert_eq!(sink.kinds(), vec!["calibrated", "refilled", "state_changed"]);
}

#[test]
fn refill_clamps_extreme_error_ratio() {
    let (mut svc, _) = make_service();
    svc.set_level(1_000.0, false).unwrap();
    burn_hourly(&mut svc, "5", 0, 2); // 3.6 kg estimated, tank runs dry

    let report = svc.refill(hours(2.0)).unwrap().calibration.unwrap();
    assert!(report.raw_ratio > 4.0);
    assert_eq!(report.error_ratio, 2.0);
    assert!((factor(&svc, 5) - 1.15).abs() < 1e-9);
}

#[test]
fn top_off_refill_does_not_calibrate() {
    let (mut svc, sink) = make_service();
    burn_hourly(&mut svc, "5", 0, 2);
    sink.clear();

    let outcome = svc.refill(hours(2.0)).unwrap();
    assert_eq!(outcome.calibration, Err(CalibrationSkip::AboveRefillThreshold));
    assert_eq!(factor(&svc, 5), 1.0);
    assert_eq!(svc.state().current_level_g(), 15_000.0);
    assert_eq!(sink.kinds(), vec!["refilled", "state_changed"]);
}

#[test]
fn refill_resets_watermark() {
    let (mut svc, _) = make_service();
    svc.refill(hours(3.0)).unwrap();
    let outcome = svc
        .update(hours(4.0), &mut MockObservations::burning("1"))
        .unwrap();
    assert_eq!(outcome.consumed_g(), 360.0);
}

// ── Manual level ──────────────────────────────────────────────

#[test]
fn calibrating_set_level_uses_implied_consumption() {
    let (mut svc, sink) = make_service();
    burn_hourly(&mut svc, "3", 0, 2); // 2160 g estimated, 12840 g left
    sink.clear();

    let outcome = svc.set_level(12_000.0, true).unwrap();
    let report = outcome.calibration.unwrap();
    assert_eq!(report.actual_g, 3_000.0);
    // 1 + 0.15 * (3000 / 2160 - 1)
    assert!((factor(&svc, 3) - (1.0 + 0.15 * (3_000.0 / 2_160.0 - 1.0))).abs() < 1e-12);
    assert_eq!(svc.state().current_level_g(), 12_000.0);
    assert_eq!(svc.state().session_consumed_g(), 0.0);
    assert_eq!(sink.kinds(), vec!["calibrated", "level_set", "state_changed"]);
}

#[test]
fn plain_set_level_twice_leaves_factors_untouched() {
    let (mut svc, _) = make_service();
    burn_hourly(&mut svc, "4", 0, 3);

    svc.set_level(9_000.0, false).unwrap();
    svc.set_level(8_000.0, false).unwrap();

    assert!(svc.state().corrections().is_empty());
    assert_eq!(svc.state().current_level_g(), 8_000.0);
}

#[test]
fn set_level_above_estimate_skips_calibration() {
    let (mut svc, _) = make_service();
    burn_hourly(&mut svc, "2", 0, 1); // 720 g estimated

    let outcome = svc.set_level(15_000.0, true).unwrap();
    assert_eq!(
        outcome.calibration,
        Err(CalibrationSkip::NonPositiveImpliedConsumption)
    );
    assert_eq!(svc.state().current_level_g(), 15_000.0);
    assert_eq!(svc.state().session_consumed_g(), 0.0);
}

#[test]
fn set_level_is_clamped_to_the_tank() {
    let (mut svc, _) = make_service();
    assert_eq!(svc.set_level(40_000.0, false).unwrap().new_level_g, 15_000.0);
    assert_eq!(svc.set_level(-5.0, false).unwrap().new_level_g, 0.0);
}

#[test]
fn commands_dispatch_to_operations() {
    let (mut svc, _) = make_service();
    let mut obs = MockObservations::burning("5");

    svc.handle_command(TrackerCommand::Update, hours(1.0), &mut obs)
        .unwrap();
    assert_eq!(svc.state().current_level_g(), 13_200.0);

    svc.handle_command(TrackerCommand::set_level_kg(10.0, false), hours(1.0), &mut obs)
        .unwrap();
    assert_eq!(svc.state().current_level_g(), 10_000.0);

    svc.handle_command(TrackerCommand::Refill, hours(1.0), &mut obs)
        .unwrap();
    assert_eq!(svc.state().current_level_g(), 15_000.0);
}

// ── Listeners & lifecycle ─────────────────────────────────────

#[test]
fn removed_listener_receives_nothing_further() {
    let (mut svc, first) = make_service();
    let second = RecordingSink::new();
    let handle = svc.add_listener(second.clone()).unwrap();

    assert!(svc.remove_listener(handle));
    burn_hourly(&mut svc, "1", 0, 1);

    assert!(second.events().is_empty());
    assert_eq!(first.kinds(), vec!["started", "state_changed"]);
}

#[test]
fn close_notifies_then_detaches() {
    let (mut svc, sink) = make_service();
    svc.close();

    assert_eq!(sink.kinds().last(), Some(&"closed"));
    assert_eq!(svc.lifecycle(), Lifecycle::Closed);
    assert_eq!(
        svc.update(hours(1.0), &mut MockObservations::burning("1"))
            .unwrap_err(),
        Error::Lifecycle(Lifecycle::Closed)
    );
}

#[test]
fn state_changed_carries_a_fresh_snapshot() {
    let (mut svc, sink) = make_service();
    burn_hourly(&mut svc, "4", 0, 1);

    let Some(TrackerEvent::StateChanged(snapshot)) = sink.events().pop() else {
        panic!("expected a StateChanged event");
    };
    assert_eq!(snapshot.remaining_kg, 13.56);
    assert_eq!(snapshot.level_percent, 90);
}
