//! Integration tests for saving and restoring tracker state through the
//! storage port.

use super::mock_ports::{MockObservations, MockStorage};

use pelletgauge::estimator::{PowerLevel, Timestamp};
use pelletgauge::persistence::{STATE_NAMESPACE, state_key};
use pelletgauge::{TrackerConfig, TrackerService};

const HOUR_MS: i64 = 3_600_000;

fn t0() -> Timestamp {
    Timestamp::from_secs(1_700_000_000)
}

fn start(config: TrackerConfig, storage: &MockStorage) -> TrackerService {
    let mut svc = TrackerService::new(config).unwrap();
    svc.initialize(t0(), storage).unwrap();
    svc
}

/// Burn 2 h at level 5, calibrate against a scale reading, burn 1 h more.
fn used_service(storage: &MockStorage) -> TrackerService {
    let mut svc = start(TrackerConfig::default(), storage);
    let mut obs = MockObservations::burning("5");
    svc.update(t0().offset_millis(2 * HOUR_MS), &mut obs).unwrap();
    svc.set_level(11_000.0, true).unwrap();
    svc.update(t0().offset_millis(3 * HOUR_MS), &mut obs).unwrap();
    svc
}

#[test]
fn restart_restores_level_session_and_factors() {
    let mut storage = MockStorage::new();
    let mut before = used_service(&storage);
    assert!(before.save_if_dirty(&mut storage));

    let after = start(TrackerConfig::default(), &storage);
    assert_eq!(after.state().current_level_g(), before.state().current_level_g());
    assert_eq!(after.state().session_consumed_g(), before.state().session_consumed_g());
    assert_eq!(after.state().corrections(), before.state().corrections());
    assert!(after.state().corrections().get(&PowerLevel::Numeric(5)) > 1.0);
    assert!(!after.is_persist_pending());
}

#[test]
fn restart_with_new_rate_config_keeps_learned_factors() {
    let mut storage = MockStorage::new();
    let mut before = used_service(&storage);
    before.save_if_dirty(&mut storage);

    let mut config = TrackerConfig::default();
    config.max_rate_kg_per_hour = 3.0;
    let after = start(config, &storage);

    assert_eq!(after.state().rates().get(&PowerLevel::Numeric(5)), Some(3_000.0));
    assert_eq!(after.state().corrections(), before.state().corrections());
}

#[test]
fn instances_do_not_share_state() {
    let mut storage = MockStorage::new();
    let mut first = used_service(&storage);
    first.save_if_dirty(&mut storage);

    let mut config = TrackerConfig::default();
    config.instance_id = "garage".into();
    let other = start(config, &storage);
    assert_eq!(other.state().current_level_g(), 15_000.0);
    assert!(other.state().corrections().is_empty());
}

#[test]
fn failed_write_stays_pending_until_it_succeeds() {
    let mut storage = MockStorage::new();
    let mut svc = used_service(&storage);

    storage.fail_writes = true;
    assert!(!svc.save_if_dirty(&mut storage));
    assert!(svc.is_persist_pending());

    storage.fail_writes = false;
    assert!(svc.save_if_dirty(&mut storage));
    assert!(!svc.is_persist_pending());
    assert_eq!(storage.writes, 1);
}

#[test]
fn corrupt_blob_starts_fresh() {
    let mut storage = MockStorage::new();
    storage.poke(STATE_NAMESPACE, &state_key("default"), &[0xde, 0xad, 0xbe, 0xef]);

    let svc = start(TrackerConfig::default(), &storage);
    assert_eq!(svc.state().current_level_g(), 15_000.0);
    assert_eq!(svc.state().session_consumed_g(), 0.0);
}

#[test]
fn restored_level_is_clamped_to_smaller_tank() {
    let mut storage = MockStorage::new();
    let mut svc = start(TrackerConfig::default(), &storage);
    svc.set_level(14_000.0, false).unwrap();
    svc.save_if_dirty(&mut storage);

    let mut config = TrackerConfig::default();
    config.tank_size_kg = 10.0;
    let smaller = start(config, &storage);
    assert_eq!(smaller.state().current_level_g(), 10_000.0);
    assert_eq!(smaller.snapshot().level_percent, 100);
}
