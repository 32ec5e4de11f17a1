use vmarena_arena::{Arena, SystemBackend, HEADER_SIZE};
use vmarena_core::{kib, ArenaError};
use vmarena_test_utils::{growth_scenario_config, tiny_config, FaultyBackend, INJECTED_OS_CODE};

#[test]
fn reservation_failure_leaves_nothing_to_release() {
    let backend = FaultyBackend::new(SystemBackend).failing_reserve();
    let err = Arena::with_backend(tiny_config(), &backend).unwrap_err();
    assert!(matches!(
        err,
        ArenaError::ReservationFailed {
            os_code: Some(INJECTED_OS_CODE),
            ..
        }
    ));
    assert_eq!(backend.reserves(), 0);
    assert_eq!(backend.releases(), 0);
}

#[test]
fn initial_commit_failure_releases_reservation() {
    let backend = FaultyBackend::new(SystemBackend).with_commit_budget(0);
    let err = Arena::with_backend(tiny_config(), &backend).unwrap_err();
    assert_eq!(
        err,
        ArenaError::CommitFailed {
            offset: 0,
            size: kib(64),
            os_code: Some(INJECTED_OS_CODE),
        }
    );
    assert_eq!(backend.reserves(), 1);
    assert_eq!(backend.outstanding(), 0);
}

#[test]
fn push_commit_failure_leaves_arena_unchanged() {
    let backend = FaultyBackend::new(SystemBackend).with_commit_budget(1);
    let arena = Arena::with_backend(growth_scenario_config(), &backend).unwrap();
    arena.push(1000, false).unwrap();
    let pos = arena.pos();
    let commit_pos = arena.commit_pos();

    let err = arena.push(100_000, true).unwrap_err();
    assert_eq!(
        err,
        ArenaError::CommitFailed {
            offset: kib(64),
            size: kib(64),
            os_code: Some(INJECTED_OS_CODE),
        }
    );
    assert_eq!(arena.pos(), pos);
    assert_eq!(arena.commit_pos(), commit_pos);
    assert_eq!(backend.failed_commits(), 1);

    // Requests that fit in the committed prefix still succeed.
    let small = arena.push_bytes(4096).unwrap();
    assert!(small.iter().all(|&b| b == 0));
}

#[test]
fn push_recovers_once_commits_succeed_again() {
    let backend = FaultyBackend::new(SystemBackend).with_commit_budget(1);
    let arena = Arena::with_backend(growth_scenario_config(), &backend).unwrap();
    assert!(arena.push(100_000, false).is_err());

    backend.set_commit_budget(None);
    arena.push(100_000, false).unwrap();
    assert_eq!(arena.commit_pos(), kib(128));
    assert_eq!(backend.commits(), 2);
}

#[test]
fn capacity_failure_never_touches_backend() {
    let backend = FaultyBackend::new(SystemBackend);
    let arena = Arena::with_backend(growth_scenario_config(), &backend).unwrap();
    let commits = backend.commits();
    assert!(matches!(
        arena.push(2_000_000, false),
        Err(ArenaError::CapacityExceeded { .. })
    ));
    assert_eq!(backend.commits(), commits);
    assert_eq!(backend.failed_commits(), 0);
}

#[test]
fn destroy_releases_exactly_once() {
    let backend = FaultyBackend::new(SystemBackend);
    let arena = Arena::with_backend(tiny_config(), &backend).unwrap();
    assert_eq!(backend.outstanding(), 1);
    arena.destroy();
    assert_eq!(backend.releases(), 1);
    assert_eq!(backend.outstanding(), 0);
}

#[test]
fn rewinds_never_decommit() {
    let backend = FaultyBackend::new(SystemBackend);
    let mut arena = Arena::with_backend(growth_scenario_config(), &backend).unwrap();
    arena.push(500_000, false).unwrap();
    arena.pop(1000);
    let mark = arena.checkpoint();
    arena.push(10, false).unwrap();
    arena.restore(mark);
    arena.pop_to(HEADER_SIZE + 8);
    arena.clear();
    assert_eq!(backend.decommits(), 0);
    assert_eq!(arena.pos(), HEADER_SIZE);
}
