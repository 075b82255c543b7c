//! Visit recording through the engine: preconditions, quota gate, cache invalidation.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use chrono::NaiveDate;
use fieldpulse_shared::{
    AssignmentId, Dataset, FixedClock, MemoryVisitStore, MetricsError, MetricsPolicy,
    PerformanceEngine, VisitEvent, VisitStore,
};

const TEAM: &str = r#"{
    "doctors": [{"id": 1, "name": "Dr. Haddad"}, {"id": 2, "name": "Dr. Idrissi"}],
    "delegates": [
        {"id": 10, "name": "Supervisor", "role": "supervisor"},
        {"id": 100, "name": "Karim", "supervisor_id": 10},
        {"id": 101, "name": "Layla", "supervisor_id": 10}
    ],
    "visit_assignments": [
        {"id": 1, "delegate_id": 100, "doctor_id": 1, "monthly_frequency": 2},
        {"id": 2, "delegate_id": 101, "doctor_id": 2, "monthly_frequency": 1}
    ],
    "visit_events": [
        {"id": 1, "assignment_id": 1, "date": "2024-01-08"},
        {"id": 2, "assignment_id": 1, "date": "2024-01-22"},
        {"id": 3, "assignment_id": 1, "date": "2024-02-12"}
    ]
}"#;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn engine_on(today: NaiveDate) -> (PerformanceEngine, Arc<MemoryVisitStore>) {
    let store = Arc::new(MemoryVisitStore::new());
    let engine = PerformanceEngine::new(
        Dataset::from_json(TEAM).unwrap(),
        store.clone(),
        Arc::new(FixedClock(today)),
        MetricsPolicy::default(),
    )
    .unwrap();
    (engine, store)
}

#[test]
fn test_dataset_events_are_seeded() {
    let (engine, store) = engine_on(date(2024, 3, 11));
    assert_eq!(store.events_for(1).unwrap().len(), 3);

    let activity = engine.assignment_activity(1).unwrap();
    assert_eq!(activity.monthly_visit_counts, vec![2, 1, 0]);
    assert_eq!(activity.ytd_visits, 3);
    assert_eq!(activity.expected_visits, 6);
    assert_eq!(activity.return_index, 50);
}

#[test]
fn test_record_twice_same_day() {
    let (engine, store) = engine_on(date(2024, 3, 11));

    let event = engine.record_visit(1, 100, None).unwrap();
    assert_eq!(event.date, date(2024, 3, 11));
    assert_eq!(event.assignment_id, 1);

    let err = engine.record_visit(1, 100, None).unwrap_err();
    assert!(matches!(err, MetricsError::DuplicateVisit { assignment_id: 1, .. }));
    assert!(err.is_recoverable());
    assert_eq!(store.events_for(1).unwrap().len(), 4);
}

#[test]
fn test_quota_gate() {
    let (engine, _) = engine_on(date(2024, 3, 11));
    engine.record_visit(1, 100, Some(date(2024, 3, 4))).unwrap();
    assert!(engine.assignment_activity(1).unwrap().can_record_today);

    engine.record_visit(1, 100, Some(date(2024, 3, 5))).unwrap();
    let activity = engine.assignment_activity(1).unwrap();
    assert_eq!(activity.monthly_visit_counts[2], 2);
    assert!(activity.monthly_target_met);
    assert!(!activity.can_record_today);

    let err = engine.record_visit(1, 100, None).unwrap_err();
    assert_eq!(
        err,
        MetricsError::QuotaExceeded {
            assignment_id: 1,
            month: 3,
            quota: 2
        }
    );
}

#[test]
fn test_recording_invalidates_assignment_and_ancestors() {
    let (engine, _) = engine_on(date(2024, 3, 11));

    let before_node = engine.node_rollup(10).unwrap();
    let before_delegate = engine.node_rollup(100).unwrap();
    let before_other = engine.node_rollup(101).unwrap();
    let before_assignment = engine.assignment_activity(1).unwrap();
    assert_eq!(before_node.visits.ytd_visits, 3);
    assert_eq!(engine.cache().cached_nodes(), 3);

    engine.record_visit(1, 100, None).unwrap();
    assert_eq!(engine.cache().cached_nodes(), 1);
    assert_eq!(engine.cache().cached_assignments(), 0);

    let after_node = engine.node_rollup(10).unwrap();
    assert_eq!(after_node.visits.ytd_visits, 4);
    assert_eq!(after_node.visits.visits_today, 1);
    assert!(!Arc::ptr_eq(&before_node, &after_node));
    assert_eq!(engine.node_rollup(100).unwrap().visits.ytd_visits, 4);
    assert_ne!(*before_delegate, *engine.node_rollup(100).unwrap());
    assert_eq!(engine.assignment_activity(1).unwrap().ytd_visits, before_assignment.ytd_visits + 1);

    // Sibling delegate's entry is untouched
    assert!(Arc::ptr_eq(&before_other, &engine.node_rollup(101).unwrap()));
}

/// Pauses the first `events_for` after it has read, until released.
struct GatedStore {
    inner: MemoryVisitStore,
    gate: Mutex<Option<(Sender<()>, Receiver<()>)>>,
}

impl VisitStore for GatedStore {
    fn events_for(&self, assignment_id: AssignmentId) -> fieldpulse_shared::Result<Vec<VisitEvent>> {
        let events = self.inner.events_for(assignment_id)?;
        let gate = self.gate.lock().unwrap().take();
        if let Some((has_read, release)) = gate {
            has_read.send(()).unwrap();
            release.recv().unwrap();
        }
        Ok(events)
    }

    fn import(&self, events: &[VisitEvent]) -> fieldpulse_shared::Result<usize> {
        self.inner.import(events)
    }

    fn insert_visit(
        &self,
        assignment_id: AssignmentId,
        date: NaiveDate,
        quota: u32,
    ) -> fieldpulse_shared::Result<VisitEvent> {
        self.inner.insert_visit(assignment_id, date, quota)
    }
}

fn gated_engine(today: NaiveDate) -> (Arc<PerformanceEngine>, Receiver<()>, Sender<()>) {
    let (has_read_tx, has_read_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let store = Arc::new(GatedStore {
        inner: MemoryVisitStore::new(),
        gate: Mutex::new(Some((has_read_tx, release_rx))),
    });
    let engine = PerformanceEngine::new(
        Dataset::from_json(TEAM).unwrap(),
        store,
        Arc::new(FixedClock(today)),
        MetricsPolicy::default(),
    )
    .unwrap();
    (Arc::new(engine), has_read_rx, release_tx)
}

#[test]
fn test_read_overlapping_a_record_is_not_cached() {
    let (engine, has_read, release) = gated_engine(date(2024, 3, 11));

    let reader = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || engine.assignment_activity(1).unwrap())
    };
    has_read.recv().unwrap();
    engine.record_visit(1, 100, None).unwrap();
    release.send(()).unwrap();

    // The in-flight reader saw the store before the insert
    assert_eq!(reader.join().unwrap().ytd_visits, 3);

    let activity = engine.assignment_activity(1).unwrap();
    assert_eq!(activity.ytd_visits, 4);
    assert_eq!(activity.visits_today, 1);
}

#[test]
fn test_rollup_overlapping_a_record_is_not_cached() {
    let (engine, has_read, release) = gated_engine(date(2024, 3, 11));

    let reader = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || engine.node_rollup(100).unwrap())
    };
    has_read.recv().unwrap();
    engine.record_visit(1, 100, None).unwrap();
    release.send(()).unwrap();
    assert_eq!(reader.join().unwrap().visits.ytd_visits, 3);

    assert_eq!(engine.cache().cached_nodes(), 0);
    let rollup = engine.node_rollup(100).unwrap();
    assert_eq!(rollup.visits.ytd_visits, 4);
    assert_eq!(rollup.visits.visits_today, 1);
}

#[test]
fn test_cached_reads_are_shared() {
    let (engine, _) = engine_on(date(2024, 3, 11));
    let a = engine.node_rollup(10).unwrap();
    let b = engine.node_rollup(10).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn test_other_delegates_assignment_is_not_found() {
    let (engine, store) = engine_on(date(2024, 3, 11));
    let err = engine.record_visit(2, 100, None).unwrap_err();
    assert!(matches!(err, MetricsError::NotFound(_)));
    assert!(store.events_for(2).unwrap().is_empty());
}

#[test]
fn test_unknown_assignment_is_not_found() {
    let (engine, _) = engine_on(date(2024, 3, 11));
    assert!(matches!(engine.record_visit(42, 100, None), Err(MetricsError::NotFound(_))));
    assert!(matches!(engine.assignment_activity(42), Err(MetricsError::NotFound(_))));
}

#[test]
fn test_future_visit_rejected() {
    let (engine, _) = engine_on(date(2024, 3, 11));
    let err = engine.record_visit(1, 100, Some(date(2024, 3, 12))).unwrap_err();
    assert_eq!(err.code(), "invalid_input");
}

#[test]
fn test_concurrent_records_persist_one_event() {
    let (engine, store) = engine_on(date(2024, 3, 11));
    let engine = Arc::new(engine);

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.record_visit(2, 101, None))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(MetricsError::DuplicateVisit { .. })))
            .count(),
        5
    );
    assert_eq!(store.events_for(2).unwrap().len(), 1);
}

#[test]
fn test_engine_rejects_cyclic_hierarchy() {
    let json = TEAM.replace(
        r#"{"id": 10, "name": "Supervisor", "role": "supervisor"}"#,
        r#"{"id": 10, "name": "Supervisor", "role": "supervisor", "supervisor_id": 10}"#,
    );
    let result = PerformanceEngine::new(
        Dataset::from_json(&json).unwrap(),
        Arc::new(MemoryVisitStore::new()),
        Arc::new(FixedClock(date(2024, 3, 11))),
        MetricsPolicy::default(),
    );
    assert!(matches!(result, Err(MetricsError::InvalidInput(_))));
}
