//! Visit recording, the one write path.
//!
//! The duplicate-day check, the monthly quota check and the insert must be a
//! single atomic step, so they live behind `VisitStore::insert_visit` rather
//! than being read-then-written here. Stores enforce `(assignment, date)`
//! uniqueness themselves: the SQLite store through a UNIQUE constraint, the
//! in-memory store by holding one lock across check and insert.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use chrono::{Datelike, NaiveDate};
use tracing::{info, warn};

use crate::error::{MetricsError, Result};
use crate::model::{AssignmentId, VisitAssignment, VisitEvent, VisitEventId};
use crate::time_window::TimeWindow;

pub trait VisitStore: Send + Sync {
    fn events_for(&self, assignment_id: AssignmentId) -> Result<Vec<VisitEvent>>;

    /// Seed existing events. Days already present are skipped; returns how many were added.
    fn import(&self, events: &[VisitEvent]) -> Result<usize>;

    /// Atomically reject a second visit on `date` (`DuplicateVisit`), then reject
    /// when `date`'s month already holds `quota` visits (`QuotaExceeded`),
    /// otherwise insert and return the new event.
    fn insert_visit(&self, assignment_id: AssignmentId, date: NaiveDate, quota: u32) -> Result<VisitEvent>;
}

#[derive(Default)]
struct MemoryInner {
    next_id: VisitEventId,
    days: HashMap<AssignmentId, BTreeMap<NaiveDate, VisitEventId>>,
}

/// Single-writer store for tests and embedding.
#[derive(Default)]
pub struct MemoryVisitStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryVisitStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryInner>> {
        self.inner
            .lock()
            .map_err(|_| MetricsError::Storage("visit store lock poisoned".to_string()))
    }
}

impl VisitStore for MemoryVisitStore {
    fn events_for(&self, assignment_id: AssignmentId) -> Result<Vec<VisitEvent>> {
        let inner = self.lock()?;
        Ok(inner
            .days
            .get(&assignment_id)
            .map(|days| {
                days.iter()
                    .map(|(date, id)| VisitEvent {
                        id: *id,
                        assignment_id,
                        date: *date,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn import(&self, events: &[VisitEvent]) -> Result<usize> {
        let mut inner = self.lock()?;
        let mut added = 0;
        for ev in events {
            let days = inner.days.entry(ev.assignment_id).or_default();
            if days.contains_key(&ev.date) {
                continue;
            }
            days.insert(ev.date, ev.id);
            inner.next_id = inner.next_id.max(ev.id);
            added += 1;
        }
        Ok(added)
    }

    fn insert_visit(&self, assignment_id: AssignmentId, date: NaiveDate, quota: u32) -> Result<VisitEvent> {
        let mut inner = self.lock()?;
        let (first, last) = TimeWindow::month_range(date.year(), date.month())?;
        let days = inner.days.entry(assignment_id).or_default();

        if days.contains_key(&date) {
            return Err(MetricsError::DuplicateVisit { assignment_id, date });
        }
        if days.range(first..=last).count() as u32 >= quota {
            return Err(MetricsError::QuotaExceeded {
                assignment_id,
                month: date.month(),
                quota,
            });
        }

        inner.next_id += 1;
        let id = inner.next_id;
        inner.days.entry(assignment_id).or_default().insert(date, id);
        Ok(VisitEvent {
            id,
            assignment_id,
            date,
        })
    }
}

pub struct VisitRecorder<'a> {
    store: &'a dyn VisitStore,
    window: TimeWindow,
}

impl<'a> VisitRecorder<'a> {
    pub fn new(store: &'a dyn VisitStore, window: TimeWindow) -> Self {
        Self { store, window }
    }

    /// Record one visit for an already-resolved assignment, on `date` or today.
    pub fn record_visit(&self, assignment: &VisitAssignment, date: Option<NaiveDate>) -> Result<VisitEvent> {
        let date = date.unwrap_or_else(|| self.window.today());
        if date > self.window.today() {
            return Err(MetricsError::invalid(format!(
                "visit date {} is after today ({})",
                date,
                self.window.today()
            )));
        }

        match self
            .store
            .insert_visit(assignment.id, date, assignment.monthly_frequency.visits())
        {
            Ok(event) => {
                info!(
                    assignment = assignment.id,
                    delegate = assignment.delegate_id,
                    %date,
                    event = event.id,
                    "visit recorded"
                );
                Ok(event)
            }
            Err(e) => {
                warn!(assignment = assignment.id, %date, code = e.code(), "visit rejected: {}", e);
                Err(e)
            }
        }
    }
}
