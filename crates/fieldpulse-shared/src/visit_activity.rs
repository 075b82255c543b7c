//! Visit activity and Return Index for one doctor assignment.
//!
//! A single assignment and a pooled hierarchy node both reduce to
//! `VisitTotals`; the ratio is only ever computed from totals, so a rollup
//! is the same calculation run over summed inputs.

use std::collections::HashSet;

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MetricsError, Result};
use crate::model::{VisitAssignment, VisitEvent};
use crate::policy::MetricsPolicy;
use crate::status::{RecentVisits, StatusLabel};
use crate::time_window::{AsOf, TimeWindow};

/// `round(100 * numerator / denominator)`, halves rounded up; 0 when the denominator is 0.
pub fn rounded_percent(numerator: u64, denominator: u64) -> u32 {
    if denominator == 0 {
        return 0;
    }
    let scaled = (200 * numerator as u128 + denominator as u128) / (2 * denominator as u128);
    u32::try_from(scaled).unwrap_or(u32::MAX)
}

/// Raw counts behind a Return Index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitTotals {
    /// Visits per elapsed month of the as-of year, index 0 = January.
    pub monthly_visit_counts: Vec<u32>,
    /// Sum of monthly frequencies.
    pub monthly_quota: u32,
    pub visits_today: u32,
    /// Assignments that can still take a visit today.
    pub recordable: u32,
    pub recent: RecentVisits,
    pub assignments: u32,
}

impl VisitTotals {
    pub fn empty(as_of: AsOf) -> Self {
        Self {
            monthly_visit_counts: vec![0; as_of.month as usize],
            monthly_quota: 0,
            visits_today: 0,
            recordable: 0,
            recent: RecentVisits::default(),
            assignments: 0,
        }
    }

    /// Bucket one assignment's events into the as-of year. Events dated after
    /// today have not happened yet and are left out of every count.
    pub fn from_events(
        assignment: &VisitAssignment,
        events: &[VisitEvent],
        window: &TimeWindow,
    ) -> Result<Self> {
        let as_of = window.as_of();
        let previous = as_of.previous();
        let second_previous = previous.previous();
        let mut totals = Self::empty(as_of);
        let mut seen = HashSet::with_capacity(events.len());

        for event in events {
            if event.assignment_id != assignment.id {
                return Err(MetricsError::invalid(format!(
                    "visit event {} belongs to assignment {}, not {}",
                    event.id, event.assignment_id, assignment.id
                )));
            }
            if !seen.insert(event.date) {
                return Err(MetricsError::invalid(format!(
                    "assignment {} has more than one visit on {}",
                    assignment.id, event.date
                )));
            }

            if event.date > window.today() {
                continue;
            }

            if event.date.year() == as_of.year && event.date.month() <= as_of.month {
                totals.monthly_visit_counts[event.date.month() as usize - 1] += 1;
            }
            if event.date == window.today() {
                totals.visits_today += 1;
            }
            if as_of.contains(event.date) {
                totals.recent.current += 1;
            } else if previous.contains(event.date) {
                totals.recent.previous += 1;
            } else if second_previous.contains(event.date) {
                totals.recent.second_previous += 1;
            }
        }

        let quota = assignment.monthly_frequency.visits();
        totals.monthly_quota = quota;
        totals.assignments = 1;
        if totals.visits_today == 0 && totals.current_month_count() < quota {
            totals.recordable = 1;
        }
        Ok(totals)
    }

    pub fn current_month_count(&self) -> u32 {
        self.monthly_visit_counts.last().copied().unwrap_or(0)
    }

    /// Element-wise sum. Both sides must share the same as-of month.
    pub fn merge(&mut self, other: &VisitTotals) -> Result<()> {
        if self.monthly_visit_counts.len() != other.monthly_visit_counts.len() {
            return Err(MetricsError::invalid(format!(
                "cannot pool visit counts over {} and {} months",
                self.monthly_visit_counts.len(),
                other.monthly_visit_counts.len()
            )));
        }
        for (mine, theirs) in self
            .monthly_visit_counts
            .iter_mut()
            .zip(&other.monthly_visit_counts)
        {
            *mine += theirs;
        }
        self.monthly_quota += other.monthly_quota;
        self.visits_today += other.visits_today;
        self.recordable += other.recordable;
        self.recent.merge(&other.recent);
        self.assignments += other.assignments;
        Ok(())
    }
}

/// Presentation-ready visit metrics for an assignment or a pooled node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitActivity {
    pub as_of: AsOf,
    pub monthly_visit_counts: Vec<u32>,
    pub visits_today: u32,
    pub ytd_visits: u32,
    pub expected_visits: u32,
    pub return_index: u32,
    pub can_record_today: bool,
    pub monthly_target_met: bool,
    pub status: StatusLabel,
    pub recent: RecentVisits,
}

pub struct VisitActivityCalculator {
    window: TimeWindow,
    policy: MetricsPolicy,
}

impl VisitActivityCalculator {
    pub fn new(window: TimeWindow, policy: MetricsPolicy) -> Self {
        Self { window, policy }
    }

    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    pub fn compute(&self, assignment: &VisitAssignment, events: &[VisitEvent]) -> Result<VisitActivity> {
        let totals = VisitTotals::from_events(assignment, events, &self.window)?;
        let activity = self.from_totals(&totals);
        debug!(
            assignment = assignment.id,
            ytd = activity.ytd_visits,
            expected = activity.expected_visits,
            index = activity.return_index,
            "visit activity computed"
        );
        Ok(activity)
    }

    pub fn from_totals(&self, totals: &VisitTotals) -> VisitActivity {
        let as_of = self.window.as_of();
        let ytd_visits: u32 = totals.monthly_visit_counts.iter().sum();
        let expected_visits =
            totals.monthly_quota * self.policy.elapsed_months.elapsed_months(as_of.month);
        let return_index = rounded_percent(ytd_visits as u64, expected_visits as u64);
        let current = totals.current_month_count();

        VisitActivity {
            as_of,
            monthly_visit_counts: totals.monthly_visit_counts.clone(),
            visits_today: totals.visits_today,
            ytd_visits,
            expected_visits,
            return_index,
            can_record_today: totals.recordable > 0,
            monthly_target_met: totals.monthly_quota > 0 && current >= totals.monthly_quota,
            status: self.policy.visit_status.label(return_index, &totals.recent),
            recent: totals.recent,
        }
    }
}
