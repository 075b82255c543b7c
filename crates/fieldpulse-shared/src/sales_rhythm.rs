//! Achievement rate and Recruitment Rhythm for sales targets.
//!
//! The remaining effort to close the year-end gap is modeled as a linear
//! ramp `1r, 2r, .., nr` over the `n` months left after the as-of month.
//! Its sum `r * n(n+1)/2` covers the gap; `r` is the reported rhythm.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MetricsError, Result};
use crate::model::{MonthlySeries, SalesAssignment};
use crate::status::{StatusLabel, ThresholdSet};
use crate::time_window::TimeWindow;
use crate::visit_activity::rounded_percent;

/// Summed target/achieved slots for one or more sales assignments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesTotals {
    pub monthly_target: MonthlySeries,
    pub monthly_achieved: MonthlySeries,
    pub assignments: u32,
}

impl SalesTotals {
    pub fn from_assignment(assignment: &SalesAssignment) -> Self {
        Self {
            monthly_target: assignment.monthly_target,
            monthly_achieved: assignment.monthly_achieved,
            assignments: 1,
        }
    }

    /// Element-wise sum. Slots that would not fit in a `u64` are `InvalidInput`.
    pub fn merge(&mut self, other: &SalesTotals) -> Result<()> {
        for i in 0..12 {
            self.monthly_target[i] = checked_add(self.monthly_target[i], other.monthly_target[i], "monthly_target")?;
            self.monthly_achieved[i] =
                checked_add(self.monthly_achieved[i], other.monthly_achieved[i], "monthly_achieved")?;
        }
        self.assignments += other.assignments;
        Ok(())
    }
}

fn checked_add(a: u64, b: u64, field: &str) -> Result<u64> {
    a.checked_add(b)
        .ok_or_else(|| MetricsError::invalid(format!("{} total exceeds {}", field, u64::MAX)))
}

fn checked_sum(values: &[u64], field: &str) -> Result<u64> {
    values.iter().try_fold(0u64, |acc, v| checked_add(acc, *v, field))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesRhythm {
    pub as_of_month: u32,
    pub annual_target: u64,
    pub ytd_target: u64,
    pub ytd_achieved: u64,
    pub achievement_rate: u32,
    pub gap: u64,
    pub remaining_months: u32,
    pub triangular_denominator: u64,
    pub recruitment_rhythm: u64,
    pub status: StatusLabel,
}

impl SalesRhythm {
    /// Required amount per remaining month under the linear ramp, as `(month, amount)`.
    pub fn ramp_schedule(&self) -> Vec<(u32, u64)> {
        (1..=self.remaining_months)
            .map(|k| (self.as_of_month + k, (k as u64).saturating_mul(self.recruitment_rhythm)))
            .collect()
    }

    /// Total the ramp delivers; at least `gap`, short of `gap + D`.
    pub fn ramp_total(&self) -> u64 {
        self.recruitment_rhythm.saturating_mul(self.triangular_denominator)
    }
}

pub struct SalesRhythmCalculator {
    thresholds: ThresholdSet,
}

impl SalesRhythmCalculator {
    pub fn new(thresholds: ThresholdSet) -> Self {
        Self { thresholds }
    }

    /// As-of month for an assignment's year: past years are complete, future years are rejected.
    pub fn month_for(assignment: &SalesAssignment, window: &TimeWindow) -> Result<u32> {
        let year = window.current_year();
        if assignment.year < year {
            Ok(12)
        } else if assignment.year == year {
            Ok(window.current_month())
        } else {
            Err(MetricsError::invalid(format!(
                "sales assignment {} is for {}, after as-of year {}",
                assignment.id, assignment.year, year
            )))
        }
    }

    pub fn compute(&self, assignment: &SalesAssignment, month: u32) -> Result<SalesRhythm> {
        let rhythm = self.from_totals(&SalesTotals::from_assignment(assignment), month)?;
        debug!(
            assignment = assignment.id,
            gap = rhythm.gap,
            rhythm = rhythm.recruitment_rhythm,
            "sales rhythm computed"
        );
        Ok(rhythm)
    }

    pub fn from_totals(&self, totals: &SalesTotals, month: u32) -> Result<SalesRhythm> {
        let elapsed = TimeWindow::ytd_months(month)?.count();

        let annual_target = checked_sum(&totals.monthly_target, "monthly_target")?;
        let ytd_target = checked_sum(&totals.monthly_target[..elapsed], "monthly_target")?;
        let ytd_achieved = checked_sum(&totals.monthly_achieved[..elapsed], "monthly_achieved")?;
        let achievement_rate = rounded_percent(ytd_achieved, ytd_target);

        let gap = annual_target.saturating_sub(ytd_achieved);
        let remaining_months = 12 - month;
        let n = remaining_months as u64;
        let triangular_denominator = n * (n + 1) / 2;
        let recruitment_rhythm = if n == 0 || triangular_denominator == 0 || gap == 0 {
            0
        } else {
            gap.div_ceil(triangular_denominator)
        };

        Ok(SalesRhythm {
            as_of_month: month,
            annual_target,
            ytd_target,
            ytd_achieved,
            achievement_rate,
            gap,
            remaining_months,
            triangular_denominator,
            recruitment_rhythm,
            status: self.thresholds.classify(achievement_rate),
        })
    }
}
