//! Explicit policy knobs for metric computation.
//!
//! The surrounding product disagrees on whether the current month counts
//! toward expected visits and on which status cut points apply, so both are
//! parameters here rather than constants.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::status::{StatusPolicy, ThresholdSet};

/// Whether the as-of month counts toward `expected_visits`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ElapsedMonthPolicy {
    #[default]
    IncludeCurrent,
    ExcludeCurrent,
}

impl ElapsedMonthPolicy {
    pub fn elapsed_months(self, month: u32) -> u32 {
        match self {
            ElapsedMonthPolicy::IncludeCurrent => month,
            ElapsedMonthPolicy::ExcludeCurrent => month.saturating_sub(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsPolicy {
    pub elapsed_months: ElapsedMonthPolicy,
    pub visit_status: StatusPolicy,
    pub sales_thresholds: ThresholdSet,
}

impl Default for MetricsPolicy {
    fn default() -> Self {
        Self {
            elapsed_months: ElapsedMonthPolicy::IncludeCurrent,
            visit_status: StatusPolicy::Threshold(ThresholdSet::RETURN_INDEX),
            sales_thresholds: ThresholdSet::SALES_ACHIEVEMENT,
        }
    }
}

impl MetricsPolicy {
    pub fn validate(&self) -> Result<()> {
        if let StatusPolicy::Threshold(set) = &self.visit_status {
            set.validate()?;
        }
        self.sales_thresholds.validate()
    }

    /// Same policy with the recency classifier for visit status.
    pub fn with_recency(self) -> Self {
        Self {
            visit_status: StatusPolicy::Recency,
            ..self
        }
    }
}
