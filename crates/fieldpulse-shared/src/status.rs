//! Three-bucket status classification.
//!
//! Two policies exist and the caller picks one: cut points over a percentage
//! (Return Index or achievement rate), or recency of visits over the last
//! three calendar months.

use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLabel {
    Behind,
    AtRisk,
    OnTrack,
}

impl std::fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Behind => write!(f, "behind"),
            Self::AtRisk => write!(f, "at risk"),
            Self::OnTrack => write!(f, "on track"),
        }
    }
}

/// Cut points for the threshold policy: `>= on_track` is on track,
/// `>= at_risk` is at risk, anything lower is behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdSet {
    pub on_track: u32,
    pub at_risk: u32,
}

impl ThresholdSet {
    /// Cut points used for Return Index displays.
    pub const RETURN_INDEX: ThresholdSet = ThresholdSet {
        on_track: 66,
        at_risk: 33,
    };

    /// Cut points used for sales achievement rates.
    pub const SALES_ACHIEVEMENT: ThresholdSet = ThresholdSet {
        on_track: 80,
        at_risk: 50,
    };

    pub fn validate(&self) -> Result<()> {
        if self.at_risk >= self.on_track {
            return Err(MetricsError::invalid(format!(
                "threshold at_risk ({}) must be below on_track ({})",
                self.at_risk, self.on_track
            )));
        }
        if self.on_track > 1000 {
            return Err(MetricsError::invalid(format!(
                "threshold on_track ({}) above 1000%",
                self.on_track
            )));
        }
        Ok(())
    }

    pub fn classify(&self, index: u32) -> StatusLabel {
        if index >= self.on_track {
            StatusLabel::OnTrack
        } else if index >= self.at_risk {
            StatusLabel::AtRisk
        } else {
            StatusLabel::Behind
        }
    }
}

/// Visit counts for the as-of month and the two before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentVisits {
    pub current: u32,
    pub previous: u32,
    pub second_previous: u32,
}

impl RecentVisits {
    pub fn merge(&mut self, other: &RecentVisits) {
        self.current += other.current;
        self.previous += other.previous;
        self.second_previous += other.second_previous;
    }

    pub fn classify(&self) -> StatusLabel {
        if self.current > 0 || self.previous > 0 {
            StatusLabel::OnTrack
        } else if self.second_previous > 0 {
            StatusLabel::AtRisk
        } else {
            StatusLabel::Behind
        }
    }
}

/// How visit metrics get their status label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusPolicy {
    Threshold(ThresholdSet),
    Recency,
}

impl StatusPolicy {
    pub fn label(&self, index: u32, recent: &RecentVisits) -> StatusLabel {
        match self {
            StatusPolicy::Threshold(set) => set.classify(index),
            StatusPolicy::Recency => recent.classify(),
        }
    }
}
