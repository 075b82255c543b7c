//! Field-sales performance metrics and hierarchical rollup.
//!
//! Turns raw visit events and monthly sales sheets into Return Index,
//! Recruitment Rhythm and status labels, per assignment and pooled up the
//! Delegate → Supervisor → Sales Director hierarchy.

pub mod cache;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod hierarchy;
pub mod model;
pub mod policy;
pub mod recorder;
pub mod rollup;
pub mod sales_rhythm;
pub mod status;
pub mod time_window;
pub mod visit_activity;

pub use dataset::Dataset;
pub use engine::PerformanceEngine;
pub use error::{MetricsError, Result};
pub use hierarchy::{Hierarchy, HierarchyNode};
pub use model::{
    AssignmentId, Delegate, DelegateId, Doctor, DoctorId, MonthlyFrequency, Product, ProductId,
    Role, SalesAssignment, VisitAssignment, VisitEvent,
};
pub use policy::{ElapsedMonthPolicy, MetricsPolicy};
pub use recorder::{MemoryVisitStore, VisitRecorder, VisitStore};
pub use rollup::{AttentionItem, DelegateRollup, HierarchyAggregator, NodeRollup};
pub use sales_rhythm::{SalesRhythm, SalesRhythmCalculator, SalesTotals};
pub use status::{RecentVisits, StatusLabel, StatusPolicy, ThresholdSet};
pub use time_window::{AsOf, Clock, FixedClock, SystemClock, TimeWindow};
pub use visit_activity::{VisitActivity, VisitActivityCalculator, VisitTotals};
