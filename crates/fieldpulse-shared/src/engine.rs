//! Engine facade: validated inputs, cached reads, and the record command.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::cache::MetricsCache;
use crate::dataset::Dataset;
use crate::error::{MetricsError, Result};
use crate::hierarchy::Hierarchy;
use crate::model::{AssignmentId, DelegateId, VisitAssignment, VisitEvent};
use crate::policy::MetricsPolicy;
use crate::recorder::{VisitRecorder, VisitStore};
use crate::rollup::{AttentionItem, HierarchyAggregator, NodeRollup};
use crate::sales_rhythm::{SalesRhythm, SalesRhythmCalculator};
use crate::time_window::{Clock, TimeWindow};
use crate::visit_activity::{VisitActivity, VisitActivityCalculator};

pub struct PerformanceEngine {
    dataset: Dataset,
    hierarchy: Hierarchy,
    store: Arc<dyn VisitStore>,
    clock: Arc<dyn Clock>,
    policy: MetricsPolicy,
    cache: MetricsCache,
}

impl PerformanceEngine {
    /// Validate everything up front and seed the store with the dataset's events.
    pub fn new(
        dataset: Dataset,
        store: Arc<dyn VisitStore>,
        clock: Arc<dyn Clock>,
        policy: MetricsPolicy,
    ) -> Result<Self> {
        policy.validate()?;
        dataset.validate()?;
        let hierarchy = Hierarchy::build(&dataset.delegates)?;
        let seeded = store.import(&dataset.visit_events)?;
        info!(
            delegates = hierarchy.len(),
            visit_assignments = dataset.visit_assignments.len(),
            sales_assignments = dataset.sales_assignments.len(),
            seeded,
            "engine ready"
        );

        Ok(Self {
            dataset,
            hierarchy,
            store,
            clock,
            policy,
            cache: MetricsCache::new(),
        })
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow::from_clock(self.clock.as_ref())
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn policy(&self) -> &MetricsPolicy {
        &self.policy
    }

    pub fn cache(&self) -> &MetricsCache {
        &self.cache
    }

    fn aggregator(&self, window: TimeWindow) -> HierarchyAggregator<'_> {
        HierarchyAggregator::new(
            &self.hierarchy,
            &self.dataset,
            self.store.as_ref(),
            window,
            self.policy,
        )
    }

    pub fn assignment_activity(&self, id: AssignmentId) -> Result<Arc<VisitActivity>> {
        let window = self.window();
        if let Some(hit) = self.cache.assignment(id, window.today()) {
            debug!(assignment = id, "assignment cache hit");
            return Ok(hit);
        }
        let generation = self.cache.generation();
        let assignment = self.dataset.visit_assignment(id)?;
        let events = self.store.events_for(id)?;
        let activity = Arc::new(VisitActivityCalculator::new(window, self.policy).compute(assignment, &events)?);
        self.cache
            .put_assignment(id, window.today(), generation, Arc::clone(&activity));
        Ok(activity)
    }

    pub fn sales_rhythm(&self, id: AssignmentId) -> Result<SalesRhythm> {
        let assignment = self.dataset.sales_assignment(id)?;
        let month = SalesRhythmCalculator::month_for(assignment, &self.window())?;
        SalesRhythmCalculator::new(self.policy.sales_thresholds).compute(assignment, month)
    }

    pub fn node_rollup(&self, id: DelegateId) -> Result<Arc<NodeRollup>> {
        let window = self.window();
        if let Some(hit) = self.cache.node(id, window.today()) {
            debug!(node = id, "rollup cache hit");
            return Ok(hit);
        }
        let generation = self.cache.generation();
        let rollup = Arc::new(self.aggregator(window).rollup(id)?);
        self.cache
            .put_node(id, window.today(), generation, Arc::clone(&rollup));
        Ok(rollup)
    }

    pub fn needs_attention(&self, id: DelegateId) -> Result<Vec<AttentionItem>> {
        self.aggregator(self.window()).needs_attention(id)
    }

    /// Resolve an assignment on behalf of the acting delegate. Someone else's
    /// assignment is reported as not found.
    pub fn resolve_assignment(&self, id: AssignmentId, acting: DelegateId) -> Result<&VisitAssignment> {
        let assignment = self.dataset.visit_assignment(id)?;
        if assignment.delegate_id != acting {
            return Err(MetricsError::not_found(format!(
                "visit assignment {} for delegate {}",
                id, acting
            )));
        }
        Ok(assignment)
    }

    pub fn record_visit(
        &self,
        id: AssignmentId,
        acting: DelegateId,
        date: Option<NaiveDate>,
    ) -> Result<VisitEvent> {
        let assignment = self.resolve_assignment(id, acting)?;
        let event = VisitRecorder::new(self.store.as_ref(), self.window()).record_visit(assignment, date)?;

        let mut stale = vec![assignment.delegate_id];
        stale.extend(self.hierarchy.ancestors(assignment.delegate_id)?);
        self.cache.invalidate(id, &stale);
        Ok(event)
    }
}
