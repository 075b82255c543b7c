//! Hierarchy-aware aggregation.
//!
//! Team and organization figures are computed by pooling raw counts and
//! targets across every assignment under a node and running the same
//! calculators once over the sums. Per-assignment ratios are never averaged.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::Dataset;
use crate::error::Result;
use crate::hierarchy::Hierarchy;
use crate::model::{
    AssignmentId, DelegateId, Doctor, DoctorId, ProductId, Role, SalesAssignment, VisitAssignment,
};
use crate::policy::MetricsPolicy;
use crate::recorder::VisitStore;
use crate::sales_rhythm::{SalesRhythm, SalesRhythmCalculator, SalesTotals};
use crate::status::{RecentVisits, StatusLabel};
use crate::time_window::TimeWindow;
use crate::visit_activity::{VisitActivity, VisitActivityCalculator, VisitTotals};

/// One node's own assignments, pooled. Used for drill-down beneath a rollup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateRollup {
    pub delegate_id: DelegateId,
    pub name: String,
    pub role: Role,
    pub visit_assignments: u32,
    pub sales_assignments: u32,
    pub visits: VisitActivity,
    pub sales: SalesRhythm,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRollup {
    pub node_id: DelegateId,
    pub name: String,
    pub role: Role,
    /// Nodes in the subtree, the root included.
    pub nodes: u32,
    pub visit_assignments: u32,
    pub sales_assignments: u32,
    pub visits: VisitActivity,
    pub sales: SalesRhythm,
    pub by_product: BTreeMap<ProductId, SalesRhythm>,
    pub members: Vec<DelegateRollup>,
}

/// An assignment whose recent visit pattern is not on track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttentionItem {
    pub assignment_id: AssignmentId,
    pub delegate_id: DelegateId,
    pub doctor_id: DoctorId,
    pub doctor_name: String,
    pub recent: RecentVisits,
    pub status: StatusLabel,
}

struct PooledTotals {
    visits: VisitTotals,
    sales: SalesTotals,
    by_product: BTreeMap<ProductId, SalesTotals>,
}

pub struct HierarchyAggregator<'a> {
    hierarchy: &'a Hierarchy,
    doctors: HashMap<DoctorId, &'a Doctor>,
    store: &'a dyn VisitStore,
    window: TimeWindow,
    visit_calc: VisitActivityCalculator,
    sales_calc: SalesRhythmCalculator,
    visits_by_delegate: HashMap<DelegateId, Vec<&'a VisitAssignment>>,
    sales_by_delegate: HashMap<DelegateId, Vec<&'a SalesAssignment>>,
}

impl<'a> HierarchyAggregator<'a> {
    pub fn new(
        hierarchy: &'a Hierarchy,
        dataset: &'a Dataset,
        store: &'a dyn VisitStore,
        window: TimeWindow,
        policy: MetricsPolicy,
    ) -> Self {
        let mut visits_by_delegate: HashMap<_, Vec<_>> = HashMap::new();
        for va in &dataset.visit_assignments {
            visits_by_delegate.entry(va.delegate_id).or_default().push(va);
        }
        // Sales sheets from other years do not belong in an as-of rollup.
        let mut sales_by_delegate: HashMap<_, Vec<_>> = HashMap::new();
        for sa in dataset
            .sales_assignments
            .iter()
            .filter(|sa| sa.year == window.current_year())
        {
            sales_by_delegate.entry(sa.delegate_id).or_default().push(sa);
        }

        let doctors = dataset.doctors.iter().map(|d| (d.id, d)).collect();

        Self {
            hierarchy,
            doctors,
            store,
            window,
            visit_calc: VisitActivityCalculator::new(window, policy),
            sales_calc: SalesRhythmCalculator::new(policy.sales_thresholds),
            visits_by_delegate,
            sales_by_delegate,
        }
    }

    fn own_totals(&self, delegate: DelegateId) -> Result<PooledTotals> {
        let mut visits = VisitTotals::empty(self.window.as_of());
        for va in self.visits_by_delegate.get(&delegate).into_iter().flatten() {
            let events = self.store.events_for(va.id)?;
            visits.merge(&VisitTotals::from_events(va, &events, &self.window)?)?;
        }

        let mut sales = SalesTotals::default();
        let mut by_product: BTreeMap<ProductId, SalesTotals> = BTreeMap::new();
        for sa in self.sales_by_delegate.get(&delegate).into_iter().flatten() {
            let totals = SalesTotals::from_assignment(sa);
            sales.merge(&totals)?;
            by_product.entry(sa.product_id).or_default().merge(&totals)?;
        }

        Ok(PooledTotals {
            visits,
            sales,
            by_product,
        })
    }

    /// Pooled figures for `root` and everything under it.
    pub fn rollup(&self, root: DelegateId) -> Result<NodeRollup> {
        let root_node = self.hierarchy.node(root)?;
        let month = self.window.current_month();
        let subtree = self.hierarchy.descendants(root)?;

        let mut pooled = PooledTotals {
            visits: VisitTotals::empty(self.window.as_of()),
            sales: SalesTotals::default(),
            by_product: BTreeMap::new(),
        };
        let mut members = Vec::new();

        for id in &subtree {
            let node = self.hierarchy.node(*id)?;
            let own = self.own_totals(*id)?;

            pooled.visits.merge(&own.visits)?;
            pooled.sales.merge(&own.sales)?;
            for (product, totals) in &own.by_product {
                pooled.by_product.entry(*product).or_default().merge(totals)?;
            }

            if node.role == Role::Delegate || own.visits.assignments > 0 || own.sales.assignments > 0 {
                members.push(DelegateRollup {
                    delegate_id: node.id,
                    name: node.name.clone(),
                    role: node.role,
                    visit_assignments: own.visits.assignments,
                    sales_assignments: own.sales.assignments,
                    visits: self.visit_calc.from_totals(&own.visits),
                    sales: self.sales_calc.from_totals(&own.sales, month)?,
                });
            }
        }

        let by_product = pooled
            .by_product
            .iter()
            .map(|(product, totals)| Ok((*product, self.sales_calc.from_totals(totals, month)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        let rollup = NodeRollup {
            node_id: root,
            name: root_node.name.clone(),
            role: root_node.role,
            nodes: subtree.len() as u32,
            visit_assignments: pooled.visits.assignments,
            sales_assignments: pooled.sales.assignments,
            visits: self.visit_calc.from_totals(&pooled.visits),
            sales: self.sales_calc.from_totals(&pooled.sales, month)?,
            by_product,
            members,
        };
        debug!(
            node = root,
            nodes = rollup.nodes,
            return_index = rollup.visits.return_index,
            rhythm = rollup.sales.recruitment_rhythm,
            "rollup computed"
        );
        Ok(rollup)
    }

    /// Assignments under `root` whose last three months of visits are not on track, worst first.
    pub fn needs_attention(&self, root: DelegateId) -> Result<Vec<AttentionItem>> {
        let mut items = Vec::new();
        for id in self.hierarchy.descendants(root)? {
            for va in self.visits_by_delegate.get(&id).into_iter().flatten() {
                let events = self.store.events_for(va.id)?;
                let totals = VisitTotals::from_events(va, &events, &self.window)?;
                let status = totals.recent.classify();
                if status == StatusLabel::OnTrack {
                    continue;
                }
                let doctor_name = self
                    .doctors
                    .get(&va.doctor_id)
                    .map(|d| d.name.clone())
                    .unwrap_or_default();
                items.push(AttentionItem {
                    assignment_id: va.id,
                    delegate_id: va.delegate_id,
                    doctor_id: va.doctor_id,
                    doctor_name,
                    recent: totals.recent,
                    status,
                });
            }
        }
        items.sort_by_key(|item| (item.status, item.delegate_id, item.doctor_id));
        Ok(items)
    }
}
