//! The record set handed over by the catalog collaborator.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, Result};
use crate::model::{
    AssignmentId, Delegate, Doctor, Product, SalesAssignment, VisitAssignment, VisitEvent,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub doctors: Vec<Doctor>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub delegates: Vec<Delegate>,
    #[serde(default)]
    pub visit_assignments: Vec<VisitAssignment>,
    #[serde(default)]
    pub visit_events: Vec<VisitEvent>,
    #[serde(default)]
    pub sales_assignments: Vec<SalesAssignment>,
}

impl Dataset {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| MetricsError::invalid(format!("dataset: {}", e)))
    }

    /// Referential integrity and uniqueness. Hierarchy shape is checked by `Hierarchy::build`.
    pub fn validate(&self) -> Result<()> {
        let delegates: HashSet<_> = self.delegates.iter().map(|d| d.id).collect();
        let doctors: HashSet<_> = self.doctors.iter().map(|d| d.id).collect();
        let products: HashSet<_> = self.products.iter().map(|p| p.id).collect();

        let mut visit_ids = HashSet::new();
        let mut pairs = HashSet::new();
        for va in &self.visit_assignments {
            if !visit_ids.insert(va.id) {
                return Err(MetricsError::invalid(format!("duplicate visit assignment id {}", va.id)));
            }
            if !delegates.contains(&va.delegate_id) {
                return Err(MetricsError::not_found(format!(
                    "delegate {} of visit assignment {}",
                    va.delegate_id, va.id
                )));
            }
            if !doctors.contains(&va.doctor_id) {
                return Err(MetricsError::not_found(format!(
                    "doctor {} of visit assignment {}",
                    va.doctor_id, va.id
                )));
            }
            if !pairs.insert((va.delegate_id, va.doctor_id)) {
                return Err(MetricsError::invalid(format!(
                    "delegate {} is assigned doctor {} more than once",
                    va.delegate_id, va.doctor_id
                )));
            }
        }

        let mut event_ids = HashSet::new();
        let mut visit_days = HashSet::new();
        for ev in &self.visit_events {
            if !event_ids.insert(ev.id) {
                return Err(MetricsError::invalid(format!("duplicate visit event id {}", ev.id)));
            }
            if !visit_ids.contains(&ev.assignment_id) {
                return Err(MetricsError::not_found(format!(
                    "visit assignment {} of visit event {}",
                    ev.assignment_id, ev.id
                )));
            }
            if !visit_days.insert((ev.assignment_id, ev.date)) {
                return Err(MetricsError::invalid(format!(
                    "assignment {} has more than one visit on {}",
                    ev.assignment_id, ev.date
                )));
            }
        }

        let mut sales_ids = HashSet::new();
        let mut sheets = HashSet::new();
        for sa in &self.sales_assignments {
            if !sales_ids.insert(sa.id) {
                return Err(MetricsError::invalid(format!("duplicate sales assignment id {}", sa.id)));
            }
            if !delegates.contains(&sa.delegate_id) {
                return Err(MetricsError::not_found(format!(
                    "delegate {} of sales assignment {}",
                    sa.delegate_id, sa.id
                )));
            }
            if !products.contains(&sa.product_id) {
                return Err(MetricsError::not_found(format!(
                    "product {} of sales assignment {}",
                    sa.product_id, sa.id
                )));
            }
            if !sheets.insert((sa.delegate_id, sa.product_id, sa.year)) {
                return Err(MetricsError::invalid(format!(
                    "delegate {} has more than one {} sheet for product {}",
                    sa.delegate_id, sa.year, sa.product_id
                )));
            }
        }

        Ok(())
    }

    pub fn visit_assignment(&self, id: AssignmentId) -> Result<&VisitAssignment> {
        self.visit_assignments
            .iter()
            .find(|va| va.id == id)
            .ok_or_else(|| MetricsError::not_found(format!("visit assignment {}", id)))
    }

    pub fn sales_assignment(&self, id: AssignmentId) -> Result<&SalesAssignment> {
        self.sales_assignments
            .iter()
            .find(|sa| sa.id == id)
            .ok_or_else(|| MetricsError::not_found(format!("sales assignment {}", id)))
    }
}
