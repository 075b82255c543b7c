//! Raw entities supplied by the catalog/persistence collaborator.
//!
//! The engine only reads these. Invariants that the type system can carry
//! (visit frequency in {1,2}, twelve monthly slots, non-negative amounts) are
//! enforced at construction and deserialization time.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, Result};

pub type DoctorId = u64;
pub type ProductId = u64;
pub type DelegateId = u64;
pub type AssignmentId = u64;
pub type VisitEventId = u64;

/// Twelve calendar-month slots, index 0 = January.
pub type MonthlySeries = [u64; 12];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: DoctorId,
    pub name: String,
    #[serde(default)]
    pub specialty: String,
    #[serde(default)]
    pub territory: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
}

/// Level of a node in the sales hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Delegate,
    Supervisor,
    SalesDirector,
}

impl Role {
    pub fn rank(self) -> u8 {
        match self {
            Role::Delegate => 0,
            Role::Supervisor => 1,
            Role::SalesDirector => 2,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Delegate => write!(f, "delegate"),
            Self::Supervisor => write!(f, "supervisor"),
            Self::SalesDirector => write!(f, "sales director"),
        }
    }
}

/// A hierarchy node. Supervisors and sales directors share the delegate shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegate {
    pub id: DelegateId,
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub supervisor_id: Option<DelegateId>,
}

/// Visits required per calendar month for one doctor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum MonthlyFrequency {
    Once,
    Twice,
}

impl MonthlyFrequency {
    pub fn visits(self) -> u32 {
        match self {
            MonthlyFrequency::Once => 1,
            MonthlyFrequency::Twice => 2,
        }
    }
}

impl TryFrom<u32> for MonthlyFrequency {
    type Error = MetricsError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            1 => Ok(MonthlyFrequency::Once),
            2 => Ok(MonthlyFrequency::Twice),
            other => Err(MetricsError::invalid(format!(
                "monthly frequency must be 1 or 2, got {}",
                other
            ))),
        }
    }
}

impl From<MonthlyFrequency> for u32 {
    fn from(freq: MonthlyFrequency) -> u32 {
        freq.visits()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitAssignment {
    pub id: AssignmentId,
    pub delegate_id: DelegateId,
    pub doctor_id: DoctorId,
    pub monthly_frequency: MonthlyFrequency,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisitEvent {
    pub id: VisitEventId,
    pub assignment_id: AssignmentId,
    pub date: NaiveDate,
}

/// One delegate/product/year target sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SalesAssignmentRecord")]
pub struct SalesAssignment {
    pub id: AssignmentId,
    pub delegate_id: DelegateId,
    pub product_id: ProductId,
    pub year: i32,
    pub monthly_target: MonthlySeries,
    pub monthly_achieved: MonthlySeries,
}

/// Wire shape of a sales assignment before slot validation.
#[derive(Debug, Clone, Deserialize)]
pub struct SalesAssignmentRecord {
    pub id: AssignmentId,
    pub delegate_id: DelegateId,
    pub product_id: ProductId,
    pub year: i32,
    pub monthly_target: Vec<i64>,
    pub monthly_achieved: Vec<i64>,
}

impl TryFrom<SalesAssignmentRecord> for SalesAssignment {
    type Error = MetricsError;

    fn try_from(record: SalesAssignmentRecord) -> Result<Self> {
        SalesAssignment::new(
            record.id,
            record.delegate_id,
            record.product_id,
            record.year,
            &record.monthly_target,
            &record.monthly_achieved,
        )
    }
}

impl SalesAssignment {
    pub fn new(
        id: AssignmentId,
        delegate_id: DelegateId,
        product_id: ProductId,
        year: i32,
        monthly_target: &[i64],
        monthly_achieved: &[i64],
    ) -> Result<Self> {
        Ok(Self {
            id,
            delegate_id,
            product_id,
            year,
            monthly_target: monthly_series(id, "monthly_target", monthly_target)?,
            monthly_achieved: monthly_series(id, "monthly_achieved", monthly_achieved)?,
        })
    }
}

fn monthly_series(id: AssignmentId, field: &str, values: &[i64]) -> Result<MonthlySeries> {
    if values.len() != 12 {
        return Err(MetricsError::invalid(format!(
            "sales assignment {}: {} has {} slots, expected 12",
            id,
            field,
            values.len()
        )));
    }
    let mut series = [0u64; 12];
    for (slot, &value) in series.iter_mut().zip(values) {
        *slot = u64::try_from(value).map_err(|_| {
            MetricsError::invalid(format!(
                "sales assignment {}: {} contains negative value {}",
                id, field, value
            ))
        })?;
    }
    Ok(series)
}
