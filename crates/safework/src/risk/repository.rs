use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::classification::{
    ImprovementStatus, InterventionType, ManagementLevel, PlanStatus, RiskCategory,
};
use super::domain::{
    AtRiskEmployee, EmployeeId, InterventionId, MonitoringId, PlanId, RiskIntervention,
    RiskManagementPlan, RiskMonitoring, WorkerId,
};
use super::report::RiskStatistics;

pub const DEFAULT_PAGE_LIMIT: usize = 100;
pub const MAX_PAGE_LIMIT: usize = 500;

/// Offset pagination applied after filtering and ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub skip: usize,
    pub limit: usize,
}

impl Page {
    pub fn new(skip: Option<usize>, limit: Option<usize>) -> Self {
        Self {
            skip: skip.unwrap_or(0),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT),
        }
    }

    /// Unbounded page used by the aggregation engine.
    pub const fn all() -> Self {
        Self {
            skip: 0,
            limit: usize::MAX,
        }
    }

    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items.into_iter().skip(self.skip).take(self.limit).collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Employee query; every populated field must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmployeeFilter {
    pub worker_id: Option<WorkerId>,
    pub is_active: Option<bool>,
    pub management_level: Option<ManagementLevel>,
    pub risk_category: Option<RiskCategory>,
    pub registered_from: Option<NaiveDate>,
    pub registered_to: Option<NaiveDate>,
}

impl EmployeeFilter {
    pub fn active() -> Self {
        Self {
            is_active: Some(true),
            ..Self::default()
        }
    }

    pub fn matches(&self, employee: &AtRiskEmployee) -> bool {
        self.worker_id
            .as_ref()
            .map_or(true, |worker| &employee.worker_id == worker)
            && self
                .is_active
                .map_or(true, |active| employee.is_active == active)
            && self
                .management_level
                .map_or(true, |level| employee.management_level == level)
            && self
                .risk_category
                .map_or(true, |category| employee.risk_categories.contains(&category))
            && self
                .registered_from
                .map_or(true, |from| employee.registration_date >= from)
            && self
                .registered_to
                .map_or(true, |to| employee.registration_date <= to)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanFilter {
    pub employee_id: Option<EmployeeId>,
    pub status: Option<PlanStatus>,
}

impl PlanFilter {
    pub fn matches(&self, plan: &RiskManagementPlan) -> bool {
        self.employee_id
            .as_ref()
            .map_or(true, |id| &plan.employee_id == id)
            && self.status.map_or(true, |status| plan.status == status)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterventionFilter {
    pub employee_id: Option<EmployeeId>,
    pub plan_id: Option<PlanId>,
    pub intervention_type: Option<InterventionType>,
    pub followup_required: Option<bool>,
    /// Inclusive bounds on the intervention date.
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl InterventionFilter {
    pub fn matches(&self, intervention: &RiskIntervention) -> bool {
        let day = intervention.intervention_date.date();
        self.employee_id
            .as_ref()
            .map_or(true, |id| &intervention.employee_id == id)
            && self
                .plan_id
                .as_ref()
                .map_or(true, |id| intervention.plan_id.as_ref() == Some(id))
            && self
                .intervention_type
                .map_or(true, |kind| intervention.intervention_type == kind)
            && self
                .followup_required
                .map_or(true, |required| intervention.followup_required == required)
            && self.from.map_or(true, |from| day >= from)
            && self.to.map_or(true, |to| day <= to)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringFilter {
    pub employee_id: Option<EmployeeId>,
    pub improvement_status: Option<ImprovementStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl MonitoringFilter {
    pub fn matches(&self, monitoring: &RiskMonitoring) -> bool {
        self.employee_id
            .as_ref()
            .map_or(true, |id| &monitoring.employee_id == id)
            && self
                .improvement_status
                .map_or(true, |status| monitoring.improvement_status == Some(status))
            && self
                .from
                .map_or(true, |from| monitoring.monitoring_date >= from)
            && self.to.map_or(true, |to| monitoring.monitoring_date <= to)
    }
}

/// Storage abstraction over the four risk entities.
///
/// Implementations enforce two uniqueness rules and report violations as
/// [`RepositoryError::Conflict`]: one active employee record per worker, and one active plan
/// per employee. Lists are ordered newest first: employees by registration date, plans by
/// start date, interventions by date and time, monitoring by date then insertion order.
pub trait RiskRepository: Send + Sync {
    fn insert_employee(&self, employee: AtRiskEmployee) -> Result<AtRiskEmployee, RepositoryError>;
    fn update_employee(&self, employee: AtRiskEmployee) -> Result<(), RepositoryError>;
    /// Write a resolved employee together with the plans closed alongside it. Either every
    /// record is written or none is.
    fn resolve_employee(
        &self,
        employee: AtRiskEmployee,
        closed_plans: Vec<RiskManagementPlan>,
    ) -> Result<(), RepositoryError>;
    fn fetch_employee(&self, id: &EmployeeId) -> Result<Option<AtRiskEmployee>, RepositoryError>;
    fn list_employees(
        &self,
        filter: &EmployeeFilter,
        page: Page,
    ) -> Result<Vec<AtRiskEmployee>, RepositoryError>;

    fn insert_plan(&self, plan: RiskManagementPlan) -> Result<RiskManagementPlan, RepositoryError>;
    fn update_plan(&self, plan: RiskManagementPlan) -> Result<(), RepositoryError>;
    fn fetch_plan(&self, id: &PlanId) -> Result<Option<RiskManagementPlan>, RepositoryError>;
    fn list_plans(
        &self,
        filter: &PlanFilter,
        page: Page,
    ) -> Result<Vec<RiskManagementPlan>, RepositoryError>;

    fn insert_intervention(
        &self,
        intervention: RiskIntervention,
    ) -> Result<RiskIntervention, RepositoryError>;
    fn fetch_intervention(
        &self,
        id: &InterventionId,
    ) -> Result<Option<RiskIntervention>, RepositoryError>;
    fn list_interventions(
        &self,
        filter: &InterventionFilter,
        page: Page,
    ) -> Result<Vec<RiskIntervention>, RepositoryError>;

    fn insert_monitoring(
        &self,
        monitoring: RiskMonitoring,
    ) -> Result<RiskMonitoring, RepositoryError>;
    fn fetch_monitoring(
        &self,
        id: &MonitoringId,
    ) -> Result<Option<RiskMonitoring>, RepositoryError>;
    fn list_monitoring(
        &self,
        filter: &MonitoringFilter,
        page: Page,
    ) -> Result<Vec<RiskMonitoring>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record violates a uniqueness constraint")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Key-value cache with per-entry expiry for computed statistics.
pub trait StatisticsCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<RiskStatistics>, CacheError>;
    fn set(&self, key: &str, value: RiskStatistics, ttl: Duration) -> Result<(), CacheError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Follow-up reminder handed off when an intervention requires one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowupReminder {
    pub worker_id: WorkerId,
    pub employee_id: EmployeeId,
    pub intervention_id: InterventionId,
    pub followup_date: NaiveDate,
    pub notes: Option<String>,
}

/// Outbound hook for follow-up reminders. Callers never wait on delivery.
pub trait ReminderScheduler: Send + Sync {
    fn schedule(&self, reminder: FollowupReminder) -> Result<(), ReminderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ReminderError {
    #[error("reminder queue closed")]
    QueueClosed,
    #[error("reminder transport unavailable: {0}")]
    Transport(String),
}
