use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::config::RiskConfig;

use super::classification::{ClassificationError, PlanStatus};
use super::clock::{Clock, SystemClock};
use super::domain::{
    AtRiskEmployee, EmployeeId, InterventionId, MonitoringId, PlanId, RiskManagementPlan,
    WorkerId,
};
use super::repository::{ReminderScheduler, RepositoryError, RiskRepository, StatisticsCache};

/// Service composing storage, the statistics cache, and the reminder hook.
///
/// Operations are split by concern: registration and plans live in `lifecycle`, activity
/// records in `recorder`, and read models in `report`.
pub struct RiskManagementService<R, N, C> {
    pub(super) repository: Arc<R>,
    pub(super) reminders: Arc<N>,
    pub(super) cache: Arc<C>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) config: RiskConfig,
}

static EMPLOYEE_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static PLAN_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static INTERVENTION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static MONITORING_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_id(prefix: &str, sequence: &AtomicU64) -> String {
    let id = sequence.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{id:06}")
}

pub(super) fn next_employee_id() -> EmployeeId {
    EmployeeId(next_id("emp", &EMPLOYEE_SEQUENCE))
}

pub(super) fn next_plan_id() -> PlanId {
    PlanId(next_id("plan", &PLAN_SEQUENCE))
}

pub(super) fn next_intervention_id() -> InterventionId {
    InterventionId(next_id("int", &INTERVENTION_SEQUENCE))
}

pub(super) fn next_monitoring_id() -> MonitoringId {
    MonitoringId(next_id("mon", &MONITORING_SEQUENCE))
}

impl<R, N, C> RiskManagementService<R, N, C>
where
    R: RiskRepository + 'static,
    N: ReminderScheduler + 'static,
    C: StatisticsCache + 'static,
{
    pub fn new(repository: Arc<R>, reminders: Arc<N>, cache: Arc<C>, config: RiskConfig) -> Self {
        Self::with_clock(repository, reminders, cache, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        repository: Arc<R>,
        reminders: Arc<N>,
        cache: Arc<C>,
        config: RiskConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            reminders,
            cache,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub(super) fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub(super) fn require_employee(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<AtRiskEmployee, RiskServiceError> {
        self.repository
            .fetch_employee(employee_id)?
            .ok_or_else(|| RiskServiceError::EmployeeNotFound(employee_id.clone()))
    }

    pub(super) fn require_plan(
        &self,
        plan_id: &PlanId,
    ) -> Result<RiskManagementPlan, RiskServiceError> {
        self.repository
            .fetch_plan(plan_id)?
            .ok_or_else(|| RiskServiceError::PlanNotFound(plan_id.clone()))
    }
}

/// Coarse classification of service failures used at the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    Unprocessable,
    Internal,
}

impl ErrorKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Validation => "validation",
            Self::Unprocessable => "unprocessable",
            Self::Internal => "internal",
        }
    }
}

/// Error raised by the risk management service.
#[derive(Debug, thiserror::Error)]
pub enum RiskServiceError {
    #[error("at-risk employee {0} not found")]
    EmployeeNotFound(EmployeeId),
    #[error("management plan {0} not found")]
    PlanNotFound(PlanId),
    #[error("intervention {0} not found")]
    InterventionNotFound(InterventionId),
    #[error("monitoring record {0} not found")]
    MonitoringNotFound(MonitoringId),
    #[error("worker {0} already has an active risk registration")]
    DuplicateActiveRegistration(WorkerId),
    #[error("employee {0} already has an active management plan")]
    ActivePlanExists(EmployeeId),
    #[error("employee {0} is already resolved")]
    AlreadyResolved(EmployeeId),
    #[error("employee {0} is not under active management")]
    EmployeeNotActive(EmployeeId),
    #[error("management plan {0} is already approved")]
    PlanAlreadyApproved(PlanId),
    #[error("management plan {plan_id} is {} and can no longer change", .status.label())]
    PlanNotActive { plan_id: PlanId, status: PlanStatus },
    #[error("plan {plan_id} does not belong to employee {employee_id}")]
    PlanEmployeeMismatch {
        plan_id: PlanId,
        employee_id: EmployeeId,
    },
    #[error("plan period must end after it starts ({start} -> {end})")]
    InvalidPlanPeriod { start: NaiveDate, end: NaiveDate },
    #[error("invalid reporting period {year}/{month:?}")]
    InvalidPeriod { year: i32, month: Option<u32> },
    #[error("overdue window must be zero or more days (found {0})")]
    InvalidOverdueWindow(i64),
    #[error(transparent)]
    Classification(#[from] ClassificationError),
    #[error("followup_date is required when followup_required is set")]
    FollowupDateRequired,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl RiskServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmployeeNotFound(_)
            | Self::PlanNotFound(_)
            | Self::InterventionNotFound(_)
            | Self::MonitoringNotFound(_)
            | Self::Repository(RepositoryError::NotFound) => ErrorKind::NotFound,
            Self::DuplicateActiveRegistration(_)
            | Self::ActivePlanExists(_)
            | Self::AlreadyResolved(_)
            | Self::EmployeeNotActive(_)
            | Self::PlanAlreadyApproved(_)
            | Self::PlanNotActive { .. }
            | Self::Repository(RepositoryError::Conflict) => ErrorKind::Conflict,
            Self::PlanEmployeeMismatch { .. }
            | Self::InvalidPlanPeriod { .. }
            | Self::InvalidPeriod { .. }
            | Self::InvalidOverdueWindow(_)
            | Self::Classification(_) => ErrorKind::Validation,
            Self::FollowupDateRequired => ErrorKind::Unprocessable,
            Self::Repository(RepositoryError::Unavailable(_)) => ErrorKind::Internal,
        }
    }
}
