//! At-risk employee management: registration and resolution, management plans, interventions,
//! monitoring, and the read models built on top of them.
//!
//! Storage, the statistics cache, and follow-up reminders sit behind traits in [`repository`];
//! [`memory`] provides in-process adapters for each.

pub mod classification;
pub mod clock;
pub mod domain;
mod lifecycle;
pub mod memory;
mod recorder;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use classification::{
    ClassificationError, EngagementLevel, ImprovementStatus, ImprovementTrend, InterventionType,
    LevelChange, ManagementLevel, PlanStatus, QualitativeRating, RiskCategory,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::{
    AtRiskEmployee, EmployeeId, EmployeePatch, EmployeeRegistration, HealthIndicators,
    InterventionEntry, InterventionId, LifestyleFactors, MonitoringEntry, MonitoringId,
    MonitoringSchedule, PlanDraft, PlanId, PlannedIntervention, RiskFactors, RiskIntervention,
    RiskManagementPlan, RiskMonitoring, WorkerId,
};
pub use memory::{
    spawn_reminder_worker, ChannelReminderScheduler, InMemoryRiskRepository,
    InMemoryStatisticsCache, NoopReminderScheduler,
};
pub use report::{EmployeeSummary, NextAction, OverdueMonitoringEntry, RiskDashboard, RiskStatistics};
pub use repository::{
    CacheError, EmployeeFilter, FollowupReminder, InterventionFilter, MonitoringFilter, Page,
    PlanFilter, ReminderError, ReminderScheduler, RepositoryError, RiskRepository,
    StatisticsCache,
};
pub use router::risk_router;
pub use service::{ErrorKind, RiskManagementService, RiskServiceError};
