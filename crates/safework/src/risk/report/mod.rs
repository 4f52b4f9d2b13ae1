mod dashboard;
mod statistics;
mod summary;
pub mod views;

pub use dashboard::{average_management_days, high_severity_cases, overdue_entries, pending_followups};
pub use statistics::{build_statistics, statistics_cache_key, ReportingPeriod};
pub use summary::{classify_trend, next_actions};
pub use views::{
    CategoryCount, EmployeeSummary, HighSeverityCase, InterventionTypeCount,
    ManagementLevelCount, NextAction, OverdueMonitoringEntry, PendingFollowup, RiskDashboard,
    RiskStatistics,
};
