use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::super::classification::{
    ImprovementTrend, InterventionType, ManagementLevel, RiskCategory,
};
use super::super::domain::{
    AtRiskEmployee, EmployeeId, InterventionId, RiskIntervention, RiskManagementPlan,
    RiskMonitoring, WorkerId,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: RiskCategory,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagementLevelCount {
    pub level: ManagementLevel,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterventionTypeCount {
    pub intervention_type: InterventionType,
    pub label: String,
    pub count: usize,
}

/// Period statistics; cached, so it round-trips through serde.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskStatistics {
    pub year: i32,
    pub month: Option<u32>,
    pub total_employees: usize,
    pub active_employees: usize,
    pub new_registrations: usize,
    pub resolved_employees: usize,
    pub by_category: Vec<CategoryCount>,
    pub by_management_level: Vec<ManagementLevelCount>,
    pub total_interventions: usize,
    pub interventions_by_type: Vec<InterventionTypeCount>,
    pub total_monitoring: usize,
    pub improved_monitoring: usize,
    /// Percentage of monitoring records in the period marked as improved.
    pub improvement_rate: f64,
}

impl RiskStatistics {
    pub fn empty(year: i32, month: Option<u32>) -> Self {
        Self {
            year,
            month,
            total_employees: 0,
            active_employees: 0,
            new_registrations: 0,
            resolved_employees: 0,
            by_category: Vec::new(),
            by_management_level: Vec::new(),
            total_interventions: 0,
            interventions_by_type: Vec::new(),
            total_monitoring: 0,
            improved_monitoring: 0,
            improvement_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverdueMonitoringEntry {
    pub employee_id: EmployeeId,
    pub worker_id: WorkerId,
    pub management_level: ManagementLevel,
    pub last_monitoring_date: Option<NaiveDate>,
    /// Days since the last monitoring, or since registration when never monitored.
    pub days_overdue: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighSeverityCase {
    pub employee_id: EmployeeId,
    pub worker_id: WorkerId,
    pub severity_score: f64,
    pub primary_risk_category: RiskCategory,
    pub management_level: ManagementLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingFollowup {
    pub intervention_id: InterventionId,
    pub employee_id: EmployeeId,
    pub intervention_type: InterventionType,
    pub followup_date: NaiveDate,
    pub followup_notes: Option<String>,
    pub days_overdue: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskDashboard {
    pub as_of: NaiveDate,
    pub active_employees: usize,
    pub by_management_level: Vec<ManagementLevelCount>,
    pub by_category: Vec<CategoryCount>,
    pub new_this_month: usize,
    pub resolved_this_month: usize,
    pub interventions_this_month: usize,
    pub overdue_monitoring: Vec<OverdueMonitoringEntry>,
    pub high_severity_cases: Vec<HighSeverityCase>,
    pub pending_followups: Vec<PendingFollowup>,
    pub average_management_days: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NextAction {
    Monitoring {
        date: NaiveDate,
        focus: Option<String>,
    },
    Followup {
        date: NaiveDate,
        intervention_id: InterventionId,
        intervention_type: InterventionType,
        notes: Option<String>,
    },
}

impl NextAction {
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Monitoring { date, .. } | Self::Followup { date, .. } => *date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeSummary {
    pub employee: AtRiskEmployee,
    pub current_plan: Option<RiskManagementPlan>,
    pub recent_interventions: Vec<RiskIntervention>,
    pub latest_monitoring: Option<RiskMonitoring>,
    pub improvement_trend: ImprovementTrend,
    pub next_actions: Vec<NextAction>,
    pub intervention_count: usize,
    pub monitoring_count: usize,
}
