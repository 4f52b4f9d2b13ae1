use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::classification::{
    validate_categories, validate_severity, ClassificationError, EngagementLevel,
    ImprovementStatus, InterventionType, ManagementLevel, PlanStatus, QualitativeRating,
    RiskCategory,
};

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

identifier!(
    /// Reference to a worker owned by the workers domain.
    WorkerId
);
identifier!(
    /// Identifier of one at-risk registration episode.
    EmployeeId
);
identifier!(PlanId);
identifier!(InterventionId);
identifier!(MonitoringId);

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_RESOLVED: &str = "resolved";

/// Risk factors grouped by origin. Unknown keys are preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskFactors {
    #[serde(default)]
    pub occupational: Vec<String>,
    #[serde(default)]
    pub personal: Vec<String>,
    #[serde(default)]
    pub work_conditions: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One registration episode for a worker under risk management.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtRiskEmployee {
    pub id: EmployeeId,
    pub worker_id: WorkerId,
    pub registration_date: NaiveDate,
    pub registered_by: String,
    pub risk_categories: BTreeSet<RiskCategory>,
    pub primary_risk_category: RiskCategory,
    pub management_level: ManagementLevel,
    pub detection_source: Option<String>,
    pub detection_date: Option<NaiveDate>,
    pub health_exam_id: Option<String>,
    pub risk_factors: RiskFactors,
    pub severity_score: Option<f64>,
    pub current_status: String,
    pub work_fitness_status: Option<String>,
    pub work_restrictions: Vec<String>,
    pub management_goals: Option<String>,
    pub target_improvement_date: Option<NaiveDate>,
    pub is_active: bool,
    pub resolution_date: Option<NaiveDate>,
    pub resolution_reason: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl AtRiskEmployee {
    /// Apply only the supplied fields. Category and severity rules are checked against the
    /// merged result before anything is written.
    pub fn apply_patch(
        &mut self,
        patch: EmployeePatch,
        now: NaiveDateTime,
    ) -> Result<(), ClassificationError> {
        let categories = patch
            .risk_categories
            .clone()
            .unwrap_or_else(|| self.risk_categories.clone());
        let primary = patch
            .primary_risk_category
            .unwrap_or(self.primary_risk_category);
        if patch.risk_categories.is_some() || patch.primary_risk_category.is_some() {
            validate_categories(&categories, primary)?;
        }
        if let Some(score) = patch.severity_score {
            validate_severity(score)?;
        }

        let EmployeePatch {
            risk_categories: _,
            primary_risk_category: _,
            management_level,
            severity_score,
            detection_source,
            detection_date,
            health_exam_id,
            risk_factors,
            work_fitness_status,
            work_restrictions,
            management_goals,
            target_improvement_date,
        } = patch;

        self.risk_categories = categories;
        self.primary_risk_category = primary;
        if let Some(level) = management_level {
            self.management_level = level;
        }
        if let Some(score) = severity_score {
            self.severity_score = Some(score);
        }
        if let Some(source) = detection_source {
            self.detection_source = Some(source);
        }
        if let Some(date) = detection_date {
            self.detection_date = Some(date);
        }
        if let Some(exam) = health_exam_id {
            self.health_exam_id = Some(exam);
        }
        if let Some(factors) = risk_factors {
            self.risk_factors = factors;
        }
        if let Some(status) = work_fitness_status {
            self.work_fitness_status = Some(status);
        }
        if let Some(restrictions) = work_restrictions {
            self.work_restrictions = restrictions;
        }
        if let Some(goals) = management_goals {
            self.management_goals = Some(goals);
        }
        if let Some(date) = target_improvement_date {
            self.target_improvement_date = Some(date);
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn days_under_management(&self, today: NaiveDate) -> i64 {
        let end = self.resolution_date.unwrap_or(today);
        (end - self.registration_date).num_days()
    }
}

/// Registration request for a worker entering risk management.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRegistration {
    pub worker_id: WorkerId,
    pub registered_by: String,
    pub risk_categories: BTreeSet<RiskCategory>,
    pub primary_risk_category: RiskCategory,
    pub management_level: ManagementLevel,
    #[serde(default)]
    pub detection_source: Option<String>,
    #[serde(default)]
    pub detection_date: Option<NaiveDate>,
    #[serde(default)]
    pub health_exam_id: Option<String>,
    #[serde(default)]
    pub risk_factors: RiskFactors,
    #[serde(default)]
    pub severity_score: Option<f64>,
    #[serde(default)]
    pub work_fitness_status: Option<String>,
    #[serde(default)]
    pub work_restrictions: Vec<String>,
    #[serde(default)]
    pub management_goals: Option<String>,
    #[serde(default)]
    pub target_improvement_date: Option<NaiveDate>,
}

/// Mutable fields of an at-risk employee. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmployeePatch {
    pub risk_categories: Option<BTreeSet<RiskCategory>>,
    pub primary_risk_category: Option<RiskCategory>,
    pub management_level: Option<ManagementLevel>,
    pub severity_score: Option<f64>,
    pub detection_source: Option<String>,
    pub detection_date: Option<NaiveDate>,
    pub health_exam_id: Option<String>,
    pub risk_factors: Option<RiskFactors>,
    pub work_fitness_status: Option<String>,
    pub work_restrictions: Option<Vec<String>>,
    pub management_goals: Option<String>,
    pub target_improvement_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedIntervention {
    pub intervention_type: InterventionType,
    pub frequency: String,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
}

/// Named cadences per monitoring activity, e.g. `health_check: "monthly"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringSchedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consultation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_environment: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskManagementPlan {
    pub id: PlanId,
    pub employee_id: EmployeeId,
    pub plan_name: String,
    pub plan_period_start: NaiveDate,
    pub plan_period_end: NaiveDate,
    pub primary_goal: String,
    pub specific_objectives: Vec<String>,
    pub planned_interventions: Vec<PlannedIntervention>,
    pub monitoring_schedule: MonitoringSchedule,
    pub success_criteria: Vec<String>,
    pub evaluation_method: Option<String>,
    pub primary_manager: String,
    pub support_team: Vec<String>,
    pub status: PlanStatus,
    pub created_by: String,
    pub approved_by: Option<String>,
    pub approval_date: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl RiskManagementPlan {
    pub fn is_approved(&self) -> bool {
        self.approved_by.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDraft {
    pub employee_id: EmployeeId,
    pub plan_name: String,
    pub plan_period_start: NaiveDate,
    pub plan_period_end: NaiveDate,
    pub primary_goal: String,
    #[serde(default)]
    pub specific_objectives: Vec<String>,
    #[serde(default)]
    pub planned_interventions: Vec<PlannedIntervention>,
    #[serde(default)]
    pub monitoring_schedule: MonitoringSchedule,
    #[serde(default)]
    pub success_criteria: Vec<String>,
    #[serde(default)]
    pub evaluation_method: Option<String>,
    pub primary_manager: String,
    #[serde(default)]
    pub support_team: Vec<String>,
    pub created_by: String,
}

/// Append-only record of an action taken for an employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskIntervention {
    pub id: InterventionId,
    pub employee_id: EmployeeId,
    pub plan_id: Option<PlanId>,
    pub intervention_type: InterventionType,
    pub intervention_date: NaiveDateTime,
    pub duration_minutes: Option<u32>,
    pub provider_name: String,
    pub provider_role: Option<String>,
    pub content: String,
    pub methods_used: Vec<String>,
    pub materials_provided: Vec<String>,
    pub worker_response: Option<String>,
    pub engagement_level: Option<EngagementLevel>,
    pub immediate_outcome: Option<String>,
    pub issues_identified: Vec<String>,
    pub recommendations: Vec<String>,
    pub referrals_made: Vec<String>,
    pub followup_required: bool,
    pub followup_date: Option<NaiveDate>,
    pub followup_notes: Option<String>,
    pub created_by: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionEntry {
    pub employee_id: EmployeeId,
    #[serde(default)]
    pub plan_id: Option<PlanId>,
    pub intervention_type: InterventionType,
    pub intervention_date: NaiveDateTime,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    pub provider_name: String,
    #[serde(default)]
    pub provider_role: Option<String>,
    pub content: String,
    #[serde(default)]
    pub methods_used: Vec<String>,
    #[serde(default)]
    pub materials_provided: Vec<String>,
    #[serde(default)]
    pub worker_response: Option<String>,
    #[serde(default)]
    pub engagement_level: Option<EngagementLevel>,
    #[serde(default)]
    pub immediate_outcome: Option<String>,
    #[serde(default)]
    pub issues_identified: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub referrals_made: Vec<String>,
    #[serde(default)]
    pub followup_required: bool,
    #[serde(default)]
    pub followup_date: Option<NaiveDate>,
    #[serde(default)]
    pub followup_notes: Option<String>,
    pub created_by: String,
}

/// Measured indicators; anything not modelled lands in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthIndicators {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub systolic_bp: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diastolic_bp: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_sugar: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hearing_threshold_left_db: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hearing_threshold_right_db: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stress_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bmi: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifestyleFactors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoking: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drinks_per_week: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_days_per_week: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_hours: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Immutable periodic observation of an employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMonitoring {
    pub id: MonitoringId,
    pub employee_id: EmployeeId,
    pub monitoring_date: NaiveDate,
    pub monitoring_type: String,
    pub health_indicators: HealthIndicators,
    pub work_performance: Option<QualitativeRating>,
    pub incident_count: u32,
    pub ppe_compliance: Option<QualitativeRating>,
    pub symptoms_reported: Vec<String>,
    pub symptom_severity: Option<u8>,
    pub lifestyle_factors: LifestyleFactors,
    pub improvement_status: Option<ImprovementStatus>,
    pub goal_achievement: Option<f64>,
    pub actions_taken: Vec<String>,
    pub plan_adjustments: Option<String>,
    pub next_monitoring_date: Option<NaiveDate>,
    pub next_monitoring_focus: Option<String>,
    pub recorded_by: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringEntry {
    pub employee_id: EmployeeId,
    pub monitoring_date: NaiveDate,
    pub monitoring_type: String,
    #[serde(default)]
    pub health_indicators: HealthIndicators,
    #[serde(default)]
    pub work_performance: Option<QualitativeRating>,
    #[serde(default)]
    pub incident_count: u32,
    #[serde(default)]
    pub ppe_compliance: Option<QualitativeRating>,
    #[serde(default)]
    pub symptoms_reported: Vec<String>,
    #[serde(default)]
    pub symptom_severity: Option<u8>,
    #[serde(default)]
    pub lifestyle_factors: LifestyleFactors,
    #[serde(default)]
    pub improvement_status: Option<ImprovementStatus>,
    #[serde(default)]
    pub goal_achievement: Option<f64>,
    #[serde(default)]
    pub actions_taken: Vec<String>,
    #[serde(default)]
    pub plan_adjustments: Option<String>,
    #[serde(default)]
    pub next_monitoring_date: Option<NaiveDate>,
    #[serde(default)]
    pub next_monitoring_focus: Option<String>,
    pub recorded_by: String,
}
