use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::Response;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::config::RiskConfig;
use crate::risk::classification::{
    ImprovementStatus, InterventionType, ManagementLevel, RiskCategory,
};
use crate::risk::clock::Clock;
use crate::risk::domain::{
    AtRiskEmployee, EmployeeId, EmployeeRegistration, InterventionEntry, InterventionId,
    MonitoringEntry, MonitoringId, PlanDraft, PlanId, RiskFactors, RiskIntervention,
    RiskManagementPlan, RiskMonitoring, WorkerId,
};
use crate::risk::memory::{InMemoryRiskRepository, InMemoryStatisticsCache};
use crate::risk::report::RiskStatistics;
use crate::risk::repository::{
    CacheError, EmployeeFilter, FollowupReminder, InterventionFilter, MonitoringFilter, Page,
    PlanFilter, ReminderError, ReminderScheduler, RepositoryError, RiskRepository,
    StatisticsCache,
};
use crate::risk::service::RiskManagementService;

pub(super) type TestService =
    RiskManagementService<InMemoryRiskRepository, RecordingReminders, InMemoryStatisticsCache>;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn at(day: NaiveDate, hour: u32) -> NaiveDateTime {
    day.and_hms_opt(hour, 0, 0).expect("valid time")
}

pub(super) fn today() -> NaiveDate {
    date(2024, 5, 20)
}

/// Clock the test can move between calls.
#[derive(Debug)]
pub(super) struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    pub(super) fn starting(day: NaiveDate) -> Self {
        Self {
            now: Mutex::new(at(day, 9)),
        }
    }

    pub(super) fn set(&self, day: NaiveDate) {
        *self.now.lock().expect("clock lock") = at(day, 9);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().expect("clock lock")
    }
}

#[derive(Debug, Default)]
pub(super) struct RecordingReminders {
    pub(super) scheduled: Mutex<Vec<FollowupReminder>>,
}

impl RecordingReminders {
    pub(super) fn scheduled(&self) -> Vec<FollowupReminder> {
        self.scheduled.lock().expect("reminder lock").clone()
    }
}

impl ReminderScheduler for RecordingReminders {
    fn schedule(&self, reminder: FollowupReminder) -> Result<(), ReminderError> {
        self.scheduled.lock().expect("reminder lock").push(reminder);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(super) struct FailingReminders;

impl ReminderScheduler for FailingReminders {
    fn schedule(&self, _reminder: FollowupReminder) -> Result<(), ReminderError> {
        Err(ReminderError::Transport("broker offline".to_string()))
    }
}

/// Cache that counts writes and always misses.
#[derive(Debug, Default)]
pub(super) struct BrokenCache {
    pub(super) writes: AtomicUsize,
}

impl StatisticsCache for BrokenCache {
    fn get(&self, _key: &str) -> Result<Option<RiskStatistics>, CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    fn set(&self, _key: &str, _value: RiskStatistics, _ttl: Duration) -> Result<(), CacheError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
}

/// In-memory repository that can refuse resolutions and hide rows from list queries, so the
/// storage-level rules are reached without the service's own checks.
#[derive(Debug, Default)]
pub(super) struct FaultyRepository {
    pub(super) inner: InMemoryRiskRepository,
    pub(super) fail_resolution: AtomicBool,
    pub(super) hide_listings: AtomicBool,
}

impl FaultyRepository {
    fn hidden(&self) -> bool {
        self.hide_listings.load(Ordering::SeqCst)
    }
}

impl RiskRepository for FaultyRepository {
    fn insert_employee(&self, employee: AtRiskEmployee) -> Result<AtRiskEmployee, RepositoryError> {
        self.inner.insert_employee(employee)
    }

    fn update_employee(&self, employee: AtRiskEmployee) -> Result<(), RepositoryError> {
        self.inner.update_employee(employee)
    }

    fn resolve_employee(
        &self,
        employee: AtRiskEmployee,
        closed_plans: Vec<RiskManagementPlan>,
    ) -> Result<(), RepositoryError> {
        if self.fail_resolution.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("write timed out".to_string()));
        }
        self.inner.resolve_employee(employee, closed_plans)
    }

    fn fetch_employee(&self, id: &EmployeeId) -> Result<Option<AtRiskEmployee>, RepositoryError> {
        self.inner.fetch_employee(id)
    }

    fn list_employees(
        &self,
        filter: &EmployeeFilter,
        page: Page,
    ) -> Result<Vec<AtRiskEmployee>, RepositoryError> {
        if self.hidden() {
            return Ok(Vec::new());
        }
        self.inner.list_employees(filter, page)
    }

    fn insert_plan(&self, plan: RiskManagementPlan) -> Result<RiskManagementPlan, RepositoryError> {
        self.inner.insert_plan(plan)
    }

    fn update_plan(&self, plan: RiskManagementPlan) -> Result<(), RepositoryError> {
        self.inner.update_plan(plan)
    }

    fn fetch_plan(&self, id: &PlanId) -> Result<Option<RiskManagementPlan>, RepositoryError> {
        self.inner.fetch_plan(id)
    }

    fn list_plans(
        &self,
        filter: &PlanFilter,
        page: Page,
    ) -> Result<Vec<RiskManagementPlan>, RepositoryError> {
        if self.hidden() {
            return Ok(Vec::new());
        }
        self.inner.list_plans(filter, page)
    }

    fn insert_intervention(
        &self,
        intervention: RiskIntervention,
    ) -> Result<RiskIntervention, RepositoryError> {
        self.inner.insert_intervention(intervention)
    }

    fn fetch_intervention(
        &self,
        id: &InterventionId,
    ) -> Result<Option<RiskIntervention>, RepositoryError> {
        self.inner.fetch_intervention(id)
    }

    fn list_interventions(
        &self,
        filter: &InterventionFilter,
        page: Page,
    ) -> Result<Vec<RiskIntervention>, RepositoryError> {
        self.inner.list_interventions(filter, page)
    }

    fn insert_monitoring(
        &self,
        monitoring: RiskMonitoring,
    ) -> Result<RiskMonitoring, RepositoryError> {
        self.inner.insert_monitoring(monitoring)
    }

    fn fetch_monitoring(
        &self,
        id: &MonitoringId,
    ) -> Result<Option<RiskMonitoring>, RepositoryError> {
        self.inner.fetch_monitoring(id)
    }

    fn list_monitoring(
        &self,
        filter: &MonitoringFilter,
        page: Page,
    ) -> Result<Vec<RiskMonitoring>, RepositoryError> {
        self.inner.list_monitoring(filter, page)
    }
}

pub(super) type FaultyService =
    RiskManagementService<FaultyRepository, RecordingReminders, InMemoryStatisticsCache>;

pub(super) fn faulty_service() -> (FaultyService, Arc<FaultyRepository>) {
    let repository = Arc::new(FaultyRepository::default());
    let service = RiskManagementService::with_clock(
        repository.clone(),
        Arc::new(RecordingReminders::default()),
        Arc::new(InMemoryStatisticsCache::default()),
        RiskConfig::default(),
        Arc::new(ManualClock::starting(today())),
    );
    (service, repository)
}

pub(super) struct Harness {
    pub(super) service: Arc<TestService>,
    pub(super) repository: Arc<InMemoryRiskRepository>,
    pub(super) reminders: Arc<RecordingReminders>,
    pub(super) cache: Arc<InMemoryStatisticsCache>,
    pub(super) clock: Arc<ManualClock>,
}

pub(super) fn harness() -> Harness {
    harness_with(RiskConfig::default())
}

pub(super) fn harness_with(config: RiskConfig) -> Harness {
    let repository = Arc::new(InMemoryRiskRepository::default());
    let reminders = Arc::new(RecordingReminders::default());
    let cache = Arc::new(InMemoryStatisticsCache::default());
    let clock = Arc::new(ManualClock::starting(today()));
    let service = Arc::new(RiskManagementService::with_clock(
        repository.clone(),
        reminders.clone(),
        cache.clone(),
        config,
        clock.clone(),
    ));
    Harness {
        service,
        repository,
        reminders,
        cache,
        clock,
    }
}

pub(super) fn registration(worker: &str) -> EmployeeRegistration {
    EmployeeRegistration {
        worker_id: WorkerId::from(worker),
        registered_by: "nurse-kim".to_string(),
        risk_categories: BTreeSet::from([RiskCategory::HearingAbnormality]),
        primary_risk_category: RiskCategory::HearingAbnormality,
        management_level: ManagementLevel::Intensive,
        detection_source: Some("특수건강진단".to_string()),
        detection_date: Some(date(2024, 4, 30)),
        health_exam_id: Some("exam-2024-0412".to_string()),
        risk_factors: RiskFactors {
            occupational: vec!["소음 85dB 초과".to_string()],
            ..RiskFactors::default()
        },
        severity_score: Some(8.5),
        work_fitness_status: None,
        work_restrictions: Vec::new(),
        management_goals: Some("청력 보존".to_string()),
        target_improvement_date: Some(date(2024, 12, 31)),
    }
}

pub(super) fn plan_draft(employee_id: &EmployeeId, start: NaiveDate, end: NaiveDate) -> PlanDraft {
    PlanDraft {
        employee_id: employee_id.clone(),
        plan_name: "청력보존 프로그램".to_string(),
        plan_period_start: start,
        plan_period_end: end,
        primary_goal: "청력 손실 진행 방지".to_string(),
        specific_objectives: vec!["보호구 착용률 100%".to_string()],
        planned_interventions: Vec::new(),
        monitoring_schedule: Default::default(),
        success_criteria: vec!["연간 청력검사 유지".to_string()],
        evaluation_method: None,
        primary_manager: "nurse-kim".to_string(),
        support_team: vec!["dr-lee".to_string()],
        created_by: "nurse-kim".to_string(),
    }
}

pub(super) fn intervention(employee_id: &EmployeeId, day: NaiveDate) -> InterventionEntry {
    InterventionEntry {
        employee_id: employee_id.clone(),
        plan_id: None,
        intervention_type: InterventionType::Consultation,
        intervention_date: at(day, 10),
        duration_minutes: Some(30),
        provider_name: "nurse-kim".to_string(),
        provider_role: Some("보건관리자".to_string()),
        content: "보호구 착용 교육".to_string(),
        methods_used: Vec::new(),
        materials_provided: Vec::new(),
        worker_response: None,
        engagement_level: None,
        immediate_outcome: None,
        issues_identified: Vec::new(),
        recommendations: Vec::new(),
        referrals_made: Vec::new(),
        followup_required: false,
        followup_date: None,
        followup_notes: None,
        created_by: "nurse-kim".to_string(),
    }
}

pub(super) fn followup(
    employee_id: &EmployeeId,
    day: NaiveDate,
    due: NaiveDate,
) -> InterventionEntry {
    InterventionEntry {
        followup_required: true,
        followup_date: Some(due),
        followup_notes: Some("재상담".to_string()),
        ..intervention(employee_id, day)
    }
}

pub(super) fn monitoring(
    employee_id: &EmployeeId,
    day: NaiveDate,
    status: Option<ImprovementStatus>,
) -> MonitoringEntry {
    MonitoringEntry {
        employee_id: employee_id.clone(),
        monitoring_date: day,
        monitoring_type: "정기".to_string(),
        health_indicators: Default::default(),
        work_performance: None,
        incident_count: 0,
        ppe_compliance: None,
        symptoms_reported: Vec::new(),
        symptom_severity: None,
        lifestyle_factors: Default::default(),
        improvement_status: status,
        goal_achievement: Some(60.0),
        actions_taken: Vec::new(),
        plan_adjustments: None,
        next_monitoring_date: None,
        next_monitoring_focus: None,
        recorded_by: "nurse-kim".to_string(),
    }
}

pub(super) async fn json_body(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}
