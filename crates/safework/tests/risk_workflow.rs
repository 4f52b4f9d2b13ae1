//! End-to-end risk management flow through the public service facade and HTTP router.
//!
//! Each scenario registers a worker, runs a plan with interventions and monitoring, and checks
//! the read models that supervisors rely on.

mod common {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use chrono::NaiveDate;

    use safework::config::RiskConfig;
    use safework::risk::{
        ChannelReminderScheduler, EmployeeId, EmployeeRegistration, FixedClock,
        InMemoryRiskRepository, InMemoryStatisticsCache, InterventionEntry, InterventionType,
        ManagementLevel, MonitoringEntry, ImprovementStatus, PlanDraft, RiskCategory,
        RiskManagementService,
    };

    pub(super) type Service =
        RiskManagementService<InMemoryRiskRepository, ChannelReminderScheduler, InMemoryStatisticsCache>;

    pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    pub(super) fn service_at(
        today: NaiveDate,
        reminders: ChannelReminderScheduler,
    ) -> Arc<Service> {
        Arc::new(RiskManagementService::with_clock(
            Arc::new(InMemoryRiskRepository::default()),
            Arc::new(reminders),
            Arc::new(InMemoryStatisticsCache::default()),
            RiskConfig::default(),
            Arc::new(FixedClock::at_date(today)),
        ))
    }

    pub(super) fn registration(worker: &str) -> EmployeeRegistration {
        EmployeeRegistration {
            worker_id: worker.into(),
            registered_by: "nurse-kim".to_string(),
            risk_categories: BTreeSet::from([RiskCategory::HearingAbnormality]),
            primary_risk_category: RiskCategory::HearingAbnormality,
            management_level: ManagementLevel::Intensive,
            detection_source: Some("특수건강진단".to_string()),
            detection_date: None,
            health_exam_id: None,
            risk_factors: Default::default(),
            severity_score: Some(8.5),
            work_fitness_status: None,
            work_restrictions: Vec::new(),
            management_goals: None,
            target_improvement_date: None,
        }
    }

    pub(super) fn plan(employee_id: &EmployeeId, start: NaiveDate, end: NaiveDate) -> PlanDraft {
        PlanDraft {
            employee_id: employee_id.clone(),
            plan_name: "청력보존 프로그램".to_string(),
            plan_period_start: start,
            plan_period_end: end,
            primary_goal: "청력 손실 진행 방지".to_string(),
            specific_objectives: Vec::new(),
            planned_interventions: Vec::new(),
            monitoring_schedule: Default::default(),
            success_criteria: Vec::new(),
            evaluation_method: None,
            primary_manager: "nurse-kim".to_string(),
            support_team: Vec::new(),
            created_by: "nurse-kim".to_string(),
        }
    }

    pub(super) fn counseling(
        employee_id: &EmployeeId,
        day: NaiveDate,
        followup: Option<NaiveDate>,
    ) -> InterventionEntry {
        InterventionEntry {
            employee_id: employee_id.clone(),
            plan_id: None,
            intervention_type: InterventionType::Consultation,
            intervention_date: day.and_hms_opt(14, 0, 0).expect("valid time"),
            duration_minutes: Some(20),
            provider_name: "nurse-kim".to_string(),
            provider_role: None,
            content: "청력보호구 착용 상담".to_string(),
            methods_used: Vec::new(),
            materials_provided: Vec::new(),
            worker_response: None,
            engagement_level: None,
            immediate_outcome: None,
            issues_identified: Vec::new(),
            recommendations: Vec::new(),
            referrals_made: Vec::new(),
            followup_required: followup.is_some(),
            followup_date: followup,
            followup_notes: None,
            created_by: "nurse-kim".to_string(),
        }
    }

    pub(super) fn check_in(
        employee_id: &EmployeeId,
        day: NaiveDate,
        status: ImprovementStatus,
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
            improvement_status: Some(status),
            goal_achievement: Some(75.0),
            actions_taken: Vec::new(),
            plan_adjustments: None,
            next_monitoring_date: None,
            next_monitoring_focus: None,
            recorded_by: "nurse-kim".to_string(),
        }
    }
}

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::*;
use safework::risk::{
    risk_router, spawn_reminder_worker, ChannelReminderScheduler, ErrorKind, ImprovementStatus,
    ImprovementTrend, PlanStatus,
};
use tower::ServiceExt;

#[tokio::test]
async fn full_episode_from_registration_to_resolution() {
    let today = date(2024, 5, 20);
    let (reminders, receiver) = ChannelReminderScheduler::new();
    let worker = spawn_reminder_worker(receiver);
    let service = service_at(today, reminders);

    let employee = service.register(registration("W-100")).expect("registers");
    let duplicate = service
        .register(registration("W-100"))
        .expect_err("one active registration per worker");
    assert_eq!(duplicate.kind(), ErrorKind::Conflict);

    let draft = service
        .create_plan(plan(&employee.id, today, date(2024, 11, 20)))
        .expect("plan");
    service
        .approve_plan(&draft.id, "dr-lee".to_string())
        .expect("approves");

    service
        .record_intervention(counseling(&employee.id, date(2024, 5, 13), Some(date(2024, 6, 3))))
        .expect("records");
    for day in [date(2024, 5, 10), date(2024, 5, 17)] {
        service
            .record_monitoring(check_in(&employee.id, day, ImprovementStatus::Improved))
            .expect("records");
    }

    let summary = service
        .compute_employee_summary(&employee.id)
        .expect("summary");
    assert_eq!(summary.improvement_trend, ImprovementTrend::Improving);
    assert_eq!(summary.next_actions.len(), 1);
    assert!(summary
        .current_plan
        .as_ref()
        .map_or(false, |current| current.is_approved()));

    let statistics = service.compute_statistics(2024, Some(5)).expect("statistics");
    assert_eq!(statistics.new_registrations, 1);
    assert_eq!(statistics.improvement_rate, 100.0);

    let resolved = service
        .resolve(&employee.id, "청력 안정".to_string())
        .expect("resolves");
    assert!(!resolved.is_active);
    assert_eq!(
        service.get_plan(&draft.id).expect("plan").status,
        PlanStatus::Completed
    );
    let again = service
        .resolve(&employee.id, "청력 안정".to_string())
        .expect_err("already resolved");
    assert_eq!(again.kind(), ErrorKind::Conflict);

    drop(service);
    let delivered = worker.await.expect("reminder worker joins");
    assert_eq!(delivered, 1);
}

#[tokio::test]
async fn dashboard_is_served_over_http() {
    let today = date(2024, 5, 20);
    let (reminders, _receiver) = ChannelReminderScheduler::new();
    let service = service_at(today, reminders);
    let employee = service.register(registration("W-200")).expect("registers");
    service
        .record_monitoring(check_in(&employee.id, date(2024, 5, 10), ImprovementStatus::Maintained))
        .expect("records");

    let response = risk_router(service)
        .oneshot(
            Request::get("/api/v1/at-risk-employees/dashboard")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let dashboard: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
    assert_eq!(dashboard["active_employees"], 1);
    assert_eq!(dashboard["overdue_monitoring"][0]["worker_id"], "W-200");
    assert_eq!(dashboard["overdue_monitoring"][0]["days_overdue"], 10);
    assert_eq!(dashboard["high_severity_cases"][0]["severity_score"], 8.5);
}
