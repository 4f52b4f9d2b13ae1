use crate::infra::{build_risk_service, RiskService};
use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime};
use clap::Args;
use safework::config::RiskConfig;
use safework::error::AppError;
use safework::risk::{
    ChannelReminderScheduler, Clock, EmployeeId, EmployeeRegistration, EmployeeSummary,
    ImprovementStatus, InterventionEntry, InterventionType, ManagementLevel, MonitoringEntry,
    NextAction, PlanDraft, RiskCategory, RiskDashboard, RiskStatistics,
};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reporting date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Print the dashboard, summary, and statistics as JSON instead of text.
    #[arg(long)]
    pub(crate) json: bool,
}

/// Clock the seeding script moves backwards and forwards through the program's history.
#[derive(Debug)]
struct ScriptClock {
    now: Mutex<NaiveDateTime>,
}

impl ScriptClock {
    fn new(day: NaiveDate) -> Self {
        Self {
            now: Mutex::new(nine_am(day)),
        }
    }

    fn set(&self, day: NaiveDate) {
        let mut guard = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = nine_am(day);
    }
}

impl Clock for ScriptClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn nine_am(day: NaiveDate) -> NaiveDateTime {
    day.and_time(chrono::NaiveTime::MIN) + Duration::hours(9)
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let clock = Arc::new(ScriptClock::new(today));
    let (reminders, mut receiver) = ChannelReminderScheduler::new();
    let service = build_risk_service(RiskConfig::default(), reminders, Some(clock.clone()));

    let focus = seed_program(&service, &clock, today)?;
    clock.set(today);

    let dashboard = service.compute_dashboard()?;
    let summary = service.compute_employee_summary(&focus)?;
    let statistics = service.compute_statistics(today.year(), Some(today.month()))?;

    let mut reminders = Vec::new();
    while let Ok(reminder) = receiver.try_recv() {
        reminders.push(reminder);
    }

    if args.json {
        let payload = serde_json::json!({
            "dashboard": dashboard,
            "summary": summary,
            "statistics": statistics,
            "reminders": reminders.len(),
        });
        match serde_json::to_string_pretty(&payload) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => eprintln!("failed to render demo output: {err}"),
        }
        return Ok(());
    }

    render_dashboard(&dashboard);
    println!();
    render_summary(&summary);
    println!();
    render_statistics(&statistics);
    println!();
    println!("Follow-up reminders queued: {}", reminders.len());
    for reminder in reminders {
        println!(
            "  - {} ({}) due {}",
            reminder.worker_id, reminder.intervention_id, reminder.followup_date
        );
    }

    Ok(())
}

/// Seed three employees over the last two months and return the one with the richest history.
fn seed_program(
    service: &RiskService,
    clock: &ScriptClock,
    today: NaiveDate,
) -> Result<EmployeeId, AppError> {
    let days_ago = |days: i64| today - Duration::days(days);

    clock.set(days_ago(60));
    let hearing = service.register(registration(
        "W-1001",
        &[RiskCategory::HearingAbnormality],
        ManagementLevel::Intensive,
        8.5,
    ))?;
    let plan = service.create_plan(PlanDraft {
        employee_id: hearing.id.clone(),
        plan_name: "청력보존 프로그램".to_string(),
        plan_period_start: days_ago(60),
        plan_period_end: today + Duration::days(120),
        primary_goal: "청력 손실 진행 방지".to_string(),
        specific_objectives: vec!["보호구 착용률 100%".to_string()],
        planned_interventions: Vec::new(),
        monitoring_schedule: Default::default(),
        success_criteria: vec!["연간 청력검사 결과 유지".to_string()],
        evaluation_method: Some("특수건강진단 재검".to_string()),
        primary_manager: "nurse-kim".to_string(),
        support_team: vec!["dr-lee".to_string()],
        created_by: "nurse-kim".to_string(),
    })?;
    service.approve_plan(&plan.id, "dr-lee".to_string())?;

    clock.set(days_ago(45));
    let cardio = service.register(registration(
        "W-1002",
        &[RiskCategory::Hypertension, RiskCategory::Diabetes],
        ManagementLevel::Observation,
        6.0,
    ))?;

    clock.set(days_ago(40));
    let stress = service.register(registration(
        "W-1003",
        &[RiskCategory::JobStress],
        ManagementLevel::Observation,
        4.0,
    ))?;

    clock.set(days_ago(30));
    service.record_intervention(intervention(
        &hearing.id,
        InterventionType::Consultation,
        days_ago(30),
        Some(days_ago(3)),
    ))?;
    clock.set(days_ago(20));
    service.record_intervention(intervention(
        &hearing.id,
        InterventionType::ProtectiveEquipment,
        days_ago(20),
        Some(today + Duration::days(7)),
    ))?;
    service.record_intervention(intervention(
        &stress.id,
        InterventionType::StressManagement,
        days_ago(20),
        None,
    ))?;

    for (day, next) in [(24, None), (10, Some(today + Duration::days(4)))] {
        clock.set(days_ago(day));
        service.record_monitoring(MonitoringEntry {
            next_monitoring_date: next,
            next_monitoring_focus: next.map(|_| "보호구 착용 상태 점검".to_string()),
            ..monitoring(&hearing.id, days_ago(day), ImprovementStatus::Improved)
        })?;
    }
    clock.set(days_ago(2));
    service.record_monitoring(monitoring(
        &cardio.id,
        days_ago(2),
        ImprovementStatus::Maintained,
    ))?;

    clock.set(days_ago(5));
    service.resolve(&stress.id, "스트레스 지수 정상화".to_string())?;

    Ok(hearing.id)
}

fn registration(
    worker: &str,
    categories: &[RiskCategory],
    level: ManagementLevel,
    severity: f64,
) -> EmployeeRegistration {
    let primary = categories.first().copied().unwrap_or(RiskCategory::Other);
    EmployeeRegistration {
        worker_id: worker.into(),
        registered_by: "nurse-kim".to_string(),
        risk_categories: categories.iter().copied().collect::<BTreeSet<_>>(),
        primary_risk_category: primary,
        management_level: level,
        detection_source: Some("일반건강진단".to_string()),
        detection_date: None,
        health_exam_id: None,
        risk_factors: Default::default(),
        severity_score: Some(severity),
        work_fitness_status: None,
        work_restrictions: Vec::new(),
        management_goals: None,
        target_improvement_date: None,
    }
}

fn intervention(
    employee_id: &EmployeeId,
    kind: InterventionType,
    day: NaiveDate,
    followup: Option<NaiveDate>,
) -> InterventionEntry {
    InterventionEntry {
        employee_id: employee_id.clone(),
        plan_id: None,
        intervention_type: kind,
        intervention_date: nine_am(day) + Duration::hours(1),
        duration_minutes: Some(30),
        provider_name: "nurse-kim".to_string(),
        provider_role: Some("보건관리자".to_string()),
        content: kind.label().to_string(),
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
        followup_notes: followup.map(|_| "재상담".to_string()),
        created_by: "nurse-kim".to_string(),
    }
}

fn monitoring(
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
        goal_achievement: Some(70.0),
        actions_taken: Vec::new(),
        plan_adjustments: None,
        next_monitoring_date: None,
        next_monitoring_focus: None,
        recorded_by: "nurse-kim".to_string(),
    }
}

fn render_dashboard(dashboard: &RiskDashboard) {
    println!("Risk management dashboard as of {}", dashboard.as_of);
    println!("  Active employees: {}", dashboard.active_employees);
    for entry in &dashboard.by_management_level {
        println!("    {:<8} {}", entry.label, entry.count);
    }
    println!(
        "  This month: {} registered / {} resolved / {} interventions",
        dashboard.new_this_month, dashboard.resolved_this_month, dashboard.interventions_this_month
    );
    println!(
        "  Average management days (resolved): {:.1}",
        dashboard.average_management_days
    );

    println!("  Overdue monitoring:");
    if dashboard.overdue_monitoring.is_empty() {
        println!("    none");
    }
    for entry in &dashboard.overdue_monitoring {
        let last = entry
            .last_monitoring_date
            .map(|date| date.to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "    {} [{}] last {} ({} days)",
            entry.worker_id,
            entry.management_level.label(),
            last,
            entry.days_overdue
        );
    }

    println!("  High severity cases:");
    for case in &dashboard.high_severity_cases {
        println!(
            "    {} {:.1} {}",
            case.worker_id,
            case.severity_score,
            case.primary_risk_category.label()
        );
    }

    println!("  Pending follow-ups:");
    for followup in &dashboard.pending_followups {
        println!(
            "    {} {} due {} ({} days late)",
            followup.employee_id,
            followup.intervention_type.label(),
            followup.followup_date,
            followup.days_overdue
        );
    }
}

fn render_summary(summary: &EmployeeSummary) {
    let employee = &summary.employee;
    println!(
        "Summary for {} ({}, {})",
        employee.worker_id,
        employee.primary_risk_category.label(),
        employee.management_level.label()
    );
    match &summary.current_plan {
        Some(plan) => println!("  Plan: {} [{}]", plan.plan_name, plan.status.label()),
        None => println!("  Plan: none"),
    }
    println!(
        "  Interventions: {} / Monitoring: {} / Trend: {}",
        summary.intervention_count,
        summary.monitoring_count,
        summary.improvement_trend.label()
    );
    println!("  Next actions:");
    for action in &summary.next_actions {
        match action {
            NextAction::Monitoring { date, focus } => println!(
                "    {date} monitoring{}",
                focus
                    .as_deref()
                    .map(|focus| format!(": {focus}"))
                    .unwrap_or_default()
            ),
            NextAction::Followup {
                date,
                intervention_type,
                ..
            } => println!("    {date} follow-up for {}", intervention_type.label()),
        }
    }
}

fn render_statistics(statistics: &RiskStatistics) {
    let period = match statistics.month {
        Some(month) => format!("{}-{:02}", statistics.year, month),
        None => statistics.year.to_string(),
    };
    println!("Statistics for {period}");
    println!(
        "  Registered: {} / Resolved: {} / Active: {}",
        statistics.new_registrations, statistics.resolved_employees, statistics.active_employees
    );
    println!(
        "  Interventions: {} / Monitoring: {} / Improvement rate: {:.1}%",
        statistics.total_interventions, statistics.total_monitoring, statistics.improvement_rate
    );
    for entry in &statistics.by_category {
        println!("    {:<10} {}", entry.label, entry.count);
    }
}
