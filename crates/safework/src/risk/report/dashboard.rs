use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use chrono::{Datelike, NaiveDate};

use super::super::domain::{AtRiskEmployee, EmployeeId, RiskIntervention};
use super::super::repository::{
    EmployeeFilter, InterventionFilter, MonitoringFilter, Page, ReminderScheduler,
    RiskRepository, StatisticsCache,
};
use super::super::service::{RiskManagementService, RiskServiceError};
use super::statistics::{category_breakdown, level_breakdown, round_one_decimal, ReportingPeriod};
use super::views::{HighSeverityCase, OverdueMonitoringEntry, PendingFollowup, RiskDashboard};

/// Active employees without a monitoring record inside the last `window_days`, most overdue
/// first. Never-monitored employees count from their registration date.
pub fn overdue_entries(
    employees: &[AtRiskEmployee],
    last_monitored: &HashMap<EmployeeId, NaiveDate>,
    today: NaiveDate,
    window_days: i64,
) -> Vec<OverdueMonitoringEntry> {
    let mut entries: Vec<OverdueMonitoringEntry> = employees
        .iter()
        .filter(|employee| employee.is_active)
        .filter_map(|employee| {
            let last = last_monitored.get(&employee.id).copied();
            let since = last.unwrap_or(employee.registration_date);
            let days_overdue = (today - since).num_days();
            (days_overdue > window_days).then(|| OverdueMonitoringEntry {
                employee_id: employee.id.clone(),
                worker_id: employee.worker_id.clone(),
                management_level: employee.management_level,
                last_monitoring_date: last,
                days_overdue,
            })
        })
        .collect();

    entries.sort_by_key(|entry| Reverse(entry.days_overdue));
    entries
}

pub fn high_severity_cases(employees: &[AtRiskEmployee], threshold: f64) -> Vec<HighSeverityCase> {
    let mut cases: Vec<HighSeverityCase> = employees
        .iter()
        .filter(|employee| employee.is_active)
        .filter_map(|employee| {
            let score = employee.severity_score?;
            (score >= threshold).then(|| HighSeverityCase {
                employee_id: employee.id.clone(),
                worker_id: employee.worker_id.clone(),
                severity_score: score,
                primary_risk_category: employee.primary_risk_category,
                management_level: employee.management_level,
            })
        })
        .collect();

    cases.sort_by(|left, right| right.severity_score.total_cmp(&left.severity_score));
    cases
}

/// Follow-ups due on or before `today`, oldest due date first.
pub fn pending_followups(
    interventions: &[RiskIntervention],
    today: NaiveDate,
) -> Vec<PendingFollowup> {
    let mut pending: Vec<PendingFollowup> = interventions
        .iter()
        .filter(|intervention| intervention.followup_required)
        .filter_map(|intervention| {
            let due = intervention.followup_date?;
            (due <= today).then(|| PendingFollowup {
                intervention_id: intervention.id.clone(),
                employee_id: intervention.employee_id.clone(),
                intervention_type: intervention.intervention_type,
                followup_date: due,
                followup_notes: intervention.followup_notes.clone(),
                days_overdue: (today - due).num_days(),
            })
        })
        .collect();

    pending.sort_by_key(|followup| followup.followup_date);
    pending
}

/// Mean of `resolution_date - registration_date` over resolved employees, or 0.0 if none.
pub fn average_management_days(employees: &[AtRiskEmployee]) -> f64 {
    let durations: Vec<i64> = employees
        .iter()
        .filter_map(|employee| {
            employee
                .resolution_date
                .map(|resolved| (resolved - employee.registration_date).num_days())
        })
        .collect();

    if durations.is_empty() {
        return 0.0;
    }
    round_one_decimal(durations.iter().sum::<i64>() as f64 / durations.len() as f64)
}

impl<R, N, C> RiskManagementService<R, N, C>
where
    R: RiskRepository + 'static,
    N: ReminderScheduler + 'static,
    C: StatisticsCache + 'static,
{
    /// Snapshot of the program as of today. Lists are capped at the configured limit.
    pub fn compute_dashboard(&self) -> Result<RiskDashboard, RiskServiceError> {
        let today = self.today();
        let limit = self.config.dashboard_list_limit;
        let month = ReportingPeriod::month_of(today).ok_or(RiskServiceError::InvalidPeriod {
            year: today.year(),
            month: Some(today.month()),
        })?;

        let employees = self
            .repository
            .list_employees(&EmployeeFilter::default(), Page::all())?;
        let active: Vec<AtRiskEmployee> = employees
            .iter()
            .filter(|employee| employee.is_active)
            .cloned()
            .collect();

        let new_this_month = employees
            .iter()
            .filter(|employee| month.contains(employee.registration_date))
            .count();
        let resolved_this_month = employees
            .iter()
            .filter(|employee| {
                employee
                    .resolution_date
                    .map_or(false, |resolved| month.contains(resolved))
            })
            .count();
        let interventions_this_month = self
            .repository
            .list_interventions(
                &InterventionFilter {
                    from: Some(month.start),
                    to: Some(month.end),
                    ..InterventionFilter::default()
                },
                Page::all(),
            )?
            .len();

        let mut overdue = self.overdue_for(&active, today, self.config.overdue_monitoring_days)?;
        overdue.truncate(limit);

        let mut high_severity =
            high_severity_cases(&active, self.config.high_severity_threshold);
        high_severity.truncate(limit);

        let followups = self.repository.list_interventions(
            &InterventionFilter {
                followup_required: Some(true),
                ..InterventionFilter::default()
            },
            Page::all(),
        )?;
        let active_ids: HashSet<&EmployeeId> = active.iter().map(|employee| &employee.id).collect();
        let followups: Vec<RiskIntervention> = followups
            .into_iter()
            .filter(|intervention| active_ids.contains(&intervention.employee_id))
            .collect();
        let mut pending = pending_followups(&followups, today);
        pending.truncate(limit);

        Ok(RiskDashboard {
            as_of: today,
            active_employees: active.len(),
            by_management_level: level_breakdown(&active),
            by_category: category_breakdown(&active),
            new_this_month,
            resolved_this_month,
            interventions_this_month,
            overdue_monitoring: overdue,
            high_severity_cases: high_severity,
            pending_followups: pending,
            average_management_days: average_management_days(&employees),
        })
    }

    /// Uncapped overdue list. `days` overrides the configured window.
    pub fn overdue_monitoring(
        &self,
        days: Option<i64>,
    ) -> Result<Vec<OverdueMonitoringEntry>, RiskServiceError> {
        let window = days.unwrap_or(self.config.overdue_monitoring_days);
        if window < 0 {
            return Err(RiskServiceError::InvalidOverdueWindow(window));
        }
        let active = self
            .repository
            .list_employees(&EmployeeFilter::active(), Page::all())?;
        self.overdue_for(&active, self.today(), window)
    }

    fn overdue_for(
        &self,
        active: &[AtRiskEmployee],
        today: NaiveDate,
        window_days: i64,
    ) -> Result<Vec<OverdueMonitoringEntry>, RiskServiceError> {
        let monitoring = self
            .repository
            .list_monitoring(&MonitoringFilter::default(), Page::all())?;
        let mut last_monitored: HashMap<EmployeeId, NaiveDate> = HashMap::new();
        for record in monitoring {
            last_monitored
                .entry(record.employee_id)
                .and_modify(|date| *date = (*date).max(record.monitoring_date))
                .or_insert(record.monitoring_date);
        }
        Ok(overdue_entries(active, &last_monitored, today, window_days))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::risk::classification::{ManagementLevel, RiskCategory};
    use crate::risk::domain::{RiskFactors, WorkerId, STATUS_ACTIVE};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn employee(id: &str, registered: NaiveDate, severity: Option<f64>) -> AtRiskEmployee {
        let stamp = registered.and_hms_opt(9, 0, 0).expect("valid time");
        AtRiskEmployee {
            id: EmployeeId::from(id),
            worker_id: WorkerId::from(format!("w-{id}").as_str()),
            registration_date: registered,
            registered_by: "nurse".to_string(),
            risk_categories: BTreeSet::from([RiskCategory::Hypertension]),
            primary_risk_category: RiskCategory::Hypertension,
            management_level: ManagementLevel::Observation,
            detection_source: None,
            detection_date: None,
            health_exam_id: None,
            risk_factors: RiskFactors::default(),
            severity_score: severity,
            current_status: STATUS_ACTIVE.to_string(),
            work_fitness_status: None,
            work_restrictions: Vec::new(),
            management_goals: None,
            target_improvement_date: None,
            is_active: true,
            resolution_date: None,
            resolution_reason: None,
            created_at: stamp,
            updated_at: stamp,
        }
    }

    #[test]
    fn overdue_counts_from_last_monitoring_or_registration() {
        let today = date(2024, 5, 20);
        let monitored = employee("a", date(2024, 1, 10), None);
        let fresh = employee("b", date(2024, 1, 10), None);
        let never = employee("c", date(2024, 5, 1), None);
        let recent_registration = employee("d", date(2024, 5, 18), None);

        let last = HashMap::from([
            (monitored.id.clone(), date(2024, 5, 10)),
            (fresh.id.clone(), date(2024, 5, 15)),
        ]);
        let entries = overdue_entries(
            &[monitored, fresh, never, recent_registration],
            &last,
            today,
            7,
        );

        let ids: Vec<&str> = entries.iter().map(|entry| entry.employee_id.0.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert_eq!(entries[0].days_overdue, 19);
        assert_eq!(entries[0].last_monitoring_date, None);
        assert_eq!(entries[1].days_overdue, 10);
    }

    #[test]
    fn monitoring_exactly_at_window_edge_is_not_overdue() {
        let today = date(2024, 5, 20);
        let record = employee("a", date(2024, 1, 1), None);
        let last = HashMap::from([(record.id.clone(), date(2024, 5, 13))]);
        assert!(overdue_entries(&[record], &last, today, 7).is_empty());
    }

    #[test]
    fn high_severity_is_inclusive_and_sorted() {
        let cases = high_severity_cases(
            &[
                employee("a", date(2024, 1, 1), Some(8.0)),
                employee("b", date(2024, 1, 1), Some(9.5)),
                employee("c", date(2024, 1, 1), Some(7.9)),
                employee("d", date(2024, 1, 1), None),
            ],
            8.0,
        );
        let scores: Vec<f64> = cases.iter().map(|case| case.severity_score).collect();
        assert_eq!(scores, vec![9.5, 8.0]);
    }

    #[test]
    fn average_is_zero_without_resolutions() {
        let mut resolved = employee("a", date(2024, 1, 1), None);
        resolved.is_active = false;
        resolved.resolution_date = Some(date(2024, 1, 31));
        let mut other = employee("b", date(2024, 2, 1), None);
        other.is_active = false;
        other.resolution_date = Some(date(2024, 2, 11));

        assert_eq!(average_management_days(&[]), 0.0);
        assert_eq!(average_management_days(&[resolved, other]), 20.0);
    }
}
