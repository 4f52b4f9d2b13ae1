use chrono::NaiveDate;

use super::super::classification::{ImprovementStatus, ImprovementTrend};
use super::super::domain::{EmployeeId, RiskIntervention, RiskMonitoring};
use super::super::repository::{
    InterventionFilter, MonitoringFilter, Page, ReminderScheduler, RiskRepository,
    StatisticsCache,
};
use super::super::service::{RiskManagementService, RiskServiceError};
use super::views::{EmployeeSummary, NextAction};

const RECENT_INTERVENTIONS: usize = 5;
const UPCOMING_FOLLOWUPS: usize = 3;

/// Trend from the two most recent improvement statuses, newest first.
///
/// A record without a status still counts toward the two; it simply never matches.
pub fn classify_trend(recent: &[Option<ImprovementStatus>]) -> ImprovementTrend {
    match recent {
        [Some(ImprovementStatus::Improved), Some(ImprovementStatus::Improved), ..] => {
            ImprovementTrend::Improving
        }
        [Some(ImprovementStatus::Worsened), Some(ImprovementStatus::Worsened), ..] => {
            ImprovementTrend::Worsening
        }
        [_, _, ..] => ImprovementTrend::Plateaued,
        _ => ImprovementTrend::Evaluating,
    }
}

/// Next monitoring date of the latest record followed by up to three upcoming follow-ups.
pub fn next_actions(
    latest_monitoring: Option<&RiskMonitoring>,
    interventions: &[RiskIntervention],
    today: NaiveDate,
) -> Vec<NextAction> {
    let mut actions = Vec::new();
    if let Some(record) = latest_monitoring {
        if let Some(date) = record.next_monitoring_date {
            actions.push(NextAction::Monitoring {
                date,
                focus: record.next_monitoring_focus.clone(),
            });
        }
    }

    let mut upcoming: Vec<&RiskIntervention> = interventions
        .iter()
        .filter(|intervention| intervention.followup_required)
        .filter(|intervention| intervention.followup_date.map_or(false, |due| due >= today))
        .collect();
    upcoming.sort_by_key(|intervention| intervention.followup_date);

    actions.extend(
        upcoming
            .into_iter()
            .take(UPCOMING_FOLLOWUPS)
            .filter_map(|intervention| {
                Some(NextAction::Followup {
                    date: intervention.followup_date?,
                    intervention_id: intervention.id.clone(),
                    intervention_type: intervention.intervention_type,
                    notes: intervention.followup_notes.clone(),
                })
            }),
    );
    actions
}

impl<R, N, C> RiskManagementService<R, N, C>
where
    R: RiskRepository + 'static,
    N: ReminderScheduler + 'static,
    C: StatisticsCache + 'static,
{
    pub fn compute_employee_summary(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<EmployeeSummary, RiskServiceError> {
        let employee = self.require_employee(employee_id)?;
        let current_plan = self.active_plan(employee_id)?;

        let interventions = self.repository.list_interventions(
            &InterventionFilter {
                employee_id: Some(employee_id.clone()),
                ..InterventionFilter::default()
            },
            Page::all(),
        )?;
        let monitoring = self.repository.list_monitoring(
            &MonitoringFilter {
                employee_id: Some(employee_id.clone()),
                ..MonitoringFilter::default()
            },
            Page::all(),
        )?;

        let statuses: Vec<Option<ImprovementStatus>> = monitoring
            .iter()
            .take(2)
            .map(|record| record.improvement_status)
            .collect();
        let latest_monitoring = monitoring.first().cloned();
        let next_actions = next_actions(latest_monitoring.as_ref(), &interventions, self.today());

        Ok(EmployeeSummary {
            employee,
            current_plan,
            recent_interventions: interventions
                .iter()
                .take(RECENT_INTERVENTIONS)
                .cloned()
                .collect(),
            latest_monitoring,
            improvement_trend: classify_trend(&statuses),
            next_actions,
            intervention_count: interventions.len(),
            monitoring_count: monitoring.len(),
        })
    }
}
