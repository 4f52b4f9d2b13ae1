use tracing::{debug, info, warn};

use super::classification::{validate_goal_achievement, validate_symptom_severity};
use super::domain::{
    InterventionEntry, InterventionId, MonitoringEntry, MonitoringId, RiskIntervention,
    RiskMonitoring,
};
use super::repository::{
    FollowupReminder, InterventionFilter, MonitoringFilter, Page, ReminderScheduler,
    RiskRepository, StatisticsCache,
};
use super::service::{
    next_intervention_id, next_monitoring_id, RiskManagementService, RiskServiceError,
};

impl<R, N, C> RiskManagementService<R, N, C>
where
    R: RiskRepository + 'static,
    N: ReminderScheduler + 'static,
    C: StatisticsCache + 'static,
{
    /// Append an intervention and hand off its follow-up reminder, if any.
    ///
    /// Reminder scheduling is best effort: a failure is logged and the stored intervention is
    /// still returned.
    pub fn record_intervention(
        &self,
        entry: InterventionEntry,
    ) -> Result<RiskIntervention, RiskServiceError> {
        let employee = self.require_employee(&entry.employee_id)?;
        if !employee.is_active {
            return Err(RiskServiceError::EmployeeNotActive(employee.id));
        }
        if entry.followup_required && entry.followup_date.is_none() {
            return Err(RiskServiceError::FollowupDateRequired);
        }
        if let Some(plan_id) = &entry.plan_id {
            let plan = self.require_plan(plan_id)?;
            if plan.employee_id != employee.id {
                return Err(RiskServiceError::PlanEmployeeMismatch {
                    plan_id: plan.id,
                    employee_id: employee.id,
                });
            }
        }

        let InterventionEntry {
            employee_id,
            plan_id,
            intervention_type,
            intervention_date,
            duration_minutes,
            provider_name,
            provider_role,
            content,
            methods_used,
            materials_provided,
            worker_response,
            engagement_level,
            immediate_outcome,
            issues_identified,
            recommendations,
            referrals_made,
            followup_required,
            followup_date,
            followup_notes,
            created_by,
        } = entry;

        let intervention = RiskIntervention {
            id: next_intervention_id(),
            employee_id,
            plan_id,
            intervention_type,
            intervention_date,
            duration_minutes,
            provider_name,
            provider_role,
            content,
            methods_used,
            materials_provided,
            worker_response,
            engagement_level,
            immediate_outcome,
            issues_identified,
            recommendations,
            referrals_made,
            followup_required,
            followup_date,
            followup_notes,
            created_by,
            created_at: self.now(),
        };
        let stored = self.repository.insert_intervention(intervention)?;

        info!(
            intervention_id = %stored.id,
            employee_id = %stored.employee_id,
            kind = stored.intervention_type.label(),
            "intervention recorded"
        );

        if let (true, Some(followup_date)) = (stored.followup_required, stored.followup_date) {
            let reminder = FollowupReminder {
                worker_id: employee.worker_id,
                employee_id: stored.employee_id.clone(),
                intervention_id: stored.id.clone(),
                followup_date,
                notes: stored.followup_notes.clone(),
            };
            if let Err(err) = self.reminders.schedule(reminder) {
                warn!(intervention_id = %stored.id, error = %err, "follow-up reminder not scheduled");
            }
        }

        Ok(stored)
    }

    pub fn get_intervention(
        &self,
        intervention_id: &InterventionId,
    ) -> Result<RiskIntervention, RiskServiceError> {
        self.repository
            .fetch_intervention(intervention_id)?
            .ok_or_else(|| RiskServiceError::InterventionNotFound(intervention_id.clone()))
    }

    pub fn list_interventions(
        &self,
        filter: &InterventionFilter,
        page: Page,
    ) -> Result<Vec<RiskIntervention>, RiskServiceError> {
        Ok(self.repository.list_interventions(filter, page)?)
    }

    /// Append a monitoring observation. A reported improvement status touches the employee's
    /// `updated_at` and nothing else.
    pub fn record_monitoring(
        &self,
        entry: MonitoringEntry,
    ) -> Result<RiskMonitoring, RiskServiceError> {
        let mut employee = self.require_employee(&entry.employee_id)?;
        if !employee.is_active {
            return Err(RiskServiceError::EmployeeNotActive(employee.id));
        }
        if let Some(percent) = entry.goal_achievement {
            validate_goal_achievement(percent)?;
        }
        if let Some(severity) = entry.symptom_severity {
            validate_symptom_severity(severity)?;
        }

        let MonitoringEntry {
            employee_id,
            monitoring_date,
            monitoring_type,
            health_indicators,
            work_performance,
            incident_count,
            ppe_compliance,
            symptoms_reported,
            symptom_severity,
            lifestyle_factors,
            improvement_status,
            goal_achievement,
            actions_taken,
            plan_adjustments,
            next_monitoring_date,
            next_monitoring_focus,
            recorded_by,
        } = entry;

        let now = self.now();
        let monitoring = RiskMonitoring {
            id: next_monitoring_id(),
            employee_id,
            monitoring_date,
            monitoring_type,
            health_indicators,
            work_performance,
            incident_count,
            ppe_compliance,
            symptoms_reported,
            symptom_severity,
            lifestyle_factors,
            improvement_status,
            goal_achievement,
            actions_taken,
            plan_adjustments,
            next_monitoring_date,
            next_monitoring_focus,
            recorded_by,
            created_at: now,
        };
        let stored = self.repository.insert_monitoring(monitoring)?;

        if stored.improvement_status.is_some() {
            employee.updated_at = now;
            self.repository.update_employee(employee)?;
        }

        debug!(
            monitoring_id = %stored.id,
            employee_id = %stored.employee_id,
            status = ?stored.improvement_status,
            "monitoring recorded"
        );
        Ok(stored)
    }

    pub fn get_monitoring(
        &self,
        monitoring_id: &MonitoringId,
    ) -> Result<RiskMonitoring, RiskServiceError> {
        self.repository
            .fetch_monitoring(monitoring_id)?
            .ok_or_else(|| RiskServiceError::MonitoringNotFound(monitoring_id.clone()))
    }

    pub fn list_monitoring(
        &self,
        filter: &MonitoringFilter,
        page: Page,
    ) -> Result<Vec<RiskMonitoring>, RiskServiceError> {
        Ok(self.repository.list_monitoring(filter, page)?)
    }
}
