//! Registration, resolution, and management plan transitions.
//!
//! ```text
//! [none] --register--> ACTIVE --resolve--> RESOLVED
//! plan: active --approve--> active(approved); active --complete|revise--> completed|revised
//! ```

use tracing::{info, warn};

use super::classification::{
    validate_categories, validate_severity, LevelChange, PlanStatus,
};
use super::domain::{
    AtRiskEmployee, EmployeeId, EmployeePatch, EmployeeRegistration, PlanDraft, PlanId,
    RiskManagementPlan, STATUS_ACTIVE, STATUS_RESOLVED,
};
use super::repository::{
    EmployeeFilter, Page, PlanFilter, ReminderScheduler, RepositoryError, RiskRepository,
    StatisticsCache,
};
use super::service::{next_employee_id, next_plan_id, RiskManagementService, RiskServiceError};

impl<R, N, C> RiskManagementService<R, N, C>
where
    R: RiskRepository + 'static,
    N: ReminderScheduler + 'static,
    C: StatisticsCache + 'static,
{
    /// Register a worker for risk management. Only one active registration per worker.
    pub fn register(
        &self,
        registration: EmployeeRegistration,
    ) -> Result<AtRiskEmployee, RiskServiceError> {
        let worker_id = registration.worker_id.clone();
        let active = self.repository.list_employees(
            &EmployeeFilter {
                worker_id: Some(worker_id.clone()),
                is_active: Some(true),
                ..EmployeeFilter::default()
            },
            Page::new(None, Some(1)),
        )?;
        if !active.is_empty() {
            return Err(RiskServiceError::DuplicateActiveRegistration(worker_id));
        }

        validate_categories(
            &registration.risk_categories,
            registration.primary_risk_category,
        )?;
        if let Some(score) = registration.severity_score {
            validate_severity(score)?;
        }

        let now = self.now();
        let EmployeeRegistration {
            worker_id: _,
            registered_by,
            risk_categories,
            primary_risk_category,
            management_level,
            detection_source,
            detection_date,
            health_exam_id,
            risk_factors,
            severity_score,
            work_fitness_status,
            work_restrictions,
            management_goals,
            target_improvement_date,
        } = registration;

        let employee = AtRiskEmployee {
            id: next_employee_id(),
            worker_id: worker_id.clone(),
            registration_date: now.date(),
            registered_by,
            risk_categories,
            primary_risk_category,
            management_level,
            detection_source,
            detection_date,
            health_exam_id,
            risk_factors,
            severity_score,
            current_status: STATUS_ACTIVE.to_string(),
            work_fitness_status,
            work_restrictions,
            management_goals,
            target_improvement_date,
            is_active: true,
            resolution_date: None,
            resolution_reason: None,
            created_at: now,
            updated_at: now,
        };

        let stored = self
            .repository
            .insert_employee(employee)
            .map_err(|err| match err {
                RepositoryError::Conflict => {
                    RiskServiceError::DuplicateActiveRegistration(worker_id.clone())
                }
                other => other.into(),
            })?;

        info!(
            employee_id = %stored.id,
            worker_id = %stored.worker_id,
            level = stored.management_level.label(),
            "at-risk employee registered"
        );
        Ok(stored)
    }

    pub fn get_employee(&self, employee_id: &EmployeeId) -> Result<AtRiskEmployee, RiskServiceError> {
        self.require_employee(employee_id)
    }

    pub fn list_employees(
        &self,
        filter: &EmployeeFilter,
        page: Page,
    ) -> Result<Vec<AtRiskEmployee>, RiskServiceError> {
        Ok(self.repository.list_employees(filter, page)?)
    }

    /// Apply a partial update to an active or historical record.
    pub fn update_employee(
        &self,
        employee_id: &EmployeeId,
        patch: EmployeePatch,
    ) -> Result<AtRiskEmployee, RiskServiceError> {
        let mut employee = self.require_employee(employee_id)?;
        let previous_level = employee.management_level;

        employee.apply_patch(patch, self.now())?;
        self.repository.update_employee(employee.clone())?;

        let change = previous_level.transition_to(employee.management_level);
        if change != LevelChange::Unchanged {
            info!(
                employee_id = %employee.id,
                from = previous_level.label(),
                to = employee.management_level.label(),
                change = change.label(),
                "management level changed"
            );
        }
        Ok(employee)
    }

    /// Close the risk episode. A second call fails and leaves the record untouched.
    pub fn resolve(
        &self,
        employee_id: &EmployeeId,
        resolution_reason: String,
    ) -> Result<AtRiskEmployee, RiskServiceError> {
        let mut employee = self.require_employee(employee_id)?;
        if !employee.is_active {
            return Err(RiskServiceError::AlreadyResolved(employee_id.clone()));
        }

        let now = self.now();
        employee.is_active = false;
        employee.current_status = STATUS_RESOLVED.to_string();
        employee.resolution_date = Some(now.date());
        employee.resolution_reason = Some(resolution_reason);
        employee.updated_at = now;

        let closed_plans: Vec<RiskManagementPlan> = self
            .active_plans(employee_id)?
            .into_iter()
            .map(|mut plan| {
                plan.status = PlanStatus::Completed;
                plan.updated_at = now;
                plan
            })
            .collect();
        let closed_count = closed_plans.len();

        if let Err(err) = self
            .repository
            .resolve_employee(employee.clone(), closed_plans)
        {
            warn!(employee_id = %employee.id, error = %err, "failed to resolve at-risk employee");
            return Err(err.into());
        }

        info!(
            employee_id = %employee.id,
            days = employee.days_under_management(now.date()),
            closed_plans = closed_count,
            "at-risk employee resolved"
        );
        Ok(employee)
    }

    pub fn create_plan(&self, draft: PlanDraft) -> Result<RiskManagementPlan, RiskServiceError> {
        let employee = self.require_employee(&draft.employee_id)?;
        if !employee.is_active {
            return Err(RiskServiceError::EmployeeNotActive(employee.id));
        }
        if !self.active_plans(&employee.id)?.is_empty() {
            return Err(RiskServiceError::ActivePlanExists(employee.id));
        }
        if draft.plan_period_end <= draft.plan_period_start {
            return Err(RiskServiceError::InvalidPlanPeriod {
                start: draft.plan_period_start,
                end: draft.plan_period_end,
            });
        }

        let now = self.now();
        let PlanDraft {
            employee_id,
            plan_name,
            plan_period_start,
            plan_period_end,
            primary_goal,
            specific_objectives,
            planned_interventions,
            monitoring_schedule,
            success_criteria,
            evaluation_method,
            primary_manager,
            support_team,
            created_by,
        } = draft;

        let plan = RiskManagementPlan {
            id: next_plan_id(),
            employee_id: employee_id.clone(),
            plan_name,
            plan_period_start,
            plan_period_end,
            primary_goal,
            specific_objectives,
            planned_interventions,
            monitoring_schedule,
            success_criteria,
            evaluation_method,
            primary_manager,
            support_team,
            status: PlanStatus::Active,
            created_by,
            approved_by: None,
            approval_date: None,
            created_at: now,
            updated_at: now,
        };

        let stored = self.repository.insert_plan(plan).map_err(|err| match err {
            RepositoryError::Conflict => RiskServiceError::ActivePlanExists(employee_id.clone()),
            other => other.into(),
        })?;

        info!(plan_id = %stored.id, employee_id = %stored.employee_id, "management plan created");
        Ok(stored)
    }

    /// Stamp approver and time once. Re-approval is rejected.
    pub fn approve_plan(
        &self,
        plan_id: &PlanId,
        approver: String,
    ) -> Result<RiskManagementPlan, RiskServiceError> {
        let mut plan = self.require_plan(plan_id)?;
        if plan.status != PlanStatus::Active {
            return Err(RiskServiceError::PlanNotActive {
                plan_id: plan.id,
                status: plan.status,
            });
        }
        if plan.is_approved() {
            return Err(RiskServiceError::PlanAlreadyApproved(plan.id));
        }

        let now = self.now();
        plan.approved_by = Some(approver);
        plan.approval_date = Some(now);
        plan.updated_at = now;
        self.repository.update_plan(plan.clone())?;

        info!(plan_id = %plan.id, approved_by = ?plan.approved_by, "management plan approved");
        Ok(plan)
    }

    pub fn complete_plan(&self, plan_id: &PlanId) -> Result<RiskManagementPlan, RiskServiceError> {
        self.close_plan(plan_id, PlanStatus::Completed)
    }

    /// Mark the plan as superseded so a replacement can be created.
    pub fn revise_plan(&self, plan_id: &PlanId) -> Result<RiskManagementPlan, RiskServiceError> {
        self.close_plan(plan_id, PlanStatus::Revised)
    }

    fn close_plan(
        &self,
        plan_id: &PlanId,
        status: PlanStatus,
    ) -> Result<RiskManagementPlan, RiskServiceError> {
        let mut plan = self.require_plan(plan_id)?;
        if plan.status != PlanStatus::Active {
            return Err(RiskServiceError::PlanNotActive {
                plan_id: plan.id,
                status: plan.status,
            });
        }

        plan.status = status;
        plan.updated_at = self.now();
        self.repository.update_plan(plan.clone())?;

        info!(plan_id = %plan.id, status = status.label(), "management plan closed");
        Ok(plan)
    }

    pub fn get_plan(&self, plan_id: &PlanId) -> Result<RiskManagementPlan, RiskServiceError> {
        self.require_plan(plan_id)
    }

    pub fn list_plans(
        &self,
        filter: &PlanFilter,
        page: Page,
    ) -> Result<Vec<RiskManagementPlan>, RiskServiceError> {
        Ok(self.repository.list_plans(filter, page)?)
    }

    pub fn active_plan(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Option<RiskManagementPlan>, RiskServiceError> {
        Ok(self.active_plans(employee_id)?.into_iter().next())
    }

    fn active_plans(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Vec<RiskManagementPlan>, RiskServiceError> {
        Ok(self.repository.list_plans(
            &PlanFilter {
                employee_id: Some(employee_id.clone()),
                status: Some(PlanStatus::Active),
            },
            Page::all(),
        )?)
    }
}
