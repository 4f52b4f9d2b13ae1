//! In-process adapters for the risk storage, cache, and reminder seams.
//!
//! Used by the demo service, local development, and tests. The repository enforces the same
//! uniqueness rules a relational store would carry as partial unique indexes.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use super::classification::PlanStatus;
use super::domain::{
    AtRiskEmployee, EmployeeId, InterventionId, MonitoringId, PlanId, RiskIntervention,
    RiskManagementPlan, RiskMonitoring,
};
use super::report::RiskStatistics;
use super::repository::{
    CacheError, EmployeeFilter, FollowupReminder, InterventionFilter, MonitoringFilter, Page,
    PlanFilter, ReminderError, ReminderScheduler, RepositoryError, RiskRepository,
    StatisticsCache,
};

#[derive(Debug, Default)]
struct RiskStore {
    employees: Vec<AtRiskEmployee>,
    plans: Vec<RiskManagementPlan>,
    interventions: Vec<RiskIntervention>,
    monitoring: Vec<RiskMonitoring>,
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryRiskRepository {
    store: Arc<Mutex<RiskStore>>,
}

impl InMemoryRiskRepository {
    fn lock(&self) -> Result<MutexGuard<'_, RiskStore>, RepositoryError> {
        self.store
            .lock()
            .map_err(|_| RepositoryError::Unavailable("risk store mutex poisoned".to_string()))
    }
}

fn active_worker_taken(store: &RiskStore, employee: &AtRiskEmployee) -> bool {
    employee.is_active
        && store.employees.iter().any(|existing| {
            existing.id != employee.id
                && existing.is_active
                && existing.worker_id == employee.worker_id
        })
}

fn active_plan_taken(store: &RiskStore, plan: &RiskManagementPlan) -> bool {
    plan.status == PlanStatus::Active
        && store.plans.iter().any(|existing| {
            existing.id != plan.id
                && existing.status == PlanStatus::Active
                && existing.employee_id == plan.employee_id
        })
}

impl RiskRepository for InMemoryRiskRepository {
    fn insert_employee(&self, employee: AtRiskEmployee) -> Result<AtRiskEmployee, RepositoryError> {
        let mut store = self.lock()?;
        if store.employees.iter().any(|existing| existing.id == employee.id)
            || active_worker_taken(&store, &employee)
        {
            return Err(RepositoryError::Conflict);
        }
        store.employees.push(employee.clone());
        Ok(employee)
    }

    fn update_employee(&self, employee: AtRiskEmployee) -> Result<(), RepositoryError> {
        let mut store = self.lock()?;
        if active_worker_taken(&store, &employee) {
            return Err(RepositoryError::Conflict);
        }
        let slot = store
            .employees
            .iter_mut()
            .find(|existing| existing.id == employee.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = employee;
        Ok(())
    }

    fn resolve_employee(
        &self,
        employee: AtRiskEmployee,
        closed_plans: Vec<RiskManagementPlan>,
    ) -> Result<(), RepositoryError> {
        let mut store = self.lock()?;
        if active_worker_taken(&store, &employee)
            || closed_plans.iter().any(|plan| active_plan_taken(&store, plan))
        {
            return Err(RepositoryError::Conflict);
        }
        let employee_slot = store
            .employees
            .iter()
            .position(|existing| existing.id == employee.id)
            .ok_or(RepositoryError::NotFound)?;
        let plan_slots = closed_plans
            .iter()
            .map(|plan| {
                store
                    .plans
                    .iter()
                    .position(|existing| existing.id == plan.id)
                    .ok_or(RepositoryError::NotFound)
            })
            .collect::<Result<Vec<_>, _>>()?;

        store.employees[employee_slot] = employee;
        for (slot, plan) in plan_slots.into_iter().zip(closed_plans) {
            store.plans[slot] = plan;
        }
        Ok(())
    }

    fn fetch_employee(&self, id: &EmployeeId) -> Result<Option<AtRiskEmployee>, RepositoryError> {
        let store = self.lock()?;
        Ok(store.employees.iter().find(|record| &record.id == id).cloned())
    }

    fn list_employees(
        &self,
        filter: &EmployeeFilter,
        page: Page,
    ) -> Result<Vec<AtRiskEmployee>, RepositoryError> {
        let store = self.lock()?;
        let mut matches: Vec<AtRiskEmployee> = store
            .employees
            .iter()
            .rev()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();
        matches.sort_by_key(|record| Reverse(record.registration_date));
        Ok(page.apply(matches))
    }

    fn insert_plan(&self, plan: RiskManagementPlan) -> Result<RiskManagementPlan, RepositoryError> {
        let mut store = self.lock()?;
        if store.plans.iter().any(|existing| existing.id == plan.id)
            || active_plan_taken(&store, &plan)
        {
            return Err(RepositoryError::Conflict);
        }
        store.plans.push(plan.clone());
        Ok(plan)
    }

    fn update_plan(&self, plan: RiskManagementPlan) -> Result<(), RepositoryError> {
        let mut store = self.lock()?;
        if active_plan_taken(&store, &plan) {
            return Err(RepositoryError::Conflict);
        }
        let slot = store
            .plans
            .iter_mut()
            .find(|existing| existing.id == plan.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = plan;
        Ok(())
    }

    fn fetch_plan(&self, id: &PlanId) -> Result<Option<RiskManagementPlan>, RepositoryError> {
        let store = self.lock()?;
        Ok(store.plans.iter().find(|plan| &plan.id == id).cloned())
    }

    fn list_plans(
        &self,
        filter: &PlanFilter,
        page: Page,
    ) -> Result<Vec<RiskManagementPlan>, RepositoryError> {
        let store = self.lock()?;
        let mut matches: Vec<RiskManagementPlan> = store
            .plans
            .iter()
            .rev()
            .filter(|plan| filter.matches(plan))
            .cloned()
            .collect();
        matches.sort_by_key(|plan| Reverse(plan.plan_period_start));
        Ok(page.apply(matches))
    }

    fn insert_intervention(
        &self,
        intervention: RiskIntervention,
    ) -> Result<RiskIntervention, RepositoryError> {
        let mut store = self.lock()?;
        if store
            .interventions
            .iter()
            .any(|existing| existing.id == intervention.id)
        {
            return Err(RepositoryError::Conflict);
        }
        store.interventions.push(intervention.clone());
        Ok(intervention)
    }

    fn fetch_intervention(
        &self,
        id: &InterventionId,
    ) -> Result<Option<RiskIntervention>, RepositoryError> {
        let store = self.lock()?;
        Ok(store
            .interventions
            .iter()
            .find(|intervention| &intervention.id == id)
            .cloned())
    }

    fn list_interventions(
        &self,
        filter: &InterventionFilter,
        page: Page,
    ) -> Result<Vec<RiskIntervention>, RepositoryError> {
        let store = self.lock()?;
        let mut matches: Vec<RiskIntervention> = store
            .interventions
            .iter()
            .rev()
            .filter(|intervention| filter.matches(intervention))
            .cloned()
            .collect();
        matches.sort_by_key(|intervention| Reverse(intervention.intervention_date));
        Ok(page.apply(matches))
    }

    fn insert_monitoring(
        &self,
        monitoring: RiskMonitoring,
    ) -> Result<RiskMonitoring, RepositoryError> {
        let mut store = self.lock()?;
        if store
            .monitoring
            .iter()
            .any(|existing| existing.id == monitoring.id)
        {
            return Err(RepositoryError::Conflict);
        }
        store.monitoring.push(monitoring.clone());
        Ok(monitoring)
    }

    fn fetch_monitoring(
        &self,
        id: &MonitoringId,
    ) -> Result<Option<RiskMonitoring>, RepositoryError> {
        let store = self.lock()?;
        Ok(store
            .monitoring
            .iter()
            .find(|monitoring| &monitoring.id == id)
            .cloned())
    }

    fn list_monitoring(
        &self,
        filter: &MonitoringFilter,
        page: Page,
    ) -> Result<Vec<RiskMonitoring>, RepositoryError> {
        let store = self.lock()?;
        // Reverse insertion order first so the stable sort keeps later records ahead on ties.
        let mut matches: Vec<RiskMonitoring> = store
            .monitoring
            .iter()
            .rev()
            .filter(|monitoring| filter.matches(monitoring))
            .cloned()
            .collect();
        matches.sort_by_key(|monitoring| Reverse(monitoring.monitoring_date));
        Ok(page.apply(matches))
    }
}

/// Statistics cache holding each entry until its own deadline.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStatisticsCache {
    entries: Arc<Mutex<HashMap<String, (Instant, RiskStatistics)>>>,
}

impl InMemoryStatisticsCache {
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StatisticsCache for InMemoryStatisticsCache {
    fn get(&self, key: &str) -> Result<Option<RiskStatistics>, CacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CacheError::Unavailable("cache mutex poisoned".to_string()))?;
        match entries.get(key) {
            Some((deadline, value)) if *deadline > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: RiskStatistics, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CacheError::Unavailable("cache mutex poisoned".to_string()))?;
        let deadline = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| CacheError::Unavailable(format!("ttl {ttl:?} out of range")))?;
        entries.insert(key.to_string(), (deadline, value));
        Ok(())
    }
}

/// Hands reminders to a background task over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelReminderScheduler {
    sender: mpsc::UnboundedSender<FollowupReminder>,
}

impl ChannelReminderScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FollowupReminder>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ReminderScheduler for ChannelReminderScheduler {
    fn schedule(&self, reminder: FollowupReminder) -> Result<(), ReminderError> {
        self.sender
            .send(reminder)
            .map_err(|_| ReminderError::QueueClosed)
    }
}

/// Drain reminders and log them until every sender is dropped. Requires a tokio runtime.
pub fn spawn_reminder_worker(
    mut receiver: mpsc::UnboundedReceiver<FollowupReminder>,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut delivered = 0;
        while let Some(reminder) = receiver.recv().await {
            delivered += 1;
            info!(
                worker_id = %reminder.worker_id,
                employee_id = %reminder.employee_id,
                intervention_id = %reminder.intervention_id,
                followup_date = %reminder.followup_date,
                "follow-up reminder scheduled"
            );
        }
        delivered
    })
}

/// Scheduler that drops every reminder.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReminderScheduler;

impl ReminderScheduler for NoopReminderScheduler {
    fn schedule(&self, _reminder: FollowupReminder) -> Result<(), ReminderError> {
        Ok(())
    }
}
