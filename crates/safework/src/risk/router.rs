use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::classification::{
    ImprovementStatus, InterventionType, ManagementLevel, PlanStatus, RiskCategory,
};
use super::domain::{
    EmployeeId, EmployeePatch, EmployeeRegistration, InterventionEntry, InterventionId,
    MonitoringEntry, MonitoringId, PlanDraft, PlanId, WorkerId,
};
use super::repository::{
    EmployeeFilter, InterventionFilter, MonitoringFilter, Page, PlanFilter, ReminderScheduler,
    RiskRepository, StatisticsCache,
};
use super::service::{ErrorKind, RiskManagementService, RiskServiceError};

pub const BASE_PATH: &str = "/api/v1/at-risk-employees";

type SharedService<R, N, C> = Arc<RiskManagementService<R, N, C>>;

/// Router exposing the risk management endpoints under [`BASE_PATH`].
pub fn risk_router<R, N, C>(service: SharedService<R, N, C>) -> Router
where
    R: RiskRepository + 'static,
    N: ReminderScheduler + 'static,
    C: StatisticsCache + 'static,
{
    let routes = Router::new()
        .route(
            "/",
            post(register_handler::<R, N, C>).get(list_employees_handler::<R, N, C>),
        )
        .route("/dashboard", get(dashboard_handler::<R, N, C>))
        .route("/statistics/:year", get(statistics_handler::<R, N, C>))
        .route(
            "/management-plans",
            post(create_plan_handler::<R, N, C>).get(list_plans_handler::<R, N, C>),
        )
        .route("/management-plans/:plan_id", get(get_plan_handler::<R, N, C>))
        .route(
            "/management-plans/:plan_id/approve",
            post(approve_plan_handler::<R, N, C>),
        )
        .route(
            "/management-plans/:plan_id/complete",
            post(complete_plan_handler::<R, N, C>),
        )
        .route(
            "/management-plans/:plan_id/revise",
            post(revise_plan_handler::<R, N, C>),
        )
        .route(
            "/interventions",
            post(record_intervention_handler::<R, N, C>)
                .get(list_interventions_handler::<R, N, C>),
        )
        .route(
            "/interventions/:intervention_id",
            get(get_intervention_handler::<R, N, C>),
        )
        .route(
            "/monitoring",
            post(record_monitoring_handler::<R, N, C>).get(list_monitoring_handler::<R, N, C>),
        )
        .route("/monitoring/overdue", get(overdue_handler::<R, N, C>))
        .route(
            "/monitoring/:monitoring_id",
            get(get_monitoring_handler::<R, N, C>),
        )
        .route(
            "/:employee_id",
            get(get_employee_handler::<R, N, C>).put(update_employee_handler::<R, N, C>),
        )
        .route("/:employee_id/resolve", post(resolve_handler::<R, N, C>))
        .route("/:employee_id/summary", get(summary_handler::<R, N, C>));

    Router::new().nest(BASE_PATH, routes).with_state(service)
}

impl IntoResponse for RiskServiceError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = match kind {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = if kind == ErrorKind::Internal {
            error!(error = %self, "risk management request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let payload = json!({
            "error": message,
            "kind": kind,
        });
        (status, Json(payload)).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct EmployeeQuery {
    worker_id: Option<String>,
    is_active: Option<bool>,
    management_level: Option<ManagementLevel>,
    risk_category: Option<RiskCategory>,
    registered_from: Option<NaiveDate>,
    registered_to: Option<NaiveDate>,
    skip: Option<usize>,
    limit: Option<usize>,
}

impl EmployeeQuery {
    fn into_parts(self) -> (EmployeeFilter, Page) {
        let filter = EmployeeFilter {
            worker_id: self.worker_id.map(WorkerId),
            is_active: self.is_active,
            management_level: self.management_level,
            risk_category: self.risk_category,
            registered_from: self.registered_from,
            registered_to: self.registered_to,
        };
        (filter, Page::new(self.skip, self.limit))
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PlanQuery {
    employee_id: Option<String>,
    status: Option<PlanStatus>,
    skip: Option<usize>,
    limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct InterventionQuery {
    employee_id: Option<String>,
    plan_id: Option<String>,
    intervention_type: Option<InterventionType>,
    followup_required: Option<bool>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    skip: Option<usize>,
    limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MonitoringQuery {
    employee_id: Option<String>,
    improvement_status: Option<ImprovementStatus>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    skip: Option<usize>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResolveRequest {
    pub resolution_reason: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApprovalRequest {
    pub approved_by: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct StatisticsQuery {
    month: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OverdueQuery {
    days: Option<i64>,
}

pub(crate) async fn register_handler<R, N, C>(
    State(service): State<SharedService<R, N, C>>,
    Json(registration): Json<EmployeeRegistration>,
) -> Result<Response, RiskServiceError>
where
    R: RiskRepository + 'static,
    N: ReminderScheduler + 'static,
    C: StatisticsCache + 'static,
{
    let employee = service.register(registration)?;
    Ok((StatusCode::CREATED, Json(employee)).into_response())
}

pub(crate) async fn list_employees_handler<R, N, C>(
    State(service): State<SharedService<R, N, C>>,
    Query(query): Query<EmployeeQuery>,
) -> Result<Response, RiskServiceError>
where
    R: RiskRepository + 'static,
    N: ReminderScheduler + 'static,
    C: StatisticsCache + 'static,
{
    let (filter, page) = query.into_parts();
    let employees = service.list_employees(&filter, page)?;
    Ok(Json(employees).into_response())
}

pub(crate) async fn get_employee_handler<R, N, C>(
    State(service): State<SharedService<R, N, C>>,
    Path(employee_id): Path<String>,
) -> Result<Response, RiskServiceError>
where
    R: RiskRepository + 'static,
    N: ReminderScheduler + 'static,
    C: StatisticsCache + 'static,
{
    let employee = service.get_employee(&EmployeeId(employee_id))?;
    Ok(Json(employee).into_response())
}

pub(crate) async fn update_employee_handler<R, N, C>(
    State(service): State<SharedService<R, N, C>>,
    Path(employee_id): Path<String>,
    Json(patch): Json<EmployeePatch>,
) -> Result<Response, RiskServiceError>
where
    R: RiskRepository + 'static,
    N: ReminderScheduler + 'static,
    C: StatisticsCache + 'static,
{
    let employee = service.update_employee(&EmployeeId(employee_id), patch)?;
    Ok(Json(employee).into_response())
}

pub(crate) async fn resolve_handler<R, N, C>(
    State(service): State<SharedService<R, N, C>>,
    Path(employee_id): Path<String>,
    Json(request): Json<ResolveRequest>,
) -> Result<Response, RiskServiceError>
where
    R: RiskRepository + 'static,
    N: ReminderScheduler + 'static,
    C: StatisticsCache + 'static,
{
    let employee = service.resolve(&EmployeeId(employee_id), request.resolution_reason)?;
    Ok(Json(employee).into_response())
}

pub(crate) async fn summary_handler<R, N, C>(
    State(service): State<SharedService<R, N, C>>,
    Path(employee_id): Path<String>,
) -> Result<Response, RiskServiceError>
where
    R: RiskRepository + 'static,
    N: ReminderScheduler + 'static,
    C: StatisticsCache + 'static,
{
    let summary = service.compute_employee_summary(&EmployeeId(employee_id))?;
    Ok(Json(summary).into_response())
}

pub(crate) async fn statistics_handler<R, N, C>(
    State(service): State<SharedService<R, N, C>>,
    Path(year): Path<i32>,
    Query(query): Query<StatisticsQuery>,
) -> Result<Response, RiskServiceError>
where
    R: RiskRepository + 'static,
    N: ReminderScheduler + 'static,
    C: StatisticsCache + 'static,
{
    let statistics = service.compute_statistics(year, query.month)?;
    Ok(Json(statistics).into_response())
}

pub(crate) async fn dashboard_handler<R, N, C>(
    State(service): State<SharedService<R, N, C>>,
) -> Result<Response, RiskServiceError>
where
    R: RiskRepository + 'static,
    N: ReminderScheduler + 'static,
    C: StatisticsCache + 'static,
{
    let dashboard = service.compute_dashboard()?;
    Ok(Json(dashboard).into_response())
}

pub(crate) async fn create_plan_handler<R, N, C>(
    State(service): State<SharedService<R, N, C>>,
    Json(draft): Json<PlanDraft>,
) -> Result<Response, RiskServiceError>
where
    R: RiskRepository + 'static,
    N: ReminderScheduler + 'static,
    C: StatisticsCache + 'static,
{
    let plan = service.create_plan(draft)?;
    Ok((StatusCode::CREATED, Json(plan)).into_response())
}

pub(crate) async fn list_plans_handler<R, N, C>(
    State(service): State<SharedService<R, N, C>>,
    Query(query): Query<PlanQuery>,
) -> Result<Response, RiskServiceError>
where
    R: RiskRepository + 'static,
    N: ReminderScheduler + 'static,
    C: StatisticsCache + 'static,
{
    let filter = PlanFilter {
        employee_id: query.employee_id.map(EmployeeId),
        status: query.status,
    };
    let plans = service.list_plans(&filter, Page::new(query.skip, query.limit))?;
    Ok(Json(plans).into_response())
}

pub(crate) async fn get_plan_handler<R, N, C>(
    State(service): State<SharedService<R, N, C>>,
    Path(plan_id): Path<String>,
) -> Result<Response, RiskServiceError>
where
    R: RiskRepository + 'static,
    N: ReminderScheduler + 'static,
    C: StatisticsCache + 'static,
{
    let plan = service.get_plan(&PlanId(plan_id))?;
    Ok(Json(plan).into_response())
}

pub(crate) async fn approve_plan_handler<R, N, C>(
    State(service): State<SharedService<R, N, C>>,
    Path(plan_id): Path<String>,
    Json(request): Json<ApprovalRequest>,
) -> Result<Response, RiskServiceError>
where
    R: RiskRepository + 'static,
    N: ReminderScheduler + 'static,
    C: StatisticsCache + 'static,
{
    let plan = service.approve_plan(&PlanId(plan_id), request.approved_by)?;
    Ok(Json(plan).into_response())
}

pub(crate) async fn complete_plan_handler<R, N, C>(
    State(service): State<SharedService<R, N, C>>,
    Path(plan_id): Path<String>,
) -> Result<Response, RiskServiceError>
where
    R: RiskRepository + 'static,
    N: ReminderScheduler + 'static,
    C: StatisticsCache + 'static,
{
    let plan = service.complete_plan(&PlanId(plan_id))?;
    Ok(Json(plan).into_response())
}

pub(crate) async fn revise_plan_handler<R, N, C>(
    State(service): State<SharedService<R, N, C>>,
    Path(plan_id): Path<String>,
) -> Result<Response, RiskServiceError>
where
    R: RiskRepository + 'static,
    N: ReminderScheduler + 'static,
    C: StatisticsCache + 'static,
{
    let plan = service.revise_plan(&PlanId(plan_id))?;
    Ok(Json(plan).into_response())
}

pub(crate) async fn record_intervention_handler<R, N, C>(
    State(service): State<SharedService<R, N, C>>,
    Json(entry): Json<InterventionEntry>,
) -> Result<Response, RiskServiceError>
where
    R: RiskRepository + 'static,
    N: ReminderScheduler + 'static,
    C: StatisticsCache + 'static,
{
    let intervention = service.record_intervention(entry)?;
    Ok((StatusCode::CREATED, Json(intervention)).into_response())
}

pub(crate) async fn list_interventions_handler<R, N, C>(
    State(service): State<SharedService<R, N, C>>,
    Query(query): Query<InterventionQuery>,
) -> Result<Response, RiskServiceError>
where
    R: RiskRepository + 'static,
    N: ReminderScheduler + 'static,
    C: StatisticsCache + 'static,
{
    let filter = InterventionFilter {
        employee_id: query.employee_id.map(EmployeeId),
        plan_id: query.plan_id.map(PlanId),
        intervention_type: query.intervention_type,
        followup_required: query.followup_required,
        from: query.from,
        to: query.to,
    };
    let interventions = service.list_interventions(&filter, Page::new(query.skip, query.limit))?;
    Ok(Json(interventions).into_response())
}

pub(crate) async fn get_intervention_handler<R, N, C>(
    State(service): State<SharedService<R, N, C>>,
    Path(intervention_id): Path<String>,
) -> Result<Response, RiskServiceError>
where
    R: RiskRepository + 'static,
    N: ReminderScheduler + 'static,
    C: StatisticsCache + 'static,
{
    let intervention = service.get_intervention(&InterventionId(intervention_id))?;
    Ok(Json(intervention).into_response())
}

pub(crate) async fn record_monitoring_handler<R, N, C>(
    State(service): State<SharedService<R, N, C>>,
    Json(entry): Json<MonitoringEntry>,
) -> Result<Response, RiskServiceError>
where
    R: RiskRepository + 'static,
    N: ReminderScheduler + 'static,
    C: StatisticsCache + 'static,
{
    let monitoring = service.record_monitoring(entry)?;
    Ok((StatusCode::CREATED, Json(monitoring)).into_response())
}

pub(crate) async fn list_monitoring_handler<R, N, C>(
    State(service): State<SharedService<R, N, C>>,
    Query(query): Query<MonitoringQuery>,
) -> Result<Response, RiskServiceError>
where
    R: RiskRepository + 'static,
    N: ReminderScheduler + 'static,
    C: StatisticsCache + 'static,
{
    let filter = MonitoringFilter {
        employee_id: query.employee_id.map(EmployeeId),
        improvement_status: query.improvement_status,
        from: query.from,
        to: query.to,
    };
    let records = service.list_monitoring(&filter, Page::new(query.skip, query.limit))?;
    Ok(Json(records).into_response())
}

pub(crate) async fn get_monitoring_handler<R, N, C>(
    State(service): State<SharedService<R, N, C>>,
    Path(monitoring_id): Path<String>,
) -> Result<Response, RiskServiceError>
where
    R: RiskRepository + 'static,
    N: ReminderScheduler + 'static,
    C: StatisticsCache + 'static,
{
    let record = service.get_monitoring(&MonitoringId(monitoring_id))?;
    Ok(Json(record).into_response())
}

pub(crate) async fn overdue_handler<R, N, C>(
    State(service): State<SharedService<R, N, C>>,
    Query(query): Query<OverdueQuery>,
) -> Result<Response, RiskServiceError>
where
    R: RiskRepository + 'static,
    N: ReminderScheduler + 'static,
    C: StatisticsCache + 'static,
{
    let overdue = service.overdue_monitoring(query.days)?;
    Ok(Json(overdue).into_response())
}
