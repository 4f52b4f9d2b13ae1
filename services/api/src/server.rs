use crate::cli::ServeArgs;
use crate::infra::{build_risk_service, AppState};
use crate::routes::with_risk_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use safework::config::AppConfig;
use safework::error::AppError;
use safework::risk::{spawn_reminder_worker, ChannelReminderScheduler};
use safework::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let (reminders, receiver) = ChannelReminderScheduler::new();
    let _reminder_worker = spawn_reminder_worker(receiver);
    let risk_service = build_risk_service(config.risk.clone(), reminders, None);

    let app = with_risk_routes(risk_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        overdue_days = config.risk.overdue_monitoring_days,
        "risk management service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
