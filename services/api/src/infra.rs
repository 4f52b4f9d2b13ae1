use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use safework::config::RiskConfig;
use safework::risk::{
    ChannelReminderScheduler, Clock, InMemoryRiskRepository, InMemoryStatisticsCache,
    RiskManagementService, SystemClock,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Service wiring used by both the HTTP server and the demo.
pub(crate) type RiskService =
    RiskManagementService<InMemoryRiskRepository, ChannelReminderScheduler, InMemoryStatisticsCache>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn build_risk_service(
    config: RiskConfig,
    reminders: ChannelReminderScheduler,
    clock: Option<Arc<dyn Clock>>,
) -> Arc<RiskService> {
    let clock = clock.unwrap_or_else(|| Arc::new(SystemClock));
    Arc::new(RiskManagementService::with_clock(
        Arc::new(InMemoryRiskRepository::default()),
        Arc::new(reminders),
        Arc::new(InMemoryStatisticsCache::default()),
        config,
        clock,
    ))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
