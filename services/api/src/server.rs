use crate::cli::ServeArgs;
use crate::infra::{build_orchestrator, in_memory_service, AppState};
use crate::routes::with_assessment_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;
use vendor_risk::config::AppConfig;
use vendor_risk::error::AppError;
use vendor_risk::telemetry;

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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let orchestrator = Arc::new(build_orchestrator(&config.assessment)?);
    info!(
        signals = orchestrator.policy().weights().len(),
        timeout_ms = config.assessment.signal_timeout.as_millis() as u64,
        remote_producers = config.assessment.producer_endpoints.len(),
        "risk orchestrator configured"
    );
    let (service, _alerts) = in_memory_service(orchestrator);

    let app = with_assessment_routes(Arc::new(service))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "vendor risk service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
