use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryApplicantRepository, InMemoryInvitationOutbox};
use crate::routes::with_registry_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use investor_desk::config::AppConfig;
use investor_desk::error::AppError;
use investor_desk::telemetry;
use investor_desk::workflows::registry::{ApplicantCsvImporter, VerificationService};
use std::sync::atomic::{AtomicBool, Ordering};
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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let service = Arc::new(VerificationService::new(
        Arc::new(InMemoryApplicantRepository::default()),
        Arc::new(InMemoryInvitationOutbox::default()),
        config.verification.clone(),
    ));

    if let Some(path) = args.seed_csv.take() {
        let applicants = ApplicantCsvImporter::from_path(&path)?;
        let count = applicants.len();
        for applicant in applicants {
            service.import(applicant)?;
        }
        info!(count, path = %path.display(), "seeded applicants from registry export");
    }

    let app = with_registry_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "investor desk ready");

    axum::serve(listener, app).await?;
    Ok(())
}
