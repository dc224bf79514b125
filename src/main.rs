use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use loanshield::config::Config;
use loanshield::handlers;
use loanshield::logic::audit::AuditStore;
use loanshield::logic::explain::ExplainerConfig;
use loanshield::logic::model::ScoringService;
use loanshield::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loanshield=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env();
    tracing::info!("Loan scoring service starting...");
    tracing::info!("Model artifact: {}", config.model_path.display());
    tracing::info!("Audit database: {}", config.audit_db_path.display());

    let audit = Arc::new(
        AuditStore::open(&config.audit_db_path).expect("Failed to open audit database"),
    );

    let explainer = ExplainerConfig { permutations: config.explainer_permutations, seed: None };
    let service = match ScoringService::load(&config.model_path, explainer) {
        Ok(service) => Some(Arc::new(service)),
        Err(err) => {
            tracing::error!("Model failed to load, serving degraded responses: {}", err);
            None
        }
    };

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    // Credentialed CORS cannot use wildcards, so methods and headers are explicit.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    let app = handlers::router(AppState { service, audit })
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Server listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
