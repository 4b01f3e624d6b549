use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use axum_prometheus::PrometheusMetricLayer;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;
use yojana_engine::catalog::SchemeCatalogImporter;
use yojana_engine::config::AppConfig;
use yojana_engine::demo;
use yojana_engine::eligibility::EligibilityEngine;
use yojana_engine::error::AppError;
use yojana_engine::notify::NotificationDispatcher;
use yojana_engine::router::{portal_router, PortalState};
use yojana_engine::scheduler::{
    HealthStatus, JobContext, ReconciliationScheduler, SchedulerStats, VerificationPolicy,
};
use yojana_engine::store::{InMemoryStore, NoopExtractor, RecordStore};
use yojana_engine::telemetry;

#[derive(Parser, Debug)]
#[command(
    name = "Yojana Engine",
    about = "Run the scheme-portal reconciliation engine from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service and the reconciliation scheduler (default)
    Serve(ServeArgs),
    /// Inspect a scheme catalog without starting the service
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
    /// Scheme catalog CSV to load at startup
    #[arg(long)]
    catalog: Option<PathBuf>,
    /// Seed sample profiles, schemes, and documents for local exploration
    #[arg(long)]
    demo: bool,
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// Parse a catalog CSV and print what it would import
    Check {
        /// Path to the catalog CSV
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Catalog {
            command: CatalogCommand::Check { path },
        } => run_catalog_check(path),
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let memory = Arc::new(InMemoryStore::default());
    if args.demo {
        demo::seed(&memory);
        info!("demo data seeded");
    }
    if let Some(path) = args.catalog.take() {
        let schemes = SchemeCatalogImporter::from_path(&path)?;
        info!(schemes = schemes.len(), path = %path.display(), "scheme catalog loaded");
        for scheme in schemes {
            memory.insert_scheme(scheme);
        }
    }

    let store: Arc<dyn RecordStore> = memory;
    let engine = Arc::new(EligibilityEngine::new(store.clone()));
    let dispatcher = Arc::new(NotificationDispatcher::new(store.clone()));
    let ctx = JobContext {
        store: store.clone(),
        extractor: Arc::new(NoopExtractor),
        engine: engine.clone(),
        dispatcher,
        stats: Arc::new(SchedulerStats::default()),
        policy: Arc::new(VerificationPolicy::default()),
        grace_period: chrono::Duration::from_std(config.scheduler.grace_period)
            .unwrap_or_else(|_| chrono::Duration::seconds(300)),
        health: Arc::new(Mutex::new(HealthStatus::Unknown)),
    };
    let scheduler = Arc::new(ReconciliationScheduler::new(ctx, &config.scheduler));
    scheduler.start();

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let app = portal_router(PortalState {
        store,
        engine,
        scheduler: scheduler.clone(),
    })
    .merge(
        Router::new()
            .route("/metrics", get(metrics_endpoint))
            .with_state(prometheus_handle),
    )
    .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(?config.environment, %addr, "scheme portal engine ready");

    axum::serve(listener, app).await?;
    scheduler.stop();
    Ok(())
}

fn run_catalog_check(path: PathBuf) -> Result<(), AppError> {
    let schemes = SchemeCatalogImporter::from_path(&path)?;

    println!("Catalog check: {}", path.display());
    println!("{} scheme(s) parsed\n", schemes.len());
    for scheme in &schemes {
        let status = if scheme.active { "active" } else { "inactive" };
        println!("- {} [{}] ({})", scheme.name, scheme.id.0, status);
        println!(
            "  category {}, {} required document(s), {} benefit(s)",
            scheme.category,
            scheme.required_documents.len(),
            scheme.benefits.len()
        );
    }

    Ok(())
}

async fn metrics_endpoint(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
}
