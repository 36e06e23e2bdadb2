use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App, HttpServer};
use tracing::{error, info};
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use vidgen_jobs::api::{
    health::health_config,
    job::{handlers::job_config, JobService},
    validation,
};
use vidgen_jobs::config::Config;
use vidgen_jobs::db::{self, JobStore, PgJobStore};
use vidgen_jobs::events::{EventSink, LogEventSink};
use vidgen_jobs::remote::http::{HttpGenerationClient, RemoteApiConfig};
use vidgen_jobs::remote::GenerationClient;
use vidgen_jobs::shutdown::ShutdownCoordinator;
use vidgen_jobs::worker::{PollConfig, PollCoordinator};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");

    // Create logs directory if it doesn't exist
    std::fs::create_dir_all(&config.log_dir).expect("Failed to create logs directory");

    // File-based logging with daily rotation and level separation, plus a
    // console layer. Files land as logs/info.<date>.log etc.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    let info_file = tracing_appender::rolling::daily(&config.log_dir, "info.log");
    let warn_file = tracing_appender::rolling::daily(&config.log_dir, "warn.log");
    let error_file = tracing_appender::rolling::daily(&config.log_dir, "error.log");
    let debug_file = tracing_appender::rolling::daily(&config.log_dir, "debug.log");

    let info_layer = tracing_subscriber::fmt::layer()
        .with_writer(info_file)
        .with_ansi(false)
        .with_filter(LevelFilter::INFO);

    let warn_layer = tracing_subscriber::fmt::layer()
        .with_writer(warn_file)
        .with_ansi(false)
        .with_filter(LevelFilter::WARN);

    let error_layer = tracing_subscriber::fmt::layer()
        .with_writer(error_file)
        .with_ansi(false)
        .with_filter(LevelFilter::ERROR);

    let debug_layer = tracing_subscriber::fmt::layer()
        .with_writer(debug_file)
        .with_ansi(false)
        .with_filter(LevelFilter::DEBUG);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(info_layer)
        .with(warn_layer)
        .with(error_layer)
        .with(debug_layer)
        .init();

    info!("Starting vidgen-jobs");
    info!("  - Bind address: {}", config.bind_addr);
    info!("  - Max payload size: {} bytes", config.max_payload_size);
    info!("  - Max database connections: {}", config.max_db_connections);
    info!("  - Remote model: {}", config.video_api_model);
    info!(
        "  - Poll policy: every {}ms, at most {} attempts",
        config.poll_interval_ms, config.poll_max_attempts
    );

    let pool = db::connection::get_connection(&config.database_url, config.max_db_connections)
        .await
        .expect("Failed to connect to database");

    info!("Database connection pool established");

    // Auto-migrate on startup
    db::migrations::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // Orchestration core: store, remote client, event sink, poll coordinator
    let store: Arc<dyn JobStore> = Arc::new(PgJobStore::new(pool.clone()));
    let client: Arc<dyn GenerationClient> = Arc::new(
        HttpGenerationClient::new(RemoteApiConfig {
            base_url: config.video_api_base_url.clone(),
            api_key: config.video_api_key.clone(),
            model: config.video_api_model.clone(),
            timeout: Duration::from_secs(config.video_api_timeout_secs),
        })
        .expect("Failed to build remote generation client"),
    );
    let events: Arc<dyn EventSink> = Arc::new(LogEventSink);

    // watch channel lets every poll loop observe the same shutdown signal
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let coordinator = PollCoordinator::new(
        client.clone(),
        store.clone(),
        events.clone(),
        PollConfig {
            interval: Duration::from_millis(config.poll_interval_ms),
            max_attempts: config.poll_max_attempts,
            ..PollConfig::default()
        },
        shutdown_rx,
    );

    let job_service = web::Data::new(JobService::new(
        store,
        client,
        events,
        coordinator.clone(),
    ));

    // Jobs that were processing when the process last stopped get their
    // poll loops back before we accept new traffic.
    match job_service.resume_in_flight().await {
        Ok(resumed) => info!("Resume sweep complete: {} in-flight jobs", resumed),
        Err(e) => error!("Resume sweep failed: {}", e),
    }

    let server_pool = pool.clone();
    let max_payload_size = config.max_payload_size;
    let server_job_service = job_service.clone();

    let server = HttpServer::new(move || {
        let payload_config = web::PayloadConfig::default().limit(max_payload_size);

        App::new()
            .app_data(web::Data::new(server_pool.clone()))
            .app_data(server_job_service.clone())
            .app_data(payload_config)
            .app_data(validation::json_config())
            .configure(health_config)
            .configure(job_config)
    });

    info!("Server starting on http://{}", config.bind_addr);

    let server = server.bind(config.bind_addr.as_str())?.run();
    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    let shutdown = ShutdownCoordinator::new(server_handle, server_task, coordinator, shutdown_tx, pool);
    shutdown.wait_for_shutdown().await
}
