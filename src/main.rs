//! Composition root: loads config, wires the registry/store/event-sink
//! singletons, spawns the sweeper, the Kafka consumer, and the REST+metrics
//! HTTP server, then runs the teardown coordinator on shutdown before the
//! event sink is dropped.

use std::sync::Arc;

use accountd::config::{Config, LogFormat};
use accountd::db::accounts::{AccountStore, PostgresAccountStore};
use accountd::db::Database;
use accountd::kafka::{CommandConsumer, KafkaCommandProducer, KafkaEventSink};
use accountd::metrics;
use accountd::rest::AppState;
use accountd::state::SessionRegistry;
use accountd::teardown::TeardownCoordinator;
use tracing::info;

fn resolve_config_path() -> String {
    std::env::var("ACCOUNTD_CONFIG").unwrap_or_else(|_| "config.toml".to_string())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => {
            tracing_subscriber::fmt().json().with_env_filter(filter).init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt().pretty().with_env_filter(filter).init();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = resolve_config_path();
    let config = Config::load(&config_path)?;
    init_tracing(&config);
    metrics::register_all();

    info!(automatic_register = config.automatic_register, "starting accountd");

    let db = Database::connect(&config.database.url, config.database.max_connections).await?;
    db.run_migrations().await?;
    let store: Arc<dyn AccountStore> = Arc::new(PostgresAccountStore::new(db.pool().clone()));

    let registry = Arc::new(SessionRegistry::new());

    let events: Arc<dyn accountd::events::EventSink> = Arc::new(KafkaEventSink::new(
        &config.kafka.bootstrap_servers,
        config.kafka.event_topic_account_status.clone(),
        config.kafka.event_topic_account_session_status.clone(),
    )?);

    let sweeper = accountd::state::TransitionSweeper::new(
        registry.clone(),
        config.transition_timeout(),
        config.sweep_interval(),
    );
    let sweeper_handle = tokio::spawn(sweeper.run());

    let consumer = CommandConsumer::new(
        &config.kafka.bootstrap_servers,
        "accountd",
        &[
            config.kafka.command_topic_create_account.as_str(),
            config.kafka.command_topic_account_session.as_str(),
        ],
        store.clone(),
        registry.clone(),
        events.clone(),
        config.clone(),
    )?;
    let consumer_handle = tokio::spawn(consumer.run());

    let producer = Arc::new(KafkaCommandProducer::new(
        &config.kafka.bootstrap_servers,
        config.kafka.command_topic_create_account.clone(),
        config.kafka.command_topic_account_session.clone(),
    )?);

    let app_state = AppState {
        store: store.clone(),
        registry: registry.clone(),
        events: events.clone(),
        config: config.clone(),
        producer,
    };
    let rest_router = accountd::rest::router(app_state);
    let listener = tokio::net::TcpListener::bind(&config.rest_bind_addr).await?;
    let rest_handle = tokio::spawn(async move {
        let _ = axum::serve(listener, rest_router).await;
    });

    let metrics_router = axum::Router::new().route(
        "/metrics",
        axum::routing::get(|| async { accountd::metrics::gather() }),
    );
    let metrics_listener = tokio::net::TcpListener::bind(&config.metrics_bind_addr).await?;
    info!(addr = %config.metrics_bind_addr, "metrics HTTP server listening");
    let metrics_handle = tokio::spawn(async move {
        let _ = axum::serve(metrics_listener, metrics_router).await;
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    sweeper_handle.abort();
    consumer_handle.abort();
    rest_handle.abort();
    metrics_handle.abort();

    let teardown = TeardownCoordinator::new(registry, store, events);
    accountd::dispatcher::on_shutdown(&teardown).await;

    info!("teardown complete, exiting");
    Ok(())
}
