// File: monitor/src/main.rs
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use monitor::constants::operations;
use monitor::web::{start_web_server, AppState, EventBroadcaster};
use monitor::{ConfigManager, Database, Engine, ProbeExecutor};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with reduced verbosity
    let env_filter = EnvFilter::from_default_env()
        .add_directive("monitor=info".parse()?)
        .add_directive("tower_http=warn".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("sqlx=warn".parse()?);

    fmt().with_env_filter(env_filter).init();

    info!("Starting Monitor Check Engine");

    // Load configuration
    let config_dir = std::env::var("MONITOR_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    let config_manager = ConfigManager::new(config_dir).await?;
    let config = config_manager.get_current_config();
    info!(
        "Configuration loaded: {} sites, {} monitors",
        config.sites.len(),
        config.monitors.len()
    );

    // Initialize database
    let database = Arc::new(Database::new(&config.database_path).await?);
    config_manager.sync_to_database(&database).await?;
    info!("Database initialized");

    let executor = Arc::new(ProbeExecutor::new(config.engine.probe_retry_delay())?);
    let engine = Engine::new(database.clone(), executor, &config.engine);

    // Nothing is registered yet, so every persisted operation id is stale
    let cleared = engine.reconcile().await?;
    if cleared > 0 {
        warn!("Cleared {} operation id(s) left over from the previous run", cleared);
    }

    let broadcaster = Arc::new(EventBroadcaster::attach(&engine.events, 256));

    engine.monitoring.resume_active_monitors().await?;

    // Start periodic operation cleanup
    let reaper = engine.clone();
    let reap_after = chrono::Duration::minutes(config.engine.operation_reap_minutes);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(
            operations::REAP_INTERVAL_SECONDS,
        ));
        loop {
            interval.tick().await;
            let reaped = reaper.registry.reap_cancelled(reap_after).await;
            if reaped > 0 {
                warn!(
                    "Reaped {} abandoned operations older than {} minutes",
                    reaped,
                    reap_after.num_minutes()
                );
            }
            match reaper.reconcile().await {
                Ok(cleared) if cleared > 0 => {
                    warn!("Cleared {} stale persisted operation id(s)", cleared)
                }
                Ok(_) => {}
                Err(e) => warn!("Operation reconciliation failed: {}", e),
            }
        }
    });

    info!(
        "Background tasks started ({}s reap interval)",
        operations::REAP_INTERVAL_SECONDS
    );

    // Start web server
    let state = AppState::new(config, engine.monitoring.clone(), broadcaster);
    let server = start_web_server(state);

    tokio::select! {
        result = server => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, stopping monitor timers");
            engine.monitoring.shutdown().await;
        }
    }

    Ok(())
}
