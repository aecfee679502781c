//! PNS server - Entry point.

use pns_core::{
    AdminList, DeferredEventSink, FanoutEventSink, MemoryEventSink, Registry, TracingEventSink,
};
use pns_server::{
    api::{create_router_with_rate_limit, AppState, RateLimitState},
    config::{Config, LogFormat},
    persistence::Store,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    let subscriber = tracing_subscriber::registry().with(filter);
    match config.log.format {
        LogFormat::Json => subscriber.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => subscriber.with(tracing_subscriber::fmt::layer()).init(),
    }

    info!("Starting PNS registry server");

    let admins = match config.registry.admin_addresses() {
        Ok(a) => AdminList::new(a),
        Err(e) => {
            error!("Invalid registry configuration: {:#}", e);
            std::process::exit(1);
        }
    };
    if admins.is_empty() {
        info!("No administrators configured, durations can only change through configuration");
    }

    let store = Store::from_config(&config.storage);

    let events = MemoryEventSink::new(config.registry.event_capacity);
    let sinks = FanoutEventSink::new(vec![Box::new(TracingEventSink), Box::new(events.clone())]);
    // Events are held until the mutation that produced them has been saved.
    let pending = DeferredEventSink::new(sinks);

    let builder = Registry::builder()
        .access_control(admins)
        .event_sink(pending.clone());

    // An unreadable snapshot is fatal: starting empty would overwrite it on the next save.
    let registry = match store.load().await {
        Ok(Some(state)) => {
            info!(
                "Restored registry with {} records, keeping persisted durations",
                state.store.len()
            );
            builder.state(state).build()
        }
        Ok(None) => builder.authority(config.registry.authority()).build(),
        Err(e) => {
            error!("Failed to load registry snapshot: {}", e);
            std::process::exit(1);
        }
    };

    // Create application state
    let state = AppState::new(registry, store, events, pending);

    // Create rate limiter from config
    let rate_limit = RateLimitState::new(config.rate_limit.global_per_minute);

    let app = create_router_with_rate_limit(state, rate_limit);

    // Bind to address
    let addr = SocketAddr::new(
        config.server.listen_addr.parse().unwrap_or([0, 0, 0, 0].into()),
        config.server.port,
    );

    info!("Listening on {}", addr);

    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
