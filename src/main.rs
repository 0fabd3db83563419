use std::{net::TcpListener, sync::Arc, time::Duration};

use actix_web::web;
use portfolio_contact_api::{
    background_task::start_eviction_task,
    constants::record_start_time,
    graceful_shutdown::shutdown_signal,
    limiter::{
        rate_limiter::{InMemoryRateLimitStore, SharedRateLimitStore},
        redis_store::RedisRateLimitStore,
    },
    mail::{
        smtp::SmtpMailer,
        transport::{LogMailer, SharedMailTransport},
    },
    server,
    settings::AppConfig,
    AppState,
};
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

fn build_transport(config: &AppConfig) -> std::io::Result<SharedMailTransport> {
    if config.has_smtp_credentials() {
        let mailer = SmtpMailer::new(config).map_err(std::io::Error::other)?;
        tracing::info!(host = %config.smtp_host, "SMTP transport configured");
        return Ok(Arc::new(mailer));
    }

    tracing::warn!("SMTP credentials not set, outgoing mail will only be logged");
    Ok(Arc::new(LogMailer))
}

async fn build_store(config: &AppConfig) -> SharedRateLimitStore {
    if let Some(url) = config.redis_url.as_deref() {
        match RedisRateLimitStore::new(url) {
            Ok(store) => match store.ping().await {
                Ok(()) => {
                    tracing::info!("Using Redis for rate limit counters");
                    return Arc::new(store);
                }
                Err(e) => tracing::error!("Redis unreachable, falling back to in-memory rate limits: {}", e),
            },
            Err(e) => tracing::error!("Redis configuration error, falling back to in-memory rate limits: {}", e),
        }
    }

    let store = InMemoryRateLimitStore::new();
    let ttl = config.api_window().max(config.contact_window());
    tokio::spawn(start_eviction_task(store.clone(), ttl + Duration::from_secs(60)));
    Arc::new(store)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = match AppConfig::new() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    record_start_time();
    init_tracing(config.is_production());
    tracing::info!("Loaded configuration: {:?}", config);

    let transport = build_transport(&config)?;
    let store = build_store(&config).await;

    let app_state = web::Data::new(AppState::new(&config, transport, store));

    let server_addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&server_addr)?;

    tracing::info!(
        "🚀 Starting {} v{} on {} ({})",
        config.name,
        env!("CARGO_PKG_VERSION"),
        server_addr,
        config.env
    );

    let server = server::run(listener, app_state, &config)?;
    let handle = server.handle();

    tokio::select! {
        res = server => res,
        _ = shutdown_signal() => {
            handle.stop(true).await;
            Ok(())
        },
    }
}
