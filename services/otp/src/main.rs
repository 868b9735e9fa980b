use std::sync::Arc;

use anyhow::Context as _;
use tracing::{info, warn};

use otpgate::config::OtpServiceConfig;
use otpgate::infra::log::LogNotifier;
use otpgate::infra::redis::RedisStreamNotifier;
use otpgate::manager::OtpManager;
use otpgate::notify::NotificationDispatcher;
use otpgate::router::build_router;
use otpgate::state::AppState;
use otpgate::sweeper::spawn_sweeper;
use otpgate_core::tracing::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = OtpServiceConfig::from_env();

    let dispatcher = match &config.notify_broker_url {
        Some(url) => {
            let notifier = RedisStreamNotifier::connect(url, config.notify_topic.clone())?;
            info!(topic = %config.notify_topic, "publishing otp notifications to redis stream");
            NotificationDispatcher::spawn(notifier, config.notify_queue_capacity)
        }
        None => {
            warn!("OTP_NOTIFY_BROKER_URL not set, otp notifications are only logged");
            NotificationDispatcher::spawn(LogNotifier, config.notify_queue_capacity)
        }
    };

    let manager = Arc::new(OtpManager::new(config.validity(), dispatcher));
    let sweeper = config
        .sweep_interval()
        .map(|period| spawn_sweeper(Arc::clone(&manager), period));

    let router = build_router(AppState::new(Arc::clone(&manager)));
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(
        validity_minutes = config.validity_minutes,
        "otp service listening on {addr}"
    );
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(sweeper) = sweeper {
        sweeper.stop().await;
    }
    manager.close().await;
    info!("otp service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
