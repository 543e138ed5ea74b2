use helpdesk_relay::{
    api::{build_router, AppState},
    bot::{BotHandler, BotPoller},
    config::{validate_environment, Config},
    correlation::CorrelationEngine,
    gateway::{FreshdeskClient, HelpdeskApi, TicketGateway},
    notifications::{Notifier, TelegramClient, TelegramNotifier},
    processing::{EventDispatcher, WebhookLog},
    state::{create_store, RecipientRegistry, SessionRegistry},
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "helpdesk_relay={},tower_http=info",
            config.observability.log_level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.observability.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    init_tracing(&config);

    tracing::info!("Starting helpdesk relay v{}", env!("CARGO_PKG_VERSION"));

    // Fail fast on missing secrets
    validate_environment()?;
    tracing::info!("✅ Environment validated");

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        if let Err(e) = helpdesk_relay::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        } else {
            tracing::info!("✅ Prometheus metrics initialized");
        }
    } else {
        tracing::info!("⚠️  Prometheus metrics disabled in configuration");
    }

    // Initialize storage backend
    tracing::info!("Storage backend: {:?}", config.state.backend);
    let store = create_store(&config.state).await?;
    tracing::info!("✅ Storage backend initialized");

    // Helpdesk client
    let (domain, api_key) = config.freshdesk.credentials()?;
    let freshdesk = Arc::new(FreshdeskClient::new(
        &domain,
        api_key,
        config.freshdesk.timeout_secs,
    )?);
    let gateway: Arc<dyn TicketGateway> = freshdesk.clone();
    let helpdesk: Arc<dyn HelpdeskApi> = freshdesk;
    tracing::info!(domain = %domain, "✅ Freshdesk client initialized");

    // Telegram client and notifier
    let telegram = TelegramClient::new(
        &config.telegram.api_url,
        &config.telegram.bot_token()?,
        config.telegram.timeout_secs,
    )?;
    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(telegram.clone()));
    tracing::info!("✅ Telegram notifier initialized");

    // Shared chat registries
    let recipients = RecipientRegistry::new();
    let sessions = SessionRegistry::new();

    // Correlation engine
    let engine = Arc::new(CorrelationEngine::new(
        store.clone(),
        gateway.clone(),
        notifier.clone(),
        recipients.clone(),
        config.correlation.clone(),
    ));
    if engine.is_enabled() {
        tracing::info!("✅ Correlation engine enabled");
    } else {
        tracing::info!("⚠️  Correlation engine disabled in configuration");
    }

    let dispatcher = Arc::new(EventDispatcher::new(
        gateway,
        engine,
        notifier,
        recipients.clone(),
        sessions.clone(),
    ));

    let webhook_log = Arc::new(WebhookLog::new(config.webhook.log_capacity));
    let app_state = AppState::new(dispatcher, store, webhook_log);
    let app = build_router(app_state);

    // Chat bot polling
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller_handle = if config.telegram.polling_enabled {
        let handler = Arc::new(BotHandler::new(
            helpdesk,
            recipients,
            sessions,
            config.webhook.public_url(),
        ));

        match telegram.get_me().await {
            Ok(me) => tracing::info!(
                username = ?me.username,
                "✅ Telegram bot @{} started",
                me.username.as_deref().unwrap_or("unknown")
            ),
            Err(e) => tracing::warn!(error = %e, "Could not verify bot identity"),
        }

        let poller = BotPoller::new(
            telegram,
            handler,
            config.telegram.bot_username(),
            config.telegram.poll_timeout_secs,
            config.telegram.poll_backoff_secs,
        );
        Some(tokio::spawn(poller.run(shutdown_rx)))
    } else {
        tracing::info!("⚠️  Bot polling disabled in configuration");
        None
    };

    // Start HTTP server
    let http_addr = format!("{}:{}", config.server.host, config.server.port);
    let http_listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("🚀 Webhook server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Freshdesk webhook: http://{}/webhook/freshdesk", http_addr);
    if let Some(url) = config.webhook.public_url() {
        tracing::info!("   Public webhook URL: {}", url);
    }

    tracing::info!("Press Ctrl+C to shutdown");

    // In-flight webhooks finish before serve returns
    let http_result = axum::serve(http_listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutdown signal received");
        })
        .await;
    if let Err(e) = http_result {
        tracing::error!("HTTP server error: {}", e);
    }

    tracing::info!("Shutting down gracefully...");
    let _ = shutdown_tx.send(true);
    if let Some(handle) = poller_handle {
        let _ = handle.await;
    }

    Ok(())
}
