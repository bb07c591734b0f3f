//! Venue check-in bot server
//!
//! Runs the Telegram bot (long polling or webhook) next to a small HTTP
//! surface for health probes.

use std::{future::IntoFuture, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use venue_checkin::{
    api,
    bot::{dispatch::Dispatcher, Bot},
    config::{AppConfig, UpdateMode},
    repository::{schema, Repository},
    services::{
        dialogue::{DialogueStore, MemoryDialogueStore},
        redis::RedisDialogueStore,
        Services,
    },
    telegram::{BotApi, Messenger},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("venue_checkin={},tower_http=info", config.logging.level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting venue-checkin v{}", env!("CARGO_PKG_VERSION"));

    if config.telegram.token.is_empty() {
        anyhow::bail!("Bot token is not configured (set BOT_TOKEN)");
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await?;
    tracing::info!("Connected to database");

    schema::ensure_schema(&pool).await?;

    let dialogues: Arc<dyn DialogueStore> = if config.redis.enabled {
        let store = RedisDialogueStore::new(&config.redis.url, config.redis.dialogue_ttl_seconds).await?;
        tracing::info!("Connected to Redis");
        Arc::new(store)
    } else {
        tracing::warn!("Redis disabled, conversation state is kept in memory");
        Arc::new(MemoryDialogueStore::new())
    };

    let api_client = Arc::new(BotApi::new(&config.telegram)?);
    let messenger: Arc<dyn Messenger> = api_client.clone();
    let username = messenger.bot_username().await?;
    tracing::info!(bot = %username, "Authorized with Telegram");

    let services = Services::new(Repository::new(pool.clone()), &config, messenger.clone(), dialogues);
    let bot = Arc::new(Bot::new(services, messenger, &config));
    let dispatcher = Arc::new(Dispatcher::new(bot));

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let mode = config.telegram.mode;
    let poll_timeout = config.telegram.poll_timeout_seconds;

    match mode {
        UpdateMode::Webhook => {
            api_client
                .set_webhook(&config.telegram.webhook_url, &config.telegram.webhook_secret)
                .await?;
            tracing::info!(url = %config.telegram.webhook_url, "Webhook registered");
        }
        UpdateMode::Polling => api_client.delete_webhook().await?,
    }

    let state = AppState {
        config: Arc::new(config),
        dispatcher: dispatcher.clone(),
        pool,
    };
    let app = create_router(state, mode);

    tracing::info!("Server listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server = axum::serve(listener, app);

    match mode {
        UpdateMode::Webhook => server.await?,
        UpdateMode::Polling => {
            tokio::select! {
                result = server.into_future() => result?,
                _ = poll_updates(api_client, dispatcher, poll_timeout) => {}
            }
        }
    }

    Ok(())
}

/// Long-poll loop; never returns. Updates are only queued here, handling
/// happens on the per-chat workers.
async fn poll_updates(api: Arc<BotApi>, dispatcher: Arc<Dispatcher>, timeout_seconds: u64) {
    let mut offset = 0;
    tracing::info!("Polling for updates");
    loop {
        match api.get_updates(offset, timeout_seconds).await {
            Ok(updates) => {
                if let Some(last) = updates.last() {
                    offset = last.update_id + 1;
                }
                for update in updates {
                    dispatcher.dispatch(update).await;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "getUpdates failed, retrying");
                tokio::time::sleep(Duration::from_secs(3)).await;
            }
        }
    }
}

/// Create the application router
fn create_router(state: AppState, mode: UpdateMode) -> Router {
    let mut router = Router::new()
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check));

    if mode == UpdateMode::Webhook {
        router = router.route("/telegram/webhook", post(api::webhook::receive_update));
    }

    router.with_state(state).layer(TraceLayer::new_for_http())
}
