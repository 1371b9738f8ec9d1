//! Claude UI server entry point.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use claude_ui::api::{self, AppState};
use claude_ui::claude::ClaudeCli;
use claude_ui::events::EventHub;
use claude_ui::notify::{LogNotifier, SharedNotifier, WebhookNotifier};
use claude_ui::{AgentRunner, Config, Database};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "claude_ui=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        working_dir = %config.working_dir.display(),
        database = %config.database_path.display(),
        dev_mode = config.dev_mode,
        "Starting Claude UI"
    );

    let db = Database::open(&config.database_path)?;

    let notifier: SharedNotifier = match &config.notify_webhook_url {
        Some(url) => {
            tracing::info!("Completion notifications will be posted to {}", url);
            Arc::new(WebhookNotifier::new(url.clone(), db.clone()))
        }
        None => Arc::new(LogNotifier),
    };

    let runner = AgentRunner::new(
        Arc::new(db.clone()),
        Arc::new(ClaudeCli::new(&config.claude_cli_path)),
        notifier,
    )
    .with_chain_delay(config.chain_delay);

    let state = Arc::new(AppState {
        config,
        db,
        runner,
        events: Arc::new(EventHub::new()),
    });

    api::serve(state).await
}
