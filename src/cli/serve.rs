use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{ServerFlags, load_config};
use crate::core::auth::TokenAuthenticator;
use crate::core::lifecycle::LifecycleManager;
use crate::core::store::EntryStore;
use crate::core::sync::ImportSync;
use crate::core::terminal::{self, GuideSection};
use crate::core::tracking::{AllowList, TrackingMachine};
use crate::interfaces::telegram::TelegramInterface;
use crate::interfaces::web::ApiServer;
use crate::logging::init_logging;

/// Runs the bot and the import API until Ctrl+C.
pub async fn run_serve(flags: &ServerFlags) -> Result<()> {
    let config = load_config(flags)?;
    init_logging(config.log_level);
    for item in &config.rejected_users {
        warn!("Skipping invalid user id {:?} in AUTHORIZED_USERS", item);
    }
    let bot_token = config.telegram_token()?.to_string();

    let store = EntryStore::open(&config.database_path).await?;
    let access = AllowList::new(config.authorized_users.iter().copied());
    info!(
        authorized_users = config.authorized_users.len(),
        "Starting punchclock"
    );

    let api = ApiServer::new(
        ImportSync::new(store.clone()),
        TokenAuthenticator::new(store.clone()),
        config.api_host.clone(),
        config.api_port,
    );
    let telegram = TelegramInterface::new(bot_token, access, TrackingMachine::new(store));

    let mut lifecycle = LifecycleManager::new();
    lifecycle.attach(Arc::new(Mutex::new(api)));
    lifecycle.attach(Arc::new(Mutex::new(telegram)));

    lifecycle.start().await?;

    terminal::print_banner();
    GuideSection::new("Running")
        .command(
            "API",
            &format!("http://{}:{}/api/entries", config.api_host, config.api_port),
        )
        .command("Database", &config.database_path.display().to_string())
        .blank()
        .text("Press Ctrl+C to stop.")
        .print();

    tokio::signal::ctrl_c().await?;
    lifecycle.shutdown().await;
    debug!(state = ?lifecycle.state(), "Lifecycle finished");
    terminal::print_info("punchclock stopped.");
    Ok(())
}
