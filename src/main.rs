use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;
use tokio::time::sleep;

use fotobonus::cli::{Cli, Commands};
use fotobonus::core::{config, init_logger};
use fotobonus::store::{RecordStore, SheetsStore};
use fotobonus::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to the appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, bot creation, missing token).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Set up global panic handler to catch panics in the dispatcher
    // so they are logged instead of silently terminating the process
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    // Initialize logger (console + file)
    init_logger(&config::LOG_FILE_PATH)?;

    // Load environment variables from .env if present
    let _ = dotenv();

    match cli.command {
        Some(Commands::Run) | None => run_bot().await,
        Some(Commands::CheckStore) => run_check_store().await,
    }
}

/// Verify the record store configuration and the workbook tables, then exit
async fn run_check_store() -> Result<()> {
    let store = SheetsStore::from_env();
    if !store.is_configured() {
        return Err(anyhow::anyhow!("Record store is not configured (GSSHEETID / GSHEETS_TOKEN)"));
    }
    store
        .ensure_tables()
        .await
        .map_err(|e| anyhow::anyhow!("Record store check failed: {}", e))?;
    log::info!("Record store OK: clients / transactions / links present");
    Ok(())
}

/// Run the Telegram bot
async fn run_bot() -> Result<()> {
    log::info!("Starting loyalty bot...");

    // Missing messaging credentials are the one fatal startup condition
    if config::BOT_TOKEN.is_empty() {
        return Err(anyhow::anyhow!("BOT_TOKEN environment variable not set"));
    }
    if config::ADMIN_IDS.is_empty() {
        log::warn!("ADMIN_IDS is empty; admin mode is disabled for everyone");
    }

    let bot = create_bot()?;

    // Retry get_me if the Bot API is still initializing
    let bot_info = {
        let startup_max_retries = 12;
        let mut startup_retry = 0;
        loop {
            match bot.get_me().await {
                Ok(info) => break info,
                Err(e) => {
                    startup_retry += 1;
                    if startup_retry >= startup_max_retries {
                        return Err(anyhow::anyhow!(
                            "Failed to connect to Bot API after {} retries: {}",
                            startup_retry,
                            e
                        ));
                    }
                    log::warn!(
                        "Bot API not ready (attempt {}/{}): {}. Retrying in 5 seconds...",
                        startup_retry,
                        startup_max_retries,
                        e
                    );
                    sleep(std::time::Duration::from_secs(5)).await;
                }
            }
        }
    };
    log::info!("Bot username: {:?}, Bot ID: {}", bot_info.username, bot_info.id);

    setup_bot_commands(&bot).await?;

    // One record store instance for the lifetime of the process. An
    // unconfigured store degrades per operation instead of blocking startup.
    let store: Arc<dyn RecordStore> = Arc::new(SheetsStore::from_env());
    match store.ensure_tables().await {
        Ok(()) => log::info!("Record store tables verified"),
        Err(e) => log::warn!("Record store unavailable at startup: {}. Continuing anyway.", e),
    }

    let handler = schema(HandlerDeps::new(store));

    log::info!("Starting bot in long polling mode");

    // Run the dispatcher with retry logic; panics inside the dispatcher task
    // are caught via the JoinHandle and trigger a reconnect
    let mut retry_count = 0;
    let max_retries = config::retry::MAX_DISPATCHER_RETRIES;

    loop {
        let bot_clone = bot.clone();
        let handler_clone = handler.clone();

        let handle = tokio::spawn(async move {
            use teloxide::update_listeners::Polling;

            // Drop updates that queued up while the bot was down
            let listener = Polling::builder(bot_clone.clone()).drop_pending_updates().build();

            Dispatcher::builder(bot_clone, handler_clone)
                .dependencies(DependencyMap::new())
                .enable_ctrlc_handler()
                .build()
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await
        });

        match handle.await {
            Ok(()) => {
                log::info!("Dispatcher shutdown gracefully");
                break;
            }
            Err(join_err) => {
                if join_err.is_panic() {
                    log::error!("Dispatcher panicked: {}", join_err);
                    if retry_count < max_retries {
                        retry_count += 1;
                        log::info!(
                            "Retrying dispatcher connection after panic (attempt {}/{})...",
                            retry_count,
                            max_retries
                        );
                        exponential_backoff(retry_count).await;
                    } else {
                        log::error!("Max retries reached after panic. Exiting...");
                        break;
                    }
                } else {
                    log::warn!("Dispatcher task was cancelled: {}", join_err);
                    break;
                }
            }
        }

        if retry_count > 0 {
            sleep(config::retry::dispatcher_delay()).await;
        }
    }

    Ok(())
}

/// Exponential backoff delay for retries
async fn exponential_backoff(retry_count: u32) {
    let delay = std::time::Duration::from_secs(config::retry::EXPONENTIAL_BACKOFF_BASE.pow(retry_count));
    sleep(delay).await;
}
