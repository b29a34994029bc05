mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ThemeAction};
use treecopy::app::clipboard::{ClipboardService, StdoutClipboard, SystemClipboard};
use treecopy::app::events::UserEvent;
use treecopy::app::helpers::lock_state;
use treecopy::app::state::AppState;
use treecopy::app::terminal::{self, EventPrinter};
use treecopy::app::tree_renderer::TreeRenderer;
use treecopy::app::view_model::generate_ui_state;
use treecopy::app::{commands, Services};
use treecopy::config::{self, AppConfig};
use treecopy::core::{ContentResolver, HttpService};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_dir = cli.config_dir.clone();
    let mut config = config::settings::load_config(config_dir.as_deref())
        .context("Failed to load the configuration")?;
    apply_overrides(&mut config, &cli);

    let service = HttpService::new(&config.server_url, config.request_timeout());
    let remote = Arc::new(service);
    tracing::debug!("Using service at {}", remote.base_url());
    let clipboard: Arc<dyn ClipboardService> = match &cli.command {
        Commands::CopyAll { stdout: true, .. } => Arc::new(StdoutClipboard),
        _ => Arc::new(SystemClipboard::new()),
    };
    let services = Services { remote, clipboard };
    let state = Arc::new(Mutex::new(AppState::new(config, config_dir)));

    match cli.command {
        Commands::Tree {
            root,
            filter,
            expand_all,
        } => {
            let (tx, printer) = start_printer();
            let load = commands::load_tree(&root, &services, tx.clone(), state.clone());
            await_task(load).await?;
            if let Some(query) = filter {
                commands::update_filter(&query, tx.clone(), state.clone());
            }
            if expand_all {
                commands::expand_collapse_all(true, tx.clone(), state.clone());
            }
            finish_printer(tx, printer).await?;

            let ui = generate_ui_state(&lock_state(&state));
            if let Some(tree) = ui.tree {
                print!("{}", TreeRenderer::render(&tree));
            }
        }
        Commands::Cat { path } => {
            let content = ContentResolver::new(services.remote.clone())
                .resolve(&path)
                .await?;
            println!("{content}");
        }
        Commands::CopyAll { root, subtree, .. } => {
            let (tx, printer) = start_printer();
            let load = commands::load_tree(&root, &services, tx.clone(), state.clone());
            await_task(load).await?;
            let has_tree = lock_state(&state).tree.is_some();
            if has_tree {
                let copy =
                    commands::copy_all(subtree.as_deref(), &services, tx.clone(), state.clone());
                await_task(copy).await?;
            }
            finish_printer(tx, printer).await?;
        }
        Commands::History => {
            let history = lock_state(&state).config.path_history.entries().to_vec();
            print!("{}", terminal::render_history(&history));
        }
        Commands::Theme { value } => {
            let action = ThemeAction::parse(value.as_deref()).map_err(anyhow::Error::msg)?;
            let (tx, printer) = start_printer();
            match action {
                ThemeAction::Show => {}
                ThemeAction::Toggle => commands::toggle_theme(tx.clone(), state.clone()),
                ThemeAction::Set(theme) => commands::set_theme(theme, tx.clone(), state.clone()),
            }
            finish_printer(tx, printer).await?;
            println!("{}", lock_state(&state).config.theme);
        }
        Commands::Config => {
            let config_dir = lock_state(&state).config_dir.clone();
            let path = config::settings::get_config_file_path(config_dir.as_deref());
            if let Some(path) = path {
                println!("# {}", path.display());
            }
            println!("{}", serde_json::to_string_pretty(&lock_state(&state).config)?);
        }
        Commands::Shell { root } => {
            terminal::run_shell(services, state, root).await?;
        }
    }

    Ok(())
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(server) = &cli.server {
        config.server_url = server.clone();
    }
    if let Some(width) = cli.concurrency {
        config.max_concurrent_fetches = width.max(1);
    }
    if let Some(policy) = cli.policy {
        config.failure_policy = policy;
    }
}

fn start_printer() -> (mpsc::UnboundedSender<UserEvent>, JoinHandle<EventPrinter>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, tokio::spawn(terminal::print_events(rx, false)))
}

/// Closes the channel and fails if any error was reported through it.
async fn finish_printer(
    tx: mpsc::UnboundedSender<UserEvent>,
    printer: JoinHandle<EventPrinter>,
) -> Result<()> {
    drop(tx);
    let printer = printer.await?;
    if printer.errors() > 0 {
        anyhow::bail!("{} error(s) reported", printer.errors());
    }
    Ok(())
}

async fn await_task(handle: Option<JoinHandle<()>>) -> Result<()> {
    if let Some(handle) = handle {
        handle.await?;
    }
    Ok(())
}
