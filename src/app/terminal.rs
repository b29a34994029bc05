//! A line-oriented front end: prints events and runs the interactive shell.

use anyhow::Result;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use super::events::{ToastKind, UserEvent};
use super::helpers::lock_state;
use super::state::AppState;
use super::tree_renderer::TreeRenderer;
use super::view_model::{generate_ui_state, UiState};
use super::{handle_command, Command, Services};

const HELP: &str = "\
Commands:
  load <root>        load the tree rooted at <root>
  open <path>        toggle a directory or preview a file
  preview <path>     show the content of a file
  toggle <path>      expand or collapse a directory
  expand-all         expand every directory
  collapse-all       collapse every directory
  filter [text]      show only files whose name contains text
  copy [path]        copy every file under path (default: root) to the clipboard
  cancel             abort a running copy
  theme [light|dark] switch or set the theme
  history            list recently loaded roots
  use <n>            load the n-th entry of the history
  clear              close the preview
  show               print the tree
  quit               leave the shell";

/// Writes events to the terminal: previews to stdout, everything else to stderr.
#[derive(Debug, Default)]
pub struct EventPrinter {
    /// Re-print the tree whenever its rendering changes.
    show_tree: bool,
    last_tree: Option<String>,
    errors: usize,
}

impl EventPrinter {
    pub fn new(show_tree: bool) -> Self {
        Self {
            show_tree,
            ..Self::default()
        }
    }

    /// Number of error toasts seen so far.
    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn handle(&mut self, event: UserEvent) {
        match event {
            UserEvent::StateUpdate(ui) => {
                if self.show_tree && !ui.is_loading {
                    let rendered = render_ui(&ui);
                    if self.last_tree.as_deref() != Some(rendered.as_str()) {
                        print!("{rendered}");
                        self.last_tree = Some(rendered);
                    }
                }
            }
            UserEvent::ShowFilePreview { path, content, .. } => {
                println!("── {path} ──");
                println!("{content}");
            }
            UserEvent::AggregateProgress(progress) => {
                eprint!(
                    "\r[{}/{}] {}\x1b[K",
                    progress.completed, progress.total, progress.current_path
                );
                if progress.completed == progress.total {
                    eprintln!();
                }
            }
            UserEvent::Toast(toast) => {
                let label = match toast.kind {
                    ToastKind::Success => "ok",
                    ToastKind::Warning => "warning",
                    ToastKind::Error => {
                        self.errors += 1;
                        "error"
                    }
                };
                eprintln!("{label}: {}", toast.message);
            }
        }
        std::io::stdout().flush().ok();
    }
}

/// Drains `rx` into a printer until every sender is gone.
pub async fn print_events(
    mut rx: mpsc::UnboundedReceiver<UserEvent>,
    show_tree: bool,
) -> EventPrinter {
    let mut printer = EventPrinter::new(show_tree);
    while let Some(event) = rx.recv().await {
        printer.handle(event);
    }
    printer
}

/// The tree (if any) followed by the status line.
pub fn render_ui(ui: &UiState) -> String {
    let mut out = match &ui.tree {
        Some(tree) => TreeRenderer::render(tree),
        None => String::new(),
    };
    let filter = if ui.filter_query.is_empty() {
        String::new()
    } else {
        format!(
            " | filter '{}': {} of {} files",
            ui.filter_query, ui.visible_files_count, ui.total_files
        )
    };
    out.push_str(&format!("[{}] {}{}\n", ui.theme, ui.status_message, filter));
    out
}

/// The numbered history list, most recent first.
pub fn render_history(history: &[String]) -> String {
    if history.is_empty() {
        return "No roots loaded yet.\n".to_string();
    }
    history
        .iter()
        .enumerate()
        .map(|(i, path)| format!("{:>2}  {}\n", i + 1, path))
        .collect()
}

/// Reads commands from stdin until `quit` or end of input, optionally loading
/// `initial_root` first.
pub async fn run_shell(
    services: Services,
    state: Arc<Mutex<AppState>>,
    initial_root: Option<String>,
) -> Result<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_events(rx, true));
    if let Some(root) = initial_root {
        handle_command(Command::Load(root), &services, tx.clone(), state.clone());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprintln!("Type 'help' for a list of commands.");
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                eprintln!("error: {e}");
                continue;
            }
        };
        match command {
            Command::Quit => break,
            Command::Help => println!("{HELP}"),
            Command::Show => print!("{}", render_ui(&generate_ui_state(&lock_state(&state)))),
            Command::History => {
                let history = lock_state(&state).config.path_history.entries().to_vec();
                print!("{}", render_history(&history));
            }
            other => {
                // Tasks report through the printer; the shell does not wait for them.
                handle_command(other, &services, tx.clone(), state.clone());
            }
        }
    }

    lock_state(&state).cancel_current_aggregation();
    drop(tx);
    printer.abort();
    Ok(())
}
