//! The interactive layer: shared state, commands and the tasks they spawn.
//!
//! Front ends parse user input into a [`Command`] and pass it to
//! [`handle_command`]; everything they need to display arrives as `UserEvent`s
//! through their [`proxy::EventProxy`].

pub mod clipboard;
pub mod commands;
pub mod events;
pub mod helpers;
pub mod proxy;
pub mod state;
pub mod tasks;
pub mod terminal;
pub mod tree_renderer;
pub mod view_model;

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

use crate::config::Theme;
use crate::core::RemoteService;
use clipboard::ClipboardService;
use proxy::EventProxy;
use state::AppState;

/// The outside world the commands talk to.
#[derive(Clone)]
pub struct Services {
    pub remote: Arc<dyn RemoteService>,
    pub clipboard: Arc<dyn ClipboardService>,
}

/// A user request, as typed into the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Load(String),
    /// Toggle a directory or preview a file.
    Open(String),
    Preview(String),
    Toggle(String),
    ExpandAll,
    CollapseAll,
    Filter(String),
    Copy(Option<String>),
    CancelCopy,
    Theme(Option<Theme>),
    /// Reload the n-th most recent root (1-based, as listed by `history`).
    Use(usize),
    ClearPreview,
    History,
    Show,
    Help,
    Quit,
}

/// A line that could not be parsed into a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCommandError(String);

impl fmt::Display for ParseCommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ParseCommandError {}

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let required = |what: &str| {
            if rest.is_empty() {
                Err(ParseCommandError(format!("'{word}' needs {what}")))
            } else {
                Ok(rest.to_string())
            }
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "load" | "cd" => Command::Load(required("a path")?),
            "open" => Command::Open(required("a path")?),
            "preview" | "cat" => Command::Preview(required("a path")?),
            "toggle" => Command::Toggle(required("a path")?),
            "expand-all" => Command::ExpandAll,
            "collapse-all" => Command::CollapseAll,
            "filter" | "find" => Command::Filter(rest.to_string()),
            "copy" => Command::Copy((!rest.is_empty()).then(|| rest.to_string())),
            "cancel" => Command::CancelCopy,
            "theme" if rest.is_empty() || rest == "toggle" => Command::Theme(None),
            "theme" => Command::Theme(Some(rest.parse().map_err(ParseCommandError)?)),
            "use" => {
                let index = required("a history number")?;
                match index.parse::<usize>() {
                    Ok(n) if n >= 1 => Command::Use(n),
                    _ => {
                        return Err(ParseCommandError(format!(
                            "'{index}' is not a history number"
                        )))
                    }
                }
            }
            "clear" => Command::ClearPreview,
            "history" => Command::History,
            "show" | "ls" => Command::Show,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            "" => return Err(ParseCommandError("empty command".to_string())),
            other => return Err(ParseCommandError(format!("unknown command '{other}'"))),
        };
        Ok(command)
    }
}

/// Routes a command to its handler.
///
/// Returns the handle of the task the command spawned, if any. Commands that
/// only display something (`History`, `Show`, `Help`, `Quit`) are left to the
/// front end and do nothing here.
pub fn handle_command<P: EventProxy>(
    command: Command,
    services: &Services,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) -> Option<JoinHandle<()>> {
    tracing::debug!("Handling command {:?}", command);
    match command {
        Command::Load(root) => commands::load_tree(&root, services, proxy, state),
        Command::Open(path) => commands::activate_node(&path, services, proxy, state),
        Command::Preview(path) => commands::preview_file(&path, services, proxy, state),
        Command::Toggle(path) => {
            commands::toggle_expansion(&path, proxy, state);
            None
        }
        Command::ExpandAll | Command::CollapseAll => {
            commands::expand_collapse_all(command == Command::ExpandAll, proxy, state);
            None
        }
        Command::Filter(query) => {
            commands::update_filter(&query, proxy, state);
            None
        }
        Command::Copy(path) => commands::copy_all(path.as_deref(), services, proxy, state),
        Command::CancelCopy => {
            commands::cancel_copy(proxy, state);
            None
        }
        Command::Theme(None) => {
            commands::toggle_theme(proxy, state);
            None
        }
        Command::Theme(Some(theme)) => {
            commands::set_theme(theme, proxy, state);
            None
        }
        Command::Use(n) => commands::select_history(n - 1, services, proxy, state),
        Command::ClearPreview => {
            commands::clear_preview(proxy, state);
            None
        }
        Command::History | Command::Show | Command::Help | Command::Quit => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(
            "load  /srv/project ".parse::<Command>().unwrap(),
            Command::Load("/srv/project".to_string())
        );
        assert_eq!(
            "OPEN /a b".parse::<Command>().unwrap(),
            Command::Open("/a b".to_string())
        );
        assert_eq!("copy".parse::<Command>().unwrap(), Command::Copy(None));
        assert_eq!(
            "copy /p/sub".parse::<Command>().unwrap(),
            Command::Copy(Some("/p/sub".to_string()))
        );
        assert_eq!("filter".parse::<Command>().unwrap(), Command::Filter(String::new()));
        assert_eq!("use 2".parse::<Command>().unwrap(), Command::Use(2));
        assert_eq!("theme".parse::<Command>().unwrap(), Command::Theme(None));
        assert_eq!(
            "theme dark".parse::<Command>().unwrap(),
            Command::Theme(Some(Theme::Dark))
        );
    }

    #[test]
    fn rejects_malformed_commands() {
        assert!("load".parse::<Command>().is_err());
        assert!("use 0".parse::<Command>().is_err());
        assert!("use x".parse::<Command>().is_err());
        assert!("theme blue".parse::<Command>().is_err());
        assert!("frobnicate".parse::<Command>().is_err());
        assert!("   ".parse::<Command>().is_err());
    }
}
