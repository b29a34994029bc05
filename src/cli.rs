use clap::{Parser, Subcommand};
use std::path::PathBuf;

use treecopy::config::Theme;
use treecopy::core::FailurePolicy;

#[derive(Parser)]
#[command(
    name = "treecopy",
    version,
    about = "Browse a remote file tree and copy whole subtrees as one text"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        long,
        global = true,
        help = "Base URL of the tree service (e.g. http://localhost:8080/api)"
    )]
    pub server: Option<String>,

    #[arg(long, global = true, help = "Maximum number of file requests in flight")]
    pub concurrency: Option<usize>,

    #[arg(long, global = true, help = "What a failed file does to a copy (abort, marker)")]
    pub policy: Option<FailurePolicy>,

    #[arg(long, global = true, help = "Read and write config.json in this directory")]
    pub config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Print the tree rooted at a path")]
    Tree {
        #[arg(help = "Root path on the server")]
        root: String,
        #[arg(long, short, help = "Show only files whose name contains this text")]
        filter: Option<String>,
        #[arg(long, short, help = "Expand every directory")]
        expand_all: bool,
    },
    #[command(about = "Print the content of one file")]
    Cat {
        #[arg(help = "File path on the server")]
        path: String,
    },
    #[command(about = "Concatenate every file under a root into the clipboard")]
    CopyAll {
        #[arg(help = "Root path on the server")]
        root: String,
        #[arg(long, help = "Copy only the subtree at this path")]
        subtree: Option<String>,
        #[arg(long, help = "Write to stdout instead of the clipboard")]
        stdout: bool,
    },
    #[command(about = "List recently loaded roots")]
    History,
    #[command(about = "Show, toggle or set the theme")]
    Theme {
        #[arg(help = "light, dark or toggle")]
        value: Option<String>,
    },
    #[command(about = "Print the effective configuration and where it is stored")]
    Config,
    #[command(about = "Start the interactive shell")]
    Shell {
        #[arg(help = "Root to load on start")]
        root: Option<String>,
    },
}

/// What the `theme` subcommand should do.
pub enum ThemeAction {
    Show,
    Toggle,
    Set(Theme),
}

impl ThemeAction {
    pub fn parse(value: Option<&str>) -> Result<Self, String> {
        match value {
            None => Ok(ThemeAction::Show),
            Some("toggle") => Ok(ThemeAction::Toggle),
            Some(other) => other.parse().map(ThemeAction::Set),
        }
    }
}
