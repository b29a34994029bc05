//! Defines the central, mutable state of the application.

use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::AbortHandle;

use crate::config::{self, AppConfig};
use crate::core::Tree;

/// A monotonically increasing tag handed out when an operation is issued.
///
/// A result is applied only if its tag is still the current one.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

impl Generation {
    /// Issues the next tag and makes it current.
    pub fn advance(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }

    pub fn current(&self) -> u64 {
        self.0
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.0 == generation
    }
}

/// The file content currently shown in the preview panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub name: String,
    pub path: String,
    pub content: String,
}

/// Holds the complete, mutable state of the application.
///
/// This struct is wrapped in an `Arc<Mutex<...>>` to allow for safe, shared access
/// from the front end and the async tasks. The lock is never held across an await.
pub struct AppState {
    /// The application's configuration settings, including history and theme.
    pub config: AppConfig,
    /// Where the config is persisted; `None` means the platform directory.
    pub config_dir: Option<PathBuf>,
    /// The root path of the most recently issued load.
    pub current_root: String,
    /// The installed snapshot. Replaced wholesale, never mutated.
    pub tree: Option<Arc<Tree>>,
    /// The load generation that produced `tree` (0 before the first load).
    pub tree_generation: u64,
    /// Paths of the directories expanded in the UI tree.
    pub expanded_dirs: HashSet<String>,
    /// The current name filter.
    pub filter_query: String,
    pub preview: Option<Preview>,
    pub is_loading: bool,
    pub is_aggregating: bool,
    pub status_message: String,
    pub loaded_at: Option<DateTime<Local>>,
    pub load_generation: Generation,
    pub preview_generation: Generation,
    pub aggregate_generation: Generation,
    /// A handle to the running "copy all" task, allowing it to be aborted.
    pub aggregate_task: Option<AbortHandle>,
}

impl Default for AppState {
    /// Creates a default `AppState` instance, loading the configuration from disk.
    fn default() -> Self {
        Self::new(AppConfig::load().unwrap_or_default(), None)
    }
}

impl AppState {
    pub fn new(config: AppConfig, config_dir: Option<PathBuf>) -> Self {
        Self {
            config,
            config_dir,
            current_root: String::new(),
            tree: None,
            tree_generation: 0,
            expanded_dirs: HashSet::new(),
            filter_query: String::new(),
            preview: None,
            is_loading: false,
            is_aggregating: false,
            status_message: "Enter a path and load it.".to_string(),
            loaded_at: None,
            load_generation: Generation::default(),
            preview_generation: Generation::default(),
            aggregate_generation: Generation::default(),
            aggregate_task: None,
        }
    }

    /// Replaces the snapshot with one produced by load `generation`.
    ///
    /// Expansion entries survive for paths that are still directories; the
    /// root starts expanded. The preview survives if its path is still a file.
    pub fn install_tree(&mut self, tree: Tree, generation: u64) {
        let directories: HashSet<String> = tree.directory_paths().into_iter().collect();
        self.expanded_dirs.retain(|path| directories.contains(path));
        if tree.root().is_dir() {
            self.expanded_dirs.insert(tree.root().path().to_string());
        }
        let preview_survives = self.preview.as_ref().is_some_and(|preview| {
            tree.get(&preview.path).is_some_and(|node| !node.is_dir())
        });
        if !preview_survives {
            self.preview = None;
        }
        self.status_message = format!(
            "Loaded {} ({} items, {} files).",
            tree.root().path(),
            tree.len(),
            tree.leaf_count()
        );
        self.tree = Some(Arc::new(tree));
        self.tree_generation = generation;
        self.loaded_at = Some(Local::now());
    }

    /// Cancels the current "copy all" task, if any.
    pub fn cancel_current_aggregation(&mut self) {
        if let Some(handle) = self.aggregate_task.take() {
            tracing::info!("Aborting running aggregation.");
            handle.abort();
        }
        self.is_aggregating = false;
    }

    /// Persists the theme and the path history, logging instead of failing.
    ///
    /// The other settings are written as they are on disk, so per-run
    /// overrides from the command line never end up in the file.
    pub fn save_config(&self) {
        let dir = self.config_dir.as_deref();
        let result = config::settings::load_config(dir).and_then(|mut stored| {
            stored.theme = self.config.theme;
            stored.path_history = self.config.path_history.clone();
            config::settings::save_config(&stored, dir)
        });
        if let Err(e) = result {
            tracing::warn!("Failed to save config: {}", e);
        }
    }
}
