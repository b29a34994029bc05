//! Shared test infrastructure: logging setup, a scripted [`RemoteService`]
//! and a clipboard that records what it was given.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::sync::Notify;

use crate::app::clipboard::ClipboardService;
use crate::core::{FetchError, LoadError, Node, RemoteService, Tree};

static LOGGING_INIT: Once = Once::new();

/// Initializes the tracing subscriber for tests.
///
/// This function is wrapped in a `Once` block to ensure that the global
/// subscriber is set exactly one time, even when tests are run in parallel.
pub fn setup_test_logging() {
    LOGGING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// An in-memory [`RemoteService`] whose answers, failures and timing are
/// scripted by the test.
///
/// Gates let one request wait for another: `hold_until(a, b)` keeps the
/// response for `a` back until `b` has been answered, which forces a
/// completion order without sleeping.
#[derive(Default)]
pub struct MockService {
    trees: HashMap<String, Node>,
    failing_trees: HashSet<String>,
    files: HashMap<String, String>,
    failing_files: HashSet<String>,
    delays: HashMap<String, Duration>,
    waits: HashMap<String, Arc<Notify>>,
    signals: HashMap<String, Arc<Notify>>,
    file_calls: Mutex<Vec<String>>,
    tree_calls: Mutex<Vec<String>>,
    completions: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `root` as the snapshot for a tree request on `root_path`.
    pub fn with_tree(mut self, root_path: &str, root: Node) -> Self {
        self.trees.insert(root_path.to_string(), root);
        self
    }

    pub fn with_failing_tree(mut self, root_path: &str) -> Self {
        self.failing_trees.insert(root_path.to_string());
        self
    }

    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(path.to_string(), content.to_string());
        self
    }

    pub fn with_failing_file(mut self, path: &str) -> Self {
        self.failing_files.insert(path.to_string());
        self
    }

    /// Delays the answer for `key` by `delay` after any gate has opened.
    pub fn with_delay(mut self, key: &str, delay: Duration) -> Self {
        self.delays.insert(key.to_string(), delay);
        self
    }

    /// Holds the answer for `waiting` until `trigger` has been answered.
    ///
    /// Keys are tree roots or file paths alike.
    pub fn hold_until(mut self, waiting: &str, trigger: &str) -> Self {
        let notify = Arc::new(Notify::new());
        self.waits.insert(waiting.to_string(), notify.clone());
        self.signals.insert(trigger.to_string(), notify);
        self
    }

    /// Holds the answer for `key` until the returned handle is notified.
    pub fn gate(&mut self, key: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.waits.insert(key.to_string(), notify.clone());
        notify
    }

    /// File paths in the order their requests started.
    pub fn file_calls(&self) -> Vec<String> {
        self.file_calls.lock().unwrap().clone()
    }

    pub fn tree_calls(&self) -> Vec<String> {
        self.tree_calls.lock().unwrap().clone()
    }

    /// Keys in the order their responses were produced.
    pub fn completions(&self) -> Vec<String> {
        self.completions.lock().unwrap().clone()
    }

    /// The largest number of file requests that were in progress at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, key: &str) {
        if let Some(wait) = self.waits.get(key) {
            wait.notified().await;
        }
        if let Some(delay) = self.delays.get(key) {
            tokio::time::sleep(*delay).await;
        }
    }

    fn leave(&self, key: &str) {
        self.completions.lock().unwrap().push(key.to_string());
        if let Some(signal) = self.signals.get(key) {
            signal.notify_one();
        }
    }
}

#[async_trait]
impl RemoteService for MockService {
    async fn fetch_tree(&self, root: &str) -> Result<Tree, LoadError> {
        self.tree_calls.lock().unwrap().push(root.to_string());
        self.enter(root).await;

        let result = if self.failing_trees.contains(root) {
            Err(LoadError::Status {
                root: root.to_string(),
                status: 500,
            })
        } else {
            match self.trees.get(root) {
                Some(node) => Tree::new(node.clone()).map_err(|source| LoadError::Invalid {
                    root: root.to_string(),
                    source,
                }),
                None => Err(LoadError::Status {
                    root: root.to_string(),
                    status: 404,
                }),
            }
        };

        self.leave(root);
        result
    }

    async fn fetch_file(&self, path: &str) -> Result<String, FetchError> {
        self.file_calls.lock().unwrap().push(path.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::task::yield_now().await;
        self.enter(path).await;

        let result = if self.failing_files.contains(path) {
            Err(FetchError::Unavailable {
                path: path.to_string(),
                reason: "scripted failure".to_string(),
            })
        } else {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| FetchError::Status {
                    path: path.to_string(),
                    status: 404,
                })
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.leave(path);
        result
    }
}

/// A [`ClipboardService`] that keeps every text it receives.
#[derive(Default)]
pub struct RecordingClipboard {
    texts: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingClipboard {
    /// A clipboard whose every write fails.
    pub fn failing() -> Self {
        Self {
            texts: Mutex::default(),
            fail: true,
        }
    }

    pub fn contents(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

impl ClipboardService for RecordingClipboard {
    fn set_text(&self, text: &str) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("clipboard is not available");
        }
        self.texts.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
