//! Concatenates the content of every file in a subtree.
//!
//! Leaves are fetched concurrently (a semaphore bounds how many fetch tasks
//! exist at once) but the output is always assembled in pre-order, left to
//! right, whatever order the fetches complete in. Directories contribute no
//! text.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::error::{AggregateError, FetchError};
use super::resolver::ContentResolver;
use super::tree::Node;

/// Placed between the contents of consecutive leaves.
pub const LEAF_SEPARATOR: &str = "\n\n";

pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 16;

/// What a failed leaf does to the rest of an aggregation.
///
/// The policy applies to every leaf of a run alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// The first failure fails the whole run and cancels outstanding fetches.
    #[default]
    Abort,
    /// A failed leaf is replaced by an error marker and the run continues.
    Marker,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Abort => f.write_str("abort"),
            FailurePolicy::Marker => f.write_str("marker"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "marker" => Ok(FailurePolicy::Marker),
            other => Err(format!(
                "unknown failure policy '{other}' (expected 'abort' or 'marker')"
            )),
        }
    }
}

/// Progress of a running aggregation, reported once per finished leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateProgress {
    pub completed: usize,
    pub total: usize,
    pub current_path: String,
}

/// The result of a successful aggregation.
#[derive(Debug, Default)]
pub struct Aggregate {
    /// Every leaf's content joined by [`LEAF_SEPARATOR`].
    pub content: String,
    pub leaf_count: usize,
    /// Leaves replaced by a marker. Always empty under [`FailurePolicy::Abort`].
    pub failures: Vec<FetchError>,
}

pub struct Aggregator {
    resolver: ContentResolver,
    max_concurrent: usize,
    policy: FailurePolicy,
}

impl Aggregator {
    pub fn new(resolver: ContentResolver) -> Self {
        Self {
            resolver,
            max_concurrent: DEFAULT_MAX_CONCURRENT_FETCHES,
            policy: FailurePolicy::default(),
        }
    }

    /// Sets the number of leaf fetches allowed in flight at once (at least 1).
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Aggregates the subtree rooted at `root`.
    pub async fn aggregate(&self, root: &Node) -> Result<Aggregate, AggregateError> {
        self.aggregate_with_progress(root, |_| {}).await
    }

    /// Aggregates the subtree rooted at `root`, reporting each finished leaf.
    pub async fn aggregate_with_progress<F>(
        &self,
        root: &Node,
        progress_callback: F,
    ) -> Result<Aggregate, AggregateError>
    where
        F: Fn(AggregateProgress),
    {
        let leaves: Vec<String> = root.leaf_paths().into_iter().map(str::to_string).collect();
        let total = leaves.len();
        if total == 0 {
            tracing::info!("Subtree {} has no files, nothing to aggregate", root.path());
            return Ok(Aggregate::default());
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut pending = leaves.into_iter().enumerate();
        let mut fetches = JoinSet::new();
        let mut slots: Vec<Option<String>> = vec![None; total];
        let mut failures = Vec::new();
        let mut completed = 0;

        loop {
            // A task is only spawned once it holds a permit, so at most
            // `max_concurrent` fetch tasks exist at any time.
            while let Ok(permit) = semaphore.clone().try_acquire_owned() {
                let Some((index, path)) = pending.next() else {
                    break;
                };
                let resolver = self.resolver.clone();
                fetches.spawn(async move {
                    let result = resolver.resolve(&path).await;
                    drop(permit);
                    (index, path, result)
                });
            }
            let Some(joined) = fetches.join_next().await else {
                break;
            };
            let (index, path, result) = joined?;
            completed += 1;
            match result {
                Ok(content) => slots[index] = Some(content),
                Err(err) => match self.policy {
                    FailurePolicy::Abort => {
                        tracing::error!("Aggregation of {} aborted: {}", root.path(), err);
                        fetches.abort_all();
                        return Err(AggregateError::Fetch {
                            failures: vec![err],
                        });
                    }
                    FailurePolicy::Marker => {
                        tracing::warn!("Substituting marker for {}: {}", path, err);
                        slots[index] = Some(failure_marker(&err));
                        failures.push(err);
                    }
                },
            }
            progress_callback(AggregateProgress {
                completed,
                total,
                current_path: path,
            });
        }

        let content = slots
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect::<Vec<_>>()
            .join(LEAF_SEPARATOR);

        tracing::info!(
            "Aggregated {} files under {} ({} bytes, {} failed)",
            total,
            root.path(),
            content.len(),
            failures.len()
        );
        Ok(Aggregate {
            content,
            leaf_count: total,
            failures,
        })
    }
}

/// The text that stands in for a leaf that could not be read.
pub fn failure_marker(err: &FetchError) -> String {
    format!("[ERROR READING FILE: {err}]")
}
