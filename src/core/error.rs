//! Defines the custom error types for the `core` module.

use thiserror::Error;

/// A tree snapshot that violates the model's invariants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Two nodes in the same snapshot share a path.
    #[error("Duplicate path in tree snapshot: {0}")]
    DuplicatePath(String),

    /// A node arrived without a display name.
    #[error("Node at {0} has an empty name")]
    EmptyName(String),

    /// A file node arrived carrying children.
    #[error("File node {0} cannot have children")]
    FileWithChildren(String),
}

/// Failure to load a tree snapshot from the remote service.
///
/// A `LoadError` never touches the currently installed tree.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The request could not be sent or the body could not be read.
    #[error("Request for tree {root} failed: {source}")]
    Transport {
        root: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("Service returned HTTP {status} for tree {root}")]
    Status { root: String, status: u16 },

    /// The body was not a valid tree document.
    #[error("Could not decode tree {root}: {source}")]
    Decode {
        root: String,
        #[source]
        source: serde_json::Error,
    },

    /// The document decoded but describes an invalid snapshot.
    #[error("Invalid tree {root}: {source}")]
    Invalid {
        root: String,
        #[source]
        source: TreeError,
    },

    /// Any other reason the service could not produce a tree.
    #[error("Tree {root} is unavailable: {reason}")]
    Unavailable { root: String, reason: String },
}

impl LoadError {
    /// The root path the failed load was issued for.
    pub fn root(&self) -> &str {
        match self {
            LoadError::Transport { root, .. }
            | LoadError::Status { root, .. }
            | LoadError::Decode { root, .. }
            | LoadError::Invalid { root, .. }
            | LoadError::Unavailable { root, .. } => root,
        }
    }
}

/// Failure to fetch the content of a single leaf.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    #[error("Request for {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("Service returned HTTP {status} for {path}")]
    Status { path: String, status: u16 },

    /// Any other reason the content is unavailable.
    #[error("{path} is unavailable: {reason}")]
    Unavailable { path: String, reason: String },
}

impl FetchError {
    /// The path of the leaf whose fetch failed.
    pub fn path(&self) -> &str {
        match self {
            FetchError::Transport { path, .. }
            | FetchError::Status { path, .. }
            | FetchError::Unavailable { path, .. } => path,
        }
    }
}

/// Failure of a whole subtree aggregation.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// One or more leaves could not be fetched under the abort policy.
    #[error("{} file(s) could not be read, first: {}", .failures.len(), first_failure(.failures))]
    Fetch { failures: Vec<FetchError> },

    /// A fetch task panicked or was cancelled from outside.
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

fn first_failure(failures: &[FetchError]) -> String {
    failures
        .first()
        .map(|failure| failure.to_string())
        .unwrap_or_default()
}
