pub mod aggregator;
pub mod error;
pub mod filter;
pub mod resolver;
pub mod tree;

pub use aggregator::{Aggregate, AggregateProgress, Aggregator, FailurePolicy, LEAF_SEPARATOR};
pub use error::{AggregateError, FetchError, LoadError, TreeError};
pub use filter::SearchEngine;
pub use resolver::{ContentResolver, HttpService, RemoteService};
pub use tree::{Node, NodeKind, Tree, WireNode};
