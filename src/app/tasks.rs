//! The asynchronous halves of the commands.
//!
//! Every task carries the generation it was issued with. When it finishes it
//! re-checks that generation under the lock and drops its result if a newer
//! request of the same kind was issued in the meantime.

use std::sync::{Arc, Mutex};

use super::clipboard::ClipboardService;
use super::events::{Toast, UserEvent};
use super::helpers::{lock_state, notify_state};
use super::proxy::EventProxy;
use super::state::{AppState, Preview};
use crate::core::{Aggregator, ContentResolver, RemoteService, Tree};

/// Fetches the snapshot for `root` and installs it if `generation` is still current.
///
/// On failure the previously installed tree stays in place.
pub async fn load_tree_task<P: EventProxy>(
    root: String,
    generation: u64,
    remote: Arc<dyn RemoteService>,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    tracing::debug!("Loading {} (generation {})", root, generation);
    let result = remote.fetch_tree(&root).await;

    let mut state_guard = lock_state(&state);
    if !state_guard.load_generation.is_current(generation) {
        tracing::warn!(
            "Discarding result of load {} for {}: generation {} is current",
            generation,
            root,
            state_guard.load_generation.current()
        );
        return;
    }
    state_guard.is_loading = false;

    match result {
        Ok(tree) => {
            let (items, files) = (tree.len(), tree.leaf_count());
            state_guard.install_tree(tree, generation);
            if state_guard.config.path_history.push(&root) {
                state_guard.save_config();
            }
            tracing::info!("Loaded {} ({} items, {} files)", root, items, files);
            proxy.send_event(Toast::success(format!("Loaded {root}")));
        }
        Err(e) => {
            tracing::error!("Failed to load {}: {}", root, e);
            state_guard.status_message = format!("Failed to load {root}.");
            proxy.send_event(Toast::error(e.to_string()));
        }
    }
    notify_state(&state_guard, &proxy);
}

/// Fetches one file for the preview panel.
///
/// The result is dropped if another preview was requested or a different tree
/// was installed while the request was in flight.
pub async fn preview_task<P: EventProxy>(
    name: String,
    path: String,
    generation: u64,
    tree_generation: u64,
    remote: Arc<dyn RemoteService>,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    let result = ContentResolver::new(remote).resolve(&path).await;

    let mut state_guard = lock_state(&state);
    if !state_guard.preview_generation.is_current(generation)
        || state_guard.tree_generation != tree_generation
    {
        tracing::warn!("Discarding stale preview of {}", path);
        return;
    }

    match result {
        Ok(content) => {
            state_guard.status_message = format!("Previewing {path}.");
            state_guard.preview = Some(Preview {
                name: name.clone(),
                path: path.clone(),
                content: content.clone(),
            });
            proxy.send_event(UserEvent::ShowFilePreview {
                name,
                path,
                content,
            });
        }
        Err(e) => {
            tracing::error!("Preview failed: {}", e);
            proxy.send_event(Toast::error(format!("Could not read file: {e}")));
        }
    }
    notify_state(&state_guard, &proxy);
}

/// Aggregates the subtree at `root_path` and hands the text to the clipboard.
pub async fn copy_all_task<P: EventProxy>(
    root_path: String,
    generation: u64,
    tree_generation: u64,
    tree: Arc<Tree>,
    remote: Arc<dyn RemoteService>,
    clipboard: Arc<dyn ClipboardService>,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    let (width, policy) = {
        let state_guard = lock_state(&state);
        (
            state_guard.config.max_concurrent_fetches,
            state_guard.config.failure_policy,
        )
    };

    let Some(root) = tree.get(&root_path) else {
        let toast = Toast::error(format!("{root_path} is not part of the loaded tree"));
        finish_aggregation(&state, &proxy, generation, toast);
        return;
    };

    let aggregator = Aggregator::new(ContentResolver::new(remote))
        .with_max_concurrent(width)
        .with_policy(policy);
    let progress_proxy = proxy.clone();
    let result = aggregator
        .aggregate_with_progress(root, move |progress| {
            progress_proxy.send_event(UserEvent::AggregateProgress(progress));
        })
        .await;

    let (is_current, tree_replaced) = {
        let state_guard = lock_state(&state);
        (
            state_guard.aggregate_generation.is_current(generation),
            state_guard.tree_generation != tree_generation,
        )
    };
    if !is_current {
        tracing::warn!("Discarding superseded aggregation of {}", root_path);
        return;
    }
    if tree_replaced {
        tracing::warn!(
            "Discarding aggregation of {}: the tree was replaced while copying",
            root_path
        );
        let toast = Toast::warning("The tree was reloaded during the copy; nothing was copied.");
        finish_aggregation(&state, &proxy, generation, toast);
        return;
    }

    let toast = match result {
        Ok(aggregate) if aggregate.leaf_count == 0 => {
            Toast::warning(format!("There are no files under {root_path}."))
        }
        Ok(aggregate) => match clipboard.set_text(&aggregate.content) {
            Ok(()) if aggregate.failures.is_empty() => Toast::success(format!(
                "Copied {} files ({} bytes).",
                aggregate.leaf_count,
                aggregate.content.len()
            )),
            Ok(()) => Toast::warning(format!(
                "Copied {} files, {} could not be read.",
                aggregate.leaf_count,
                aggregate.failures.len()
            )),
            Err(e) => {
                tracing::error!("Clipboard write failed: {}", e);
                Toast::error(format!("Could not copy to the clipboard: {e}"))
            }
        },
        Err(e) => {
            tracing::error!("Copy all under {} failed: {}", root_path, e);
            Toast::error(format!("Copy failed: {e}"))
        }
    };
    finish_aggregation(&state, &proxy, generation, toast);
}

fn finish_aggregation<P: EventProxy>(
    state: &Arc<Mutex<AppState>>,
    proxy: &P,
    generation: u64,
    toast: UserEvent,
) {
    let mut state_guard = lock_state(state);
    if !state_guard.aggregate_generation.is_current(generation) {
        return;
    }
    state_guard.is_aggregating = false;
    state_guard.aggregate_task = None;
    proxy.send_event(toast);
    notify_state(&state_guard, proxy);
}
