//! Contains all the command handlers that the front end can invoke.
//!
//! Handlers update the `AppState`, send `UserEvent`s back to the front end and,
//! for the operations that talk to the service, spawn one of the `tasks` and
//! return its handle.

use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

use super::events::Toast;
use super::helpers::{lock_state, notify_state, with_state_and_notify};
use super::proxy::EventProxy;
use super::state::AppState;
use super::tasks;
use super::view_model::auto_expand_for_matches;
use super::Services;
use crate::config::Theme;

/// Sends the initial state to a freshly attached front end.
pub fn initialize<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    notify_state(&lock_state(&state), &proxy);
}

/// Starts loading the snapshot rooted at `root`.
///
/// Any load still in flight is superseded: its result will be discarded.
pub fn load_tree<P: EventProxy>(
    root: &str,
    services: &Services,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) -> Option<JoinHandle<()>> {
    let root = root.trim().to_string();
    if root.is_empty() {
        proxy.send_event(Toast::warning("Enter a path to load."));
        return None;
    }

    let generation = with_state_and_notify(&state, &proxy, |s| {
        s.current_root = root.clone();
        s.is_loading = true;
        s.load_generation.advance()
    });
    tracing::info!("Issued load {} for {}", generation, root);

    let remote = services.remote.clone();
    Some(tokio::spawn(tasks::load_tree_task(
        root, generation, remote, proxy, state,
    )))
}

/// Loads the `index`-th entry of the path history (0 is the most recent).
pub fn select_history<P: EventProxy>(
    index: usize,
    services: &Services,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) -> Option<JoinHandle<()>> {
    let path = lock_state(&state)
        .config
        .path_history
        .get(index)
        .map(str::to_string);
    match path {
        Some(path) => load_tree(&path, services, proxy, state),
        None => {
            proxy.send_event(Toast::warning(format!("There is no history entry {index}.")));
            None
        }
    }
}

/// Fetches `path` for the preview panel. Only files can be previewed.
pub fn preview_file<P: EventProxy>(
    path: &str,
    services: &Services,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) -> Option<JoinHandle<()>> {
    let issued = {
        let mut state_guard = lock_state(&state);
        let node = state_guard
            .tree
            .as_ref()
            .and_then(|tree| tree.get(path))
            .map(|node| (node.name().to_string(), node.is_dir()));
        match node {
            None => Err(Toast::error(format!("{path} is not part of the loaded tree."))),
            Some((_, true)) => Err(Toast::warning(format!("{path} is a directory."))),
            Some((name, false)) => {
                let generation = state_guard.preview_generation.advance();
                Ok((name, generation, state_guard.tree_generation))
            }
        }
    };

    match issued {
        Ok((name, generation, tree_generation)) => Some(tokio::spawn(tasks::preview_task(
            name,
            path.to_string(),
            generation,
            tree_generation,
            services.remote.clone(),
            proxy,
            state,
        ))),
        Err(toast) => {
            proxy.send_event(toast);
            None
        }
    }
}

/// Activates a node the way a click in the tree does: directories toggle,
/// files open in the preview.
pub fn activate_node<P: EventProxy>(
    path: &str,
    services: &Services,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) -> Option<JoinHandle<()>> {
    let is_dir = lock_state(&state)
        .tree
        .as_ref()
        .and_then(|tree| tree.get(path))
        .map(|node| node.is_dir());
    match is_dir {
        Some(true) => {
            toggle_expansion(path, proxy, state);
            None
        }
        _ => preview_file(path, services, proxy, state),
    }
}

/// Drops the preview and invalidates any preview request still in flight.
pub fn clear_preview<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |s| {
        s.preview_generation.advance();
        s.preview = None;
    });
}

/// Concatenates every file under `path` (the tree root if `None`) into the clipboard.
///
/// A copy still running is aborted first.
pub fn copy_all<P: EventProxy>(
    path: Option<&str>,
    services: &Services,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) -> Option<JoinHandle<()>> {
    let mut state_guard = lock_state(&state);
    let Some(tree) = state_guard.tree.clone() else {
        proxy.send_event(Toast::warning("Load a tree before copying."));
        return None;
    };
    let target = path.unwrap_or_else(|| tree.root().path()).to_string();
    if tree.get(&target).is_none() {
        proxy.send_event(Toast::error(format!("{target} is not part of the loaded tree.")));
        return None;
    }

    state_guard.cancel_current_aggregation();
    let generation = state_guard.aggregate_generation.advance();
    state_guard.is_aggregating = true;
    tracing::info!("Issued copy {} of {}", generation, target);

    let handle = tokio::spawn(tasks::copy_all_task(
        target,
        generation,
        state_guard.tree_generation,
        tree,
        services.remote.clone(),
        services.clipboard.clone(),
        proxy.clone(),
        state.clone(),
    ));
    state_guard.aggregate_task = Some(handle.abort_handle());
    notify_state(&state_guard, &proxy);
    Some(handle)
}

/// Aborts a running "copy all".
pub fn cancel_copy<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |s| {
        if s.is_aggregating {
            s.aggregate_generation.advance();
            s.cancel_current_aggregation();
        }
    });
}

/// Expands a collapsed directory or collapses an expanded one.
pub fn toggle_expansion<P: EventProxy>(path: &str, proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |s| {
        let is_dir = s
            .tree
            .as_ref()
            .and_then(|tree| tree.get(path))
            .is_some_and(|node| node.is_dir());
        if !is_dir {
            tracing::debug!("Ignoring expansion toggle for non-directory {}", path);
            return;
        }
        if !s.expanded_dirs.remove(path) {
            s.expanded_dirs.insert(path.to_string());
        }
    });
}

/// Expands every directory, or collapses all of them.
pub fn expand_collapse_all<P: EventProxy>(expand: bool, proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |s| {
        s.expanded_dirs.clear();
        if expand {
            if let Some(tree) = &s.tree {
                s.expanded_dirs.extend(tree.directory_paths());
            }
        }
    });
}

/// Sets the name filter and opens the directories leading to matches.
pub fn update_filter<P: EventProxy>(query: &str, proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |s| {
        s.filter_query = query.trim().to_string();
        auto_expand_for_matches(s);
    });
}

pub fn toggle_theme<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    let theme = lock_state(&state).config.theme.toggle();
    set_theme(theme, proxy, state);
}

pub fn set_theme<P: EventProxy>(theme: Theme, proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |s| {
        if s.config.theme != theme {
            s.config.theme = theme;
            s.save_config();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::clipboard::ClipboardService;
    use crate::app::events::{ToastKind, UserEvent};
    use crate::app::view_model::UiState;
    use crate::config::AppConfig;
    use crate::core::{FailurePolicy, Node};
    use crate::utils::test_helpers::{MockService, RecordingClipboard};
    use tempfile::{tempdir, TempDir};
    use tokio::sync::mpsc;

    #[derive(Clone)]
    struct TestEventProxy {
        sender: mpsc::UnboundedSender<UserEvent>,
    }

    impl EventProxy for TestEventProxy {
        fn send_event(&self, event: UserEvent) {
            self.sender.send(event).expect("Test receiver dropped");
        }
    }

    struct TestHarness {
        state: Arc<Mutex<AppState>>,
        proxy: TestEventProxy,
        event_rx: mpsc::UnboundedReceiver<UserEvent>,
        services: Services,
        clipboard: Arc<RecordingClipboard>,
        _config_dir: TempDir,
    }

    impl TestHarness {
        fn new(service: MockService) -> Self {
            Self::with_clipboard(service, RecordingClipboard::default())
        }

        fn with_clipboard(service: MockService, clipboard: RecordingClipboard) -> Self {
            let config_dir = tempdir().expect("Failed to create temp dir");
            let (tx, rx) = mpsc::unbounded_channel();
            let clipboard = Arc::new(clipboard);
            let state = AppState::new(AppConfig::default(), Some(config_dir.path().to_path_buf()));
            Self {
                state: Arc::new(Mutex::new(state)),
                proxy: TestEventProxy { sender: tx },
                event_rx: rx,
                services: Services {
                    remote: Arc::new(service),
                    clipboard: clipboard.clone() as Arc<dyn ClipboardService>,
                },
                clipboard,
                _config_dir: config_dir,
            }
        }

        fn drain(&mut self) -> Vec<UserEvent> {
            let mut events = Vec::new();
            while let Ok(event) = self.event_rx.try_recv() {
                events.push(event);
            }
            events
        }

        fn last_state(&mut self) -> Option<Box<UiState>> {
            self.drain().into_iter().rev().find_map(|event| match event {
                UserEvent::StateUpdate(ui) => Some(ui),
                _ => None,
            })
        }

        fn toasts(&mut self) -> Vec<(ToastKind, String)> {
            self.drain()
                .into_iter()
                .filter_map(|event| match event {
                    UserEvent::Toast(toast) => Some((toast.kind, toast.message)),
                    _ => None,
                })
                .collect()
        }

        fn start_load(&self, root: &str) -> Option<JoinHandle<()>> {
            load_tree(root, &self.services, self.proxy.clone(), self.state.clone())
        }

        async fn load(&self, root: &str) {
            finish(self.start_load(root)).await;
        }

        fn preview(&self, path: &str) -> Option<JoinHandle<()>> {
            preview_file(path, &self.services, self.proxy.clone(), self.state.clone())
        }

        fn activate(&self, path: &str) -> Option<JoinHandle<()>> {
            activate_node(path, &self.services, self.proxy.clone(), self.state.clone())
        }

        fn copy(&self, path: Option<&str>) -> Option<JoinHandle<()>> {
            copy_all(path, &self.services, self.proxy.clone(), self.state.clone())
        }

        fn select(&self, index: usize) -> Option<JoinHandle<()>> {
            select_history(index, &self.services, self.proxy.clone(), self.state.clone())
        }
    }

    /// Waits for a task the command must have spawned.
    async fn finish(handle: Option<JoinHandle<()>>) {
        handle.expect("no task was spawned").await.unwrap();
    }

    fn project() -> Node {
        Node::directory(
            "p",
            "/p",
            vec![
                Node::file("a", "/p/a"),
                Node::directory("sub", "/p/sub", vec![Node::file("b", "/p/sub/b")]),
            ],
        )
    }

    fn project_service() -> MockService {
        MockService::new()
            .with_tree("/p", project())
            .with_file("/p/a", "A")
            .with_file("/p/sub/b", "B")
    }

    #[tokio::test]
    async fn load_installs_tree_and_records_history() {
        let mut harness = TestHarness::new(project_service());
        harness.load("  /p ").await;

        let ui = harness.last_state().unwrap();
        assert!(!ui.is_loading);
        assert_eq!(ui.current_root, "/p");
        assert_eq!(ui.history, vec!["/p"]);
        assert_eq!(ui.total_files, 2);
        assert!(ui.tree.unwrap().is_expanded);
    }

    #[tokio::test]
    async fn blank_root_is_not_loaded() {
        let mut harness = TestHarness::new(project_service());
        let handle = harness.start_load("   ");
        assert!(handle.is_none());
        assert_eq!(harness.toasts()[0].0, ToastKind::Warning);
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_tree() {
        let mut harness = TestHarness::new(project_service().with_failing_tree("/broken"));
        harness.load("/p").await;
        harness.drain();

        harness.load("/broken").await;

        let toasts = harness.toasts();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].0, ToastKind::Error);
        let state = harness.state.lock().unwrap();
        assert_eq!(state.tree.as_ref().unwrap().root().path(), "/p");
        assert_eq!(state.config.path_history.entries(), ["/p".to_string()]);
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn stale_load_is_discarded() {
        let service = MockService::new()
            .with_tree("/one", Node::directory("one", "/one", Vec::new()))
            .with_tree("/two", Node::directory("two", "/two", Vec::new()))
            .hold_until("/one", "/two");
        let harness = TestHarness::new(service);

        let first = harness.start_load("/one").unwrap();
        let second = harness.start_load("/two").unwrap();
        second.await.unwrap();
        first.await.unwrap();

        let state = harness.state.lock().unwrap();
        assert_eq!(state.tree.as_ref().unwrap().root().path(), "/two");
        assert_eq!(state.tree_generation, 2);
        assert_eq!(state.config.path_history.entries(), ["/two".to_string()]);
    }

    #[tokio::test]
    async fn preview_rejects_directories_and_reads_files() {
        let mut harness = TestHarness::new(project_service());
        harness.load("/p").await;
        harness.drain();

        assert!(harness.preview("/p/sub").is_none());
        assert_eq!(harness.toasts()[0].0, ToastKind::Warning);

        finish(harness.preview("/p/sub/b")).await;
        let events = harness.drain();
        assert!(events.iter().any(|event| matches!(
            event,
            UserEvent::ShowFilePreview { path, content, .. } if path == "/p/sub/b" && content == "B"
        )));
        let preview = harness.state.lock().unwrap().preview.clone().unwrap();
        assert_eq!(preview.name, "b");
    }

    #[tokio::test]
    async fn failed_preview_keeps_previous_content() {
        let mut harness = TestHarness::new(project_service().with_failing_file("/p/sub/b"));
        harness.load("/p").await;

        finish(harness.preview("/p/a")).await;
        harness.drain();
        finish(harness.preview("/p/sub/b")).await;

        assert_eq!(harness.toasts()[0].0, ToastKind::Error);
        let preview = harness.state.lock().unwrap().preview.clone().unwrap();
        assert_eq!(preview.path, "/p/a");
        assert_eq!(preview.content, "A");
    }

    #[tokio::test]
    async fn superseded_preview_is_discarded() {
        let service = project_service().hold_until("/p/a", "/p/sub/b");
        let harness = TestHarness::new(service);
        harness.load("/p").await;

        let first = harness.preview("/p/a").unwrap();
        let second = harness.preview("/p/sub/b").unwrap();
        second.await.unwrap();
        first.await.unwrap();

        let preview = harness.state.lock().unwrap().preview.clone().unwrap();
        assert_eq!(preview.path, "/p/sub/b");
    }

    #[tokio::test]
    async fn activate_toggles_directories_and_previews_files() {
        let mut harness = TestHarness::new(project_service());
        harness.load("/p").await;

        assert!(harness.activate("/p/sub").is_none());
        assert!(harness.state.lock().unwrap().expanded_dirs.contains("/p/sub"));
        harness.activate("/p/sub");
        assert!(!harness.state.lock().unwrap().expanded_dirs.contains("/p/sub"));

        finish(harness.activate("/p/a")).await;
        let ui = harness.last_state().unwrap();
        assert_eq!(ui.previewed_path.as_deref(), Some("/p/a"));
    }

    #[tokio::test]
    async fn copy_all_puts_pre_order_text_on_clipboard() {
        let mut harness = TestHarness::new(project_service());
        harness.load("/p").await;
        harness.drain();

        finish(harness.copy(None)).await;

        assert_eq!(harness.clipboard.contents(), vec!["A\n\nB".to_string()]);
        let toasts = harness.toasts();
        assert_eq!(toasts.last().unwrap().0, ToastKind::Success);
        assert!(!harness.state.lock().unwrap().is_aggregating);
    }

    #[tokio::test]
    async fn copy_all_of_subtree() {
        let harness = TestHarness::new(project_service());
        harness.load("/p").await;

        finish(harness.copy(Some("/p/sub"))).await;
        assert_eq!(harness.clipboard.contents(), vec!["B".to_string()]);
    }

    #[tokio::test]
    async fn copy_all_failure_leaves_clipboard_untouched() {
        let mut harness = TestHarness::new(project_service().with_failing_file("/p/sub/b"));
        harness.load("/p").await;
        harness.drain();

        finish(harness.copy(None)).await;

        assert!(harness.clipboard.contents().is_empty());
        assert_eq!(harness.toasts().last().unwrap().0, ToastKind::Error);
    }

    #[tokio::test]
    async fn copy_all_with_marker_policy_warns() {
        let mut harness = TestHarness::new(project_service().with_failing_file("/p/a"));
        harness.state.lock().unwrap().config.failure_policy = FailurePolicy::Marker;
        harness.load("/p").await;
        harness.drain();

        finish(harness.copy(None)).await;

        let copied = harness.clipboard.contents();
        assert!(copied[0].starts_with("[ERROR READING FILE: /p/a"));
        assert!(copied[0].ends_with("\n\nB"));
        assert_eq!(harness.toasts().last().unwrap().0, ToastKind::Warning);
    }

    #[tokio::test]
    async fn clipboard_failure_is_reported() {
        let mut harness =
            TestHarness::with_clipboard(project_service(), RecordingClipboard::failing());
        harness.load("/p").await;
        harness.drain();

        finish(harness.copy(None)).await;
        assert_eq!(harness.toasts().last().unwrap().0, ToastKind::Error);
    }

    #[tokio::test]
    async fn copy_all_of_empty_directory_only_warns() {
        let service = MockService::new().with_tree("/e", Node::directory("e", "/e", Vec::new()));
        let mut harness = TestHarness::new(service);
        harness.load("/e").await;
        harness.drain();

        finish(harness.copy(None)).await;
        assert!(harness.clipboard.contents().is_empty());
        assert_eq!(harness.toasts().last().unwrap().0, ToastKind::Warning);
    }

    #[tokio::test]
    async fn copy_all_requires_a_tree() {
        let mut harness = TestHarness::new(project_service());
        assert!(harness.copy(None).is_none());
        assert_eq!(harness.toasts()[0].0, ToastKind::Warning);
    }

    #[tokio::test]
    async fn new_copy_supersedes_running_one() {
        let mut service = project_service();
        let gate = service.gate("/p/a");
        let harness = TestHarness::new(service);
        harness.load("/p").await;

        let first = harness.copy(None).unwrap();
        tokio::task::yield_now().await;
        let second = harness.copy(Some("/p/sub")).unwrap();
        second.await.unwrap();
        gate.notify_one();

        assert!(first.await.unwrap_err().is_cancelled());
        assert_eq!(harness.clipboard.contents(), vec!["B".to_string()]);
    }

    #[tokio::test]
    async fn copy_started_on_replaced_tree_never_reaches_clipboard() {
        let mut service = project_service().with_tree(
            "/q",
            Node::directory("q", "/q", vec![Node::file("x", "/q/x")]),
        );
        let gate = service.gate("/p/a");
        let mut harness = TestHarness::new(service);
        harness.load("/p").await;

        let pending = harness.copy(None).unwrap();
        harness.load("/q").await;
        harness.drain();
        gate.notify_one();
        pending.await.unwrap();

        assert!(harness.clipboard.contents().is_empty());
        assert!(!harness.state.lock().unwrap().is_aggregating);
        let toasts = harness.toasts();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].0, ToastKind::Warning);
    }

    #[tokio::test]
    async fn filter_expands_ancestors_of_matches() {
        let mut harness = TestHarness::new(project_service());
        harness.load("/p").await;

        update_filter(" B ", harness.proxy.clone(), harness.state.clone());

        let ui = harness.last_state().unwrap();
        assert_eq!(ui.filter_query, "B");
        assert_eq!(ui.visible_files_count, 1);
        let tree = ui.tree.unwrap();
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].children[0].path, "/p/sub/b");
    }

    #[tokio::test]
    async fn expand_and_collapse_all() {
        let harness = TestHarness::new(project_service());
        harness.load("/p").await;

        expand_collapse_all(true, harness.proxy.clone(), harness.state.clone());
        assert_eq!(harness.state.lock().unwrap().expanded_dirs.len(), 2);
        expand_collapse_all(false, harness.proxy.clone(), harness.state.clone());
        assert!(harness.state.lock().unwrap().expanded_dirs.is_empty());
    }

    #[tokio::test]
    async fn theme_toggle_is_persisted() {
        let mut harness = TestHarness::new(project_service());
        toggle_theme(harness.proxy.clone(), harness.state.clone());

        assert_eq!(harness.last_state().unwrap().theme, Theme::Dark);
        let dir = harness.state.lock().unwrap().config_dir.clone();
        let saved = crate::config::settings::load_config(dir.as_deref()).unwrap();
        assert_eq!(saved.theme, Theme::Dark);
    }

    #[tokio::test]
    async fn history_selection_reloads_entry() {
        let service = project_service()
            .with_tree("/q", Node::directory("q", "/q", Vec::new()));
        let harness = TestHarness::new(service);
        harness.load("/p").await;
        harness.load("/q").await;

        finish(harness.select(1)).await;

        let state = harness.state.lock().unwrap();
        assert_eq!(state.tree.as_ref().unwrap().root().path(), "/p");
        assert_eq!(
            state.config.path_history.entries(),
            ["/p".to_string(), "/q".to_string()]
        );
        drop(state);
        assert!(harness.select(9).is_none());
    }

    #[tokio::test]
    async fn clear_preview_invalidates_in_flight_request() {
        let mut service = project_service();
        let gate = service.gate("/p/a");
        let harness = TestHarness::new(service);
        harness.load("/p").await;

        let pending = harness.preview("/p/a").unwrap();
        clear_preview(harness.proxy.clone(), harness.state.clone());
        gate.notify_one();
        pending.await.unwrap();

        assert!(harness.state.lock().unwrap().preview.is_none());
    }
}
