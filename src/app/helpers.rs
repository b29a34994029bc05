//! Contains helper functions to reduce boilerplate code in other `app` modules.

use std::sync::{Arc, Mutex, MutexGuard};

use super::events::UserEvent;
use super::proxy::EventProxy;
use super::state::AppState;
use super::view_model::generate_ui_state;

/// Locks the shared state.
pub fn lock_state(state: &Arc<Mutex<AppState>>) -> MutexGuard<'_, AppState> {
    state
        .lock()
        .expect("Mutex was poisoned. This should not happen.")
}

/// Sends the current view of `state` to the front end.
pub fn notify_state<P: EventProxy>(state: &AppState, proxy: &P) {
    proxy.send_event(UserEvent::StateUpdate(Box::new(generate_ui_state(state))));
}

/// A helper function that locks the `AppState`, performs a mutation,
/// and then automatically sends a `StateUpdate` event to the UI.
///
/// Whatever the mutation returns is handed back to the caller.
pub fn with_state_and_notify<F, R, P: EventProxy>(
    state: &Arc<Mutex<AppState>>,
    proxy: &P,
    update_fn: F,
) -> R
where
    F: FnOnce(&mut AppState) -> R,
{
    let mut state_guard = lock_state(state);
    let result = update_fn(&mut state_guard);
    notify_state(&state_guard, proxy);
    result
}
