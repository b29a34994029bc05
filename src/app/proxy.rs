//! Defines an abstraction over the event sending mechanism.

use super::events::UserEvent;
use tokio::sync::mpsc;

/// A trait that abstracts the sending of user events.
/// This is "fire-and-forget" and doesn't return a result, simplifying its use.
pub trait EventProxy: Send + Sync + Clone + 'static {
    fn send_event(&self, event: UserEvent);
}

/// Forwards events into a tokio channel, e.g. to a render loop.
impl EventProxy for mpsc::UnboundedSender<UserEvent> {
    fn send_event(&self, event: UserEvent) {
        // A closed receiver only means nobody is rendering any more.
        if let Err(e) = self.send(event) {
            tracing::warn!("Failed to send event to the front end: {}", e);
        }
    }
}
