//! Defines the event structures sent from the engine to the front end.

use serde::Serialize;

use super::view_model::UiState;
use crate::core::AggregateProgress;

/// Events sent from the background tasks to whatever renders the UI.
#[derive(Debug)]
pub enum UserEvent {
    /// A complete state update to re-render the UI.
    StateUpdate(Box<UiState>),
    /// Content for the file preview panel.
    ShowFilePreview {
        name: String,
        path: String,
        content: String,
    },
    /// A leaf finished during a running "copy all".
    AggregateProgress(AggregateProgress),
    /// A short, non-blocking notification.
    Toast(Toast),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> UserEvent {
        Self::event(ToastKind::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> UserEvent {
        Self::event(ToastKind::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> UserEvent {
        Self::event(ToastKind::Error, message)
    }

    fn event(kind: ToastKind, message: impl Into<String>) -> UserEvent {
        UserEvent::Toast(Toast {
            kind,
            message: message.into(),
        })
    }
}
