//! View capability for a client's live page
//!
//! The controller never touches widgets directly. It talks to a
//! [`ViewSurface`], which the server backs with a broadcast channel of
//! [`ViewEvent`]s delivered over SSE. Sends to a client with no listener are
//! dropped silently.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Widgets the controller can address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetId {
    IntentSelect,
    CategorySelect,
    PeriodSelect,
    ExecuteButton,
    QuickActions,
    ChatInput,
    SendButton,
    FilterPanel,
    FilterToggle,
}

impl WidgetId {
    /// Widgets disabled while a request is in flight
    pub const FORM: [WidgetId; 5] = [
        WidgetId::IntentSelect,
        WidgetId::CategorySelect,
        WidgetId::PeriodSelect,
        WidgetId::ExecuteButton,
        WidgetId::QuickActions,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Positive,
    Warning,
    Negative,
}

/// Identifies one assistant bubble so later events can replace it
pub type MessageId = Uuid;

/// Everything the page can be told to do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewEvent {
    Text {
        widget: WidgetId,
        text: String,
    },
    Enabled {
        widget: WidgetId,
        enabled: bool,
    },
    Visible {
        widget: WidgetId,
        visible: bool,
    },
    /// `None` resets the widget to unset
    Value {
        widget: WidgetId,
        value: Option<String>,
    },
    UserMessage {
        text: String,
    },
    /// Placeholder bubble with a spinner
    Pending {
        id: MessageId,
        text: String,
    },
    AssistantText {
        id: MessageId,
        text: String,
    },
    ReportReady {
        id: MessageId,
        title: String,
    },
    Error {
        id: MessageId,
        text: String,
    },
    Notice {
        level: NoticeLevel,
        text: String,
    },
    ScrollToBottom,
}

impl ViewEvent {
    /// SSE event name
    pub fn kind(&self) -> &'static str {
        match self {
            ViewEvent::Text { .. } => "text",
            ViewEvent::Enabled { .. } => "enabled",
            ViewEvent::Visible { .. } => "visible",
            ViewEvent::Value { .. } => "value",
            ViewEvent::UserMessage { .. } => "user_message",
            ViewEvent::Pending { .. } => "pending",
            ViewEvent::AssistantText { .. } => "assistant_text",
            ViewEvent::ReportReady { .. } => "report_ready",
            ViewEvent::Error { .. } => "error",
            ViewEvent::Notice { .. } => "notice",
            ViewEvent::ScrollToBottom => "scroll_to_bottom",
        }
    }
}

/// Capability handle on one client's page.
///
/// Only `present` is required; the widget helpers are expressed in terms of
/// it.
pub trait ViewSurface: Send + Sync {
    fn present(&self, event: ViewEvent);

    fn update_text(&self, widget: WidgetId, text: &str) {
        self.present(ViewEvent::Text {
            widget,
            text: text.to_string(),
        });
    }

    fn set_enabled(&self, widget: WidgetId, enabled: bool) {
        self.present(ViewEvent::Enabled { widget, enabled });
    }

    fn set_visible(&self, widget: WidgetId, visible: bool) {
        self.present(ViewEvent::Visible { widget, visible });
    }

    fn set_value(&self, widget: WidgetId, value: Option<String>) {
        self.present(ViewEvent::Value { widget, value });
    }

    fn notify(&self, level: NoticeLevel, text: &str) {
        self.present(ViewEvent::Notice {
            level,
            text: text.to_string(),
        });
    }
}

/// View surface publishing to a broadcast channel
#[derive(Clone)]
pub struct ChannelView {
    tx: broadcast::Sender<ViewEvent>,
}

impl ChannelView {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChannelView {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ViewSurface for ChannelView {
    fn present(&self, event: ViewEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("view event dropped, no subscribers");
        }
    }
}

/// The client's live view plus page-local UI state
#[derive(Clone)]
pub struct ViewBundle {
    pub surface: Arc<dyn ViewSurface>,
    pub filter_open: bool,
}

impl ViewBundle {
    pub fn new(surface: Arc<dyn ViewSurface>) -> Self {
        Self {
            surface,
            filter_open: true,
        }
    }
}

impl std::fmt::Debug for ViewBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewBundle")
            .field("filter_open", &self.filter_open)
            .finish_non_exhaustive()
    }
}

/// Test helper that records every event in order
#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingView {
        events: Mutex<Vec<ViewEvent>>,
    }

    impl RecordingView {
        pub fn events(&self) -> Vec<ViewEvent> {
            self.events.lock().map(|e| e.clone()).unwrap_or_default()
        }
    }

    impl ViewSurface for RecordingView {
        fn present(&self, event: ViewEvent) {
            if let Ok(mut events) = self.events.lock() {
                events.push(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(ViewEvent::Enabled {
            widget: WidgetId::ExecuteButton,
            enabled: false,
        })
        .unwrap();
        assert_eq!(json["type"], "enabled");
        assert_eq!(json["widget"], "execute_button");

        let json = serde_json::to_value(ViewEvent::ScrollToBottom).unwrap();
        assert_eq!(json["type"], "scroll_to_bottom");
    }

    #[tokio::test]
    async fn channel_view_delivers_to_subscribers() {
        let view = ChannelView::new(8);
        let mut rx = view.subscribe();
        view.set_visible(WidgetId::FilterPanel, false);

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            ViewEvent::Visible {
                widget: WidgetId::FilterPanel,
                visible: false
            }
        );
    }

    #[test]
    fn channel_view_without_subscribers_drops_events() {
        let view = ChannelView::new(8);
        assert_eq!(view.receiver_count(), 0);
        view.notify(NoticeLevel::Info, "nobody listening");
    }
}
