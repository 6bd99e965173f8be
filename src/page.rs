//! Chatbot page controller
//!
//! Handles every [`PageCommand`] for a client: field transitions, the filter
//! panel toggle, execute, quick actions, free text and downloads. Runs inside
//! the client's inbox worker, so two requests for the same client never
//! interleave.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Datelike;

use crate::collaborator::ChatbotEngine;
use crate::error::{EsgError, Result};
use crate::filter::{FilterField, FilterSelection, Intent, QuickAction};
use crate::report;
use crate::session::worker::{spawn_inbox, CommandHandler};
use crate::session::{ClientId, PageCommand, SessionRegistry};
use crate::stream::{RenderedBlock, ResponseOrchestrator, ResponseRequest};
use crate::view::{NoticeLevel, ViewBundle, ViewEvent, ViewSurface, WidgetId};

const WELCOME_TEXT: &str = "Welcome! Use the guided filters on the left to choose what you need. \
I can look up ESG data, analyze trends and generate reports.";

pub struct PageController {
    registry: SessionRegistry,
    orchestrator: ResponseOrchestrator,
}

impl PageController {
    pub fn new(registry: SessionRegistry, chatbot: Arc<dyn ChatbotEngine>, cmp_num: impl Into<String>) -> Self {
        Self {
            registry,
            orchestrator: ResponseOrchestrator::new(chatbot, cmp_num),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Register a client and start its inbox worker
    pub async fn connect(self: &Arc<Self>) -> ClientId {
        let client = self.registry.connect().await;
        let handler: Arc<dyn CommandHandler> = self.clone();
        let (inbox, _task) = spawn_inbox(client, handler);
        self.registry.attach_inbox(client, inbox).await;
        client
    }

    /// Drop the client and end its chatbot session
    pub async fn disconnect(&self, client: ClientId) -> bool {
        let Some(closed) = self.registry.disconnect(client).await else {
            return false;
        };
        if let Some(session) = closed.chat_session {
            self.orchestrator.chatbot().end_session(&session).await;
        }
        true
    }

    /// Queue a command on the client's inbox
    pub async fn submit(&self, client: ClientId, command: PageCommand) -> Result<()> {
        let inbox = self
            .registry
            .inbox(client)
            .await
            .ok_or(EsgError::UnknownClient(client))?;
        inbox.submit(command).await
    }

    fn current_year() -> i32 {
        chrono::Local::now().year()
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Attach a fresh view and replay the client's state onto it
    pub async fn render(&self, client: ClientId, bundle: ViewBundle) {
        let Some(selection) = self.registry.selection(client).await else {
            tracing::debug!(%client, "render for unknown client ignored");
            return;
        };
        let surface = bundle.surface.clone();
        let open = bundle.filter_open;
        if !self.registry.attach_view(client, bundle).await {
            return;
        }

        surface.set_value(WidgetId::IntentSelect, selection.intent.map(|i| i.as_str().to_string()));
        surface.set_value(WidgetId::CategorySelect, selection.category.map(|c| c.as_str().to_string()));
        surface.set_value(WidgetId::PeriodSelect, selection.period.map(|p| p.as_str().to_string()));
        surface.set_enabled(WidgetId::ExecuteButton, selection.is_complete());
        apply_filter_panel(surface.as_ref(), open);
        surface.present(ViewEvent::AssistantText {
            id: uuid::Uuid::new_v4(),
            text: WELCOME_TEXT.to_string(),
        });
    }

    // ========================================================================
    // Filter form
    // ========================================================================

    pub async fn set_field(&self, client: ClientId, field: FilterField, value: Option<String>) {
        let Some(result) = self
            .registry
            .try_update_state(client, |s| s.apply(field, value.as_deref()))
            .await
        else {
            return;
        };
        let view = self.registry.get_view(client).await;

        match result {
            Ok(transition) => {
                tracing::debug!(%client, ?field, complete = transition.complete, "filter transition");
                if let Some(view) = view {
                    if transition.cascaded {
                        view.surface.set_value(WidgetId::CategorySelect, None);
                        view.surface.set_value(WidgetId::PeriodSelect, None);
                    }
                    view.surface
                        .set_enabled(WidgetId::ExecuteButton, transition.complete);
                }
            }
            Err(e) => {
                tracing::warn!(%client, ?field, error = %e, "rejected filter value");
                if let Some(view) = view {
                    view.surface.notify(e.notice_level(), &e.to_string());
                }
            }
        }
    }

    /// Flip the filter panel. No-op before the first render.
    pub async fn toggle_filter(&self, client: ClientId) {
        let toggled = self
            .registry
            .update_view(client, |view| {
                view.filter_open = !view.filter_open;
                (view.surface.clone(), view.filter_open)
            })
            .await;
        if let Some((surface, open)) = toggled {
            apply_filter_panel(surface.as_ref(), open);
        }
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Run the structured query for the current selection
    pub async fn execute(&self, client: ClientId) {
        let Some(view) = self.registry.get_view(client).await else {
            tracing::debug!(%client, "execute before render ignored");
            return;
        };
        let surface = view.surface;

        let Some(selection) = self.registry.selection(client).await else {
            return;
        };
        let Some(query) = complete_query(&selection) else {
            surface.notify(
                NoticeLevel::Warning,
                "Please select an action, category and period first.",
            );
            surface.set_enabled(WidgetId::ExecuteButton, false);
            return;
        };

        let session = match self
            .registry
            .get_or_create_session(client, self.orchestrator.chatbot().as_ref())
            .await
        {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(%client, error = %e, "could not create chat session");
                surface.notify(NoticeLevel::Negative, &e.to_string());
                return;
            }
        };

        let request = ResponseRequest {
            text: query,
            session,
            context: selection.ui_context(),
            intent_hint: match selection.intent {
                Some(Intent::ReportGeneration) => Some(Intent::ReportGeneration),
                _ => None,
            },
        };

        set_running(surface.as_ref(), true);
        let block = self.orchestrator.respond(&request, surface.as_ref()).await;
        self.remember_report(client, &block).await;

        // The client may have disconnected while the answer was produced
        let complete = self
            .registry
            .selection(client)
            .await
            .is_some_and(|s| s.is_complete());
        set_running(surface.as_ref(), false);
        surface.set_enabled(WidgetId::ExecuteButton, complete);
    }

    /// Fill the form with a preset and execute it
    pub async fn quick_action(&self, client: ClientId, action: QuickAction) {
        let selection = action.selection();
        if self
            .registry
            .try_update_state(client, |s| *s = selection)
            .await
            .is_none()
        {
            return;
        }
        if let Some(view) = self.registry.get_view(client).await {
            view.surface.set_value(WidgetId::IntentSelect, selection.intent.map(|i| i.as_str().to_string()));
            view.surface.set_value(WidgetId::CategorySelect, selection.category.map(|c| c.as_str().to_string()));
            view.surface.set_value(WidgetId::PeriodSelect, selection.period.map(|p| p.as_str().to_string()));
        }
        tracing::info!(%client, ?action, "quick action");
        self.execute(client).await;
    }

    /// Free-text chat message
    pub async fn free_text(&self, client: ClientId, text: &str) {
        let Some(view) = self.registry.get_view(client).await else {
            return;
        };
        let surface = view.surface;

        let text = text.trim();
        if text.is_empty() {
            surface.notify(NoticeLevel::Warning, "Please enter a message.");
            return;
        }

        let session = match self
            .registry
            .get_or_create_session(client, self.orchestrator.chatbot().as_ref())
            .await
        {
            Ok(session) => session,
            Err(e) => {
                surface.notify(NoticeLevel::Negative, &e.to_string());
                return;
            }
        };

        surface.set_enabled(WidgetId::SendButton, false);
        surface.set_enabled(WidgetId::ChatInput, false);
        surface.present(ViewEvent::UserMessage {
            text: text.to_string(),
        });

        let request = ResponseRequest {
            text: text.to_string(),
            session,
            context: Default::default(),
            intent_hint: None,
        };
        let block = self.orchestrator.respond(&request, surface.as_ref()).await;
        self.remember_report(client, &block).await;

        surface.set_value(WidgetId::ChatInput, Some(String::new()));
        surface.set_enabled(WidgetId::ChatInput, true);
        surface.set_enabled(WidgetId::SendButton, true);
    }

    /// Path of the last report if it still exists; a notice otherwise
    pub async fn download(&self, client: ClientId) -> Result<PathBuf> {
        let last = self.registry.last_report(client).await;
        let result = report::resolve_download(last.as_deref()).await;
        if let Err(e) = &result {
            tracing::warn!(%client, error = %e, "download unavailable");
            if let Some(view) = self.registry.get_view(client).await {
                view.surface.notify(e.notice_level(), &e.to_string());
            }
        }
        result
    }

    async fn remember_report(&self, client: ClientId, block: &RenderedBlock) {
        if let RenderedBlock::Report(artifact) = block {
            self.registry
                .set_last_report(client, artifact.path.clone())
                .await;
        }
    }
}

#[async_trait]
impl CommandHandler for PageController {
    async fn handle(&self, client: ClientId, command: PageCommand) {
        match command {
            PageCommand::Render { view } => self.render(client, view).await,
            PageCommand::SetField { field, value } => self.set_field(client, field, value).await,
            PageCommand::ToggleFilter => self.toggle_filter(client).await,
            PageCommand::Execute => self.execute(client).await,
            PageCommand::Quick(action) => self.quick_action(client, action).await,
            PageCommand::FreeText(text) => self.free_text(client, &text).await,
            PageCommand::Download { reply } => {
                let result = self.download(client).await;
                // Requester may have gone away
                let _ = reply.send(result);
            }
        }
    }
}

/// Structured query, only for a complete selection
fn complete_query(selection: &FilterSelection) -> Option<String> {
    if !selection.is_complete() {
        return None;
    }
    selection.structured_query(PageController::current_year())
}

fn apply_filter_panel(surface: &dyn ViewSurface, open: bool) {
    surface.set_visible(WidgetId::FilterPanel, open);
    surface.set_visible(WidgetId::FilterToggle, !open);
}

fn set_running(surface: &dyn ViewSurface, running: bool) {
    for widget in WidgetId::FORM {
        surface.set_enabled(widget, !running);
    }
}
