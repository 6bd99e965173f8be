//! Streaming response orchestrator
//!
//! Turns one query into exactly one rendered block in the chat: a report
//! download block, the accumulated answer text, or an inline error. Chunks
//! are accumulated silently and the placeholder is replaced once, after the
//! stream ends.

use std::sync::Arc;

use futures::StreamExt;
use uuid::Uuid;

use crate::collaborator::{ChatSessionId, ChatbotEngine};
use crate::error::Result;
use crate::filter::{Intent, UiContext};
use crate::report::{self, ReportArtifact};
use crate::view::{ViewEvent, ViewSurface};

pub const EMPTY_RESPONSE_TEXT: &str = "No response was generated.";
const PENDING_RESPONSE_TEXT: &str = "Generating a response, please wait...";
const PENDING_REPORT_TEXT: &str = "Generating the report, please wait...";

/// One query to answer
#[derive(Debug, Clone)]
pub struct ResponseRequest {
    pub text: String,
    pub session: ChatSessionId,
    pub context: UiContext,
    /// `ReportGeneration` takes the direct report path
    pub intent_hint: Option<Intent>,
}

/// What ended up in the chat for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedBlock {
    Report(ReportArtifact),
    Text(String),
    Error(String),
}

pub struct ResponseOrchestrator {
    chatbot: Arc<dyn ChatbotEngine>,
    cmp_num: String,
}

impl ResponseOrchestrator {
    pub fn new(chatbot: Arc<dyn ChatbotEngine>, cmp_num: impl Into<String>) -> Self {
        Self {
            chatbot,
            cmp_num: cmp_num.into(),
        }
    }

    pub fn chatbot(&self) -> &Arc<dyn ChatbotEngine> {
        &self.chatbot
    }

    /// Answer `request` on `view`. Never fails; errors are rendered inline.
    pub async fn respond(&self, request: &ResponseRequest, view: &dyn ViewSurface) -> RenderedBlock {
        let id = Uuid::new_v4();

        let block = if request.intent_hint == Some(Intent::ReportGeneration) {
            view.present(ViewEvent::Pending {
                id,
                text: PENDING_REPORT_TEXT.to_string(),
            });
            let category = Some(request.context.selected_category);
            let period = Some(request.context.selected_period);
            match report::generate_and_export(self.chatbot.as_ref(), &self.cmp_num, category, period).await {
                Ok(artifact) => RenderedBlock::Report(artifact),
                Err(e) => {
                    tracing::error!(error = %e, "report generation failed");
                    RenderedBlock::Error(format!("Failed to generate the report: {}", e))
                }
            }
        } else {
            view.present(ViewEvent::Pending {
                id,
                text: PENDING_RESPONSE_TEXT.to_string(),
            });
            match self.stream_answer(request).await {
                Ok(block) => block,
                Err(e) => {
                    tracing::error!(session = %request.session, error = %e, "streaming failed");
                    RenderedBlock::Error(format!("An error occurred while streaming: {}", e))
                }
            }
        };

        view.present(match &block {
            RenderedBlock::Report(artifact) => ViewEvent::ReportReady {
                id,
                title: artifact.title.clone(),
            },
            RenderedBlock::Text(text) => ViewEvent::AssistantText {
                id,
                text: text.clone(),
            },
            RenderedBlock::Error(text) => ViewEvent::Error {
                id,
                text: text.clone(),
            },
        });
        view.present(ViewEvent::ScrollToBottom);
        block
    }

    async fn stream_answer(&self, request: &ResponseRequest) -> Result<RenderedBlock> {
        let mut chunks =
            self.chatbot
                .stream_response(&request.text, &request.session, &request.context);

        let mut full = String::new();
        while let Some(chunk) = chunks.next().await {
            full.push_str(&chunk?);
        }

        let outcome = self.chatbot.get_last_outcome(&request.session).await;
        if let Some(report_id) = outcome.exportable_report() {
            let artifact = report::export(self.chatbot.as_ref(), report_id).await?;
            return Ok(RenderedBlock::Report(artifact));
        }

        if full.is_empty() {
            Ok(RenderedBlock::Text(EMPTY_RESPONSE_TEXT.to_string()))
        } else {
            Ok(RenderedBlock::Text(full))
        }
    }
}
