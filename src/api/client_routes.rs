//! Per-client routes
//!
//! Interaction commands are queued on the client's inbox and answered with
//! 202; their effects arrive on the client's SSE stream.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

use super::{api_error, ApiError, ApiResponse, AppState};
use crate::error::EsgError;
use crate::filter::{FilterField, QuickAction};
use crate::session::{ClientId, PageCommand};
use crate::view::{ChannelView, ViewBundle};

// ── Request/Response Types ───────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectResponse {
    pub client_id: ClientId,
}

#[derive(Debug, Deserialize)]
pub struct FilterRequest {
    pub field: FilterField,
    /// Empty or absent clears the field
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

// ── Handlers ─────────────────────────────────────────────────

/// POST /api/clients
pub(super) async fn connect(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<ConnectResponse>>) {
    let client_id = state.controller.connect().await;
    (
        StatusCode::CREATED,
        Json(ApiResponse::ok(ConnectResponse { client_id })),
    )
}

/// DELETE /api/clients/:id
pub(super) async fn disconnect(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let client = ClientId(id);
    if state.controller.disconnect(client).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(EsgError::UnknownClient(client).into())
    }
}

/// GET /api/clients/:id/events
///
/// Subscribes before queueing the render so the replayed state is not lost.
pub(super) async fn events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let client = ClientId(id);
    let view = ChannelView::default();
    let rx = view.subscribe();

    state
        .controller
        .submit(
            client,
            PageCommand::Render {
                view: ViewBundle::new(Arc::new(view)),
            },
        )
        .await?;

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => {
            let json = serde_json::to_string(&event).unwrap_or_default();
            Some(Ok(Event::default().event(event.kind()).data(json)))
        }
        Err(_) => None, // Lagged
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    ))
}

/// POST /api/clients/:id/filter
pub(super) async fn set_filter(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<FilterRequest>,
) -> Result<StatusCode, ApiError> {
    accept(
        &state,
        id,
        PageCommand::SetField {
            field: req.field,
            value: req.value,
        },
    )
    .await
}

/// POST /api/clients/:id/filter/toggle
pub(super) async fn toggle_filter(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    accept(&state, id, PageCommand::ToggleFilter).await
}

/// POST /api/clients/:id/execute
pub(super) async fn execute(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    accept(&state, id, PageCommand::Execute).await
}

/// POST /api/clients/:id/quick/:action
pub(super) async fn quick_action(
    State(state): State<AppState>,
    Path((id, action)): Path<(Uuid, String)>,
) -> Result<StatusCode, ApiError> {
    let action: QuickAction = action.parse()?;
    accept(&state, id, PageCommand::Quick(action)).await
}

/// POST /api/clients/:id/chat
pub(super) async fn chat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ChatRequest>,
) -> Result<StatusCode, ApiError> {
    accept(&state, id, PageCommand::FreeText(req.text)).await
}

/// GET /api/clients/:id/report/download
pub(super) async fn download(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let client = ClientId(id);
    let (reply, rx) = oneshot::channel();
    state
        .controller
        .submit(client, PageCommand::Download { reply })
        .await?;

    let path = rx
        .await
        .map_err(|_| api_error(StatusCode::INTERNAL_SERVER_ERROR, "Download request dropped"))??;

    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        tracing::warn!(%client, path = %path.display(), error = %e, "report unreadable");
        api_error(
            StatusCode::NOT_FOUND,
            format!("Report file not found: {}", path.display()),
        )
    })?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("report.pdf")
        .to_string();
    tracing::info!(%client, file = %file_name, "report downloaded");

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
        .into_response())
}

async fn accept(state: &AppState, id: Uuid, command: PageCommand) -> Result<StatusCode, ApiError> {
    state.controller.submit(ClientId(id), command).await?;
    Ok(StatusCode::ACCEPTED)
}
