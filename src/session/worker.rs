//! Per-client inbox
//!
//! Every interaction from a client becomes a [`PageCommand`] on a bounded
//! mpsc channel. One worker task per client drains it, so commands for the
//! same client run strictly one after another while different clients
//! proceed concurrently.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::ClientId;
use crate::error::{EsgError, Result};
use crate::filter::{FilterField, QuickAction};
use crate::view::ViewBundle;

/// Inbox capacity per client
const DEFAULT_INBOX_SIZE: usize = 32;

/// One client interaction
pub enum PageCommand {
    /// Page (re)rendered with a fresh view
    Render { view: ViewBundle },
    SetField {
        field: FilterField,
        value: Option<String>,
    },
    ToggleFilter,
    Execute,
    Quick(QuickAction),
    FreeText(String),
    /// Resolve the file to transfer for the last report
    Download {
        reply: oneshot::Sender<Result<PathBuf>>,
    },
}

impl PageCommand {
    pub fn name(&self) -> &'static str {
        match self {
            PageCommand::Render { .. } => "render",
            PageCommand::SetField { .. } => "set_field",
            PageCommand::ToggleFilter => "toggle_filter",
            PageCommand::Execute => "execute",
            PageCommand::Quick(_) => "quick_action",
            PageCommand::FreeText(_) => "free_text",
            PageCommand::Download { .. } => "download",
        }
    }
}

impl std::fmt::Debug for PageCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Consumer of a client's commands
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, client: ClientId, command: PageCommand);
}

/// Sending half of a client's inbox
#[derive(Clone)]
pub struct InboxHandle {
    client: ClientId,
    sender: mpsc::Sender<PageCommand>,
    closed: Arc<AtomicBool>,
}

impl InboxHandle {
    pub fn client(&self) -> ClientId {
        self.client
    }

    /// Queue a command. Fails once the inbox is closed.
    pub async fn submit(&self, command: PageCommand) -> Result<()> {
        if self.is_closed() {
            return Err(EsgError::UnknownClient(self.client));
        }
        self.sender
            .send(command)
            .await
            .map_err(|_| EsgError::UnknownClient(self.client))
    }

    /// Stop processing. Commands still queued are discarded.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.sender.is_closed()
    }
}

/// Start the worker task for `client`
pub fn spawn_inbox(
    client: ClientId,
    handler: Arc<dyn CommandHandler>,
) -> (InboxHandle, JoinHandle<()>) {
    spawn_inbox_with_size(client, handler, DEFAULT_INBOX_SIZE)
}

pub fn spawn_inbox_with_size(
    client: ClientId,
    handler: Arc<dyn CommandHandler>,
    size: usize,
) -> (InboxHandle, JoinHandle<()>) {
    let (sender, mut receiver) = mpsc::channel::<PageCommand>(size);
    let closed = Arc::new(AtomicBool::new(false));
    let handle = InboxHandle {
        client,
        sender,
        closed: closed.clone(),
    };

    let task = tokio::spawn(async move {
        tracing::debug!(%client, "inbox worker started");
        while let Some(command) = receiver.recv().await {
            if closed.load(Ordering::SeqCst) {
                break;
            }
            tracing::debug!(%client, command = command.name(), "processing command");
            handler.handle(client, command).await;
        }
        receiver.close();
        tracing::debug!(%client, "inbox worker stopped");
    });

    (handle, task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
        active: AtomicBool,
        overlapped: AtomicBool,
    }

    #[async_trait]
    impl CommandHandler for Recorder {
        async fn handle(&self, _client: ClientId, command: PageCommand) {
            if self.active.swap(true, Ordering::SeqCst) {
                self.overlapped.store(true, Ordering::SeqCst);
            }
            let label = match &command {
                PageCommand::FreeText(text) => text.clone(),
                other => other.name().to_string(),
            };
            tokio::time::sleep(Duration::from_millis(2)).await;
            self.seen.lock().await.push(label);
            self.active.store(false, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn commands_are_processed_in_order_without_overlap() {
        let recorder = Arc::new(Recorder::default());
        let (inbox, task) = spawn_inbox(ClientId::new(), recorder.clone());

        for i in 0..10 {
            inbox
                .submit(PageCommand::FreeText(format!("msg-{}", i)))
                .await
                .unwrap();
        }
        inbox.submit(PageCommand::Execute).await.unwrap();
        drop(inbox);
        task.await.unwrap();

        let seen = recorder.seen.lock().await.clone();
        let mut expected: Vec<String> = (0..10).map(|i| format!("msg-{}", i)).collect();
        expected.push("execute".to_string());
        assert_eq!(seen, expected);
        assert!(!recorder.overlapped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn closed_inbox_rejects_commands() {
        let recorder = Arc::new(Recorder::default());
        let client = ClientId::new();
        let (inbox, task) = spawn_inbox(client, recorder.clone());

        inbox.close();
        assert!(inbox.is_closed());
        let err = inbox.submit(PageCommand::Execute).await.unwrap_err();
        assert!(matches!(err, EsgError::UnknownClient(id) if id == client));

        drop(inbox);
        task.await.unwrap();
        assert!(recorder.seen.lock().await.is_empty());
    }
}
