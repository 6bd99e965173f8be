//! Session registry
//!
//! ```text
//! SessionRegistry
//!   clients: Arc<RwLock<HashMap<ClientId, ClientEntry>>>
//!                                        │
//!                                        ├─ state: Arc<Mutex<ClientSession>>
//!                                        └─ inbox: Option<InboxHandle>
//! ```
//!
//! The outer map lock is only held to find or insert an entry. All per-client
//! mutation happens under the entry mutex, which is never held while a view
//! event is sent.
//!
//! Writes that land after a request has finished go through the
//! non-creating lookup, so a client disconnected mid-request stays gone.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use super::{ClientId, ClientSession, InboxHandle};
use crate::collaborator::{ChatSessionId, ChatbotEngine};
use crate::error::{EsgError, Result};
use crate::filter::FilterSelection;
use crate::view::ViewBundle;

struct ClientEntry {
    state: Arc<Mutex<ClientSession>>,
    inbox: Option<InboxHandle>,
}

impl ClientEntry {
    fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ClientSession::default())),
            inbox: None,
        }
    }
}

/// What a disconnect released
#[derive(Debug)]
pub struct ClosedClient {
    pub chat_session: Option<ChatSessionId>,
}

/// Shared map of client state
#[derive(Clone, Default)]
pub struct SessionRegistry {
    clients: Arc<RwLock<HashMap<ClientId, ClientEntry>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new client and return its id
    pub async fn connect(&self) -> ClientId {
        let client = ClientId::new();
        self.clients.write().await.insert(client, ClientEntry::new());
        tracing::info!(%client, "client connected");
        client
    }

    /// Remove a client. Drops its view and closes its inbox.
    ///
    /// Returns `None` if the client was not registered.
    pub async fn disconnect(&self, client: ClientId) -> Option<ClosedClient> {
        let entry = self.clients.write().await.remove(&client)?;
        if let Some(inbox) = entry.inbox {
            inbox.close();
        }
        let mut session = entry.state.lock().await;
        session.view = None;
        tracing::info!(%client, "client disconnected");
        Some(ClosedClient {
            chat_session: session.chat_session.take(),
        })
    }

    pub async fn contains(&self, client: ClientId) -> bool {
        self.clients.read().await.contains_key(&client)
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }

    /// Entry state for `client`, creating the entry on first access
    async fn entry(&self, client: ClientId) -> Arc<Mutex<ClientSession>> {
        {
            let clients = self.clients.read().await;
            if let Some(entry) = clients.get(&client) {
                return entry.state.clone();
            }
        }
        let mut clients = self.clients.write().await;
        // Double-check after acquiring write lock
        clients
            .entry(client)
            .or_insert_with(ClientEntry::new)
            .state
            .clone()
    }

    /// Entry state for `client` without creating it
    async fn existing(&self, client: ClientId) -> Option<Arc<Mutex<ClientSession>>> {
        self.clients
            .read()
            .await
            .get(&client)
            .map(|entry| entry.state.clone())
    }

    /// Chatbot session for `client`, minted through `chatbot` on first use.
    ///
    /// The entry lock is held across creation so concurrent callers for the
    /// same client observe one session. Fails for clients that are not
    /// registered.
    pub async fn get_or_create_session(
        &self,
        client: ClientId,
        chatbot: &dyn ChatbotEngine,
    ) -> Result<ChatSessionId> {
        let state = self
            .existing(client)
            .await
            .ok_or(EsgError::UnknownClient(client))?;
        let mut session = state.lock().await;
        if let Some(id) = &session.chat_session {
            return Ok(id.clone());
        }
        let id = chatbot.create_session().await?;
        tracing::debug!(%client, chat_session = %id, "chat session created");
        session.chat_session = Some(id.clone());
        Ok(id)
    }

    pub async fn get_or_create_state(&self, client: ClientId) -> FilterSelection {
        self.entry(client).await.lock().await.selection
    }

    /// Like [`update_state`](Self::update_state) but `None` for unknown clients
    pub async fn try_update_state<R>(
        &self,
        client: ClientId,
        f: impl FnOnce(&mut FilterSelection) -> R,
    ) -> Option<R> {
        let state = self.existing(client).await?;
        let mut session = state.lock().await;
        Some(f(&mut session.selection))
    }

    /// Current selection, `None` for unknown clients
    pub async fn selection(&self, client: ClientId) -> Option<FilterSelection> {
        let state = self.existing(client).await?;
        let selection = state.lock().await.selection;
        Some(selection)
    }

    /// Mutate the selection atomically and return what `f` returns
    pub async fn update_state<R>(
        &self,
        client: ClientId,
        f: impl FnOnce(&mut FilterSelection) -> R,
    ) -> R {
        let state = self.entry(client).await;
        let mut session = state.lock().await;
        f(&mut session.selection)
    }

    /// Current view, `None` when the page has not been rendered
    pub async fn get_view(&self, client: ClientId) -> Option<ViewBundle> {
        let state = self.existing(client).await?;
        let session = state.lock().await;
        session.view.clone()
    }

    /// Replace the client's view wholesale. Returns false for unknown clients.
    pub async fn attach_view(&self, client: ClientId, bundle: ViewBundle) -> bool {
        let Some(state) = self.existing(client).await else {
            return false;
        };
        state.lock().await.view = Some(bundle);
        true
    }

    /// Mutate the attached view; `None` when not rendered
    pub async fn update_view<R>(
        &self,
        client: ClientId,
        f: impl FnOnce(&mut ViewBundle) -> R,
    ) -> Option<R> {
        let state = self.existing(client).await?;
        let mut session = state.lock().await;
        session.view.as_mut().map(f)
    }

    /// Record the client's last report. No-op for unknown clients.
    pub async fn set_last_report(&self, client: ClientId, path: PathBuf) {
        let Some(state) = self.existing(client).await else {
            tracing::debug!(%client, path = %path.display(), "report for departed client not recorded");
            return;
        };
        state.lock().await.last_report = Some(path);
    }

    pub async fn last_report(&self, client: ClientId) -> Option<PathBuf> {
        let state = self.existing(client).await?;
        let session = state.lock().await;
        session.last_report.clone()
    }

    /// Install the client's inbox. Returns false for unknown clients.
    pub async fn attach_inbox(&self, client: ClientId, inbox: InboxHandle) -> bool {
        match self.clients.write().await.get_mut(&client) {
            Some(entry) => {
                entry.inbox = Some(inbox);
                true
            }
            None => false,
        }
    }

    pub async fn inbox(&self, client: ClientId) -> Option<InboxHandle> {
        self.clients
            .read()
            .await
            .get(&client)
            .and_then(|entry| entry.inbox.clone())
    }
}
