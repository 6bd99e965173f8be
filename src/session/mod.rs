//! Per-client state
//!
//! One browser tab is one client. Each client owns a filter selection, a
//! lazily created chatbot session, its live view and the last report it
//! produced. Commands from a client are serialized through its inbox.

pub mod registry;
pub mod worker;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::collaborator::ChatSessionId;
use crate::filter::FilterSelection;
use crate::view::ViewBundle;

pub use registry::{ClosedClient, SessionRegistry};
pub use worker::{InboxHandle, PageCommand};

/// Opaque identifier for one browser connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ClientId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(ClientId)
    }
}

/// State held for one client
#[derive(Debug, Default)]
pub struct ClientSession {
    pub selection: FilterSelection,
    /// Created on first query, stable afterwards
    pub chat_session: Option<ChatSessionId>,
    pub view: Option<ViewBundle>,
    pub last_report: Option<PathBuf>,
}
