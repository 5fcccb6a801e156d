use crate::state::{AppState, ChatMessage, ConnectivityStatus, FeedSource, UserProfile};
use crate::AppAction;

#[derive(uniffi::Enum, Clone, Debug)]
pub enum AppUpdate {
    FullState(AppState),
    UserChanged {
        rev: u64,
        user: Option<UserProfile>,
    },
    StatusChanged {
        rev: u64,
        connectivity: ConnectivityStatus,
        source: FeedSource,
        can_send: bool,
    },
    MessagesChanged {
        rev: u64,
        messages: Vec<ChatMessage>,
    },
    ToastChanged {
        rev: u64,
        toast: Option<String>,
    },
}

impl AppUpdate {
    pub fn rev(&self) -> u64 {
        match self {
            AppUpdate::FullState(s) => s.rev,
            AppUpdate::UserChanged { rev, .. } => *rev,
            AppUpdate::StatusChanged { rev, .. } => *rev,
            AppUpdate::MessagesChanged { rev, .. } => *rev,
            AppUpdate::ToastChanged { rev, .. } => *rev,
        }
    }
}

#[derive(Debug)]
pub enum CoreMsg {
    Action(AppAction),
    Internal(Box<InternalEvent>),
}

/// Feed callbacks re-entered as actor messages so every effect on shared
/// state runs under the single-writer discipline.
#[derive(Debug)]
pub enum InternalEvent {
    /// The platform registered its feed implementation. Lets the core go
    /// live if connectivity already says online, which happens when a
    /// configured initial status is applied before registration.
    FeedRegistered,
    /// A full snapshot pushed by the remote feed, newest-first as queried.
    /// `subscription` is the generation the snapshot belongs to; anything
    /// not matching the live generation is dropped.
    SnapshotReceived {
        subscription: u64,
        messages: Vec<ChatMessage>,
    },
    /// Mid-subscription delivery failure reported by the feed.
    SubscriptionFailed {
        subscription: u64,
        reason: String,
    },
    /// Outcome of an `append` previously handed to the feed.
    SendResult {
        client_id: String,
        ok: bool,
        error: Option<String>,
    },
}
