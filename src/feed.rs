use std::sync::{Arc, RwLock};

use crate::state::{MessageContent, MessageSender};

/// An outbound message handed to the feed for appending. The server assigns
/// the authoritative id and creation timestamp; `client_id` only correlates
/// the later `notify_send_result` call, and `client_timestamp_ms` is kept
/// for diagnostics.
#[derive(uniffi::Record, Clone, Debug)]
pub struct OutgoingMessage {
    pub client_id: String,
    pub sender: MessageSender,
    pub client_timestamp_ms: i64,
    pub content: MessageContent,
}

/// The remote message feed, implemented by the platform over its hosted
/// document-store SDK. All three calls are fire-and-forget: snapshots,
/// subscription errors and append outcomes come back through
/// `ChatApp::deliver_snapshot`, `ChatApp::notify_subscription_error` and
/// `ChatApp::notify_send_result`, tagged with the ids given here.
///
/// `subscribe` opens a live query over the message collection ordered by
/// creation time, newest first. The core opens at most one subscription at
/// a time and always calls `unsubscribe` for the previous generation before
/// subscribing a new one.
#[uniffi::export(callback_interface)]
pub trait RemoteFeed: Send + Sync + 'static {
    fn subscribe(&self, subscription: u64);
    fn unsubscribe(&self, subscription: u64);
    fn append(&self, message: OutgoingMessage);
}

pub type SharedRemoteFeed = Arc<RwLock<Option<Arc<dyn RemoteFeed>>>>;
