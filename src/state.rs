#[derive(uniffi::Enum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectivityStatus {
    Connected,
    Disconnected,
    Unknown,
}

impl ConnectivityStatus {
    /// Data-source gate: only a positive report counts as online.
    /// `Unknown` fails open to the cache, matching the strict
    /// `isConnected === true` check the shells perform.
    pub fn is_online(self) -> bool {
        matches!(self, ConnectivityStatus::Connected)
    }
}

/// Which collaborator currently backs the visible message list.
#[derive(uniffi::Enum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedSource {
    Live,
    Cache,
}

#[derive(uniffi::Record, Clone, Debug, PartialEq)]
pub struct UserProfile {
    pub user_id: String,
    pub name: String,
}

#[derive(uniffi::Record, Clone, Debug, PartialEq)]
pub struct MessageSender {
    pub id: String,
    pub name: String,
}

/// Message payload as a closed union rather than a bag of optional fields,
/// so "what kind of message is this" is never ambiguous.
#[derive(uniffi::Enum, Clone, Debug, PartialEq)]
pub enum MessageContent {
    Text { body: String },
    Image { url: String },
    Location { latitude: f64, longitude: f64 },
}

impl MessageContent {
    /// Short log/toast-safe description of the payload.
    pub fn preview(&self) -> String {
        match self {
            MessageContent::Text { body } => {
                let mut p: String = body.chars().take(32).collect();
                if body.chars().count() > 32 {
                    p.push('…');
                }
                p
            }
            MessageContent::Image { .. } => "[photo]".to_string(),
            MessageContent::Location { .. } => "[location]".to_string(),
        }
    }
}

/// A message as published to the UI. `id` is unique within a list and
/// assigned by the remote feed; `timestamp_ms` is the server-assigned
/// creation time in unix milliseconds. Lists are ordered newest-last.
#[derive(uniffi::Record, Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub sender: MessageSender,
    pub timestamp_ms: i64,
    pub content: MessageContent,
}

#[derive(uniffi::Record, Clone, Debug)]
pub struct AppState {
    pub rev: u64,
    pub user: Option<UserProfile>,
    pub connectivity: ConnectivityStatus,
    pub source: FeedSource,
    pub can_send: bool,
    pub is_loading: bool,
    pub messages: Vec<ChatMessage>,
    pub toast: Option<String>,
}

impl AppState {
    pub fn empty() -> Self {
        Self {
            rev: 0,
            user: None,
            connectivity: ConnectivityStatus::Unknown,
            source: FeedSource::Cache,
            can_send: false,
            is_loading: true,
            messages: vec![],
            toast: None,
        }
    }
}

pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
