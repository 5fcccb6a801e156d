// On-device copy of the last known snapshot, used when the remote feed is
// unreachable. One well-known key, replace-all writes, newest 50 kept.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::{ChatMessage, MessageContent, MessageSender};

const CACHE_KEY: &str = "chat_messages";

pub(crate) const DEFAULT_CACHE_LIMIT: usize = 50;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize, Debug)]
struct CachedSender {
    id: String,
    name: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum CachedContent {
    Text { body: String },
    Image { url: String },
    Location { latitude: f64, longitude: f64 },
}

/// Cached record with the creation time as an ISO-8601 string, millisecond
/// precision preserved through RFC 3339 serialization.
#[derive(Serialize, Deserialize, Debug)]
struct CachedMessage {
    id: String,
    sender: CachedSender,
    created_at: DateTime<Utc>,
    content: CachedContent,
}

impl From<&ChatMessage> for CachedMessage {
    fn from(m: &ChatMessage) -> Self {
        let created_at = Utc
            .timestamp_millis_opt(m.timestamp_ms)
            .single()
            .unwrap_or_else(|| {
                tracing::warn!(
                    id = %m.id,
                    timestamp_ms = m.timestamp_ms,
                    "timestamp outside representable range, clamped to epoch"
                );
                DateTime::<Utc>::UNIX_EPOCH
            });
        Self {
            id: m.id.clone(),
            sender: CachedSender {
                id: m.sender.id.clone(),
                name: m.sender.name.clone(),
            },
            created_at,
            content: match &m.content {
                MessageContent::Text { body } => CachedContent::Text { body: body.clone() },
                MessageContent::Image { url } => CachedContent::Image { url: url.clone() },
                MessageContent::Location {
                    latitude,
                    longitude,
                } => CachedContent::Location {
                    latitude: *latitude,
                    longitude: *longitude,
                },
            },
        }
    }
}

impl From<CachedMessage> for ChatMessage {
    fn from(m: CachedMessage) -> Self {
        Self {
            id: m.id,
            sender: MessageSender {
                id: m.sender.id,
                name: m.sender.name,
            },
            timestamp_ms: m.created_at.timestamp_millis(),
            content: match m.content {
                CachedContent::Text { body } => MessageContent::Text { body },
                CachedContent::Image { url } => MessageContent::Image { url },
                CachedContent::Location {
                    latitude,
                    longitude,
                } => MessageContent::Location {
                    latitude,
                    longitude,
                },
            },
        }
    }
}

#[derive(Debug)]
pub(crate) struct MessageCache {
    path: PathBuf,
    limit: usize,
}

impl MessageCache {
    pub(crate) fn new(data_dir: &str, limit: usize) -> Self {
        Self {
            path: Path::new(data_dir).join(format!("{CACHE_KEY}.json")),
            limit,
        }
    }

    /// Replace the cached snapshot with `messages` (newest-last), keeping
    /// only the newest `limit` entries — the tail of the display order.
    pub(crate) fn store(&self, messages: &[ChatMessage]) -> Result<(), CacheError> {
        let start = messages.len().saturating_sub(self.limit);
        let records: Vec<CachedMessage> = messages[start..].iter().map(CachedMessage::from).collect();
        let bytes = serde_json::to_vec(&records)?;

        // Write-then-rename so a crash mid-write never leaves a torn cache.
        let tmp_path = self.path.with_extension("json.tmp");
        let mut file = File::create(&tmp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        std::fs::rename(&tmp_path, &self.path)?;

        if let Some(parent) = self.path.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        Ok(())
    }

    /// Load the cached snapshot in display order. A missing file is an
    /// empty cache, not an error.
    pub(crate) fn load(&self) -> Result<Vec<ChatMessage>, CacheError> {
        if !self.path.exists() {
            return Ok(vec![]);
        }
        let bytes = std::fs::read(&self.path)?;
        let records: Vec<CachedMessage> = serde_json::from_slice(&bytes)?;
        Ok(records.into_iter().map(ChatMessage::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn msg(id: &str, ts: i64) -> ChatMessage {
        ChatMessage {
            id: id.into(),
            sender: MessageSender {
                id: "u1".into(),
                name: "Ada".into(),
            },
            timestamp_ms: ts,
            content: MessageContent::Text {
                body: format!("hello {id}"),
            },
        }
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let cache = MessageCache::new(dir.path().to_str().unwrap(), DEFAULT_CACHE_LIMIT);
        assert!(cache.load().unwrap().is_empty());
    }

    #[test]
    fn roundtrip_preserves_order_and_millisecond_timestamps() {
        let dir = tempdir().unwrap();
        let cache = MessageCache::new(dir.path().to_str().unwrap(), DEFAULT_CACHE_LIMIT);

        let messages = vec![msg("a", 1_700_000_000_123), msg("b", 1_700_000_000_456)];
        cache.store(&messages).unwrap();

        assert_eq!(cache.load().unwrap(), messages);
    }

    #[test]
    fn roundtrip_keeps_attachment_payloads() {
        let dir = tempdir().unwrap();
        let cache = MessageCache::new(dir.path().to_str().unwrap(), DEFAULT_CACHE_LIMIT);

        let messages = vec![
            ChatMessage {
                content: MessageContent::Image {
                    url: "https://example.com/p.png".into(),
                },
                ..msg("a", 1)
            },
            ChatMessage {
                content: MessageContent::Location {
                    latitude: 52.52,
                    longitude: 13.405,
                },
                ..msg("b", 2)
            },
        ];
        cache.store(&messages).unwrap();

        assert_eq!(cache.load().unwrap(), messages);
    }

    #[test]
    fn store_keeps_only_the_newest_entries() {
        let dir = tempdir().unwrap();
        let cache = MessageCache::new(dir.path().to_str().unwrap(), DEFAULT_CACHE_LIMIT);

        let messages: Vec<ChatMessage> =
            (0..51).map(|i| msg(&format!("m{i}"), i as i64)).collect();
        cache.store(&messages).unwrap();

        let loaded = cache.load().unwrap();
        assert_eq!(loaded.len(), 50);
        // Display order is newest-last; the oldest entry is the one dropped.
        assert_eq!(loaded.first().unwrap().id, "m1");
        assert_eq!(loaded.last().unwrap().id, "m50");
    }

    #[test]
    fn out_of_range_timestamp_clamps_to_epoch() {
        let dir = tempdir().unwrap();
        let cache = MessageCache::new(dir.path().to_str().unwrap(), DEFAULT_CACHE_LIMIT);

        cache.store(&[msg("a", i64::MAX)]).unwrap();

        let loaded = cache.load().unwrap();
        assert_eq!(loaded[0].timestamp_ms, 0);
    }

    #[test]
    fn corrupt_file_is_an_error_not_a_panic() {
        let dir = tempdir().unwrap();
        let cache = MessageCache::new(dir.path().to_str().unwrap(), DEFAULT_CACHE_LIMIT);
        std::fs::write(dir.path().join("chat_messages.json"), b"not json").unwrap();

        assert!(matches!(
            cache.load(),
            Err(CacheError::Serialization(_))
        ));
    }

    #[test]
    fn write_leaves_no_tmp_file_behind() {
        let dir = tempdir().unwrap();
        let cache = MessageCache::new(dir.path().to_str().unwrap(), DEFAULT_CACHE_LIMIT);
        cache.store(&[msg("a", 1)]).unwrap();

        assert!(dir.path().join("chat_messages.json").exists());
        assert!(!dir.path().join("chat_messages.json.tmp").exists());
    }
}
