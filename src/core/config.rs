use std::path::Path;

use serde::Deserialize;

use super::ChatCore;
use crate::state::ConnectivityStatus;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(super) struct AppConfig {
    // Seed applied before the connectivity monitor's first report:
    // "connected" or "disconnected". Absent means wait for the monitor.
    pub(super) initial_status: Option<String>,
    // Override of the 50-message cache cap.
    pub(super) cache_limit: Option<u32>,
}

pub(super) fn load_app_config(data_dir: &str) -> AppConfig {
    let path = Path::new(data_dir).join("chirp_config.json");
    let Ok(bytes) = std::fs::read(&path) else {
        return AppConfig::default();
    };
    serde_json::from_slice::<AppConfig>(&bytes).unwrap_or_default()
}

impl ChatCore {
    pub(super) fn configured_initial_status(&self) -> Option<ConnectivityStatus> {
        match self.config.initial_status.as_deref() {
            Some("connected") => Some(ConnectivityStatus::Connected),
            Some("disconnected") => Some(ConnectivityStatus::Disconnected),
            Some(other) => {
                tracing::warn!(value = other, "ignoring unrecognized initial_status");
                None
            }
            None => None,
        }
    }
}

pub(super) fn cache_limit(config: &AppConfig) -> usize {
    config
        .cache_limit
        .map(|n| n as usize)
        .filter(|n| *n > 0)
        .unwrap_or(super::cache::DEFAULT_CACHE_LIMIT)
}
