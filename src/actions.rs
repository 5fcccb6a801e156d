use crate::state::ConnectivityStatus;

#[derive(uniffi::Enum, Debug, Clone)]
pub enum AppAction {
    // Auth (the shell completes anonymous sign-in and hands us the result)
    SignIn {
        user_id: String,
        name: String,
    },

    // Connectivity monitor reports; only the latest value matters
    ConnectivityChanged {
        status: ConnectivityStatus,
    },

    // Chat
    SendMessage {
        text: String,
    },
    SendImage {
        url: String,
    },
    SendLocation {
        latitude: f64,
        longitude: f64,
    },

    // UI
    ClearToast,

    // Lifecycle
    Shutdown,
}

impl AppAction {
    /// Log-safe action tag (never includes message bodies or coordinates).
    pub fn tag(&self) -> &'static str {
        match self {
            AppAction::SignIn { .. } => "SignIn",
            AppAction::ConnectivityChanged { .. } => "ConnectivityChanged",
            AppAction::SendMessage { .. } => "SendMessage",
            AppAction::SendImage { .. } => "SendImage",
            AppAction::SendLocation { .. } => "SendLocation",
            AppAction::ClearToast => "ClearToast",
            AppAction::Shutdown => "Shutdown",
        }
    }
}
