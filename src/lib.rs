mod actions;
mod core;
mod feed;
mod logging;
mod state;
mod updates;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;

use flume::{Receiver, Sender};

pub use actions::AppAction;
pub use feed::*;
pub use state::*;
pub use updates::*;

uniffi::setup_scaffolding!();

#[uniffi::export(callback_interface)]
pub trait AppReconciler: Send + Sync + 'static {
    fn reconcile(&self, update: AppUpdate);
}

/// Trim-only normalization of the name entered on the start screen.
#[uniffi::export]
pub fn normalize_display_name(input: &str) -> String {
    input.trim().to_string()
}

#[uniffi::export]
pub fn is_valid_display_name(input: &str) -> bool {
    !normalize_display_name(input).is_empty()
}

#[derive(uniffi::Object)]
pub struct ChatApp {
    core_tx: Sender<CoreMsg>,
    update_rx: Receiver<AppUpdate>,
    listening: AtomicBool,
    shared_state: Arc<RwLock<AppState>>,
    remote_feed: SharedRemoteFeed,
}

#[uniffi::export]
impl ChatApp {
    #[uniffi::constructor]
    pub fn new(data_dir: String) -> Arc<Self> {
        logging::init_logging();
        tracing::info!(data_dir = %data_dir, "ChatApp::new() starting");

        let (update_tx, update_rx) = flume::unbounded();
        let (core_tx, core_rx) = flume::unbounded::<CoreMsg>();
        let shared_state = Arc::new(RwLock::new(AppState::empty()));
        let remote_feed: SharedRemoteFeed = Arc::new(RwLock::new(None));

        // Actor loop thread (single threaded "app actor").
        let shared_for_core = shared_state.clone();
        let feed_for_core = remote_feed.clone();
        thread::spawn(move || {
            let mut core =
                crate::core::ChatCore::new(update_tx, data_dir, shared_for_core, feed_for_core);
            while let Ok(msg) = core_rx.recv() {
                core.handle_message(msg);
            }
        });

        Arc::new(Self {
            core_tx,
            update_rx,
            listening: AtomicBool::new(false),
            shared_state,
            remote_feed,
        })
    }

    pub fn state(&self) -> AppState {
        match self.shared_state.read() {
            Ok(g) => g.clone(),
            Err(poison) => poison.into_inner().clone(),
        }
    }

    pub fn dispatch(&self, action: AppAction) {
        // Contract: never block caller.
        let _ = self.core_tx.send(CoreMsg::Action(action));
    }

    pub fn listen_for_updates(&self, reconciler: Box<dyn AppReconciler>) {
        if self
            .listening
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // Avoid multiple listeners that would split messages.
            return;
        }

        let rx = self.update_rx.clone();
        thread::spawn(move || {
            while let Ok(update) = rx.recv() {
                reconciler.reconcile(update);
            }
        });
    }

    /// Register the platform's remote feed implementation. If the core is
    /// already online (a configured initial status, or a monitor report
    /// that arrived first) it goes live now.
    pub fn set_remote_feed(&self, feed: Box<dyn RemoteFeed>) {
        let feed: Arc<dyn RemoteFeed> = Arc::from(feed);
        match self.remote_feed.write() {
            Ok(mut slot) => {
                *slot = Some(feed);
            }
            Err(poison) => {
                *poison.into_inner() = Some(feed);
            }
        }
        let _ = self
            .core_tx
            .send(CoreMsg::Internal(Box::new(InternalEvent::FeedRegistered)));
    }

    /// Called by the platform feed with each snapshot, newest-first,
    /// tagged with the subscription id it belongs to. Safe from any
    /// thread; stale generations are dropped by the core.
    pub fn deliver_snapshot(&self, subscription: u64, messages: Vec<ChatMessage>) {
        let _ = self.core_tx.send(CoreMsg::Internal(Box::new(
            InternalEvent::SnapshotReceived {
                subscription,
                messages,
            },
        )));
    }

    pub fn notify_subscription_error(&self, subscription: u64, reason: String) {
        let _ = self.core_tx.send(CoreMsg::Internal(Box::new(
            InternalEvent::SubscriptionFailed {
                subscription,
                reason,
            },
        )));
    }

    pub fn notify_send_result(&self, client_id: String, ok: bool, error: Option<String>) {
        let _ = self.core_tx.send(CoreMsg::Internal(Box::new(
            InternalEvent::SendResult {
                client_id,
                ok,
                error,
            },
        )));
    }

    /// Release the remote subscription and stop accepting transitions.
    /// Safe to call multiple times.
    pub fn shutdown(&self) {
        self.dispatch(AppAction::Shutdown);
    }
}
