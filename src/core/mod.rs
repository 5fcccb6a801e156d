// The sync coordinator: single authority over which data source backs the
// visible message list and over cache coherence. Runs on the app actor
// thread; every public entry point is a message.

mod cache;
mod config;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use flume::Sender;

use crate::actions::AppAction;
use crate::feed::{OutgoingMessage, RemoteFeed, SharedRemoteFeed};
use crate::state::{
    now_millis, AppState, ConnectivityStatus, FeedSource, MessageContent, MessageSender,
    UserProfile,
};
use crate::updates::{AppUpdate, CoreMsg, InternalEvent};

use cache::MessageCache;
use config::{cache_limit, load_app_config, AppConfig};

const PENDING_SENDS_MAX: usize = 64;

/// Which source feeds the UI. `SubscribedLive` carries the generation of
/// the one active remote subscription; snapshots tagged with any other
/// generation are stale and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncPhase {
    Uninitialized,
    SubscribedLive { subscription: u64 },
    ReadingCache,
    Disposed,
}

pub(crate) struct ChatCore {
    state: AppState,
    rev: u64,
    phase: SyncPhase,
    subscription_seq: u64,
    // client_id -> payload preview, kept only to word failed-send toasts.
    pending_sends: HashMap<String, String>,

    update_sender: Sender<AppUpdate>,
    shared_state: Arc<RwLock<AppState>>,
    feed: SharedRemoteFeed,
    cache: MessageCache,
    config: AppConfig,
    runtime: tokio::runtime::Runtime,
}

impl ChatCore {
    pub(crate) fn new(
        update_sender: Sender<AppUpdate>,
        data_dir: String,
        shared_state: Arc<RwLock<AppState>>,
        feed: SharedRemoteFeed,
    ) -> Self {
        let config = load_app_config(&data_dir);
        let cache = MessageCache::new(&data_dir, cache_limit(&config));

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .build()
            .expect("tokio runtime");

        let mut this = Self {
            state: AppState::empty(),
            rev: 0,
            phase: SyncPhase::Uninitialized,
            subscription_seq: 0,
            pending_sends: HashMap::new(),
            update_sender,
            shared_state,
            feed,
            cache,
            config,
            runtime,
        };

        // Ensure ChatApp.state() has an immediately-available snapshot.
        this.commit_state();

        if let Some(seed) = this.configured_initial_status() {
            tracing::info!(?seed, "applying configured initial connectivity");
            let before = this.status_snapshot();
            this.on_connectivity_changed(seed);
            this.emit_status_if_changed(before);
        }

        this
    }

    pub(crate) fn handle_message(&mut self, msg: CoreMsg) {
        if self.phase == SyncPhase::Disposed {
            // Disposed is terminal; repeated Shutdown included.
            tracing::debug!("message after dispose ignored");
            return;
        }
        match msg {
            CoreMsg::Action(action) => {
                tracing::info!(action = action.tag(), "dispatch");
                self.handle_action(action);
            }
            CoreMsg::Internal(internal) => self.handle_internal(*internal),
        }
    }

    fn handle_action(&mut self, action: AppAction) {
        match action {
            AppAction::SignIn { user_id, name } => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    self.toast("Please enter your name");
                    return;
                }
                if user_id.is_empty() {
                    self.toast("Sign-in failed, try again");
                    return;
                }
                tracing::info!(user_id = %user_id, "signed in");
                self.state.user = Some(UserProfile { user_id, name });
                self.emit_user();
            }

            AppAction::ConnectivityChanged { status } => {
                let before = self.status_snapshot();
                self.on_connectivity_changed(status);
                self.emit_status_if_changed(before);
            }

            AppAction::SendMessage { text } => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    return;
                }
                self.send(MessageContent::Text { body: text });
            }
            AppAction::SendImage { url } => {
                if url.trim().is_empty() {
                    return;
                }
                self.send(MessageContent::Image { url });
            }
            AppAction::SendLocation {
                latitude,
                longitude,
            } => {
                self.send(MessageContent::Location {
                    latitude,
                    longitude,
                });
            }

            AppAction::ClearToast => {
                if self.state.toast.is_some() {
                    self.state.toast = None;
                    self.emit_toast();
                }
            }

            AppAction::Shutdown => self.dispose(),
        }
    }

    fn handle_internal(&mut self, internal: InternalEvent) {
        match internal {
            InternalEvent::FeedRegistered => {
                // Connectivity may already say online, with go_live having
                // been demoted to the cache for want of a feed.
                if !self.state.connectivity.is_online() {
                    return;
                }
                if matches!(
                    self.phase,
                    SyncPhase::Uninitialized | SyncPhase::ReadingCache
                ) {
                    tracing::info!("remote feed registered while online; going live");
                    let before = self.status_snapshot();
                    self.go_live();
                    self.emit_status_if_changed(before);
                }
            }

            InternalEvent::SnapshotReceived {
                subscription,
                messages,
            } => {
                if self.phase != (SyncPhase::SubscribedLive { subscription }) {
                    tracing::debug!(subscription, "dropping snapshot from released subscription");
                    return;
                }

                // Wire order is newest-first (feed queries by creation time
                // descending); display order is newest-last.
                let mut messages = messages;
                messages.reverse();

                tracing::debug!(count = messages.len(), subscription, "snapshot applied");
                self.state.is_loading = false;
                self.state.messages = messages;
                self.emit_messages();

                // Cache write happens strictly after publish, and only ever
                // with the snapshot that triggered it.
                if let Err(e) = self.cache.store(&self.state.messages) {
                    tracing::warn!(%e, "cache write failed; continuing with stale cache");
                }
            }

            InternalEvent::SubscriptionFailed {
                subscription,
                reason,
            } => {
                if self.phase != (SyncPhase::SubscribedLive { subscription }) {
                    tracing::debug!(subscription, "error from released subscription ignored");
                    return;
                }
                tracing::warn!(subscription, reason = %reason, "remote feed failed; falling back to cache");

                let before = self.status_snapshot();
                self.release_subscription(subscription);
                self.phase = SyncPhase::ReadingCache;
                self.publish_cache();
                self.emit_status_if_changed(before);
                self.toast("Connection lost. Showing saved messages.");
            }

            InternalEvent::SendResult {
                client_id,
                ok,
                error,
            } => {
                let preview = self.pending_sends.remove(&client_id);
                if ok {
                    tracing::debug!(client_id = %client_id, "send confirmed");
                    return;
                }
                let reason = error.unwrap_or_else(|| "unknown error".into());
                tracing::warn!(client_id = %client_id, reason = %reason, "send failed");
                match preview {
                    Some(p) => self.toast(format!("Couldn't send \"{p}\": {reason}")),
                    None => self.toast(format!("Couldn't send message: {reason}")),
                }
            }
        }
    }

    /// Core of the state machine. Must be idempotent under repeated
    /// identical reports: a second `Connected` while live never
    /// resubscribes, a second `Disconnected` never rereads the cache.
    fn on_connectivity_changed(&mut self, status: ConnectivityStatus) {
        self.state.connectivity = status;
        match (self.phase, status.is_online()) {
            (SyncPhase::SubscribedLive { .. }, true) => {}
            (SyncPhase::SubscribedLive { subscription }, false) => {
                self.release_subscription(subscription);
                self.phase = SyncPhase::ReadingCache;
                self.publish_cache();
            }
            (SyncPhase::ReadingCache, true) | (SyncPhase::Uninitialized, true) => {
                self.go_live();
            }
            (SyncPhase::Uninitialized, false) => {
                self.phase = SyncPhase::ReadingCache;
                self.publish_cache();
            }
            (SyncPhase::ReadingCache, false) => {}
            (SyncPhase::Disposed, _) => {}
        }
    }

    fn go_live(&mut self) {
        let Some(feed) = self.remote_feed() else {
            tracing::warn!("no remote feed registered; staying on cache");
            self.phase = SyncPhase::ReadingCache;
            self.publish_cache();
            return;
        };

        self.subscription_seq += 1;
        let subscription = self.subscription_seq;
        self.phase = SyncPhase::SubscribedLive { subscription };
        self.state.source = FeedSource::Live;
        self.state.can_send = true;
        self.state.is_loading = true;
        tracing::info!(subscription, "subscribing to remote feed");
        feed.subscribe(subscription);
    }

    fn release_subscription(&mut self, subscription: u64) {
        if let Some(feed) = self.remote_feed() {
            tracing::info!(subscription, "releasing remote subscription");
            feed.unsubscribe(subscription);
        }
    }

    /// Publish the cached snapshot as the current message list. A read
    /// failure presents an empty list rather than surfacing a fault.
    fn publish_cache(&mut self) {
        self.state.source = FeedSource::Cache;
        self.state.can_send = false;
        let messages = match self.cache.load() {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(%e, "cache read failed; presenting empty list");
                vec![]
            }
        };
        tracing::info!(count = messages.len(), "loaded messages from cache");
        self.state.is_loading = false;
        self.state.messages = messages;
        self.emit_messages();
    }

    fn send(&mut self, content: MessageContent) {
        let Some(user) = self.state.user.clone() else {
            self.toast("Please sign in first");
            return;
        };
        if !matches!(self.phase, SyncPhase::SubscribedLive { .. }) {
            // Expected condition while offline, not a fault.
            self.toast("You're offline. Messages can't be sent right now.");
            return;
        }
        let Some(feed) = self.remote_feed() else {
            tracing::warn!("send while live but no remote feed registered");
            self.toast("Couldn't send message. Try again.");
            return;
        };

        if self.pending_sends.len() >= PENDING_SENDS_MAX {
            // The platform stopped reporting outcomes; only toast wording
            // degrades when this bookkeeping is dropped.
            tracing::debug!("pending send bookkeeping overflow; clearing");
            self.pending_sends.clear();
        }

        let client_id = uuid::Uuid::new_v4().to_string();
        self.pending_sends.insert(client_id.clone(), content.preview());

        let message = OutgoingMessage {
            client_id: client_id.clone(),
            sender: MessageSender {
                id: user.user_id,
                name: user.name,
            },
            client_timestamp_ms: now_millis(),
            content,
        };

        tracing::info!(client_id = %client_id, "forwarding message to remote feed");
        // No optimistic local append: the authoritative copy arrives with
        // the next snapshot. Spawned so a slow platform append never stalls
        // the actor.
        self.runtime.spawn(async move {
            feed.append(message);
        });
    }

    fn dispose(&mut self) {
        if let SyncPhase::SubscribedLive { subscription } = self.phase {
            self.release_subscription(subscription);
        }
        self.phase = SyncPhase::Disposed;
        if self.state.can_send {
            self.state.can_send = false;
            self.emit_status();
        }
        tracing::info!("core disposed");
    }

    fn remote_feed(&self) -> Option<Arc<dyn RemoteFeed>> {
        match self.feed.read() {
            Ok(g) => g.clone(),
            Err(poison) => poison.into_inner().clone(),
        }
    }

    fn status_snapshot(&self) -> (ConnectivityStatus, FeedSource, bool) {
        (
            self.state.connectivity,
            self.state.source,
            self.state.can_send,
        )
    }

    fn emit_status_if_changed(&mut self, before: (ConnectivityStatus, FeedSource, bool)) {
        if before != self.status_snapshot() {
            self.emit_status();
        }
    }

    fn next_rev(&mut self) -> u64 {
        self.rev += 1;
        self.state.rev = self.rev;
        self.rev
    }

    fn emit(&mut self, update: AppUpdate) {
        self.commit_state();
        let _ = self.update_sender.send(update);
    }

    fn commit_state(&self) {
        let snapshot = self.state.clone();
        match self.shared_state.write() {
            Ok(mut g) => *g = snapshot,
            Err(poison) => *poison.into_inner() = snapshot,
        }
    }

    fn emit_user(&mut self) {
        let rev = self.next_rev();
        self.emit(AppUpdate::UserChanged {
            rev,
            user: self.state.user.clone(),
        });
    }

    fn emit_status(&mut self) {
        let rev = self.next_rev();
        self.emit(AppUpdate::StatusChanged {
            rev,
            connectivity: self.state.connectivity,
            source: self.state.source,
            can_send: self.state.can_send,
        });
    }

    fn emit_messages(&mut self) {
        let rev = self.next_rev();
        self.emit(AppUpdate::MessagesChanged {
            rev,
            messages: self.state.messages.clone(),
        });
    }

    fn emit_toast(&mut self) {
        let rev = self.next_rev();
        self.emit(AppUpdate::ToastChanged {
            rev,
            toast: self.state.toast.clone(),
        });
    }

    fn toast(&mut self, msg: impl Into<String>) {
        // Kept in state until the UI explicitly clears it, so a state()
        // resync still contains it.
        self.state.toast = Some(msg.into());
        self.emit_toast();
    }
}
