//! Per-browser client state: the session provider, the mounted dashboard
//! components, and one-shot notices.

use crate::backend::Services;
use crate::config::{Config, ReadErrorPolicy};
use crate::error::ForestResult;
use crate::events::{MemoryEvents, spawn_refresh_on_plant};
use crate::feed::FeedView;
use crate::form::PlantMemoryForm;
use crate::grove::GroveState;
use crate::session::SessionProvider;
use crate::store::MemoryStoreClient;
use crate::tree::TreeView;
use dashmap::DashMap;
use memory_forest_types::SignUpOutcome;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A one-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ViewOptions {
    pub feed_limit: usize,
    pub read_errors: ReadErrorPolicy,
    pub site_url: Option<String>,
}

impl From<&Config> for ViewOptions {
    fn from(config: &Config) -> Self {
        Self {
            feed_limit: config.feed_limit,
            read_errors: config.read_errors,
            site_url: config.site_url.clone(),
        }
    }
}

/// Components that exist only while a user is signed in.
pub struct Dashboard {
    pub form: Arc<PlantMemoryForm>,
    pub feed: Arc<FeedView>,
    pub tree: Arc<TreeView>,
}

impl Dashboard {
    fn unmount(&self) {
        self.feed.unmount();
        self.tree.unmount();
    }
}

pub struct ClientContext {
    pub id: String,
    pub session: Arc<SessionProvider>,
    pub grove: GroveState,
    services: Services,
    events: MemoryEvents,
    options: ViewOptions,
    dashboard: RwLock<Option<Arc<Dashboard>>>,
    notice: Mutex<Option<Notice>>,
    last_seen: Mutex<Instant>,
    /// Off for one-request contexts; nothing could read the refreshed views.
    watch_plants: bool,
}

impl ClientContext {
    pub fn new(id: String, services: Services, events: MemoryEvents, options: ViewOptions) -> Self {
        Self::build(id, services, events, options, true)
    }

    /// A context that lives for one request: never registered, no refresh loops.
    pub fn transient(services: Services, events: MemoryEvents, options: ViewOptions) -> Self {
        Self::build("transient".to_string(), services, events, options, false)
    }

    fn build(
        id: String,
        services: Services,
        events: MemoryEvents,
        options: ViewOptions,
        watch_plants: bool,
    ) -> Self {
        Self {
            id,
            session: Arc::new(SessionProvider::new(services.auth.clone())),
            grove: GroveState::default(),
            services,
            events,
            options,
            dashboard: RwLock::new(None),
            notice: Mutex::new(None),
            last_seen: Mutex::new(Instant::now()),
            watch_plants,
        }
    }

    /// Resolves the stored token on first use; later calls are no-ops.
    pub async fn resolve_session(&self, stored_token: Option<&str>) {
        if self.session.is_loading() {
            self.session.initialize(stored_token).await;
            if self.session.session().is_some() {
                self.mount_dashboard();
            }
        }
    }

    /// Builds the dashboard components and subscribes the views to plant events.
    pub fn mount_dashboard(&self) -> Arc<Dashboard> {
        if let Some(existing) = self.dashboard.read().as_ref() {
            return existing.clone();
        }
        let mut slot = self.dashboard.write();
        if let Some(existing) = slot.as_ref() {
            return existing.clone();
        }

        let store = MemoryStoreClient::new(self.services.records.clone(), self.services.blobs.clone());
        let dashboard = Arc::new(Dashboard {
            form: Arc::new(PlantMemoryForm::new(store.clone(), self.events.clone())),
            feed: Arc::new(FeedView::new(
                store.clone(),
                self.options.feed_limit,
                self.options.read_errors,
            )),
            tree: Arc::new(TreeView::new(store, self.options.read_errors)),
        });
        if self.watch_plants {
            spawn_refresh_on_plant(dashboard.feed.clone(), &self.events, self.session.clone());
            spawn_refresh_on_plant(dashboard.tree.clone(), &self.events, self.session.clone());
        }

        log::debug!("[CLIENT] Mounted dashboard for client {}", self.id);
        *slot = Some(dashboard.clone());
        dashboard
    }

    pub fn dashboard(&self) -> Option<Arc<Dashboard>> {
        self.dashboard.read().clone()
    }

    fn unmount_dashboard(&self) {
        if let Some(dashboard) = self.dashboard.write().take() {
            dashboard.unmount();
            log::debug!("[CLIENT] Unmounted dashboard for client {}", self.id);
        }
    }

    /// A rejected sign-in leaves the current session and dashboard untouched.
    pub async fn sign_in(&self, email: &str, password: &str) -> ForestResult<()> {
        self.session.sign_in(email, password).await?;
        self.unmount_dashboard();
        self.mount_dashboard();
        Ok(())
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> ForestResult<SignUpOutcome> {
        self.session
            .sign_up(email, password, self.options.site_url.as_deref())
            .await
    }

    pub async fn sign_out(&self) {
        self.unmount_dashboard();
        self.session.sign_out().await;
    }

    pub fn push_notice(&self, kind: NoticeKind, message: impl Into<String>) {
        *self.notice.lock() = Some(Notice {
            kind,
            message: message.into(),
        });
    }

    pub fn take_notice(&self) -> Option<Notice> {
        self.notice.lock().take()
    }

    fn touch(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }
}

/// All known browser clients, keyed by the client cookie.
pub struct ClientRegistry {
    clients: DashMap<String, Arc<ClientContext>>,
    services: Services,
    events: MemoryEvents,
    options: ViewOptions,
    idle_limit: Duration,
}

impl ClientRegistry {
    pub fn new(services: Services, events: MemoryEvents, options: ViewOptions, idle_limit: Duration) -> Self {
        Self {
            clients: DashMap::new(),
            services,
            events,
            options,
            idle_limit,
        }
    }

    /// Returns the client for `id`, or a fresh one when the id is missing or unknown.
    pub fn get_or_create(&self, id: Option<&str>) -> Arc<ClientContext> {
        if let Some(client) = id.and_then(|id| self.clients.get(id).map(|c| c.clone())) {
            client.touch();
            return client;
        }

        self.prune_idle();
        let id = uuid::Uuid::new_v4().simple().to_string();
        let client = Arc::new(ClientContext::new(
            id.clone(),
            self.services.clone(),
            self.events.clone(),
            self.options.clone(),
        ));
        self.clients.insert(id, client.clone());
        client
    }

    /// One-request context for callers that authenticate per request.
    pub fn transient(&self) -> Arc<ClientContext> {
        Arc::new(ClientContext::transient(
            self.services.clone(),
            self.events.clone(),
            self.options.clone(),
        ))
    }

    /// Drops clients idle past the limit and cancels their views.
    pub fn prune_idle(&self) {
        let idle_limit = self.idle_limit;
        self.clients.retain(|_, client| {
            let keep = client.idle_for() < idle_limit;
            if !keep {
                client.unmount_dashboard();
            }
            keep
        });
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
