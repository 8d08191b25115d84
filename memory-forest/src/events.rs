use crate::backend::Session;
use crate::session::SessionProvider;
use async_trait::async_trait;
use memory_forest_types::Memory;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Capacity of the event channel. Lagging subscribers skip to the newest
/// event, which is fine for refresh triggers.
const EVENT_CHANNEL_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum MemoryEvent {
    /// A memory was inserted successfully.
    Planted(Memory),
}

impl MemoryEvent {
    pub fn owner(&self) -> &str {
        match self {
            MemoryEvent::Planted(m) => &m.user_id,
        }
    }
}

/// Fan-out of memory lifecycle events to the views that re-fetch on change.
#[derive(Clone)]
pub struct MemoryEvents {
    tx: broadcast::Sender<MemoryEvent>,
}

impl MemoryEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MemoryEvent> {
        self.tx.subscribe()
    }

    /// Returns how many subscribers received the event.
    pub fn publish(&self, event: MemoryEvent) -> usize {
        match self.tx.send(event) {
            Ok(n) => n,
            Err(_) => {
                log::debug!("[EVENTS] No subscribers for memory event");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for MemoryEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// A view that re-fetches when its user's memories change.
#[async_trait]
pub trait RefreshOnPlant: Send + Sync + 'static {
    /// Scope of the view's fetches; cancelled on unmount.
    fn scope(&self) -> &CancellationToken;

    async fn refresh(&self, session: &Session);
}

/// Re-fetches `view` for every `Planted` event owned by the signed-in user,
/// until the view's scope is cancelled.
pub fn spawn_refresh_on_plant<V: RefreshOnPlant>(
    view: Arc<V>,
    events: &MemoryEvents,
    sessions: Arc<SessionProvider>,
) -> JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            let owner = tokio::select! {
                biased;
                _ = view.scope().cancelled() => break,
                event = rx.recv() => match event {
                    Ok(event) => Some(event.owner().to_string()),
                    // Missed events: refresh once to catch up.
                    Err(RecvError::Lagged(_)) => None,
                    Err(RecvError::Closed) => break,
                },
            };

            let Some(session) = sessions.session() else {
                continue;
            };
            if owner.as_deref().is_some_and(|o| o != session.user.id) {
                continue;
            }
            view.refresh(&session).await;
        }
        log::debug!("[EVENTS] Refresh loop stopped");
    })
}
