//! Feed view: the most recent memories, newest first.

use crate::backend::Session;
use crate::config::ReadErrorPolicy;
use crate::events::RefreshOnPlant;
use crate::store::MemoryStoreClient;
use async_trait::async_trait;
use chrono::NaiveDate;
use memory_forest_types::{Emotion, Memory};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

pub const EMPTY_FEED_MESSAGE: &str = "No memories yet. Plant your first one!";

/// Longest description shown in a feed card before it is cut.
pub const DESCRIPTION_PREVIEW_CHARS: usize = 100;

/// Icon and colour for an emotion label. Unknown labels get the Happy look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmotionStyle {
    pub emotion: Emotion,
    pub icon: &'static str,
    pub color: &'static str,
}

impl EmotionStyle {
    pub fn of(emotion: Emotion) -> Self {
        match emotion {
            Emotion::Happy => Self {
                emotion,
                icon: "smile",
                color: "gold-glow",
            },
            Emotion::Sad => Self {
                emotion,
                icon: "frown",
                color: "muted",
            },
            Emotion::Special => Self {
                emotion,
                icon: "star",
                color: "primary",
            },
        }
    }

    pub fn for_label(label: &str) -> Self {
        Self::of(Emotion::from_label(label).unwrap_or(Emotion::Happy))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedItem {
    pub id: String,
    pub image_url: Option<String>,
    pub style: EmotionStyle,
    pub description: String,
    pub preview: String,
    pub date_label: String,
}

impl FeedItem {
    pub fn from_memory(memory: &Memory) -> Self {
        Self {
            id: memory.id.clone(),
            image_url: memory.image_url.clone(),
            style: EmotionStyle::for_label(&memory.emotion),
            description: memory.description.clone(),
            preview: truncate_description(&memory.description, DESCRIPTION_PREVIEW_CHARS),
            date_label: format_memory_date(memory.memory_date),
        }
    }
}

/// Cuts on a char boundary and marks the cut with an ellipsis.
pub fn truncate_description(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}

/// `May 1, 2024`
pub fn format_memory_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum FeedState {
    Loading,
    Empty,
    Loaded(Vec<FeedItem>),
    /// Only reachable with `ReadErrorPolicy::Visible`.
    Failed(String),
}

impl FeedState {
    pub fn items(&self) -> &[FeedItem] {
        match self {
            FeedState::Loaded(items) => items,
            _ => &[],
        }
    }

    pub fn planted_label(&self) -> String {
        format!("{} memories planted", self.items().len())
    }
}

pub struct FeedView {
    store: MemoryStoreClient,
    limit: usize,
    policy: ReadErrorPolicy,
    state: RwLock<FeedState>,
    generation: AtomicU64,
    scope: CancellationToken,
}

impl FeedView {
    pub fn new(store: MemoryStoreClient, limit: usize, policy: ReadErrorPolicy) -> Self {
        Self {
            store,
            limit,
            policy,
            state: RwLock::new(FeedState::Loading),
            generation: AtomicU64::new(0),
            scope: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> FeedState {
        self.state.read().clone()
    }

    /// Fetches and applies the newest memories. A fetch that is overtaken by a
    /// later one, or whose view was unmounted, is discarded.
    pub async fn load(&self, session: &Session) -> FeedState {
        if self.scope.is_cancelled() {
            return self.state();
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.state.write() = FeedState::Loading;

        let result = tokio::select! {
            biased;
            _ = self.scope.cancelled() => {
                log::debug!("[FEED] Fetch cancelled by unmount");
                return self.state();
            }
            result = self.store.recent(session, self.limit) => result,
        };

        let next = match result {
            Ok(memories) if memories.is_empty() => FeedState::Empty,
            Ok(memories) => FeedState::Loaded(memories.iter().map(FeedItem::from_memory).collect()),
            Err(e) => match self.policy {
                ReadErrorPolicy::Silent => {
                    log::warn!("[FEED] Fetch failed, showing empty feed: {}", e);
                    FeedState::Empty
                }
                ReadErrorPolicy::Visible => {
                    log::warn!("[FEED] Fetch failed: {}", e);
                    FeedState::Failed(e.to_string())
                }
            },
        };

        if self.generation.load(Ordering::SeqCst) == generation {
            *self.state.write() = next.clone();
            next
        } else {
            self.state()
        }
    }

    /// Cancels any in-flight fetch; later loads are no-ops.
    pub fn unmount(&self) {
        self.scope.cancel();
    }

    pub fn is_mounted(&self) -> bool {
        !self.scope.is_cancelled()
    }
}

#[async_trait]
impl RefreshOnPlant for FeedView {
    fn scope(&self) -> &CancellationToken {
        &self.scope
    }

    async fn refresh(&self, session: &Session) {
        self.load(session).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::AuthService;
    use crate::events::{MemoryEvents, spawn_refresh_on_plant};
    use crate::session::SessionProvider;
    use crate::testing::{Call, TestBackend};
    use memory_forest_types::NewMemory;
    use std::sync::Arc;
    use std::time::Duration;

    fn memory(session: &Session, description: &str, emotion: Emotion) -> NewMemory {
        NewMemory {
            user_id: session.user.id.clone(),
            image_url: None,
            description: description.to_string(),
            memory_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            emotion,
        }
    }

    fn descriptions(state: &FeedState) -> Vec<String> {
        state.items().iter().map(|i| i.description.clone()).collect()
    }

    #[test]
    fn test_emotion_style_fallback() {
        assert_eq!(EmotionStyle::for_label("Sad").icon, "frown");
        assert_eq!(EmotionStyle::for_label("Special").color, "primary");
        assert_eq!(EmotionStyle::for_label("Angry"), EmotionStyle::of(Emotion::Happy));
        assert_eq!(EmotionStyle::for_label(""), EmotionStyle::of(Emotion::Happy));
    }

    #[test]
    fn test_truncate_and_format() {
        assert_eq!(truncate_description("short", 10), "short");
        assert_eq!(truncate_description("ééééé", 3), "ééé…");
        assert_eq!(truncate_description("a b c d", 4), "a b…");
        assert_eq!(
            format_memory_date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()),
            "May 1, 2024"
        );
        assert_eq!(
            format_memory_date(NaiveDate::from_ymd_opt(2023, 12, 25).unwrap()),
            "Dec 25, 2023"
        );
    }

    #[tokio::test]
    async fn test_empty_feed_is_not_an_error() {
        let backend = TestBackend::new().await;
        let session = backend.session().await;
        let feed = FeedView::new(backend.store(), 20, ReadErrorPolicy::Visible);

        assert_eq!(feed.state(), FeedState::Loading);
        assert_eq!(feed.load(&session).await, FeedState::Empty);
        assert_eq!(feed.state().planted_label(), "0 memories planted");
    }

    #[tokio::test]
    async fn test_newest_first_and_idempotent() {
        let backend = TestBackend::new().await;
        let session = backend.session().await;
        for d in ["t1", "t2", "t3"] {
            backend.seed(&session, &memory(&session, d, Emotion::Sad)).await;
        }
        let feed = FeedView::new(backend.store(), 20, ReadErrorPolicy::Silent);

        let first = feed.load(&session).await;
        assert_eq!(descriptions(&first), vec!["t3", "t2", "t1"]);
        let second = feed.load(&session).await;
        assert_eq!(first, second);
        assert_eq!(
            backend.calls(),
            vec![Call::Recent { limit: 20 }, Call::Recent { limit: 20 }]
        );
        assert_eq!(first.items()[0].style.icon, "frown");
        assert_eq!(first.items()[0].date_label, "May 1, 2024");
    }

    #[tokio::test]
    async fn test_read_error_policy() {
        let backend = TestBackend::new().await;
        let session = backend.session().await;
        backend.fail_reads("connection reset");

        let silent = FeedView::new(backend.store(), 20, ReadErrorPolicy::Silent);
        assert_eq!(silent.load(&session).await, FeedState::Empty);

        let visible = FeedView::new(backend.store(), 20, ReadErrorPolicy::Visible);
        assert_eq!(
            visible.load(&session).await,
            FeedState::Failed("connection reset".to_string())
        );

        backend.heal_reads();
        assert_eq!(visible.load(&session).await, FeedState::Empty);
    }

    #[tokio::test]
    async fn test_unmount_discards_in_flight_fetch() {
        let backend = TestBackend::new().await;
        let session = backend.session().await;
        backend.seed(&session, &memory(&session, "hidden", Emotion::Happy)).await;
        let gate = backend.hold_reads();
        let feed = Arc::new(FeedView::new(backend.store(), 20, ReadErrorPolicy::Silent));

        let pending = {
            let feed = feed.clone();
            let session = session.clone();
            tokio::spawn(async move { feed.load(&session).await })
        };
        backend.wait_for_held_read().await;
        feed.unmount();
        gate.notify_one();

        assert_eq!(pending.await.unwrap(), FeedState::Loading);
        assert_eq!(feed.state(), FeedState::Loading);
        assert!(!feed.is_mounted());
    }

    #[tokio::test]
    async fn test_planted_memory_appears_first_after_refresh() {
        let backend = TestBackend::new().await;
        let sessions = Arc::new(SessionProvider::new(backend.clone()));
        let email = "picnic@example.com";
        backend.inner.sign_up(email, "secret123", None).await.unwrap();
        let session = sessions.sign_in(email, "secret123").await.unwrap();
        backend.seed(&session, &memory(&session, "older", Emotion::Sad)).await;

        let feed = Arc::new(FeedView::new(backend.store(), 20, ReadErrorPolicy::Silent));
        feed.load(&session).await;
        let watcher = spawn_refresh_on_plant(feed.clone(), &backend.events, sessions.clone());

        let form = backend.form();
        form.set_description("Picnic at the lake");
        form.set_emotion("Happy");
        form.set_date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        let planted = form.submit(Some(&session)).await.unwrap();

        let mut refreshed = false;
        for _ in 0..100 {
            if feed.state().items().first().map(|i| i.id.as_str()) == Some(planted.id.as_str()) {
                refreshed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(refreshed, "feed did not refresh after planting");
        assert_eq!(descriptions(&feed.state()), vec!["Picnic at the lake", "older"]);
        assert_eq!(feed.state().items()[0].image_url, None);

        feed.unmount();
        watcher.await.unwrap();
    }

    #[tokio::test]
    async fn test_other_users_events_do_not_refresh() {
        let backend = TestBackend::new().await;
        let sessions = Arc::new(SessionProvider::new(backend.clone()));
        backend.inner.sign_up("me@example.com", "secret123", None).await.unwrap();
        sessions.sign_in("me@example.com", "secret123").await.unwrap();
        let other = backend.session().await;

        let events = MemoryEvents::new();
        let feed = Arc::new(FeedView::new(backend.store(), 20, ReadErrorPolicy::Silent));
        let watcher = spawn_refresh_on_plant(feed.clone(), &events, sessions);

        let theirs = backend.seed(&other, &memory(&other, "theirs", Emotion::Happy)).await;
        events.publish(crate::events::MemoryEvent::Planted(theirs));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(backend.calls().is_empty());

        feed.unmount();
        watcher.await.unwrap();
    }
}
