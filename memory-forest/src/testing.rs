//! Test backend: wraps an in-memory `LocalBackend`, records every store call
//! and can fail or hold them on demand.

use crate::backend::local::LocalBackend;
use crate::backend::{AuthService, BlobStore, RecordStore, Services, Session};
use crate::error::{ForestError, ForestResult};
use crate::events::MemoryEvents;
use crate::form::PlantMemoryForm;
use crate::store::MemoryStoreClient;
use async_trait::async_trait;
use memory_forest_types::{AuthUser, Memory, NewMemory, SignUpOutcome};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Upload { path: String },
    Insert { image_url: Option<String> },
    Recent { limit: usize },
    Count,
}

pub struct TestBackend {
    pub inner: Arc<LocalBackend>,
    pub events: MemoryEvents,
    _dir: tempfile::TempDir,
    calls: Mutex<Vec<Call>>,
    upload_error: Mutex<Option<String>>,
    insert_error: Mutex<Option<String>>,
    read_error: Mutex<Option<String>>,
    insert_gate: Mutex<Option<Arc<Notify>>>,
    read_gate: Mutex<Option<Arc<Notify>>>,
    held_insert: Notify,
    held_read: Notify,
    users: AtomicUsize,
}

impl TestBackend {
    pub async fn new() -> Arc<Self> {
        let dir = tempfile::tempdir().expect("tempdir");
        let inner = Arc::new(LocalBackend::open(":memory:", dir.path(), "").expect("open backend"));
        Arc::new(Self {
            inner,
            events: MemoryEvents::new(),
            _dir: dir,
            calls: Mutex::new(Vec::new()),
            upload_error: Mutex::new(None),
            insert_error: Mutex::new(None),
            read_error: Mutex::new(None),
            insert_gate: Mutex::new(None),
            read_gate: Mutex::new(None),
            held_insert: Notify::new(),
            held_read: Notify::new(),
            users: AtomicUsize::new(0),
        })
    }

    /// Registers and signs in a fresh user.
    pub async fn session(&self) -> Session {
        let n = self.users.fetch_add(1, Ordering::SeqCst);
        let email = format!("user{}@example.com", n);
        self.inner.sign_up(&email, "secret123", None).await.expect("sign up");
        self.inner.sign_in(&email, "secret123").await.expect("sign in")
    }

    pub fn services(self: &Arc<Self>) -> Services {
        Services::from_backend("test", self.clone())
    }

    pub fn store(self: &Arc<Self>) -> MemoryStoreClient {
        MemoryStoreClient::new(self.clone(), self.clone())
    }

    pub fn form(self: &Arc<Self>) -> PlantMemoryForm {
        PlantMemoryForm::new(self.store(), self.events.clone())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn fail_uploads(&self, message: &str) {
        *self.upload_error.lock() = Some(message.to_string());
    }

    pub fn fail_inserts(&self, message: &str) {
        *self.insert_error.lock() = Some(message.to_string());
    }

    pub fn fail_reads(&self, message: &str) {
        *self.read_error.lock() = Some(message.to_string());
    }

    pub fn heal_reads(&self) {
        *self.read_error.lock() = None;
    }

    /// Inserts block until the returned gate is notified.
    pub fn hold_inserts(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.insert_gate.lock() = Some(gate.clone());
        gate
    }

    /// Reads block until the returned gate is notified.
    pub fn hold_reads(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.read_gate.lock() = Some(gate.clone());
        gate
    }

    pub async fn wait_for_held_insert(&self) {
        self.held_insert.notified().await;
    }

    pub async fn wait_for_held_read(&self) {
        self.held_read.notified().await;
    }

    pub fn blob_exists(&self, path: &str) -> bool {
        self.inner.blob_dir().join(path).exists()
    }

    pub async fn stored_count(&self, session: &Session) -> u64 {
        self.inner.count_memories(session).await.expect("count")
    }

    /// Inserts straight into the store, bypassing the form and the call log.
    pub async fn seed(&self, session: &Session, memory: &NewMemory) -> Memory {
        self.inner.insert_memory(session, memory).await.expect("seed")
    }

    async fn pass_read_gate(&self) -> ForestResult<()> {
        let gate = self.read_gate.lock().clone();
        if let Some(gate) = gate {
            self.held_read.notify_one();
            gate.notified().await;
        }
        let error = self.read_error.lock().clone();
        match error {
            Some(msg) => Err(ForestError::Read(msg)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AuthService for TestBackend {
    async fn sign_in(&self, email: &str, password: &str) -> ForestResult<Session> {
        self.inner.sign_in(email, password).await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> ForestResult<SignUpOutcome> {
        self.inner.sign_up(email, password, redirect_to).await
    }

    async fn sign_out(&self, session: &Session) -> ForestResult<()> {
        self.inner.sign_out(session).await
    }

    async fn current_user(&self, access_token: &str) -> ForestResult<Option<AuthUser>> {
        self.inner.current_user(access_token).await
    }
}

#[async_trait]
impl RecordStore for TestBackend {
    async fn insert_memory(&self, session: &Session, memory: &NewMemory) -> ForestResult<Memory> {
        self.calls.lock().push(Call::Insert {
            image_url: memory.image_url.clone(),
        });
        let gate = self.insert_gate.lock().clone();
        if let Some(gate) = gate {
            self.held_insert.notify_one();
            gate.notified().await;
        }
        let error = self.insert_error.lock().clone();
        if let Some(msg) = error {
            return Err(ForestError::Insert(msg));
        }
        self.inner.insert_memory(session, memory).await
    }

    async fn recent_memories(&self, session: &Session, limit: usize) -> ForestResult<Vec<Memory>> {
        self.calls.lock().push(Call::Recent { limit });
        self.pass_read_gate().await?;
        self.inner.recent_memories(session, limit).await
    }

    async fn count_memories(&self, session: &Session) -> ForestResult<u64> {
        self.calls.lock().push(Call::Count);
        self.pass_read_gate().await?;
        self.inner.count_memories(session).await
    }
}

#[async_trait]
impl BlobStore for TestBackend {
    async fn upload(
        &self,
        session: &Session,
        path: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> ForestResult<()> {
        self.calls.lock().push(Call::Upload {
            path: path.to_string(),
        });
        let error = self.upload_error.lock().clone();
        if let Some(msg) = error {
            return Err(ForestError::Upload(msg));
        }
        self.inner.upload(session, path, bytes, content_type).await
    }

    fn public_url(&self, path: &str) -> String {
        self.inner.public_url(path)
    }
}
