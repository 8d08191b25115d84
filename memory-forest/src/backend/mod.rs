//! Seams to the hosted backend: auth, record store and blob store.
//!
//! `supabase` talks to the hosted REST APIs; `local` is a SQLite + directory
//! stand-in with the same behaviour, used offline and in tests.

pub mod local;
pub mod supabase;

use crate::error::ForestResult;
use async_trait::async_trait;
use memory_forest_types::{AuthUser, Memory, NewMemory, SignUpOutcome};
use std::sync::Arc;

/// An authenticated session as issued by the auth service.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user: AuthUser,
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> ForestResult<Session>;

    /// `redirect_to` is where the confirmation email sends the user back.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> ForestResult<SignUpOutcome>;

    async fn sign_out(&self, session: &Session) -> ForestResult<()>;

    /// Resolves a stored access token. `Ok(None)` when the token is no longer valid.
    async fn current_user(&self, access_token: &str) -> ForestResult<Option<AuthUser>>;
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_memory(&self, session: &Session, memory: &NewMemory) -> ForestResult<Memory>;

    /// Newest first by `created_at`, at most `limit` rows, scoped to the session's user.
    async fn recent_memories(&self, session: &Session, limit: usize) -> ForestResult<Vec<Memory>>;

    async fn count_memories(&self, session: &Session) -> ForestResult<u64>;
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Never overwrites: uploading to an existing path fails.
    async fn upload(
        &self,
        session: &Session,
        path: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> ForestResult<()>;

    fn public_url(&self, path: &str) -> String;
}

/// The three backend seams as shared trait objects.
#[derive(Clone)]
pub struct Services {
    pub name: &'static str,
    pub auth: Arc<dyn AuthService>,
    pub records: Arc<dyn RecordStore>,
    pub blobs: Arc<dyn BlobStore>,
}

impl Services {
    pub fn from_backend<B>(name: &'static str, backend: Arc<B>) -> Self
    where
        B: AuthService + RecordStore + BlobStore + 'static,
    {
        Self {
            name,
            auth: backend.clone(),
            records: backend.clone(),
            blobs: backend,
        }
    }
}
