//! REST client for a hosted Supabase project (GoTrue auth, PostgREST, Storage).

use super::{AuthService, BlobStore, RecordStore, Session};
use crate::error::{ForestError, ForestResult};
use async_trait::async_trait;
use memory_forest_types::{AuthUser, Memory, NewMemory, SignUpOutcome};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;

const MEMORIES_TABLE: &str = "memories";

pub struct SupabaseBackend {
    base_url: String,
    anon_key: String,
    bucket: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    user: AuthUser,
}

/// Sign-up answers with a session when confirmation is off, or a bare user
/// object when a confirmation email went out.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(AuthUser),
}

impl SupabaseBackend {
    pub fn new(base_url: &str, anon_key: &str, bucket: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            bucket: bucket.to_string(),
            client: crate::http::shared_client().clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Anonymous request: project key only.
    fn anon(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    /// Request on behalf of a signed-in user.
    fn authed(&self, builder: RequestBuilder, access_token: &str) -> RequestBuilder {
        builder.header("apikey", &self.anon_key).bearer_auth(access_token)
    }

    fn memories_query(&self, user_id: &str) -> String {
        format!(
            "/rest/v1/{}?select=*&user_id=eq.{}",
            MEMORIES_TABLE,
            urlencoding::encode(user_id)
        )
    }

    fn object_path(path: &str) -> String {
        path.split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Pulls the human-readable message out of an error body. GoTrue, PostgREST
/// and Storage each use a different field for it.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error_description", "msg", "message", "error"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                if !msg.is_empty() {
                    return msg.to_string();
                }
            }
        }
    }
    let body = body.trim();
    if body.is_empty() {
        format!("Request failed with status {}", status.as_u16())
    } else {
        body.to_string()
    }
}

/// Total from a PostgREST `Content-Range` header, e.g. `0-24/3573` or `*/0`.
pub(crate) fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit('/').next()?.trim().parse().ok()
}

async fn failure(resp: Response) -> String {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    error_message(status, &body)
}

#[async_trait]
impl AuthService for SupabaseBackend {
    async fn sign_in(&self, email: &str, password: &str) -> ForestResult<Session> {
        let resp = self
            .anon(self.client.post(self.url("/auth/v1/token?grant_type=password")))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| ForestError::Auth(format!("Auth request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(ForestError::Auth(failure(resp).await));
        }
        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| ForestError::Auth(format!("Invalid auth response: {}", e)))?;

        log::info!("[SUPABASE] Signed in user {}", token.user.id);
        Ok(Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            user: token.user,
        })
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> ForestResult<SignUpOutcome> {
        let mut url = self.url("/auth/v1/signup");
        if let Some(redirect) = redirect_to {
            url.push_str("?redirect_to=");
            url.push_str(&urlencoding::encode(redirect));
        }
        let resp = self
            .anon(self.client.post(url))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| ForestError::Auth(format!("Auth request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(ForestError::Auth(failure(resp).await));
        }
        let parsed: SignUpResponse = resp
            .json()
            .await
            .map_err(|e| ForestError::Auth(format!("Invalid auth response: {}", e)))?;

        Ok(match parsed {
            SignUpResponse::Session(token) => SignUpOutcome {
                user: Some(token.user),
                confirmation_required: false,
            },
            SignUpResponse::User(user) => SignUpOutcome {
                user: Some(user),
                confirmation_required: true,
            },
        })
    }

    async fn sign_out(&self, session: &Session) -> ForestResult<()> {
        let resp = self
            .authed(self.client.post(self.url("/auth/v1/logout")), &session.access_token)
            .send()
            .await
            .map_err(|e| ForestError::Auth(format!("Auth request failed: {}", e)))?;

        // An already-expired token means the session is gone anyway.
        match resp.status() {
            s if s.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(()),
            _ => Err(ForestError::Auth(failure(resp).await)),
        }
    }

    async fn current_user(&self, access_token: &str) -> ForestResult<Option<AuthUser>> {
        let resp = self
            .authed(self.client.get(self.url("/auth/v1/user")), access_token)
            .send()
            .await
            .map_err(|e| ForestError::Auth(format!("Auth request failed: {}", e)))?;

        match resp.status() {
            s if s.is_success() => resp
                .json::<AuthUser>()
                .await
                .map(Some)
                .map_err(|e| ForestError::Auth(format!("Invalid auth response: {}", e))),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            _ => Err(ForestError::Auth(failure(resp).await)),
        }
    }
}

#[async_trait]
impl RecordStore for SupabaseBackend {
    async fn insert_memory(&self, session: &Session, memory: &NewMemory) -> ForestResult<Memory> {
        let resp = self
            .authed(
                self.client.post(self.url(&format!("/rest/v1/{}", MEMORIES_TABLE))),
                &session.access_token,
            )
            .header("Prefer", "return=representation")
            .json(memory)
            .send()
            .await
            .map_err(|e| ForestError::Insert(format!("Insert request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(ForestError::Insert(failure(resp).await));
        }
        let mut rows: Vec<Memory> = resp
            .json()
            .await
            .map_err(|e| ForestError::Insert(format!("Invalid insert response: {}", e)))?;
        rows.pop()
            .ok_or_else(|| ForestError::Insert("Insert returned no row".to_string()))
    }

    async fn recent_memories(&self, session: &Session, limit: usize) -> ForestResult<Vec<Memory>> {
        let path = format!(
            "{}&order=created_at.desc&limit={}",
            self.memories_query(&session.user.id),
            limit
        );
        let resp = self
            .authed(self.client.get(self.url(&path)), &session.access_token)
            .send()
            .await
            .map_err(|e| ForestError::Read(format!("Feed request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(ForestError::Read(failure(resp).await));
        }
        resp.json()
            .await
            .map_err(|e| ForestError::Read(format!("Invalid feed response: {}", e)))
    }

    async fn count_memories(&self, session: &Session) -> ForestResult<u64> {
        let resp = self
            .authed(
                self.client.head(self.url(&self.memories_query(&session.user.id))),
                &session.access_token,
            )
            .header("Prefer", "count=exact")
            .send()
            .await
            .map_err(|e| ForestError::Read(format!("Count request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(ForestError::Read(format!(
                "Count request failed with status {}",
                resp.status().as_u16()
            )));
        }
        resp.headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| ForestError::Read("Count missing from response".to_string()))
    }
}

#[async_trait]
impl BlobStore for SupabaseBackend {
    async fn upload(
        &self,
        session: &Session,
        path: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> ForestResult<()> {
        let url = self.url(&format!(
            "/storage/v1/object/{}/{}",
            self.bucket,
            Self::object_path(path)
        ));
        let resp = self
            .authed(self.client.post(url), &session.access_token)
            .header("x-upsert", "false")
            .header(
                "content-type",
                content_type.unwrap_or("application/octet-stream"),
            )
            .body(bytes)
            .send()
            .await
            .map_err(|e| ForestError::Upload(format!("Upload request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(ForestError::Upload(failure(resp).await));
        }
        log::debug!("[SUPABASE] Uploaded {}/{}", self.bucket, path);
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            self.bucket,
            Self::object_path(path)
        )
    }
}
