//! Self-hosted backend: SQLite for users, sessions and memories, a directory
//! for image blobs. Error messages follow the hosted service's wording.

use super::{AuthService, BlobStore, RecordStore, Session};
use crate::error::{ForestError, ForestResult};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use memory_forest_types::{AuthUser, Memory, NewMemory, SignUpOutcome};
use parking_lot::Mutex;
use rand::RngCore;
use rusqlite::types::Type;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

const MIN_PASSWORD_LEN: usize = 6;

pub struct LocalBackend {
    conn: Mutex<rusqlite::Connection>,
    blob_dir: PathBuf,
    public_base: String,
}

impl LocalBackend {
    /// `public_base` prefixes public blob URLs; blobs are served under `/blobs`.
    pub fn open(
        db_path: &str,
        blob_dir: impl Into<PathBuf>,
        public_base: &str,
    ) -> rusqlite::Result<Self> {
        let conn = if db_path == ":memory:" {
            rusqlite::Connection::open_in_memory()?
        } else {
            rusqlite::Connection::open(db_path)?
        };
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let backend = Self {
            conn: Mutex::new(conn),
            blob_dir: blob_dir.into(),
            public_base: public_base.trim_end_matches('/').to_string(),
        };
        backend.create_tables()?;
        Ok(backend)
    }

    pub fn blob_dir(&self) -> &Path {
        &self.blob_dir
    }

    fn create_tables(&self) -> rusqlite::Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                salt TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id),
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE TABLE IF NOT EXISTS memories (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id),
                image_url TEXT,
                description TEXT NOT NULL CHECK (description <> ''),
                memory_date TEXT NOT NULL,
                emotion TEXT NOT NULL CHECK (emotion IN ('Happy', 'Sad', 'Special')),
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_memories_user_created
                ON memories(user_id, created_at DESC);",
        )
    }

    fn user_for_token(&self, token: &str) -> rusqlite::Result<Option<AuthUser>> {
        let conn = self.conn.lock();
        let result = conn.query_row(
            "SELECT u.id, u.email FROM sessions s JOIN users u ON u.id = s.user_id
             WHERE s.token = ?1",
            rusqlite::params![token],
            |row| {
                Ok(AuthUser {
                    id: row.get(0)?,
                    email: row.get(1)?,
                })
            },
        );
        match result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Checks the session token still maps to the session's user.
    fn authorize(&self, session: &Session) -> ForestResult<()> {
        match self.user_for_token(&session.access_token) {
            Ok(Some(user)) if user.id == session.user.id => Ok(()),
            Ok(_) => Err(ForestError::Unauthenticated),
            Err(e) => Err(ForestError::Auth(format!("Database error: {}", e))),
        }
    }

    fn blob_path(&self, path: &str) -> Option<PathBuf> {
        let mut full = self.blob_dir.clone();
        for segment in path.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
                return None;
            }
            full.push(segment);
        }
        Some(full)
    }
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn new_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn new_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl AuthService for LocalBackend {
    async fn sign_in(&self, email: &str, password: &str) -> ForestResult<Session> {
        let email = email.trim().to_lowercase();
        let conn = self.conn.lock();
        let row = conn.query_row(
            "SELECT id, password_hash, salt FROM users WHERE email = ?1",
            rusqlite::params![email],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        );
        let (user_id, stored_hash, salt) = match row {
            Ok(r) => r,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(ForestError::Auth("Invalid login credentials".to_string()));
            }
            Err(e) => return Err(ForestError::Auth(format!("Database error: {}", e))),
        };
        if hash_password(&salt, password) != stored_hash {
            return Err(ForestError::Auth("Invalid login credentials".to_string()));
        }

        let token = new_token();
        conn.execute(
            "INSERT INTO sessions (token, user_id) VALUES (?1, ?2)",
            rusqlite::params![token, user_id],
        )
        .map_err(|e| ForestError::Auth(format!("Failed to create session: {}", e)))?;

        Ok(Session {
            access_token: token,
            refresh_token: None,
            user: AuthUser {
                id: user_id,
                email: Some(email),
            },
        })
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        _redirect_to: Option<&str>,
    ) -> ForestResult<SignUpOutcome> {
        let email = email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(ForestError::Auth("Unable to validate email address: invalid format".to_string()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ForestError::Auth(format!(
                "Password should be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let conn = self.conn.lock();
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
                rusqlite::params![email],
                |r| r.get(0),
            )
            .map_err(|e| ForestError::Auth(format!("Database error: {}", e)))?;
        if exists {
            return Err(ForestError::Auth("User already registered".to_string()));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let salt = new_salt();
        conn.execute(
            "INSERT INTO users (id, email, password_hash, salt) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id, email, hash_password(&salt, password), salt],
        )
        .map_err(|e| ForestError::Auth(format!("Failed to create user: {}", e)))?;

        log::info!("[LOCAL] Registered user {}", id);
        Ok(SignUpOutcome {
            user: Some(AuthUser {
                id,
                email: Some(email),
            }),
            confirmation_required: false,
        })
    }

    async fn sign_out(&self, session: &Session) -> ForestResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM sessions WHERE token = ?1",
            rusqlite::params![session.access_token],
        )
        .map_err(|e| ForestError::Auth(format!("Failed to end session: {}", e)))?;
        Ok(())
    }

    async fn current_user(&self, access_token: &str) -> ForestResult<Option<AuthUser>> {
        self.user_for_token(access_token)
            .map_err(|e| ForestError::Auth(format!("Database error: {}", e)))
    }
}

#[async_trait]
impl RecordStore for LocalBackend {
    async fn insert_memory(&self, session: &Session, memory: &NewMemory) -> ForestResult<Memory> {
        self.authorize(session)?;
        if memory.user_id != session.user.id {
            return Err(ForestError::Insert(
                "new row violates row-level security policy for table \"memories\"".to_string(),
            ));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO memories (id, user_id, image_url, description, memory_date, emotion, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                id,
                memory.user_id,
                memory.image_url,
                memory.description,
                memory.memory_date.format("%Y-%m-%d").to_string(),
                memory.emotion.as_str(),
                created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )
        .map_err(|e| ForestError::Insert(format!("Failed to insert memory: {}", e)))?;

        Ok(Memory {
            id,
            user_id: memory.user_id.clone(),
            image_url: memory.image_url.clone(),
            description: memory.description.clone(),
            memory_date: memory.memory_date,
            emotion: memory.emotion.as_str().to_string(),
            created_at,
        })
    }

    async fn recent_memories(&self, session: &Session, limit: usize) -> ForestResult<Vec<Memory>> {
        self.authorize(session)?;
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, image_url, description, memory_date, emotion, created_at
                 FROM memories
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )
            .map_err(|e| ForestError::Read(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(rusqlite::params![session.user.id, limit as i64], row_to_memory)
            .map_err(|e| ForestError::Read(format!("Failed to query: {}", e)))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| ForestError::Read(format!("Failed to read memory: {}", e)))
    }

    async fn count_memories(&self, session: &Session) -> ForestResult<u64> {
        self.authorize(session)?;
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM memories WHERE user_id = ?1",
                rusqlite::params![session.user.id],
                |r| r.get(0),
            )
            .map_err(|e| ForestError::Read(format!("Failed to count memories: {}", e)))?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl BlobStore for LocalBackend {
    async fn upload(
        &self,
        session: &Session,
        path: &str,
        bytes: Vec<u8>,
        _content_type: Option<&str>,
    ) -> ForestResult<()> {
        self.authorize(session)?;
        if path.split('/').next() != Some(session.user.id.as_str()) {
            return Err(ForestError::Upload(
                "new row violates row-level security policy".to_string(),
            ));
        }
        let full = self
            .blob_path(path)
            .ok_or_else(|| ForestError::Upload(format!("Invalid key: {}", path)))?;

        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ForestError::Upload(format!("Failed to create folder: {}", e)))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => {
                    ForestError::Upload("The resource already exists".to_string())
                }
                _ => ForestError::Upload(format!("Failed to store object: {}", e)),
            })?;
        file.write_all(&bytes)
            .await
            .map_err(|e| ForestError::Upload(format!("Failed to write object: {}", e)))?;
        file.flush()
            .await
            .map_err(|e| ForestError::Upload(format!("Failed to write object: {}", e)))?;

        log::debug!("[LOCAL] Stored blob {} ({} bytes)", path, bytes.len());
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/blobs/{}", self.public_base, path)
    }
}

fn row_to_memory(row: &rusqlite::Row) -> rusqlite::Result<Memory> {
    let memory_date: String = row.get(4)?;
    let created_at: String = row.get(6)?;
    Ok(Memory {
        id: row.get(0)?,
        user_id: row.get(1)?,
        image_url: row.get(2)?,
        description: row.get(3)?,
        memory_date: NaiveDate::parse_from_str(&memory_date, "%Y-%m-%d")
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
        emotion: row.get(5)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?,
    })
}
