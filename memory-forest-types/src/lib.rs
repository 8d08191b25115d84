//! Shared types for the memory forest service and its RPC clients.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =====================================================
// Domain Types
// =====================================================

/// Mood attached to a memory. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Emotion {
    Happy,
    Sad,
    Special,
}

impl Emotion {
    pub const ALL: [Emotion; 3] = [Emotion::Happy, Emotion::Sad, Emotion::Special];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Happy => "Happy",
            Emotion::Sad => "Sad",
            Emotion::Special => "Special",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Emotion::Happy => "😊",
            Emotion::Sad => "😢",
            Emotion::Special => "✨",
        }
    }

    /// Exact, case-sensitive match against the stored labels.
    pub fn from_label(label: &str) -> Option<Emotion> {
        Self::ALL.into_iter().find(|e| e.as_str() == label)
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Emotion::from_label(s).ok_or_else(|| format!("Unknown emotion: {:?}", s))
    }
}

/// A persisted journal entry as returned by the record store.
///
/// `emotion` stays a raw label: rows written by other clients may carry
/// values outside the closed set, and readers fall back instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub user_id: String,
    pub image_url: Option<String>,
    pub description: String,
    pub memory_date: NaiveDate,
    pub emotion: String,
    pub created_at: DateTime<Utc>,
}

impl Memory {
    pub fn emotion_kind(&self) -> Option<Emotion> {
        Emotion::from_label(&self.emotion)
    }
}

/// Insert payload for one memory. `image_url` is always serialized, as null
/// when no image was attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMemory {
    pub user_id: String,
    pub image_url: Option<String>,
    pub description: String,
    pub memory_date: NaiveDate,
    pub emotion: Emotion,
}

/// Identity of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

// =====================================================
// RPC Request Types
// =====================================================

/// An image attached to a plant request, body base64-encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data_base64: String,
}

/// Raw form submission. Fields are unvalidated on purpose.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlantMemoryRequest {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub emotion: String,
    pub memory_date: Option<NaiveDate>,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectRequest {
    pub name: String,
}

// =====================================================
// RPC Response Types
// =====================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> RpcResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Result of a sign-up call. Confirmation may be pending out of band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignUpOutcome {
    pub user: Option<AuthUser>,
    pub confirmation_required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub loading: bool,
    pub user: Option<AuthUser>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryCount {
    pub count: u64,
}

// =====================================================
// Service Status
// =====================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub running: bool,
    pub uptime_secs: u64,
    pub backend: String,
    pub active_sessions: usize,
    pub memories_planted_since_start: u64,
}
