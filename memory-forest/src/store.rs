//! Thin façade over the record and blob stores, shared by the form and the views.

use crate::backend::{BlobStore, RecordStore, Session};
use crate::error::ForestResult;
use memory_forest_types::{Memory, NewMemory};
use std::sync::Arc;

/// An image picked in the form, held in memory until submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    /// Text after the last `.` of the file name (the whole name if there is none).
    pub fn extension(&self) -> &str {
        self.file_name.rsplit('.').next().unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct MemoryStoreClient {
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
}

impl MemoryStoreClient {
    pub fn new(records: Arc<dyn RecordStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { records, blobs }
    }

    /// Blob key for a new image: `<user id>/<unix millis>.<ext>`.
    pub fn image_path(user_id: &str, image: &ImageFile, unix_millis: i64) -> String {
        format!("{}/{}.{}", user_id, unix_millis, image.extension())
    }

    /// Uploads the image under the user's folder and resolves its public URL.
    pub async fn upload_image(&self, session: &Session, image: &ImageFile) -> ForestResult<String> {
        let path = Self::image_path(
            &session.user.id,
            image,
            chrono::Utc::now().timestamp_millis(),
        );
        self.blobs
            .upload(
                session,
                &path,
                image.bytes.clone(),
                image.content_type.as_deref(),
            )
            .await?;
        Ok(self.blobs.public_url(&path))
    }

    pub async fn insert(&self, session: &Session, memory: &NewMemory) -> ForestResult<Memory> {
        self.records.insert_memory(session, memory).await
    }

    pub async fn recent(&self, session: &Session, limit: usize) -> ForestResult<Vec<Memory>> {
        self.records.recent_memories(session, limit).await
    }

    pub async fn count(&self, session: &Session) -> ForestResult<u64> {
        self.records.count_memories(session).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(name: &str) -> ImageFile {
        ImageFile {
            file_name: name.to_string(),
            content_type: None,
            bytes: vec![],
        }
    }

    #[test]
    fn test_image_path_uses_last_extension() {
        assert_eq!(
            MemoryStoreClient::image_path("u1", &image("lake.trip.JPG"), 1714560000000),
            "u1/1714560000000.JPG"
        );
        assert_eq!(
            MemoryStoreClient::image_path("u1", &image("noext"), 5),
            "u1/5.noext"
        );
    }
}
