//! Plant-memory form: collects fields, validates them locally, then uploads
//! the image (if any) and inserts the record, in that order.

use crate::backend::Session;
use crate::error::{ForestError, ForestResult};
use crate::events::{MemoryEvent, MemoryEvents};
use crate::store::{ImageFile, MemoryStoreClient};
use chrono::NaiveDate;
use memory_forest_types::{Emotion, Memory, NewMemory};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

pub const REQUIRED_FIELDS_MESSAGE: &str = "Please fill in all required fields";
pub const IN_FLIGHT_MESSAGE: &str = "A memory is already being planted";
pub const PLANTED_MESSAGE: &str = "Memory planted! 🌱";
const FALLBACK_FAILURE_MESSAGE: &str = "Failed to plant memory";

#[derive(Debug, Clone, PartialEq)]
pub struct FormFields {
    pub description: String,
    /// Raw selection; empty until the user picks one.
    pub emotion: String,
    pub memory_date: NaiveDate,
    pub image: Option<ImageFile>,
}

impl FormFields {
    pub fn initial() -> Self {
        Self {
            description: String::new(),
            emotion: String::new(),
            memory_date: today(),
            image: None,
        }
    }
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Fields that passed validation, ready to submit.
#[derive(Debug, Clone)]
struct ValidSubmission {
    session: Session,
    description: String,
    emotion: Emotion,
    memory_date: NaiveDate,
    image: Option<ImageFile>,
}

/// Clears the loading flag when the submission finishes, however it ends.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct PlantMemoryForm {
    store: MemoryStoreClient,
    events: MemoryEvents,
    fields: Mutex<FormFields>,
    open: AtomicBool,
    loading: AtomicBool,
    last_error: Mutex<Option<String>>,
}

impl PlantMemoryForm {
    pub fn new(store: MemoryStoreClient, events: MemoryEvents) -> Self {
        Self {
            store,
            events,
            fields: Mutex::new(FormFields::initial()),
            open: AtomicBool::new(false),
            loading: AtomicBool::new(false),
            last_error: Mutex::new(None),
        }
    }

    pub fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
    }

    /// Closing keeps whatever was typed; only a successful submit resets.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn fields(&self) -> FormFields {
        self.fields.lock().clone()
    }

    pub fn set_description(&self, description: &str) {
        self.fields.lock().description = description.to_string();
    }

    pub fn set_emotion(&self, emotion: &str) {
        self.fields.lock().emotion = emotion.to_string();
    }

    pub fn set_date(&self, date: NaiveDate) {
        self.fields.lock().memory_date = date;
    }

    pub fn attach_image(&self, image: ImageFile) {
        self.fields.lock().image = Some(image);
    }

    pub fn clear_image(&self) {
        self.fields.lock().image = None;
    }

    /// Message from the last failed submit, if it has not been read yet.
    pub fn take_error(&self) -> Option<String> {
        self.last_error.lock().take()
    }

    /// Mirrors the disabled state of the submit control.
    pub fn can_submit(&self) -> bool {
        let fields = self.fields.lock();
        !self.is_loading() && !fields.description.is_empty() && !fields.emotion.is_empty()
    }

    fn validate(&self, session: Option<&Session>) -> ForestResult<ValidSubmission> {
        let fields = self.fields.lock().clone();
        let required = || ForestError::Validation(REQUIRED_FIELDS_MESSAGE.to_string());

        let session = session.cloned().ok_or_else(required)?;
        if fields.description.is_empty() {
            return Err(required());
        }
        let emotion = Emotion::from_label(&fields.emotion).ok_or_else(required)?;

        Ok(ValidSubmission {
            session,
            description: fields.description,
            emotion,
            memory_date: fields.memory_date,
            image: fields.image,
        })
    }

    /// Validates, uploads the image if present, inserts the record.
    ///
    /// Validation failures make no network call. On success the fields reset,
    /// the form closes, and one `Planted` event goes out. On any failure the
    /// form stays open with its fields intact and nothing is published.
    pub async fn submit(&self, session: Option<&Session>) -> ForestResult<Memory> {
        if self.loading.swap(true, Ordering::SeqCst) {
            return Err(ForestError::Validation(IN_FLIGHT_MESSAGE.to_string()));
        }
        let _guard = LoadingGuard(&self.loading);

        let valid = match self.validate(session) {
            Ok(v) => v,
            Err(e) => {
                *self.last_error.lock() = Some(e.to_string());
                return Err(e);
            }
        };

        match self.plant(&valid).await {
            Ok(memory) => {
                log::info!(
                    "[FORM] Planted memory {} for user {}",
                    memory.id,
                    memory.user_id
                );
                *self.fields.lock() = FormFields::initial();
                *self.last_error.lock() = None;
                self.close();
                self.events.publish(MemoryEvent::Planted(memory.clone()));
                Ok(memory)
            }
            Err(e) => {
                log::warn!("[FORM] Planting failed for user {}: {}", valid.session.user.id, e);
                let message = e.to_string();
                *self.last_error.lock() = Some(if message.is_empty() {
                    FALLBACK_FAILURE_MESSAGE.to_string()
                } else {
                    message
                });
                Err(e)
            }
        }
    }

    async fn plant(&self, valid: &ValidSubmission) -> ForestResult<Memory> {
        let image_url = match &valid.image {
            Some(image) => Some(self.store.upload_image(&valid.session, image).await?),
            None => None,
        };

        let new_memory = NewMemory {
            user_id: valid.session.user.id.clone(),
            image_url,
            description: valid.description.clone(),
            memory_date: valid.memory_date,
            emotion: valid.emotion,
        };
        self.store.insert(&valid.session, &new_memory).await
    }
}
