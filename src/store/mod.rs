//! External collaborator interfaces: the record store the core reads and
//! writes through, and the document text extractor. The core consumes these
//! abstractions and never implements real storage or OCR itself.

mod memory;

pub use memory::InMemoryStore;

use chrono::{DateTime, Utc};

use crate::domain::{
    Application, ApplicationId, ApplicationStatus, Document, ExtractedFields, Notification,
    Profile, ProfileId, Scheme, SchemeId, VerificationStatus,
};

/// Filter for profile lookups. An empty id list selects every profile.
#[derive(Debug, Clone, Default)]
pub struct ProfileFilter {
    pub ids: Vec<ProfileId>,
}

impl ProfileFilter {
    pub fn by_id(id: ProfileId) -> Self {
        Self { ids: vec![id] }
    }
}

/// Filter for scheme lookups.
#[derive(Debug, Clone, Default)]
pub struct SchemeFilter {
    pub ids: Vec<SchemeId>,
    pub active_only: bool,
}

impl SchemeFilter {
    pub fn active() -> Self {
        Self {
            ids: Vec::new(),
            active_only: true,
        }
    }

    pub fn by_id(id: SchemeId) -> Self {
        Self {
            ids: vec![id],
            active_only: false,
        }
    }
}

/// Filter for document lookups.
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub profile_id: Option<ProfileId>,
    pub status: Option<VerificationStatus>,
}

impl DocumentFilter {
    pub fn for_profile(profile_id: ProfileId) -> Self {
        Self {
            profile_id: Some(profile_id),
            status: None,
        }
    }

    pub fn pending() -> Self {
        Self {
            profile_id: None,
            status: Some(VerificationStatus::Pending),
        }
    }
}

/// Filter for application queries.
#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub profile_id: Option<ProfileId>,
    pub status: Option<ApplicationStatus>,
    /// Only applications whose submission timestamp is strictly before this
    /// instant; used by the auto-processing grace window.
    pub submitted_before: Option<DateTime<Utc>>,
}

/// Aggregate record counts reported by the health probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordCounts {
    pub profiles: u64,
    pub schemes: u64,
    pub applications: u64,
}

/// Error enumeration for store failures. Connectivity loss is expected to
/// fail fast rather than hang; retry belongs to the store layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction the reconciliation core runs against.
pub trait RecordStore: Send + Sync {
    fn find_profiles(&self, filter: &ProfileFilter) -> Result<Vec<Profile>, StoreError>;
    fn find_schemes(&self, filter: &SchemeFilter) -> Result<Vec<Scheme>, StoreError>;
    fn find_documents(&self, filter: &DocumentFilter) -> Result<Vec<Document>, StoreError>;
    fn application(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError>;
    fn query_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, StoreError>;
    fn save_application(&self, application: &Application) -> Result<(), StoreError>;
    fn save_document(&self, document: &Document) -> Result<(), StoreError>;
    fn insert_notification(&self, notification: Notification) -> Result<(), StoreError>;
    fn delete_notifications_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, StoreError>;
    fn counts(&self) -> Result<RecordCounts, StoreError>;
}

/// Error raised when structured field extraction fails for a document. The
/// document stays pending; nothing crashes.
#[derive(Debug, thiserror::Error)]
#[error("field extraction failed: {0}")]
pub struct ExtractionError(pub String);

/// Maps an uploaded document to structured field guesses (document number,
/// issue date, issuing authority). Internals are out of scope for the core.
pub trait DocumentTextExtractor: Send + Sync {
    fn extract(&self, document: &Document) -> Result<ExtractedFields, ExtractionError>;
}

/// Extractor used when no OCR backend is wired in; produces no field guesses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExtractor;

impl DocumentTextExtractor for NoopExtractor {
    fn extract(&self, _document: &Document) -> Result<ExtractedFields, ExtractionError> {
        Ok(ExtractedFields::default())
    }
}
