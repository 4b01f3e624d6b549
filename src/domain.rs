//! Shared data model for the scheme portal core: citizen profiles, scheme
//! criteria, documents, applications, and notifications.
//!
//! Profiles and schemes are owned by the record store and treated as read-only
//! snapshots here; applications and documents are mutated only through the
//! lifecycle and reconciliation paths.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for citizen profiles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileId(pub String);

/// Identifier wrapper for benefit schemes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemeId(pub String);

/// Identifier wrapper for applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for uploaded documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

/// Identifier wrapper for notifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub String);

/// Demographic and economic snapshot of a citizen used for eligibility
/// matching. Free-text fields mirror what the intake layer collects; missing
/// data is treated leniently by the gate evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub full_name: String,
    pub age: Option<u8>,
    /// Annual income as entered, e.g. "150000" or "1.5 LPA".
    pub annual_income: Option<String>,
    /// Caste category, e.g. "General", "OBC", "SC", "ST".
    pub category: Option<String>,
    pub gender: Option<String>,
    pub state: Option<String>,
    pub education: Option<String>,
    pub employment: Option<String>,
}

/// Eligibility restrictions declared by a scheme. A restriction that is absent
/// or equal to the sentinel "All" imposes no constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemeCriteria {
    pub min_age: Option<u8>,
    pub max_age: Option<u8>,
    /// Free-text income ceiling, e.g. "Below 2 LPA".
    pub income_ceiling: Option<String>,
    /// Allowed caste categories; empty or containing "All" means unrestricted.
    pub categories: Vec<String>,
    pub gender: Option<String>,
    /// Applicable states; empty means unrestricted.
    pub states: Vec<String>,
    pub education: Option<String>,
    pub employment: Option<String>,
}

/// A government benefit program with eligibility criteria and required
/// documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scheme {
    pub id: SchemeId,
    pub name: String,
    /// Domain category, e.g. "Education", "Healthcare", "Financial".
    pub category: String,
    pub description: String,
    pub criteria: SchemeCriteria,
    pub required_documents: Vec<DocumentRequirement>,
    pub benefits: Vec<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Closed enumeration of document categories tracked by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentCategory {
    Identity,
    Income,
    Category,
    Banking,
    Address,
    Education,
    Other,
}

impl DocumentCategory {
    pub const fn label(self) -> &'static str {
        match self {
            DocumentCategory::Identity => "identity",
            DocumentCategory::Income => "income",
            DocumentCategory::Category => "category",
            DocumentCategory::Banking => "banking",
            DocumentCategory::Address => "address",
            DocumentCategory::Education => "education",
            DocumentCategory::Other => "other",
        }
    }

    /// Resolve a required-document keyword to a category. Used once at scheme
    /// load so the per-check path compares categories instead of scanning
    /// strings.
    pub fn for_keyword(keyword: &str) -> Option<Self> {
        let lowered = keyword.to_lowercase();
        if ["aadhaar", "aadhar", "pan", "voter", "identity"]
            .iter()
            .any(|hint| lowered.contains(hint))
        {
            Some(DocumentCategory::Identity)
        } else if lowered.contains("income") || lowered.contains("salary") {
            Some(DocumentCategory::Income)
        } else if lowered.contains("caste") {
            Some(DocumentCategory::Category)
        } else if lowered.contains("bank") {
            Some(DocumentCategory::Banking)
        } else if ["residence", "address", "ration", "domicile"]
            .iter()
            .any(|hint| lowered.contains(hint))
        {
            Some(DocumentCategory::Address)
        } else if ["education", "marksheet", "degree"]
            .iter()
            .any(|hint| lowered.contains(hint))
        {
            Some(DocumentCategory::Education)
        } else {
            None
        }
    }
}

/// A required document declared by a scheme, with its keyword resolved to a
/// category at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRequirement {
    pub keyword: String,
    pub category: Option<DocumentCategory>,
}

impl DocumentRequirement {
    pub fn resolve(keyword: impl Into<String>) -> Self {
        let keyword = keyword.into();
        let category = DocumentCategory::for_keyword(&keyword);
        Self { keyword, category }
    }
}

/// Verification state of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
    NeedsReview,
}

impl VerificationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Rejected => "rejected",
            VerificationStatus::NeedsReview => "needs_review",
        }
    }
}

/// Structured field guesses produced by the document text extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub document_number: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub issuing_authority: Option<String>,
}

/// An uploaded proof document owned by a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub profile_id: ProfileId,
    pub name: String,
    pub category: DocumentCategory,
    pub status: VerificationStatus,
    /// Kept consistent with `status == Verified`.
    pub verified: bool,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub fields: ExtractedFields,
}

impl Document {
    /// Flip the document to verified, keeping the flag and the status in sync
    /// and stamping the verification time only once.
    pub fn mark_verified(&mut self, at: DateTime<Utc>) {
        self.status = VerificationStatus::Verified;
        self.verified = true;
        self.verified_at.get_or_insert(at);
    }
}

/// High level status tracked throughout the application lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    RequiresResubmission,
    FinalApproved,
    FinalRejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "draft",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::RequiresResubmission => "requires_resubmission",
            ApplicationStatus::FinalApproved => "final_approved",
            ApplicationStatus::FinalRejected => "final_rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Rejected
                | ApplicationStatus::FinalApproved
                | ApplicationStatus::FinalRejected
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Who drove a status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Actor {
    System,
    Admin(String),
    Citizen(ProfileId),
}

/// One entry in the auditable status history of an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: ApplicationStatus,
    pub at: DateTime<Utc>,
    pub actor: Actor,
    pub reason: Option<String>,
}

static TRACKING_DISAMBIGUATOR: AtomicU64 = AtomicU64::new(0);

/// Mint a tracking id for a submission. The id embeds the issue instant in
/// milliseconds so ids minted by separate process runs never collide with
/// already persisted ones; the counter separates ids minted within the same
/// millisecond.
pub(crate) fn next_tracking_id(issued_at: DateTime<Utc>) -> String {
    let sequence = TRACKING_DISAMBIGUATOR.fetch_add(1, Ordering::Relaxed) % 10_000;
    format!("TRK-{}-{sequence:04}", issued_at.timestamp_millis())
}

/// A citizen's request for a specific scheme, tracked through the status
/// lifecycle with milestone timestamps set exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub profile_id: ProfileId,
    pub scheme_id: SchemeId,
    pub status: ApplicationStatus,
    pub history: Vec<StatusChange>,
    /// Unique, externally shareable tracking reference. Absent until the
    /// application is first submitted.
    pub tracking_id: Option<String>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub final_approved_at: Option<DateTime<Utc>>,
    pub final_rejected_at: Option<DateTime<Utc>>,
}

impl Application {
    pub fn draft(
        id: ApplicationId,
        profile_id: ProfileId,
        scheme_id: SchemeId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            profile_id,
            scheme_id,
            status: ApplicationStatus::Draft,
            history: Vec::new(),
            tracking_id: None,
            remarks: None,
            created_at,
            submitted_at: None,
            reviewed_at: None,
            completed_at: None,
            final_approved_at: None,
            final_rejected_at: None,
        }
    }
}

/// Closed enumeration of notification event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    ApplicationSubmitted,
    ApplicationUnderReview,
    ApplicationApproved,
    ApplicationRejected,
    ResubmissionRequired,
    ApplicationFinalApproved,
    ApplicationFinalRejected,
    DocumentVerified,
    DocumentRejected,
    SchemeMatch,
}

impl NotificationKind {
    pub const fn label(self) -> &'static str {
        match self {
            NotificationKind::ApplicationSubmitted => "application_submitted",
            NotificationKind::ApplicationUnderReview => "application_under_review",
            NotificationKind::ApplicationApproved => "application_approved",
            NotificationKind::ApplicationRejected => "application_rejected",
            NotificationKind::ResubmissionRequired => "resubmission_required",
            NotificationKind::ApplicationFinalApproved => "application_final_approved",
            NotificationKind::ApplicationFinalRejected => "application_final_rejected",
            NotificationKind::DocumentVerified => "document_verified",
            NotificationKind::DocumentRejected => "document_rejected",
            NotificationKind::SchemeMatch => "scheme_match",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationPriority {
    Low,
    Medium,
    High,
    Urgent,
}

/// Days a notification stays visible before the cleanup job may purge it.
pub const NOTIFICATION_TTL_DAYS: i64 = 30;

/// A persisted notification row. Created only by the dispatcher; the cleanup
/// job purges rows past `expires_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub profile_id: ProfileId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub application_id: Option<ApplicationId>,
    pub scheme_id: Option<SchemeId>,
    pub document_id: Option<DocumentId>,
    pub read: bool,
    pub priority: NotificationPriority,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Notification {
    pub fn default_expiry(created_at: DateTime<Utc>) -> DateTime<Utc> {
        created_at + Duration::days(NOTIFICATION_TTL_DAYS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_resolution_covers_common_document_names() {
        assert_eq!(
            DocumentCategory::for_keyword("Aadhaar Card"),
            Some(DocumentCategory::Identity)
        );
        assert_eq!(
            DocumentCategory::for_keyword("Income Certificate"),
            Some(DocumentCategory::Income)
        );
        assert_eq!(
            DocumentCategory::for_keyword("Caste Certificate"),
            Some(DocumentCategory::Category)
        );
        assert_eq!(
            DocumentCategory::for_keyword("Bank Passbook"),
            Some(DocumentCategory::Banking)
        );
        assert_eq!(
            DocumentCategory::for_keyword("Ration Card"),
            Some(DocumentCategory::Address)
        );
        assert_eq!(DocumentCategory::for_keyword("Photograph"), None);
    }

    #[test]
    fn mark_verified_keeps_flag_and_status_consistent() {
        let mut document = Document {
            id: DocumentId("doc-1".to_string()),
            profile_id: ProfileId("profile-1".to_string()),
            name: "Aadhaar Card".to_string(),
            category: DocumentCategory::Identity,
            status: VerificationStatus::Pending,
            verified: false,
            size_bytes: 42_000,
            uploaded_at: Utc::now(),
            verified_at: None,
            fields: ExtractedFields::default(),
        };

        let first = Utc::now();
        document.mark_verified(first);
        assert!(document.verified);
        assert_eq!(document.status, VerificationStatus::Verified);
        assert_eq!(document.verified_at, Some(first));

        // A second call must not overwrite the original timestamp.
        document.mark_verified(first + Duration::minutes(5));
        assert_eq!(document.verified_at, Some(first));
    }

    #[test]
    fn tracking_ids_embed_the_issue_instant_and_never_repeat() {
        let issued_at = Utc::now();
        let first = next_tracking_id(issued_at);
        let second = next_tracking_id(issued_at);

        // Same millisecond, still distinct.
        assert_ne!(first, second);
        // Two runs of the portal can never mint the same id because the issue
        // instant is part of it.
        let prefix = format!("TRK-{}-", issued_at.timestamp_millis());
        assert!(first.starts_with(&prefix), "{first}");
        assert!(second.starts_with(&prefix), "{second}");
    }

    #[test]
    fn drafts_carry_no_tracking_id() {
        let draft = Application::draft(
            ApplicationId("app-1".to_string()),
            ProfileId("profile-1".to_string()),
            SchemeId("scheme-1".to_string()),
            Utc::now(),
        );
        assert!(draft.tracking_id.is_none());
    }
}
