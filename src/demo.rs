//! Sample data for local runs: a handful of citizen profiles, a small scheme
//! catalog, uploaded documents in various states, and one stale submitted
//! application the auto-processing job will pick up on its first tick.

use chrono::{Duration, Utc};

use crate::domain::{
    Actor, Application, ApplicationId, ApplicationStatus, Document, DocumentCategory, DocumentId,
    DocumentRequirement, ExtractedFields, Profile, ProfileId, Scheme, SchemeCriteria, SchemeId,
    VerificationStatus,
};
use crate::lifecycle::ApplicationStateMachine;
use crate::store::InMemoryStore;

pub fn seed(store: &InMemoryStore) {
    let now = Utc::now();

    store.insert_profile(Profile {
        id: ProfileId("profile-asha".to_string()),
        full_name: "Asha Kumari".to_string(),
        age: Some(21),
        annual_income: Some("150000".to_string()),
        category: Some("OBC".to_string()),
        gender: Some("Female".to_string()),
        state: Some("Bihar".to_string()),
        education: Some("Undergraduate".to_string()),
        employment: Some("Student".to_string()),
    });
    store.insert_profile(Profile {
        id: ProfileId("profile-ramesh".to_string()),
        full_name: "Ramesh Yadav".to_string(),
        age: Some(58),
        annual_income: Some("3 LPA".to_string()),
        category: Some("General".to_string()),
        gender: Some("Male".to_string()),
        state: Some("Uttar Pradesh".to_string()),
        education: None,
        employment: Some("Farmer".to_string()),
    });

    store.insert_scheme(Scheme {
        id: SchemeId("pm-scholarship".to_string()),
        name: "PM Scholarship".to_string(),
        category: "Education".to_string(),
        description: "Merit scholarship for students from reserved categories.".to_string(),
        criteria: SchemeCriteria {
            min_age: Some(18),
            max_age: Some(25),
            income_ceiling: Some("Below 2 LPA".to_string()),
            categories: vec!["OBC".to_string(), "SC".to_string(), "ST".to_string()],
            gender: None,
            states: Vec::new(),
            education: None,
            employment: None,
        },
        required_documents: vec![
            DocumentRequirement::resolve("Aadhaar Card"),
            DocumentRequirement::resolve("Income Certificate"),
        ],
        benefits: vec![
            "Tuition fee waiver".to_string(),
            "Monthly stipend".to_string(),
        ],
        active: true,
        created_at: now - Duration::days(30),
    });
    store.insert_scheme(Scheme {
        id: SchemeId("kisan-support".to_string()),
        name: "Kisan Support Grant".to_string(),
        category: "Agriculture".to_string(),
        description: "Direct income support for small farmers.".to_string(),
        criteria: SchemeCriteria {
            min_age: Some(18),
            max_age: None,
            income_ceiling: Some("Below 5 LPA".to_string()),
            categories: vec!["All".to_string()],
            gender: None,
            states: Vec::new(),
            education: None,
            employment: None,
        },
        required_documents: vec![DocumentRequirement::resolve("Bank Passbook")],
        benefits: vec!["Annual support payment".to_string()],
        active: true,
        created_at: now - Duration::days(90),
    });

    // A genuine-looking Aadhaar scan the verification job will auto-verify,
    // plus an already-verified income certificate.
    store.insert_document(Document {
        id: DocumentId("doc-asha-aadhaar".to_string()),
        profile_id: ProfileId("profile-asha".to_string()),
        name: "Aadhaar Card.pdf".to_string(),
        category: DocumentCategory::Identity,
        status: VerificationStatus::Pending,
        verified: false,
        size_bytes: 48_000,
        uploaded_at: now - Duration::hours(2),
        verified_at: None,
        fields: ExtractedFields::default(),
    });
    let mut income_certificate = Document {
        id: DocumentId("doc-asha-income".to_string()),
        profile_id: ProfileId("profile-asha".to_string()),
        name: "Income Certificate.pdf".to_string(),
        category: DocumentCategory::Income,
        status: VerificationStatus::Pending,
        verified: false,
        size_bytes: 22_000,
        uploaded_at: now - Duration::days(1),
        verified_at: None,
        fields: ExtractedFields::default(),
    };
    income_certificate.mark_verified(now - Duration::hours(20));
    store.insert_document(income_certificate);

    let mut application = Application::draft(
        ApplicationId("app-asha-scholarship".to_string()),
        ProfileId("profile-asha".to_string()),
        SchemeId("pm-scholarship".to_string()),
        now - Duration::hours(1),
    );
    if ApplicationStateMachine::transition(
        &mut application,
        ApplicationStatus::Submitted,
        Actor::Citizen(ProfileId("profile-asha".to_string())),
        None,
        now - Duration::minutes(30),
    )
    .is_ok()
    {
        store.insert_application(application);
    }
}
