use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::domain::{
    Document, DocumentCategory, DocumentId, DocumentRequirement, ExtractedFields, Profile,
    ProfileId, Scheme, SchemeCriteria, SchemeId, VerificationStatus,
};
use crate::eligibility::EligibilityEngine;
use crate::store::InMemoryStore;

pub(super) fn profile() -> Profile {
    Profile {
        id: ProfileId("profile-1".to_string()),
        full_name: "Asha Kumari".to_string(),
        age: Some(30),
        annual_income: Some("150000".to_string()),
        category: Some("OBC".to_string()),
        gender: Some("Female".to_string()),
        state: Some("Bihar".to_string()),
        education: Some("Graduate".to_string()),
        employment: Some("Self-employed".to_string()),
    }
}

pub(super) fn criteria() -> SchemeCriteria {
    SchemeCriteria {
        min_age: Some(18),
        max_age: Some(60),
        income_ceiling: Some("Below 2 LPA".to_string()),
        categories: vec!["OBC".to_string(), "SC".to_string()],
        gender: None,
        states: Vec::new(),
        education: None,
        employment: None,
    }
}

pub(super) fn scheme(id: &str, criteria: SchemeCriteria) -> Scheme {
    Scheme {
        id: SchemeId(id.to_string()),
        name: format!("Scheme {id}"),
        category: "Financial".to_string(),
        description: "Support scheme".to_string(),
        criteria,
        required_documents: Vec::new(),
        benefits: vec!["Direct benefit transfer".to_string()],
        active: true,
        created_at: Utc::now() - Duration::days(30),
    }
}

pub(super) fn requirement(keyword: &str) -> DocumentRequirement {
    DocumentRequirement::resolve(keyword)
}

pub(super) fn verified_document(id: &str, name: &str, category: DocumentCategory) -> Document {
    Document {
        id: DocumentId(id.to_string()),
        profile_id: ProfileId("profile-1".to_string()),
        name: name.to_string(),
        category,
        status: VerificationStatus::Verified,
        verified: true,
        size_bytes: 42_000,
        uploaded_at: Utc::now(),
        verified_at: Some(Utc::now()),
        fields: ExtractedFields::default(),
    }
}

pub(super) fn pending_document(id: &str, name: &str, category: DocumentCategory) -> Document {
    Document {
        status: VerificationStatus::Pending,
        verified: false,
        verified_at: None,
        ..verified_document(id, name, category)
    }
}

pub(super) fn engine_with_store() -> (EligibilityEngine, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::default());
    let engine = EligibilityEngine::new(store.clone());
    (engine, store)
}
