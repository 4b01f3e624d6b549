use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use yojana_engine::config::SchedulerConfig;
use yojana_engine::demo;
use yojana_engine::domain::{
    Actor, Application, ApplicationId, ApplicationStatus, Document, DocumentCategory, DocumentId,
    DocumentRequirement, ExtractedFields, NotificationKind, Profile, ProfileId, Scheme,
    SchemeCriteria, SchemeId, VerificationStatus,
};
use yojana_engine::eligibility::EligibilityEngine;
use yojana_engine::lifecycle::ApplicationStateMachine;
use yojana_engine::notify::NotificationDispatcher;
use yojana_engine::scheduler::jobs::{
    ApplicationAutoProcessing, DocumentAutoVerification, EligibilityBroadcast, HealthProbe,
    NotificationCleanup,
};
use yojana_engine::scheduler::{
    HealthStatus, JobContext, ReconciliationJob, ReconciliationScheduler, SchedulerStats,
    VerificationPolicy,
};
use yojana_engine::store::{InMemoryStore, NoopExtractor, RecordStore};

fn context(store: Arc<InMemoryStore>) -> JobContext {
    let shared: Arc<dyn RecordStore> = store;
    JobContext {
        store: shared.clone(),
        extractor: Arc::new(NoopExtractor),
        engine: Arc::new(EligibilityEngine::new(shared.clone())),
        dispatcher: Arc::new(NotificationDispatcher::new(shared)),
        stats: Arc::new(SchedulerStats::default()),
        policy: Arc::new(VerificationPolicy::default()),
        grace_period: Duration::minutes(5),
        health: Arc::new(Mutex::new(HealthStatus::Unknown)),
    }
}

fn applicant() -> Profile {
    Profile {
        id: ProfileId("profile-1".to_string()),
        full_name: "Asha Kumari".to_string(),
        age: Some(21),
        annual_income: Some("150000".to_string()),
        category: Some("OBC".to_string()),
        gender: Some("Female".to_string()),
        state: Some("Bihar".to_string()),
        education: None,
        employment: None,
    }
}

fn scholarship() -> Scheme {
    Scheme {
        id: SchemeId("scholarship".to_string()),
        name: "PM Scholarship".to_string(),
        category: "Education".to_string(),
        description: String::new(),
        criteria: SchemeCriteria {
            min_age: Some(18),
            max_age: Some(25),
            income_ceiling: Some("Below 2 LPA".to_string()),
            categories: vec!["OBC".to_string(), "SC".to_string()],
            gender: None,
            states: Vec::new(),
            education: None,
            employment: None,
        },
        required_documents: vec![DocumentRequirement::resolve("Aadhaar Card")],
        benefits: Vec::new(),
        active: true,
        created_at: Utc::now() - Duration::days(10),
    }
}

fn pending_aadhaar() -> Document {
    Document {
        id: DocumentId("doc-1".to_string()),
        profile_id: ProfileId("profile-1".to_string()),
        name: "Aadhaar Card.pdf".to_string(),
        category: DocumentCategory::Identity,
        status: VerificationStatus::Pending,
        verified: false,
        size_bytes: 48_000,
        uploaded_at: Utc::now() - Duration::hours(1),
        verified_at: None,
        fields: ExtractedFields::default(),
    }
}

fn stale_submission() -> Application {
    let submitted_at = Utc::now() - Duration::minutes(30);
    let mut application = Application::draft(
        ApplicationId("app-1".to_string()),
        ProfileId("profile-1".to_string()),
        SchemeId("scholarship".to_string()),
        submitted_at,
    );
    ApplicationStateMachine::transition(
        &mut application,
        ApplicationStatus::Submitted,
        Actor::Citizen(ProfileId("profile-1".to_string())),
        None,
        submitted_at,
    )
    .expect("draft to submitted");
    application
}

#[test]
fn full_reconciliation_pass_moves_every_record_forward() {
    let store = Arc::new(InMemoryStore::default());
    store.insert_profile(applicant());
    store.insert_scheme(scholarship());
    store.insert_document(pending_aadhaar());
    store.insert_application(stale_submission());
    let ctx = context(store.clone());

    // Document verification has to land before auto-processing, otherwise the
    // unverified Aadhaar scan blocks the approval.
    let verified = DocumentAutoVerification.run(&ctx).expect("verification tick");
    assert_eq!(verified.affected, 1);
    let document = store
        .document(&DocumentId("doc-1".to_string()))
        .expect("document present");
    assert_eq!(document.status, VerificationStatus::Verified);

    let processed = ApplicationAutoProcessing.run(&ctx).expect("processing tick");
    assert_eq!(processed.affected, 1);
    let application = store
        .application(&ApplicationId("app-1".to_string()))
        .expect("store reachable")
        .expect("application present");
    assert_eq!(application.status, ApplicationStatus::Approved);
    assert!(application.completed_at.is_some());
    assert_eq!(application.history.len(), 2);

    let broadcast = EligibilityBroadcast.run(&ctx).expect("broadcast tick");
    assert_eq!(broadcast.affected, 1);

    HealthProbe.run(&ctx).expect("probe tick");
    assert!(matches!(ctx.health(), HealthStatus::Healthy { .. }));

    let kinds: Vec<NotificationKind> = store
        .notifications()
        .iter()
        .map(|notification| notification.kind)
        .collect();
    assert!(kinds.contains(&NotificationKind::DocumentVerified));
    assert!(kinds.contains(&NotificationKind::ApplicationApproved));
    assert!(kinds.contains(&NotificationKind::SchemeMatch));
    assert_eq!(ctx.dispatcher.sent(), 3);
}

#[test]
fn a_second_pass_changes_nothing() {
    let store = Arc::new(InMemoryStore::default());
    store.insert_profile(applicant());
    store.insert_scheme(scholarship());
    store.insert_document(pending_aadhaar());
    store.insert_application(stale_submission());
    let ctx = context(store.clone());

    for _ in 0..2 {
        DocumentAutoVerification.run(&ctx).expect("verification tick");
        ApplicationAutoProcessing.run(&ctx).expect("processing tick");
        EligibilityBroadcast.run(&ctx).expect("broadcast tick");
        NotificationCleanup.run(&ctx).expect("cleanup tick");
    }

    let application = store
        .application(&ApplicationId("app-1".to_string()))
        .expect("store reachable")
        .expect("application present");
    assert_eq!(application.status, ApplicationStatus::Approved);
    assert_eq!(application.history.len(), 2);
    assert_eq!(store.notifications().len(), 3);
    assert_eq!(ctx.stats.errors(), 0);
}

#[test]
fn unverified_documents_send_the_application_to_manual_review() {
    let store = Arc::new(InMemoryStore::default());
    store.insert_profile(applicant());
    store.insert_scheme(scholarship());
    // Too small for the auto-verification floor; it stays pending.
    let mut small_scan = pending_aadhaar();
    small_scan.size_bytes = 4_000;
    store.insert_document(small_scan);
    store.insert_application(stale_submission());
    let ctx = context(store.clone());

    DocumentAutoVerification.run(&ctx).expect("verification tick");
    ApplicationAutoProcessing.run(&ctx).expect("processing tick");

    let application = store
        .application(&ApplicationId("app-1".to_string()))
        .expect("store reachable")
        .expect("application present");
    assert_eq!(application.status, ApplicationStatus::UnderReview);
    assert!(application.reviewed_at.is_some());
}

#[test]
fn demo_seed_converges_under_the_standard_jobs() {
    let store = Arc::new(InMemoryStore::default());
    demo::seed(&store);
    let ctx = context(store.clone());

    DocumentAutoVerification.run(&ctx).expect("verification tick");
    ApplicationAutoProcessing.run(&ctx).expect("processing tick");

    let application = store
        .application(&ApplicationId("app-asha-scholarship".to_string()))
        .expect("store reachable")
        .expect("application present");
    assert_eq!(application.status, ApplicationStatus::Approved);
    assert_eq!(ctx.stats.errors(), 0);
}

#[tokio::test]
async fn scheduler_lifecycle_is_idempotent_end_to_end() {
    let store = Arc::new(InMemoryStore::default());
    let ctx = context(store);
    let scheduler = ReconciliationScheduler::new(ctx, &SchedulerConfig::default());

    scheduler.start();
    scheduler.start();
    assert!(scheduler.is_running());

    let snapshot = scheduler.stats();
    assert_eq!(snapshot.errors, 0);
    assert_eq!(snapshot.notifications_sent, 0);

    scheduler.stop();
    scheduler.stop();
    assert!(!scheduler.is_running());
}
