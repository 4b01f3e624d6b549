//! Turns domain events into persisted notification records.
//!
//! The dispatcher keeps an idempotency key per (entity, event kind) so the
//! unattended jobs can re-trigger the same event without producing duplicate
//! rows. The ledger stays bounded: an application's keys are dropped when it
//! reaches a terminal status (the state machine permits no further events),
//! and each profile retains only its most recent scheme digest.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tracing::debug;

use crate::domain::{
    ApplicationId, DocumentId, Notification, NotificationId, NotificationKind,
    NotificationPriority, ProfileId, SchemeId,
};
use crate::lifecycle::{DomainEvent, DomainEventKind};
use crate::store::{RecordStore, StoreError};

/// Inputs the dispatcher can turn into notification rows.
#[derive(Debug, Clone)]
pub enum NotificationEvent {
    /// A lifecycle event, enriched with the scheme name for the message body.
    Application { event: DomainEvent, scheme_name: String },
    DocumentVerified {
        profile_id: ProfileId,
        document_id: DocumentId,
        document_name: String,
    },
    DocumentRejected {
        profile_id: ProfileId,
        document_id: DocumentId,
        document_name: String,
        reason: Option<String>,
    },
    /// New-eligible-schemes digest for one profile.
    SchemeMatch {
        profile_id: ProfileId,
        schemes: Vec<(SchemeId, String)>,
    },
}

/// Dispatch bookkeeping behind the idempotency guarantee. Sized by live
/// applications, uploaded documents, and profiles rather than by process
/// uptime.
#[derive(Debug, Default)]
struct DispatchLedger {
    application_events: HashMap<ApplicationId, HashSet<NotificationKind>>,
    document_events: HashSet<(NotificationKind, DocumentId)>,
    scheme_digests: HashMap<ProfileId, String>,
}

enum LedgerKey {
    Application(ApplicationId, NotificationKind),
    Document(NotificationKind, DocumentId),
    SchemeDigest(ProfileId, String),
}

impl DispatchLedger {
    fn contains(&self, key: &LedgerKey) -> bool {
        match key {
            LedgerKey::Application(id, kind) => self
                .application_events
                .get(id)
                .map_or(false, |kinds| kinds.contains(kind)),
            LedgerKey::Document(kind, id) => {
                self.document_events.contains(&(*kind, id.clone()))
            }
            LedgerKey::SchemeDigest(profile_id, digest) => {
                self.scheme_digests.get(profile_id) == Some(digest)
            }
        }
    }

    fn record(&mut self, key: LedgerKey) {
        match key {
            // A terminal status admits no further transitions, so no new
            // events can originate from the application and its keys can go.
            LedgerKey::Application(id, kind) if kind_is_terminal(kind) => {
                self.application_events.remove(&id);
            }
            LedgerKey::Application(id, kind) => {
                self.application_events.entry(id).or_default().insert(kind);
            }
            LedgerKey::Document(kind, id) => {
                self.document_events.insert((kind, id));
            }
            // Replacing instead of accumulating means a profile whose match
            // set reverts to an earlier one is notified again; the digest is
            // informational, so a repeat beats unbounded growth.
            LedgerKey::SchemeDigest(profile_id, digest) => {
                self.scheme_digests.insert(profile_id, digest);
            }
        }
    }
}

fn kind_is_terminal(kind: NotificationKind) -> bool {
    matches!(
        kind,
        NotificationKind::ApplicationRejected
            | NotificationKind::ApplicationFinalApproved
            | NotificationKind::ApplicationFinalRejected
    )
}

pub struct NotificationDispatcher {
    store: Arc<dyn RecordStore>,
    ledger: Mutex<DispatchLedger>,
    sequence: AtomicU64,
    sent: AtomicU64,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            ledger: Mutex::new(DispatchLedger::default()),
            sequence: AtomicU64::new(1),
            sent: AtomicU64::new(0),
        }
    }

    /// Notifications persisted by this dispatcher instance.
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Persist one notification for the event, or skip it when the same
    /// (entity, kind) pair has already been dispatched by this instance.
    pub fn dispatch(&self, event: NotificationEvent) -> Result<Option<Notification>, StoreError> {
        let key = Self::ledger_key(&event);
        {
            let ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
            if ledger.contains(&key) {
                debug!("notification already dispatched, skipping");
                return Ok(None);
            }
        }

        let notification = self.build(event);
        self.store.insert_notification(notification.clone())?;

        self.ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(key);
        self.sent.fetch_add(1, Ordering::Relaxed);
        Ok(Some(notification))
    }

    fn ledger_key(event: &NotificationEvent) -> LedgerKey {
        match event {
            NotificationEvent::Application { event, .. } => LedgerKey::Application(
                event.application_id.clone(),
                Self::application_kind(event.kind),
            ),
            NotificationEvent::DocumentVerified { document_id, .. } => {
                LedgerKey::Document(NotificationKind::DocumentVerified, document_id.clone())
            }
            NotificationEvent::DocumentRejected { document_id, .. } => {
                LedgerKey::Document(NotificationKind::DocumentRejected, document_id.clone())
            }
            NotificationEvent::SchemeMatch { profile_id, schemes } => {
                let mut ids: Vec<&str> =
                    schemes.iter().map(|(id, _)| id.0.as_str()).collect();
                ids.sort_unstable();
                LedgerKey::SchemeDigest(profile_id.clone(), ids.join(","))
            }
        }
    }

    fn application_kind(kind: DomainEventKind) -> NotificationKind {
        match kind {
            DomainEventKind::Submitted => NotificationKind::ApplicationSubmitted,
            DomainEventKind::UnderReview => NotificationKind::ApplicationUnderReview,
            DomainEventKind::Approved => NotificationKind::ApplicationApproved,
            DomainEventKind::Rejected => NotificationKind::ApplicationRejected,
            DomainEventKind::ResubmissionRequired => NotificationKind::ResubmissionRequired,
            DomainEventKind::FinalApproved => NotificationKind::ApplicationFinalApproved,
            DomainEventKind::FinalRejected => NotificationKind::ApplicationFinalRejected,
        }
    }

    fn build(&self, event: NotificationEvent) -> Notification {
        let created_at = Utc::now();
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let id = NotificationId(format!("ntf-{sequence:06}"));

        let mut notification = Notification {
            id,
            profile_id: ProfileId(String::new()),
            kind: NotificationKind::SchemeMatch,
            title: String::new(),
            message: String::new(),
            application_id: None,
            scheme_id: None,
            document_id: None,
            read: false,
            priority: NotificationPriority::Medium,
            created_at,
            expires_at: Notification::default_expiry(created_at),
        };

        match event {
            NotificationEvent::Application { event, scheme_name } => {
                notification.profile_id = event.profile_id.clone();
                notification.application_id = Some(event.application_id.clone());
                notification.scheme_id = Some(event.scheme_id.clone());
                notification.kind = Self::application_kind(event.kind);
                let (title, message, priority) = match event.kind {
                    DomainEventKind::Submitted => (
                        "Application Submitted".to_string(),
                        format!("Your application for {scheme_name} has been submitted."),
                        NotificationPriority::Medium,
                    ),
                    DomainEventKind::UnderReview => (
                        "Application Under Review".to_string(),
                        format!(
                            "Your application for {scheme_name} is now under review by our team."
                        ),
                        NotificationPriority::Medium,
                    ),
                    DomainEventKind::Approved => (
                        "Application Approved!".to_string(),
                        format!(
                            "Congratulations! Your application for {scheme_name} has been approved."
                        ),
                        NotificationPriority::High,
                    ),
                    DomainEventKind::Rejected => {
                        let message = match event.reason.as_deref() {
                            Some(reason) => format!(
                                "Your application for {scheme_name} was rejected: {reason}."
                            ),
                            None => {
                                format!("Your application for {scheme_name} was rejected.")
                            }
                        };
                        (
                            "Application Rejected".to_string(),
                            message,
                            NotificationPriority::High,
                        )
                    }
                    DomainEventKind::ResubmissionRequired => (
                        "Resubmission Required".to_string(),
                        format!(
                            "Your application for {scheme_name} needs corrections before it can proceed."
                        ),
                        NotificationPriority::High,
                    ),
                    DomainEventKind::FinalApproved => (
                        "Final Approval Granted".to_string(),
                        format!("Your application for {scheme_name} has received final approval."),
                        NotificationPriority::High,
                    ),
                    DomainEventKind::FinalRejected => (
                        "Final Decision: Not Approved".to_string(),
                        format!(
                            "Your application for {scheme_name} was not approved in the final review."
                        ),
                        NotificationPriority::High,
                    ),
                };
                notification.title = title;
                notification.message = message;
                notification.priority = priority;
            }
            NotificationEvent::DocumentVerified {
                profile_id,
                document_id,
                document_name,
            } => {
                notification.profile_id = profile_id;
                notification.document_id = Some(document_id);
                notification.kind = NotificationKind::DocumentVerified;
                notification.title = "Document Verified!".to_string();
                notification.message =
                    format!("Your {document_name} has been automatically verified.");
                notification.priority = NotificationPriority::Low;
            }
            NotificationEvent::DocumentRejected {
                profile_id,
                document_id,
                document_name,
                reason,
            } => {
                notification.profile_id = profile_id;
                notification.document_id = Some(document_id);
                notification.kind = NotificationKind::DocumentRejected;
                notification.title = "Document Rejected".to_string();
                notification.message = match reason {
                    Some(reason) => {
                        format!("Your {document_name} was rejected: {reason}.")
                    }
                    None => format!("Your {document_name} was rejected."),
                };
                notification.priority = NotificationPriority::High;
            }
            NotificationEvent::SchemeMatch { profile_id, schemes } => {
                let names: Vec<&str> =
                    schemes.iter().map(|(_, name)| name.as_str()).collect();
                notification.profile_id = profile_id;
                notification.kind = NotificationKind::SchemeMatch;
                notification.title = "New Schemes Available!".to_string();
                notification.message = format!(
                    "Great news! You are now eligible for: {}. Apply now!",
                    names.join(", ")
                );
                notification.priority = NotificationPriority::Medium;
            }
        }

        notification
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ApplicationId;
    use crate::store::InMemoryStore;

    fn dispatcher() -> (NotificationDispatcher, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::default());
        (NotificationDispatcher::new(store.clone()), store)
    }

    fn approved_event(application_id: &str) -> NotificationEvent {
        NotificationEvent::Application {
            event: DomainEvent {
                application_id: ApplicationId(application_id.to_string()),
                profile_id: ProfileId("profile-1".to_string()),
                scheme_id: SchemeId("scheme-1".to_string()),
                kind: DomainEventKind::Approved,
                reason: None,
            },
            scheme_name: "PM Scholarship".to_string(),
        }
    }

    #[test]
    fn approval_event_persists_one_templated_row() {
        let (dispatcher, store) = dispatcher();

        let notification = dispatcher
            .dispatch(approved_event("app-1"))
            .expect("store reachable")
            .expect("first dispatch persists");

        assert_eq!(notification.kind, NotificationKind::ApplicationApproved);
        assert!(notification.message.contains("PM Scholarship"));
        assert_eq!(notification.priority, NotificationPriority::High);
        assert!(notification.expires_at > notification.created_at);
        assert_eq!(store.notifications().len(), 1);
        assert_eq!(dispatcher.sent(), 1);
    }

    #[test]
    fn repeated_event_for_same_application_is_suppressed() {
        let (dispatcher, store) = dispatcher();

        dispatcher
            .dispatch(approved_event("app-1"))
            .expect("store reachable");
        let second = dispatcher
            .dispatch(approved_event("app-1"))
            .expect("store reachable");

        assert!(second.is_none());
        assert_eq!(store.notifications().len(), 1);
        assert_eq!(dispatcher.sent(), 1);
    }

    #[test]
    fn different_kinds_for_same_application_both_dispatch() {
        let (dispatcher, store) = dispatcher();

        dispatcher
            .dispatch(approved_event("app-1"))
            .expect("store reachable");
        dispatcher
            .dispatch(NotificationEvent::Application {
                event: DomainEvent {
                    application_id: ApplicationId("app-1".to_string()),
                    profile_id: ProfileId("profile-1".to_string()),
                    scheme_id: SchemeId("scheme-1".to_string()),
                    kind: DomainEventKind::FinalApproved,
                    reason: None,
                },
                scheme_name: "PM Scholarship".to_string(),
            })
            .expect("store reachable");

        assert_eq!(store.notifications().len(), 2);
    }

    #[test]
    fn rejection_message_includes_reason_when_present() {
        let (dispatcher, _store) = dispatcher();

        let notification = dispatcher
            .dispatch(NotificationEvent::Application {
                event: DomainEvent {
                    application_id: ApplicationId("app-2".to_string()),
                    profile_id: ProfileId("profile-1".to_string()),
                    scheme_id: SchemeId("scheme-1".to_string()),
                    kind: DomainEventKind::Rejected,
                    reason: Some("income proof outdated".to_string()),
                },
                scheme_name: "PM Scholarship".to_string(),
            })
            .expect("store reachable")
            .expect("persists");

        assert!(notification.message.contains("income proof outdated"));
    }

    #[test]
    fn document_rejection_is_high_priority_and_carries_the_reason() {
        let (dispatcher, _store) = dispatcher();

        let notification = dispatcher
            .dispatch(NotificationEvent::DocumentRejected {
                profile_id: ProfileId("profile-1".to_string()),
                document_id: DocumentId("doc-1".to_string()),
                document_name: "Income Certificate".to_string(),
                reason: Some("scan is illegible".to_string()),
            })
            .expect("store reachable")
            .expect("persists");

        assert_eq!(notification.kind, NotificationKind::DocumentRejected);
        assert_eq!(notification.priority, NotificationPriority::High);
        assert!(notification.message.contains("scan is illegible"));
        assert_eq!(notification.document_id, Some(DocumentId("doc-1".to_string())));
    }

    #[test]
    fn scheme_digest_key_ignores_scheme_ordering() {
        let (dispatcher, store) = dispatcher();
        let forward = NotificationEvent::SchemeMatch {
            profile_id: ProfileId("profile-1".to_string()),
            schemes: vec![
                (SchemeId("a".to_string()), "Scheme A".to_string()),
                (SchemeId("b".to_string()), "Scheme B".to_string()),
            ],
        };
        let reversed = NotificationEvent::SchemeMatch {
            profile_id: ProfileId("profile-1".to_string()),
            schemes: vec![
                (SchemeId("b".to_string()), "Scheme B".to_string()),
                (SchemeId("a".to_string()), "Scheme A".to_string()),
            ],
        };

        dispatcher.dispatch(forward).expect("store reachable");
        let second = dispatcher.dispatch(reversed).expect("store reachable");

        assert!(second.is_none());
        assert_eq!(store.notifications().len(), 1);
    }

    #[test]
    fn terminal_event_releases_the_application_from_the_ledger() {
        let (dispatcher, store) = dispatcher();

        dispatcher
            .dispatch(approved_event("app-1"))
            .expect("store reachable");
        dispatcher
            .dispatch(NotificationEvent::Application {
                event: DomainEvent {
                    application_id: ApplicationId("app-1".to_string()),
                    profile_id: ProfileId("profile-1".to_string()),
                    scheme_id: SchemeId("scheme-1".to_string()),
                    kind: DomainEventKind::FinalApproved,
                    reason: None,
                },
                scheme_name: "PM Scholarship".to_string(),
            })
            .expect("store reachable");

        // Both rows persisted, but the finished application no longer
        // occupies dedup state.
        assert_eq!(store.notifications().len(), 2);
        let ledger = dispatcher.ledger.lock().expect("ledger lock");
        assert!(ledger.application_events.is_empty());
    }

    #[test]
    fn each_profile_holds_at_most_one_scheme_digest() {
        let (dispatcher, store) = dispatcher();
        let digest = |ids: &[&str]| NotificationEvent::SchemeMatch {
            profile_id: ProfileId("profile-1".to_string()),
            schemes: ids
                .iter()
                .map(|id| (SchemeId(id.to_string()), format!("Scheme {id}")))
                .collect(),
        };

        dispatcher.dispatch(digest(&["a"])).expect("store reachable");
        dispatcher.dispatch(digest(&["a", "b"])).expect("store reachable");
        // Reverting to an earlier match set notifies again because only the
        // latest digest is retained.
        let reverted = dispatcher.dispatch(digest(&["a"])).expect("store reachable");

        assert!(reverted.is_some());
        assert_eq!(store.notifications().len(), 3);
        let ledger = dispatcher.ledger.lock().expect("ledger lock");
        assert_eq!(ledger.scheme_digests.len(), 1);
    }

    #[test]
    fn store_failure_does_not_mark_the_event_as_seen() {
        let (dispatcher, store) = dispatcher();
        store.set_available(false);

        let err = dispatcher
            .dispatch(approved_event("app-1"))
            .expect_err("offline store must error");
        assert!(matches!(err, StoreError::Unavailable(_)));

        store.set_available(true);
        let retried = dispatcher
            .dispatch(approved_event("app-1"))
            .expect("store reachable");
        assert!(retried.is_some());
    }
}
