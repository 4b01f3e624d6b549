//! Application lifecycle state machine. Pure: a transition mutates only the
//! application passed in and returns the domain events to emit; persisting the
//! record and dispatching notifications are the caller's concern.
//!
//! The grace-window auto-advance rule (submitted + eligible -> approved, else
//! under_review) is business policy owned by the auto-processing job, not a
//! rule of this machine.

use chrono::{DateTime, Utc};

use crate::domain::{
    next_tracking_id, Actor, Application, ApplicationId, ApplicationStatus, ProfileId, SchemeId,
    StatusChange,
};

/// Rejected status changes leave the application untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
}

/// Event kinds produced by reaching a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainEventKind {
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    ResubmissionRequired,
    FinalApproved,
    FinalRejected,
}

/// A domain event emitted by a successful transition, carrying enough
/// correlation to build a notification without re-reading the application.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainEvent {
    pub application_id: ApplicationId,
    pub profile_id: ProfileId,
    pub scheme_id: SchemeId,
    pub kind: DomainEventKind,
    pub reason: Option<String>,
}

pub struct ApplicationStateMachine;

impl ApplicationStateMachine {
    /// Legal successor set for each status. Terminal states have none.
    pub fn allowed_targets(status: ApplicationStatus) -> &'static [ApplicationStatus] {
        use ApplicationStatus::*;
        match status {
            Draft => &[Submitted],
            Submitted => &[UnderReview, Approved],
            UnderReview => &[Approved, Rejected, RequiresResubmission],
            Approved => &[FinalApproved, FinalRejected],
            RequiresResubmission => &[Submitted],
            Rejected | FinalApproved | FinalRejected => &[],
        }
    }

    /// Apply one status change: guard the adjacency set, append exactly one
    /// history entry, stamp the milestone timestamp if unset, and return the
    /// events to emit (exactly one per status reached).
    pub fn transition(
        application: &mut Application,
        target: ApplicationStatus,
        actor: Actor,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Vec<DomainEvent>, TransitionError> {
        if !Self::allowed_targets(application.status).contains(&target) {
            return Err(TransitionError::InvalidTransition {
                from: application.status,
                to: target,
            });
        }

        application.status = target;
        application.history.push(StatusChange {
            status: target,
            at: now,
            actor,
            reason: reason.clone(),
        });
        Self::stamp_milestone(application, target, now);
        if target == ApplicationStatus::Submitted {
            // The shareable reference is issued on first submission and kept
            // through the resubmission loop.
            application
                .tracking_id
                .get_or_insert_with(|| next_tracking_id(now));
        }

        Ok(vec![DomainEvent {
            application_id: application.id.clone(),
            profile_id: application.profile_id.clone(),
            scheme_id: application.scheme_id.clone(),
            kind: Self::event_kind(target),
            reason,
        }])
    }

    // Milestone timestamps are set exactly once; re-reaching a status through
    // the resubmission loop never overwrites them.
    fn stamp_milestone(application: &mut Application, target: ApplicationStatus, now: DateTime<Utc>) {
        match target {
            ApplicationStatus::Submitted => {
                application.submitted_at.get_or_insert(now);
            }
            ApplicationStatus::UnderReview => {
                application.reviewed_at.get_or_insert(now);
            }
            ApplicationStatus::Approved | ApplicationStatus::Rejected => {
                application.completed_at.get_or_insert(now);
            }
            ApplicationStatus::FinalApproved => {
                application.final_approved_at.get_or_insert(now);
            }
            ApplicationStatus::FinalRejected => {
                application.final_rejected_at.get_or_insert(now);
            }
            ApplicationStatus::Draft | ApplicationStatus::RequiresResubmission => {}
        }
    }

    fn event_kind(target: ApplicationStatus) -> DomainEventKind {
        match target {
            ApplicationStatus::Draft | ApplicationStatus::Submitted => DomainEventKind::Submitted,
            ApplicationStatus::UnderReview => DomainEventKind::UnderReview,
            ApplicationStatus::Approved => DomainEventKind::Approved,
            ApplicationStatus::Rejected => DomainEventKind::Rejected,
            ApplicationStatus::RequiresResubmission => DomainEventKind::ResubmissionRequired,
            ApplicationStatus::FinalApproved => DomainEventKind::FinalApproved,
            ApplicationStatus::FinalRejected => DomainEventKind::FinalRejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn application() -> Application {
        Application::draft(
            ApplicationId("app-1".to_string()),
            ProfileId("profile-1".to_string()),
            SchemeId("scheme-1".to_string()),
            Utc::now(),
        )
    }

    fn advance(
        application: &mut Application,
        target: ApplicationStatus,
        now: DateTime<Utc>,
    ) -> Vec<DomainEvent> {
        ApplicationStateMachine::transition(application, target, Actor::System, None, now)
            .expect("legal transition")
    }

    #[test]
    fn draft_cannot_jump_to_approved() {
        let mut application = application();
        let err = ApplicationStateMachine::transition(
            &mut application,
            ApplicationStatus::Approved,
            Actor::System,
            None,
            Utc::now(),
        )
        .expect_err("draft to approved is illegal");

        assert_eq!(
            err,
            TransitionError::InvalidTransition {
                from: ApplicationStatus::Draft,
                to: ApplicationStatus::Approved,
            }
        );
        assert_eq!(application.status, ApplicationStatus::Draft);
        assert!(application.history.is_empty());
    }

    #[test]
    fn every_pair_outside_the_adjacency_set_is_rejected() {
        use ApplicationStatus::*;
        let all = [
            Draft,
            Submitted,
            UnderReview,
            Approved,
            Rejected,
            RequiresResubmission,
            FinalApproved,
            FinalRejected,
        ];

        for from in all {
            for to in all {
                let mut application = application();
                application.status = from;
                let result = ApplicationStateMachine::transition(
                    &mut application,
                    to,
                    Actor::System,
                    None,
                    Utc::now(),
                );
                let legal = ApplicationStateMachine::allowed_targets(from).contains(&to);
                assert_eq!(result.is_ok(), legal, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn terminal_states_have_no_successors() {
        for status in [
            ApplicationStatus::Rejected,
            ApplicationStatus::FinalApproved,
            ApplicationStatus::FinalRejected,
        ] {
            assert!(status.is_terminal());
            assert!(ApplicationStateMachine::allowed_targets(status).is_empty());
        }
    }

    #[test]
    fn history_grows_by_one_per_valid_transition() {
        let mut application = application();
        let now = Utc::now();

        advance(&mut application, ApplicationStatus::Submitted, now);
        advance(&mut application, ApplicationStatus::UnderReview, now);
        advance(&mut application, ApplicationStatus::Approved, now);
        advance(&mut application, ApplicationStatus::FinalApproved, now);

        assert_eq!(application.history.len(), 4);
        assert_eq!(
            application.history.last().map(|entry| entry.status),
            Some(ApplicationStatus::FinalApproved)
        );
    }

    #[test]
    fn milestones_are_stamped_once_even_through_resubmission_loop() {
        let mut application = application();
        let first = Utc::now();
        let later = first + Duration::hours(2);

        advance(&mut application, ApplicationStatus::Submitted, first);
        advance(&mut application, ApplicationStatus::UnderReview, first);
        advance(
            &mut application,
            ApplicationStatus::RequiresResubmission,
            first,
        );
        // Loop back and resubmit two hours later.
        advance(&mut application, ApplicationStatus::Submitted, later);
        advance(&mut application, ApplicationStatus::UnderReview, later);

        assert_eq!(application.submitted_at, Some(first));
        assert_eq!(application.reviewed_at, Some(first));
        assert_eq!(application.history.len(), 5);
    }

    #[test]
    fn each_transition_emits_exactly_one_event_with_reason() {
        let mut application = application();
        advance(&mut application, ApplicationStatus::Submitted, Utc::now());
        advance(&mut application, ApplicationStatus::UnderReview, Utc::now());

        let events = ApplicationStateMachine::transition(
            &mut application,
            ApplicationStatus::Rejected,
            Actor::Admin("reviewer@portal".to_string()),
            Some("income proof outdated".to_string()),
            Utc::now(),
        )
        .expect("legal transition");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, DomainEventKind::Rejected);
        assert_eq!(events[0].reason.as_deref(), Some("income proof outdated"));
        assert_eq!(events[0].application_id, application.id);
    }

    #[test]
    fn tracking_id_is_issued_at_first_submission_and_kept_afterwards() {
        let mut application = application();
        assert!(application.tracking_id.is_none());

        let submitted_at = Utc::now();
        advance(&mut application, ApplicationStatus::Submitted, submitted_at);
        let issued = application.tracking_id.clone().expect("issued on submission");
        let prefix = format!("TRK-{}-", submitted_at.timestamp_millis());
        assert!(issued.starts_with(&prefix), "{issued}");

        // The resubmission loop must not mint a second reference.
        advance(&mut application, ApplicationStatus::UnderReview, submitted_at);
        advance(
            &mut application,
            ApplicationStatus::RequiresResubmission,
            submitted_at,
        );
        advance(
            &mut application,
            ApplicationStatus::Submitted,
            submitted_at + Duration::hours(1),
        );
        assert_eq!(application.tracking_id.as_deref(), Some(issued.as_str()));
    }

    #[test]
    fn submitted_can_be_auto_approved_directly() {
        let mut application = application();
        advance(&mut application, ApplicationStatus::Submitted, Utc::now());
        let events = advance(&mut application, ApplicationStatus::Approved, Utc::now());

        assert_eq!(application.status, ApplicationStatus::Approved);
        assert!(application.completed_at.is_some());
        assert_eq!(events[0].kind, DomainEventKind::Approved);
    }
}
