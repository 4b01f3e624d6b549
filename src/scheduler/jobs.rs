//! The standard reconciliation jobs.
//!
//! Per-record failures (a missing profile, an illegal transition) are counted
//! and skipped so one bad record never blocks the rest of a tick; store
//! connectivity loss aborts the whole tick instead, since every later record
//! would hit the same wall.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::domain::{Actor, ApplicationStatus, Document};
use crate::lifecycle::ApplicationStateMachine;
use crate::notify::NotificationEvent;
use crate::store::{
    ApplicationFilter, DocumentFilter, ProfileFilter, SchemeFilter, StoreError,
};

use super::{HealthStatus, JobContext, JobError, ReconciliationJob, TickReport};

/// One auto-verification rule: documents whose name contains the keyword and
/// whose upload is larger than the byte floor are taken as genuine.
#[derive(Debug, Clone)]
pub struct VerificationRule {
    pub keyword: String,
    pub min_bytes: u64,
}

/// Data-driven policy for unattended document verification.
#[derive(Debug, Clone)]
pub struct VerificationPolicy {
    pub rules: Vec<VerificationRule>,
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self {
            rules: vec![
                VerificationRule {
                    keyword: "aadhaar".to_string(),
                    min_bytes: 10_000,
                },
                VerificationRule {
                    keyword: "aadhar".to_string(),
                    min_bytes: 10_000,
                },
                VerificationRule {
                    keyword: "income".to_string(),
                    min_bytes: 5_000,
                },
            ],
        }
    }
}

impl VerificationPolicy {
    pub fn auto_verifiable(&self, document: &Document) -> bool {
        let name = document.name.to_lowercase();
        self.rules
            .iter()
            .any(|rule| name.contains(&rule.keyword) && document.size_bytes > rule.min_bytes)
    }
}

fn is_unavailable(err: &StoreError) -> bool {
    matches!(err, StoreError::Unavailable(_))
}

/// Advances submitted applications that have sat past the grace window:
/// eligible ones are approved, the rest move to manual review.
pub struct ApplicationAutoProcessing;

impl ReconciliationJob for ApplicationAutoProcessing {
    fn name(&self) -> &'static str {
        "application_auto_processing"
    }

    fn run(&self, ctx: &JobContext) -> Result<TickReport, JobError> {
        let cutoff = Utc::now() - ctx.grace_period;
        let stale = ctx.store.query_applications(&ApplicationFilter {
            status: Some(ApplicationStatus::Submitted),
            submitted_before: Some(cutoff),
            ..ApplicationFilter::default()
        })?;

        let mut report = TickReport {
            scanned: stale.len(),
            ..TickReport::default()
        };
        let mut approved = 0u64;

        for mut application in stale {
            let profile = match ctx
                .store
                .find_profiles(&ProfileFilter::by_id(application.profile_id.clone()))
            {
                Ok(profiles) => match profiles.into_iter().next() {
                    Some(profile) => profile,
                    None => {
                        warn!(
                            application = %application.id.0,
                            "profile missing, skipping application"
                        );
                        ctx.stats.record_error();
                        continue;
                    }
                },
                Err(err) if is_unavailable(&err) => return Err(err.into()),
                Err(err) => {
                    ctx.stats.record_error();
                    warn!(application = %application.id.0, error = %err, "profile lookup failed");
                    continue;
                }
            };

            let eligible = match ctx.engine.is_eligible(&profile, &application) {
                Ok(eligible) => eligible,
                Err(err) if is_unavailable(&err) => return Err(err.into()),
                Err(err) => {
                    ctx.stats.record_error();
                    warn!(
                        application = %application.id.0,
                        error = %err,
                        "eligibility check failed"
                    );
                    continue;
                }
            };

            let (target, reason) = if eligible {
                (
                    ApplicationStatus::Approved,
                    "auto-approved: all eligibility criteria met".to_string(),
                )
            } else {
                (
                    ApplicationStatus::UnderReview,
                    "escalated for manual review".to_string(),
                )
            };

            let events = match ApplicationStateMachine::transition(
                &mut application,
                target,
                Actor::System,
                Some(reason),
                Utc::now(),
            ) {
                Ok(events) => events,
                Err(err) => {
                    ctx.stats.record_error();
                    warn!(application = %application.id.0, error = %err, "transition rejected");
                    continue;
                }
            };

            match ctx.store.save_application(&application) {
                Ok(()) => {}
                Err(err) if is_unavailable(&err) => return Err(err.into()),
                Err(err) => {
                    ctx.stats.record_error();
                    warn!(application = %application.id.0, error = %err, "save failed");
                    continue;
                }
            }

            let scheme_name = ctx
                .store
                .find_schemes(&SchemeFilter::by_id(application.scheme_id.clone()))?
                .into_iter()
                .next()
                .map(|scheme| scheme.name)
                .unwrap_or_else(|| "the scheme".to_string());
            for event in events {
                ctx.dispatcher.dispatch(NotificationEvent::Application {
                    event,
                    scheme_name: scheme_name.clone(),
                })?;
            }

            report.affected += 1;
            if target == ApplicationStatus::Approved {
                approved += 1;
                info!(
                    application = %application.id.0,
                    tracking = application.tracking_id.as_deref().unwrap_or("-"),
                    "application auto-approved"
                );
            } else {
                info!(
                    application = %application.id.0,
                    tracking = application.tracking_id.as_deref().unwrap_or("-"),
                    "application moved to manual review"
                );
            }
        }

        ctx.stats.record_applications_processed(approved);
        Ok(report)
    }
}

/// Recomputes ranked eligible schemes for every profile and sends a digest
/// notification when the profile matches anything. The dispatcher's
/// idempotency key suppresses repeats until the match set changes.
pub struct EligibilityBroadcast;

impl ReconciliationJob for EligibilityBroadcast {
    fn name(&self) -> &'static str {
        "eligibility_broadcast"
    }

    fn run(&self, ctx: &JobContext) -> Result<TickReport, JobError> {
        let profiles = ctx.store.find_profiles(&ProfileFilter::default())?;

        let mut report = TickReport {
            scanned: profiles.len(),
            ..TickReport::default()
        };
        let mut checked = 0u64;

        for profile in profiles {
            let ranked = match ctx.engine.find_eligible_schemes(&profile) {
                Ok(ranked) => ranked,
                Err(err) if is_unavailable(&err) => return Err(err.into()),
                Err(err) => {
                    ctx.stats.record_error();
                    warn!(profile = %profile.id.0, error = %err, "eligibility scan failed");
                    continue;
                }
            };
            checked += 1;

            if ranked.is_empty() {
                continue;
            }
            let schemes = ranked
                .into_iter()
                .map(|entry| (entry.scheme.id, entry.scheme.name))
                .collect();
            if ctx
                .dispatcher
                .dispatch(NotificationEvent::SchemeMatch {
                    profile_id: profile.id.clone(),
                    schemes,
                })?
                .is_some()
            {
                report.affected += 1;
            }
        }

        ctx.stats.record_eligibility_checks(checked);
        Ok(report)
    }
}

/// Verifies pending documents that satisfy the verification policy, running
/// field extraction on each before flipping it to verified.
pub struct DocumentAutoVerification;

impl ReconciliationJob for DocumentAutoVerification {
    fn name(&self) -> &'static str {
        "document_auto_verification"
    }

    fn run(&self, ctx: &JobContext) -> Result<TickReport, JobError> {
        let pending = ctx.store.find_documents(&DocumentFilter::pending())?;

        let mut report = TickReport {
            scanned: pending.len(),
            ..TickReport::default()
        };
        let mut verified = 0u64;

        for mut document in pending {
            if !ctx.policy.auto_verifiable(&document) {
                continue;
            }

            // Extraction failure leaves the document pending for the next tick.
            match ctx.extractor.extract(&document) {
                Ok(fields) => document.fields = fields,
                Err(err) => {
                    ctx.stats.record_error();
                    warn!(document = %document.id.0, error = %err, "field extraction failed");
                    continue;
                }
            }

            document.mark_verified(Utc::now());
            match ctx.store.save_document(&document) {
                Ok(()) => {}
                Err(err) if is_unavailable(&err) => return Err(err.into()),
                Err(err) => {
                    ctx.stats.record_error();
                    warn!(document = %document.id.0, error = %err, "save failed");
                    continue;
                }
            }

            ctx.dispatcher.dispatch(NotificationEvent::DocumentVerified {
                profile_id: document.profile_id.clone(),
                document_id: document.id.clone(),
                document_name: document.name.clone(),
            })?;

            verified += 1;
            report.affected += 1;
            info!(document = %document.id.0, name = %document.name, "document auto-verified");
        }

        ctx.stats.record_documents_verified(verified);
        Ok(report)
    }
}

/// Purges notifications whose expiry has passed.
pub struct NotificationCleanup;

impl ReconciliationJob for NotificationCleanup {
    fn name(&self) -> &'static str {
        "notification_cleanup"
    }

    fn run(&self, ctx: &JobContext) -> Result<TickReport, JobError> {
        let deleted = ctx.store.delete_notifications_older_than(Utc::now())?;
        if deleted > 0 {
            info!(deleted, "expired notifications purged");
        }
        Ok(TickReport {
            scanned: deleted,
            affected: deleted,
        })
    }
}

/// Probes the store and records the result for the health endpoint.
pub struct HealthProbe;

impl ReconciliationJob for HealthProbe {
    fn name(&self) -> &'static str {
        "health_probe"
    }

    fn run(&self, ctx: &JobContext) -> Result<TickReport, JobError> {
        match ctx.store.counts() {
            Ok(counts) => {
                debug!(
                    profiles = counts.profiles,
                    schemes = counts.schemes,
                    applications = counts.applications,
                    "store healthy"
                );
                ctx.set_health(HealthStatus::Healthy { counts });
                Ok(TickReport::default())
            }
            Err(err) => {
                ctx.set_health(HealthStatus::Degraded {
                    reason: err.to_string(),
                });
                Err(err.into())
            }
        }
    }
}
