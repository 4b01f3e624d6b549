//! Background reconciliation: a set of periodic jobs that advance stale
//! applications, broadcast eligibility matches, auto-verify documents, purge
//! expired notifications, and probe store health.
//!
//! Each job runs on its own sequential tick loop, so a single job is never
//! re-entered; a tick that overruns its interval simply skips the missed
//! firings instead of stacking up.

pub mod jobs;


use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::config::SchedulerConfig;
use crate::eligibility::EligibilityEngine;
use crate::lifecycle::TransitionError;
use crate::notify::NotificationDispatcher;
use crate::store::{DocumentTextExtractor, RecordCounts, RecordStore, StoreError};

pub use jobs::VerificationPolicy;

/// Failure of one job tick. A failed tick is logged and counted; the loop
/// keeps running.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// What one successful tick looked at and touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub scanned: usize,
    pub affected: usize,
}

/// One periodic reconciliation task.
pub trait ReconciliationJob: Send + Sync {
    fn name(&self) -> &'static str;
    fn run(&self, ctx: &JobContext) -> Result<TickReport, JobError>;
}

/// Monotonic counters shared by all jobs. Reset only by process restart.
#[derive(Debug, Default)]
pub struct SchedulerStats {
    applications_processed: AtomicU64,
    eligibility_checks: AtomicU64,
    documents_verified: AtomicU64,
    errors: AtomicU64,
}

impl SchedulerStats {
    pub fn record_applications_processed(&self, n: u64) {
        self.applications_processed.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_eligibility_checks(&self, n: u64) {
        self.eligibility_checks.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_documents_verified(&self, n: u64) {
        self.documents_verified.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

/// Point-in-time view of the counters, served by the stats endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub applications_processed: u64,
    pub eligibility_checks: u64,
    pub documents_verified: u64,
    pub notifications_sent: u64,
    pub errors: u64,
}

/// Last known health of the backing store, maintained by the health probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy { counts: RecordCounts },
    Degraded { reason: String },
    /// No probe has completed yet.
    Unknown,
}

/// Everything a job needs to do its work. Cheap to clone; all fields are
/// shared handles.
#[derive(Clone)]
pub struct JobContext {
    pub store: Arc<dyn RecordStore>,
    pub extractor: Arc<dyn DocumentTextExtractor>,
    pub engine: Arc<EligibilityEngine>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub stats: Arc<SchedulerStats>,
    pub policy: Arc<VerificationPolicy>,
    /// Submitted applications younger than this are left alone.
    pub grace_period: chrono::Duration,
    pub health: Arc<Mutex<HealthStatus>>,
}

impl JobContext {
    pub fn set_health(&self, status: HealthStatus) {
        *self.health.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }

    pub fn health(&self) -> HealthStatus {
        self.health
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

struct JobSpec {
    interval: Duration,
    job: Arc<dyn ReconciliationJob>,
}

/// Owns the job registry and the spawned tick loops.
pub struct ReconciliationScheduler {
    ctx: JobContext,
    jobs: Vec<JobSpec>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    running: AtomicBool,
}

impl ReconciliationScheduler {
    /// Build a scheduler with the five standard jobs at their configured
    /// intervals.
    pub fn new(ctx: JobContext, config: &SchedulerConfig) -> Self {
        let mut scheduler = Self {
            ctx,
            jobs: Vec::new(),
            handles: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
        };
        scheduler.register(
            config.application_processing_interval,
            Arc::new(jobs::ApplicationAutoProcessing),
        );
        scheduler.register(
            config.eligibility_check_interval,
            Arc::new(jobs::EligibilityBroadcast),
        );
        scheduler.register(
            config.document_verification_interval,
            Arc::new(jobs::DocumentAutoVerification),
        );
        scheduler.register(
            config.notification_cleanup_interval,
            Arc::new(jobs::NotificationCleanup),
        );
        scheduler.register(config.health_check_interval, Arc::new(jobs::HealthProbe));
        scheduler
    }

    /// Add a job to the registry. Has no effect on loops already started.
    pub fn register(&mut self, interval: Duration, job: Arc<dyn ReconciliationJob>) {
        self.jobs.push(JobSpec { interval, job });
    }

    /// Spawn one tick loop per registered job. Calling twice is a no-op.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("scheduler already running");
            return;
        }

        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        for spec in &self.jobs {
            let job = Arc::clone(&spec.job);
            let ctx = self.ctx.clone();
            let period = spec.interval;
            info!(job = job.name(), period_secs = period.as_secs(), "job scheduled");
            handles.push(tokio::spawn(async move {
                // First firing waits one full period, then ticks steadily;
                // overruns skip rather than burst.
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    run_tick(job.as_ref(), &ctx);
                }
            }));
        }
    }

    /// Abort every tick loop. Idempotent; safe to call before `start`.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        for handle in handles.drain(..) {
            handle.abort();
        }
        info!("scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> StatsSnapshot {
        let stats = &self.ctx.stats;
        StatsSnapshot {
            applications_processed: stats.applications_processed.load(Ordering::Relaxed),
            eligibility_checks: stats.eligibility_checks.load(Ordering::Relaxed),
            documents_verified: stats.documents_verified.load(Ordering::Relaxed),
            notifications_sent: self.ctx.dispatcher.sent(),
            errors: stats.errors.load(Ordering::Relaxed),
        }
    }

    pub fn health(&self) -> HealthStatus {
        self.ctx.health()
    }
}

impl Drop for ReconciliationScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Run one tick, translating the outcome into counters and logs.
fn run_tick(job: &dyn ReconciliationJob, ctx: &JobContext) {
    match job.run(ctx) {
        Ok(report) => {
            debug!(
                job = job.name(),
                scanned = report.scanned,
                affected = report.affected,
                "tick complete"
            );
        }
        Err(err) => {
            ctx.stats.record_error();
            error!(job = job.name(), error = %err, "tick failed");
        }
    }
}
