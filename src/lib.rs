//! Core engine for a government-scheme citizen portal: eligibility matching,
//! application lifecycle management, and the unattended reconciliation jobs
//! that keep applications, documents, and notifications moving without an
//! operator.

pub mod catalog;
pub mod config;
pub mod demo;
pub mod domain;
pub mod eligibility;
pub mod error;
pub mod lifecycle;
pub mod notify;
pub mod router;
pub mod scheduler;
pub mod store;
pub mod telemetry;
