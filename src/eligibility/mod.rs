//! Eligibility matching: criteria gates, document requirements, and the
//! engine that composes them into ranked scheme results.

pub mod criteria;
pub mod documents;
mod score;

#[cfg(test)]
mod tests;

pub use criteria::CriteriaReport;
pub use documents::{DocumentRequirementChecker, RequirementReport};

use std::sync::Arc;

use serde::Serialize;

use crate::domain::{Application, Document, Profile, Scheme};
use crate::store::{DocumentFilter, RecordStore, SchemeFilter, StoreError};

/// Full evaluation of one profile against one scheme.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemeEvaluation {
    pub eligible: bool,
    pub reasons: Vec<String>,
    pub missing_documents: Vec<String>,
    pub score: u8,
}

/// A scheme the profile qualifies for, carrying its ranking score.
#[derive(Debug, Clone, Serialize)]
pub struct RankedScheme {
    pub scheme: Scheme,
    pub score: u8,
}

/// Composes the criteria evaluator and the document checker over the record
/// store, adding the ranking score.
pub struct EligibilityEngine {
    store: Arc<dyn RecordStore>,
}

impl EligibilityEngine {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Pure composition step: no store access, usable against any snapshot of
    /// documents the caller already holds.
    pub fn evaluate_scheme(
        &self,
        profile: &Profile,
        scheme: &Scheme,
        documents: &[Document],
    ) -> SchemeEvaluation {
        let criteria = criteria::evaluate(profile, &scheme.criteria);
        let requirements =
            DocumentRequirementChecker::check(&scheme.required_documents, documents);
        let score = score::rank_score(profile, scheme, criteria.eligible, requirements.satisfied);

        SchemeEvaluation {
            eligible: criteria.eligible && requirements.satisfied,
            reasons: criteria.reasons,
            missing_documents: requirements.missing,
            score,
        }
    }

    /// All active schemes the profile qualifies for, ranked by score with
    /// ties broken by scheme recency (newest first).
    pub fn find_eligible_schemes(
        &self,
        profile: &Profile,
    ) -> Result<Vec<RankedScheme>, StoreError> {
        let schemes = self.store.find_schemes(&SchemeFilter::active())?;
        let documents = self
            .store
            .find_documents(&DocumentFilter::for_profile(profile.id.clone()))?;

        let mut ranked = Vec::new();
        for scheme in schemes {
            let evaluation = self.evaluate_scheme(profile, &scheme, &documents);
            if evaluation.eligible {
                ranked.push(RankedScheme {
                    score: evaluation.score,
                    scheme,
                });
            }
        }
        ranked.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then(b.scheme.created_at.cmp(&a.scheme.created_at))
        });

        Ok(ranked)
    }

    /// Re-run the same gates for the scheme tied to a specific application.
    /// Used by the auto-approval job.
    pub fn is_eligible(
        &self,
        profile: &Profile,
        application: &Application,
    ) -> Result<bool, StoreError> {
        let scheme = self
            .store
            .find_schemes(&SchemeFilter::by_id(application.scheme_id.clone()))?
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound)?;
        let documents = self
            .store
            .find_documents(&DocumentFilter::for_profile(profile.id.clone()))?;

        Ok(self.evaluate_scheme(profile, &scheme, &documents).eligible)
    }
}
