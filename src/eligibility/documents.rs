//! Required-document checking. Scheme requirements carry a category resolved
//! once at load time; a requirement is satisfied only by a *verified*
//! document, matched by category or by a case-insensitive keyword scan of the
//! document name.

use crate::domain::{Document, DocumentRequirement};

/// Outcome of checking a profile's documents against scheme requirements.
#[derive(Debug, Clone, PartialEq)]
pub struct RequirementReport {
    pub satisfied: bool,
    pub missing: Vec<String>,
}

pub struct DocumentRequirementChecker;

impl DocumentRequirementChecker {
    /// Every requirement not covered by a verified document is reported back
    /// by its keyword so the caller can surface an actionable missing list.
    pub fn check(requirements: &[DocumentRequirement], documents: &[Document]) -> RequirementReport {
        let mut missing = Vec::new();
        for requirement in requirements {
            let covered = documents
                .iter()
                .any(|document| Self::satisfies(requirement, document));
            if !covered {
                missing.push(requirement.keyword.clone());
            }
        }

        RequirementReport {
            satisfied: missing.is_empty(),
            missing,
        }
    }

    fn satisfies(requirement: &DocumentRequirement, document: &Document) -> bool {
        if !document.verified {
            return false;
        }
        if requirement
            .category
            .map_or(false, |category| category == document.category)
        {
            return true;
        }
        document
            .name
            .to_lowercase()
            .contains(&requirement.keyword.to_lowercase())
    }
}
