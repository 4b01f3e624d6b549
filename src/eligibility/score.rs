//! Ranking score for eligible schemes. The score orders results for display;
//! it never gates eligibility, which is binary from the criteria and document
//! checks.

use super::criteria::parse_income;
use crate::domain::{Profile, Scheme};

const DOCUMENTS_WEIGHT: u8 = 40;
const CRITERIA_WEIGHT: u8 = 30;
const CATEGORY_EXACT_WEIGHT: u8 = 20;
const CATEGORY_PARTIAL_WEIGHT: u8 = 10;
const INCOME_FIT_WEIGHT: u8 = 10;

pub(crate) fn rank_score(
    profile: &Profile,
    scheme: &Scheme,
    criteria_pass: bool,
    documents_complete: bool,
) -> u8 {
    let mut score = 0;

    if documents_complete {
        score += DOCUMENTS_WEIGHT;
    }
    if criteria_pass {
        score += CRITERIA_WEIGHT;
    }

    // Full credit when the profile's category is in the scheme's allowed
    // list; half credit when both sides declare a category but they differ.
    let restricted: Vec<&String> = scheme
        .criteria
        .categories
        .iter()
        .filter(|category| !category.eq_ignore_ascii_case("All"))
        .collect();
    if let Some(category) = profile.category.as_deref() {
        if restricted
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(category))
        {
            score += CATEGORY_EXACT_WEIGHT;
        } else if !restricted.is_empty() {
            score += CATEGORY_PARTIAL_WEIGHT;
        }
    }

    let ceiling = scheme
        .criteria
        .income_ceiling
        .as_deref()
        .and_then(parse_income);
    let income = profile.annual_income.as_deref().and_then(parse_income);
    if let (Some(ceiling), Some(income)) = (ceiling, income) {
        if income <= ceiling {
            score += INCOME_FIT_WEIGHT;
        }
    }

    score
}
