//! Gate evaluation for scheme criteria. Every gate is an independent AND-ed
//! condition; any failing gate makes the profile ineligible and contributes a
//! reason string.

use crate::domain::{Profile, SchemeCriteria};

/// Outcome of evaluating one profile against one scheme's criteria.
#[derive(Debug, Clone, PartialEq)]
pub struct CriteriaReport {
    pub eligible: bool,
    pub reasons: Vec<String>,
}

const UNRESTRICTED: &str = "All";

fn unrestricted(values: &[String]) -> bool {
    values.is_empty() || values.iter().any(|value| value.eq_ignore_ascii_case(UNRESTRICTED))
}

/// Parse a rupee amount out of free text. Understands "LPA"/"lakh" units so a
/// ceiling like "Below 2 LPA" compares against a plain figure like "150000".
/// Returns `None` when no digits are present; callers skip the gate in that
/// case, staying lenient on missing data.
pub(crate) fn parse_income(text: &str) -> Option<u64> {
    let lowered = text.to_lowercase();

    let mut number = String::new();
    for ch in lowered.chars() {
        if ch.is_ascii_digit() {
            number.push(ch);
        } else if ch == '.' && !number.is_empty() && !number.contains('.') {
            number.push('.');
        } else if !number.is_empty() {
            break;
        }
    }
    let value: f64 = number.trim_end_matches('.').parse().ok()?;

    let multiplier = if lowered.contains("lpa") || lowered.contains("lakh") {
        100_000.0
    } else if lowered.contains("crore") {
        10_000_000.0
    } else {
        1.0
    };

    Some((value * multiplier).round() as u64)
}

/// Evaluate a profile against scheme criteria. Deterministic and pure.
pub fn evaluate(profile: &Profile, criteria: &SchemeCriteria) -> CriteriaReport {
    let mut reasons = Vec::new();

    if let Some(age) = profile.age {
        if let Some(min_age) = criteria.min_age {
            if age < min_age {
                reasons.push(format!("age {age} below scheme minimum {min_age}"));
            }
        }
        if let Some(max_age) = criteria.max_age {
            if age > max_age {
                reasons.push(format!("age {age} above scheme maximum {max_age}"));
            }
        }
    }

    let ceiling = criteria.income_ceiling.as_deref().and_then(parse_income);
    let income = profile.annual_income.as_deref().and_then(parse_income);
    if let (Some(ceiling), Some(income)) = (ceiling, income) {
        if income > ceiling {
            reasons.push(format!("income {income} above scheme ceiling {ceiling}"));
        }
    }

    if !unrestricted(&criteria.categories) {
        let matched = profile.category.as_deref().map_or(false, |category| {
            criteria
                .categories
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(category))
        });
        if !matched {
            reasons.push(format!(
                "category {} not in allowed list [{}]",
                profile.category.as_deref().unwrap_or("unspecified"),
                criteria.categories.join(", ")
            ));
        }
    }

    if let Some(required_gender) = criteria
        .gender
        .as_deref()
        .filter(|gender| !gender.eq_ignore_ascii_case(UNRESTRICTED))
    {
        let matched = profile
            .gender
            .as_deref()
            .map_or(false, |gender| gender.eq_ignore_ascii_case(required_gender));
        if !matched {
            reasons.push(format!("scheme restricted to {required_gender}"));
        }
    }

    if !criteria.states.is_empty() {
        let matched = profile.state.as_deref().map_or(false, |state| {
            criteria
                .states
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(state))
        });
        if !matched {
            reasons.push(format!(
                "state {} outside scheme coverage",
                profile.state.as_deref().unwrap_or("unspecified")
            ));
        }
    }

    CriteriaReport {
        eligible: reasons.is_empty(),
        reasons,
    }
}
