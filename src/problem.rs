//! Problems reported while resolving, bundling and walking documents.
//!
//! Every recoverable issue becomes a [`Problem`]; [`Totals`] counts them by
//! severity and is additive across entrypoints.

use crate::location::Location;
use serde::Serialize;
use std::ops::AddAssign;

/// Rule id used for refs whose target cannot be found or loaded.
pub const NO_UNRESOLVED_REFS: &str = "no-unresolved-refs";
/// Rule id used when a circular ref has to be cut in text output.
pub const NO_CIRCULAR_REFS: &str = "no-circular-refs";
/// Rule id used when bundling renames a component to avoid a collision.
pub const BUNDLE_NAME_COLLISION: &str = "bundle-name-collision";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    /// Suppressed by an ignore entry. Counted, never actionable.
    Ignored,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Ignored => write!(f, "ignored"),
        }
    }
}

/// Where a problem was found, detached from the loaded source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProblemLocation {
    pub source: String,
    pub pointer: String,
}

impl From<&Location> for ProblemLocation {
    fn from(location: &Location) -> Self {
        Self {
            source: location.source.absolute_ref.clone(),
            pointer: location.pointer.clone(),
        }
    }
}

impl std::fmt::Display for ProblemLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.source, self.pointer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub message: String,
    pub location: Option<ProblemLocation>,
    pub severity: Severity,
    pub rule_id: Option<String>,
}

impl Problem {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            severity,
            rule_id: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn with_location(mut self, location: &Location) -> Self {
        self.location = Some(ProblemLocation::from(location));
        self
    }

    pub fn with_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    pub fn is_rule(&self, rule_id: &str) -> bool {
        self.rule_id.as_deref() == Some(rule_id)
    }
}

/// Whether suppressed problems count against the pass/fail gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IgnoredPolicy {
    #[default]
    Exclude,
    CountAsErrors,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub errors: usize,
    pub warnings: usize,
    pub ignored: usize,
}

impl Totals {
    pub fn from_problems(problems: &[Problem]) -> Self {
        let mut totals = Totals::default();
        for problem in problems {
            match problem.severity {
                Severity::Error => totals.errors += 1,
                Severity::Warning => totals.warnings += 1,
                Severity::Ignored => totals.ignored += 1,
            }
        }
        totals
    }

    pub fn gate_errors(&self, policy: IgnoredPolicy) -> usize {
        match policy {
            IgnoredPolicy::Exclude => self.errors,
            IgnoredPolicy::CountAsErrors => self.errors + self.ignored,
        }
    }

    pub fn is_failing(&self, policy: IgnoredPolicy) -> bool {
        self.gate_errors(policy) > 0
    }
}

impl AddAssign for Totals {
    fn add_assign(&mut self, other: Totals) {
        self.errors += other.errors;
        self.warnings += other.warnings;
        self.ignored += other.ignored;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_builder() {
        let problem = Problem::warning("renamed").with_rule(BUNDLE_NAME_COLLISION);
        assert_eq!(problem.severity, Severity::Warning);
        assert!(problem.is_rule(BUNDLE_NAME_COLLISION));
        assert!(problem.location.is_none());
    }

    #[test]
    fn test_totals_from_problems() {
        let problems = vec![
            Problem::error("a"),
            Problem::error("b"),
            Problem::warning("c"),
            Problem::new(Severity::Ignored, "d"),
        ];
        let totals = Totals::from_problems(&problems);
        assert_eq!(totals, Totals { errors: 2, warnings: 1, ignored: 1 });
    }

    #[test]
    fn test_totals_add_assign() {
        let mut totals = Totals { errors: 1, warnings: 2, ignored: 0 };
        totals += Totals { errors: 3, warnings: 0, ignored: 4 };
        assert_eq!(totals, Totals { errors: 4, warnings: 2, ignored: 4 });
    }

    #[test]
    fn test_ignored_policy() {
        let totals = Totals { errors: 0, warnings: 0, ignored: 2 };
        assert!(!totals.is_failing(IgnoredPolicy::Exclude));
        assert!(totals.is_failing(IgnoredPolicy::CountAsErrors));
    }

    #[test]
    fn test_problem_serializes_camel_case() {
        let json = serde_json::to_value(Problem::error("broken").with_rule(NO_UNRESOLVED_REFS)).unwrap();
        assert_eq!(json["ruleId"], "no-unresolved-refs");
        assert_eq!(json["severity"], "error");
    }
}
