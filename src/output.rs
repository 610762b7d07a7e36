//! Plain rendering of problem lists.
//!
//! `max_problems` limits what is rendered only; the totals printed alongside
//! are always computed from the full list.

use crate::problem::{Problem, Totals};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemFormat {
    #[default]
    Stylish,
    Json,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    pub format: ProblemFormat,
    pub max_problems: Option<usize>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    totals: Totals,
    problems: &'a [Problem],
    hidden: usize,
}

pub fn format_problems(problems: &[Problem], options: &FormatOptions) -> Result<String, serde_json::Error> {
    let totals = Totals::from_problems(problems);
    let shown = options
        .max_problems
        .map_or(problems.len(), |max| max.min(problems.len()));
    let hidden = problems.len() - shown;

    match options.format {
        ProblemFormat::Json => serde_json::to_string_pretty(&JsonReport {
            totals,
            problems: &problems[..shown],
            hidden,
        }),
        ProblemFormat::Stylish => {
            let mut out = String::new();
            for problem in &problems[..shown] {
                let location = problem
                    .location
                    .as_ref()
                    .map_or_else(|| "-".to_string(), ToString::to_string);
                let _ = writeln!(
                    out,
                    "{location}  {}  {}  {}",
                    problem.severity,
                    problem.rule_id.as_deref().unwrap_or("-"),
                    problem.message
                );
            }
            if hidden > 0 {
                let _ = writeln!(out, "... {hidden} more problem(s) not shown (max-problems: {shown})");
            }
            let _ = writeln!(
                out,
                "{} error(s), {} warning(s), {} ignored",
                totals.errors, totals.warnings, totals.ignored
            );
            Ok(out)
        }
    }
}
