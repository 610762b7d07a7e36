//! Runs lint and bundle over a batch of entrypoints.
//!
//! Each entrypoint produces its own outcome. A fatal error on one (the
//! entrypoint cannot be loaded) is recorded and the batch moves on.

use crate::bundler::{bundle_document, BundleResult};
use crate::config::Config;
use crate::error::BundleError;
use crate::loader::absolute_identity;
use crate::problem::{IgnoredPolicy, Problem, Totals};
use crate::resolver::RefResolver;
use crate::serialization::OutputFormat;
use crate::source::SourceCache;
use crate::walk::{lint_document, VisitorSet};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Run the diagnostic walk before bundling.
    pub lint: bool,
    /// Emit output even when the bundle has errors.
    pub force: bool,
    pub output_format: OutputFormat,
}

#[derive(Debug, Clone)]
pub struct EntrypointReport {
    pub entrypoint: String,
    pub lint_problems: Vec<Problem>,
    pub bundle: BundleResult,
    /// Lint and bundle problems together.
    pub totals: Totals,
    /// Serialized output, `None` when withheld because of errors.
    pub output: Option<String>,
}

#[derive(Debug)]
pub struct EntrypointOutcome {
    pub entrypoint: String,
    pub result: Result<EntrypointReport, BundleError>,
}

#[derive(Debug)]
pub struct BatchReport {
    pub outcomes: Vec<EntrypointOutcome>,
    pub totals: Totals,
    /// Skip-list names that matched no visitor.
    pub unused_skips: Vec<String>,
    pub ignored_policy: IgnoredPolicy,
}

impl BatchReport {
    pub fn failed_entrypoints(&self) -> impl Iterator<Item = &EntrypointOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.result.is_err())
    }

    pub fn is_failing(&self) -> bool {
        self.failed_entrypoints().next().is_some() || self.totals.is_failing(self.ignored_policy)
    }

    /// `force` overrides problem errors, never an entrypoint that failed to load.
    pub fn exit_code(&self, force: bool) -> i32 {
        if self.failed_entrypoints().next().is_some() {
            return 1;
        }
        if force || !self.totals.is_failing(self.ignored_policy) {
            0
        } else {
            1
        }
    }
}

pub fn run<S: AsRef<str>>(
    entrypoints: &[S],
    config: &Config,
    cache: &SourceCache,
    visitors: &mut VisitorSet,
    options: &RunOptions,
) -> BatchReport {
    if options.lint && config.lint.recommended_fallback() {
        log::info!("no rules configured, using the recommended set");
    }

    let mut totals = Totals::default();
    let mut outcomes = Vec::with_capacity(entrypoints.len());
    for entrypoint in entrypoints {
        let entrypoint = entrypoint.as_ref();
        let result = run_one(entrypoint, config, cache, visitors, options);
        match &result {
            Ok(report) => totals += report.totals,
            Err(err) => log::warn!("{entrypoint}: {err}"),
        }
        outcomes.push(EntrypointOutcome {
            entrypoint: entrypoint.to_string(),
            result,
        });
    }

    let unused_skips = if options.lint {
        config.lint.unused_skips(visitors)
    } else {
        Vec::new()
    };
    for name in &unused_skips {
        log::warn!("skip entry {name} did not match any rule, preprocessor or decorator");
    }

    BatchReport {
        outcomes,
        totals,
        unused_skips,
        ignored_policy: config.ignored_policy,
    }
}

fn run_one(
    entrypoint: &str,
    config: &Config,
    cache: &SourceCache,
    visitors: &mut VisitorSet,
    options: &RunOptions,
) -> Result<EntrypointReport, BundleError> {
    let root = cache.load(&absolute_identity(entrypoint)?)?;

    let lint_problems = if options.lint {
        let mut resolver = RefResolver::new(cache);
        lint_document(&mut resolver, Arc::clone(&root), visitors, &config.lint)
    } else {
        Vec::new()
    };

    let mut resolver = RefResolver::new(cache);
    let mut bundle = bundle_document(&mut resolver, root, &config.bundle);
    config.lint.apply_ignores(&mut bundle.problems);

    let mut totals = Totals::from_problems(&lint_problems);
    totals += bundle.totals();

    let bundle_errors = bundle.totals().errors;
    let output = if bundle_errors == 0 || options.force {
        Some(bundle.document.dump(options.output_format)?)
    } else {
        log::warn!("{entrypoint}: output withheld, bundle has {bundle_errors} error(s)");
        None
    };

    Ok(EntrypointReport {
        entrypoint: entrypoint.to_string(),
        lint_problems,
        bundle,
        totals,
        output,
    })
}
