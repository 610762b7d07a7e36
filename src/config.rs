//! Run configuration.
//!
//! ```yaml
//! lint:
//!   rules:
//!     no-unresolved-refs: warn
//!   skipRules: [operation-summary]
//!   ignore:
//!     - source: openapi.yaml
//!       pointer: "#/paths/~1legacy"
//!       rule: no-unresolved-refs
//! bundle:
//!   defaultComponentKind: schemas
//! ignoredPolicy: exclude
//! ```

use crate::bundler::BundleOptions;
use crate::error::ConfigError;
use crate::loader::absolute_identity;
use crate::pointer::{is_absolute_url, resolve_uri};
use crate::problem::{IgnoredPolicy, Problem, Severity, NO_UNRESOLVED_REFS};
use crate::walk::{VisitorKind, VisitorSet};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Config {
    pub lint: LintConfig,
    pub bundle: BundleOptions,
    pub ignored_policy: IgnoredPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSeverity {
    Error,
    Warn,
    Off,
}

/// A problem to downgrade to `ignored`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IgnoreEntry {
    pub source: String,
    pub pointer: String,
    pub rule: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct LintConfig {
    pub rules: IndexMap<String, RuleSeverity>,
    pub skip_rules: Vec<String>,
    pub skip_preprocessors: Vec<String>,
    pub skip_decorators: Vec<String>,
    pub ignore: Vec<IgnoreEntry>,
}

impl Config {
    /// Parses a YAML configuration document.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` if the document is malformed or has unknown keys.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| ConfigError::Invalid {
            reason: e.to_string(),
        })
    }

    /// Reads a configuration file. Relative ignore sources are resolved
    /// against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut config = Self::from_yaml_str(&text)?;

        let config_ref = absolute_identity(&path.to_string_lossy()).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        for entry in &mut config.lint.ignore {
            if !is_absolute_url(&entry.source) && !Path::new(&entry.source).is_absolute() {
                entry.source = resolve_uri(&config_ref, &entry.source);
            }
        }
        log::debug!("loaded config from {config_ref}");
        Ok(config)
    }
}

impl LintConfig {
    pub fn skip_rules<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_rules.extend(names.into_iter().map(Into::into));
    }

    pub fn skip_preprocessors<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_preprocessors.extend(names.into_iter().map(Into::into));
    }

    pub fn skip_decorators<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_decorators.extend(names.into_iter().map(Into::into));
    }

    /// `true` when no rules were configured and the recommended set applies.
    pub fn recommended_fallback(&self) -> bool {
        self.rules.is_empty()
    }

    fn skip_list(&self, kind: VisitorKind) -> &[String] {
        match kind {
            VisitorKind::Preprocessor => &self.skip_preprocessors,
            VisitorKind::Rule => &self.skip_rules,
            VisitorKind::Decorator => &self.skip_decorators,
        }
    }

    pub fn is_skipped(&self, kind: VisitorKind, name: &str) -> bool {
        self.skip_list(kind).iter().any(|skipped| skipped == name)
    }

    /// Effective severity of a rule, or `None` when it is turned off.
    pub fn rule_severity(&self, name: &str, default: Severity) -> Option<Severity> {
        match self.rules.get(name) {
            Some(RuleSeverity::Error) => Some(Severity::Error),
            Some(RuleSeverity::Warn) => Some(Severity::Warning),
            Some(RuleSeverity::Off) => None,
            None => Some(default),
        }
    }

    /// Downgrades problems matched by an ignore entry to `Severity::Ignored`.
    pub fn apply_ignores(&self, problems: &mut [Problem]) {
        if self.ignore.is_empty() {
            return;
        }
        for problem in problems.iter_mut() {
            let (Some(location), Some(rule)) = (&problem.location, &problem.rule_id) else {
                continue;
            };
            let ignored = self.ignore.iter().any(|entry| {
                &entry.rule == rule && entry.source == location.source && entry.pointer == location.pointer
            });
            if ignored {
                problem.severity = Severity::Ignored;
            }
        }
    }

    /// Skip-list names that match no registered visitor.
    pub fn unused_skips(&self, visitors: &VisitorSet) -> Vec<String> {
        let mut unused = Vec::new();
        for kind in [VisitorKind::Preprocessor, VisitorKind::Rule, VisitorKind::Decorator] {
            for skipped in self.skip_list(kind) {
                let known = visitors.names(kind).any(|name| name == skipped)
                    || (kind == VisitorKind::Rule && skipped == NO_UNRESOLVED_REFS);
                if !known {
                    unused.push(skipped.clone());
                }
            }
        }
        unused
    }
}
