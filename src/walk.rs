//! Depth-first walk of the resolved graph that drives diagnostic visitors.
//!
//! Every distinct location is visited once. Refs are followed into their
//! targets unless the target is still being walked (a circular edge), in
//! which case that edge is not descended again.

use crate::config::LintConfig;
use crate::location::Location;
use crate::node::Node;
use crate::problem::{Problem, Severity, NO_UNRESOLVED_REFS};
use crate::resolver::RefResolver;
use crate::source::Source;
use std::collections::HashSet;
use std::sync::Arc;

/// A pluggable check run on every visited node.
pub trait Visitor {
    fn name(&self) -> &str;

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn visit(&mut self, node: &Node, ctx: &mut VisitContext<'_>);
}

/// What a visitor sees besides the node itself.
pub struct VisitContext<'a> {
    pub location: &'a Location,
    visitor: &'a str,
    severity: Severity,
    problems: &'a mut Vec<Problem>,
}

impl VisitContext<'_> {
    /// Reports a problem at the node being visited.
    pub fn report(&mut self, message: impl Into<String>) {
        let location = self.location;
        self.report_at(location, message);
    }

    pub fn report_at(&mut self, location: &Location, message: impl Into<String>) {
        self.problems.push(
            Problem::new(self.severity, message)
                .with_location(location)
                .with_rule(self.visitor),
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitorKind {
    Preprocessor,
    Rule,
    Decorator,
}

/// Visitors by category. Within a node, preprocessors run first, then
/// rules, then decorators, each in registration order.
#[derive(Default)]
pub struct VisitorSet {
    pub preprocessors: Vec<Box<dyn Visitor>>,
    pub rules: Vec<Box<dyn Visitor>>,
    pub decorators: Vec<Box<dyn Visitor>>,
}

impl VisitorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The set used when no rules are configured. Unresolved refs are
    /// checked by the walk itself under `no-unresolved-refs`.
    pub fn recommended() -> Self {
        Self::new()
    }

    pub fn with_preprocessor(mut self, visitor: impl Visitor + 'static) -> Self {
        self.preprocessors.push(Box::new(visitor));
        self
    }

    pub fn with_rule(mut self, visitor: impl Visitor + 'static) -> Self {
        self.rules.push(Box::new(visitor));
        self
    }

    pub fn with_decorator(mut self, visitor: impl Visitor + 'static) -> Self {
        self.decorators.push(Box::new(visitor));
        self
    }

    pub fn of_kind(&self, kind: VisitorKind) -> &[Box<dyn Visitor>] {
        match kind {
            VisitorKind::Preprocessor => &self.preprocessors,
            VisitorKind::Rule => &self.rules,
            VisitorKind::Decorator => &self.decorators,
        }
    }

    fn get_mut(&mut self, kind: VisitorKind, index: usize) -> &mut dyn Visitor {
        let list = match kind {
            VisitorKind::Preprocessor => &mut self.preprocessors,
            VisitorKind::Rule => &mut self.rules,
            VisitorKind::Decorator => &mut self.decorators,
        };
        list[index].as_mut()
    }

    pub fn names(&self, kind: VisitorKind) -> impl Iterator<Item = &str> {
        self.of_kind(kind).iter().map(|visitor| visitor.name())
    }
}

struct ActiveVisitor {
    kind: VisitorKind,
    index: usize,
    name: String,
    severity: Severity,
}

/// Computes the active visitors once, before the walk: skip-lists and
/// rules turned `off` are removed entirely.
fn activate(visitors: &VisitorSet, config: &LintConfig) -> Vec<ActiveVisitor> {
    let mut active = Vec::new();
    for kind in [VisitorKind::Preprocessor, VisitorKind::Rule, VisitorKind::Decorator] {
        for (index, visitor) in visitors.of_kind(kind).iter().enumerate() {
            let name = visitor.name();
            if config.is_skipped(kind, name) {
                log::debug!("skipping {kind:?} {name}");
                continue;
            }
            let severity = match kind {
                VisitorKind::Rule => match config.rule_severity(name, visitor.default_severity()) {
                    Some(severity) => severity,
                    None => continue,
                },
                _ => visitor.default_severity(),
            };
            active.push(ActiveVisitor {
                kind,
                index,
                name: name.to_string(),
                severity,
            });
        }
    }
    active
}

/// Walks `root` and everything reachable from it, returning the problems
/// reported by the active visitors and by the walk itself.
pub fn lint_document(
    resolver: &mut RefResolver<'_>,
    root: Arc<Source>,
    visitors: &mut VisitorSet,
    config: &LintConfig,
) -> Vec<Problem> {
    let active = activate(visitors, config);
    let unresolved_severity = if config.is_skipped(VisitorKind::Rule, NO_UNRESOLVED_REFS) {
        None
    } else {
        config.rule_severity(NO_UNRESOLVED_REFS, Severity::Error)
    };

    let mut walker = Walker {
        resolver,
        visitors,
        active,
        unresolved_severity,
        visited: HashSet::new(),
        problems: Vec::new(),
    };
    walker.visit(&root.root, &Location::root(Arc::clone(&root)));

    let mut problems = walker.problems;
    config.apply_ignores(&mut problems);
    problems
}

struct Walker<'w, 'r, 'c> {
    resolver: &'r mut RefResolver<'c>,
    visitors: &'w mut VisitorSet,
    active: Vec<ActiveVisitor>,
    unresolved_severity: Option<Severity>,
    visited: HashSet<String>,
    problems: Vec<Problem>,
}

impl Walker<'_, '_, '_> {
    fn visit(&mut self, node: &Node, location: &Location) {
        let here = location.absolute_pointer();
        if !self.visited.insert(here.clone()) {
            return;
        }

        for active in &self.active {
            let mut ctx = VisitContext {
                location,
                visitor: &active.name,
                severity: active.severity,
                problems: &mut self.problems,
            };
            self.visitors
                .get_mut(active.kind, active.index)
                .visit(node, &mut ctx);
        }

        match node {
            Node::Ref(reference) => self.follow(reference, location),
            Node::Mapping(map) => {
                self.resolver.enter(&here);
                for (key, value) in map {
                    self.visit(value, &location.child([key]));
                }
                self.resolver.leave(&here);
            }
            Node::Sequence(items) => {
                self.resolver.enter(&here);
                for (index, item) in items.iter().enumerate() {
                    self.visit(item, &location.child([index.to_string()]));
                }
                self.resolver.leave(&here);
            }
            Node::Scalar(_) => {}
        }
    }

    fn follow(&mut self, reference: &str, location: &Location) {
        match self.resolver.resolve(reference, location) {
            Ok(target) => {
                let key = target.location.absolute_pointer();
                if self.resolver.is_in_progress(&key) || target.content.is_ref() {
                    log::trace!("not descending circular ref {reference} at {location}");
                    return;
                }
                self.visit(&target.content, &target.location);
            }
            Err(err) => {
                if let Some(severity) = self.unresolved_severity {
                    let mut problem = err.into_problem(location);
                    problem.severity = severity;
                    self.problems.push(problem);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleSeverity;
    use crate::loader::MemoryLoader;
    use crate::source::SourceCache;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records the pointers it sees and flags every `type: any`.
    struct Recorder {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Visitor for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn default_severity(&self) -> Severity {
            Severity::Warning
        }

        fn visit(&mut self, node: &Node, ctx: &mut VisitContext<'_>) {
            self.log
                .borrow_mut()
                .push(format!("{}:{}", self.name, ctx.location.pointer));
            if node.child("type").and_then(Node::as_str) == Some("any") {
                ctx.report("`any` is not a type");
            }
        }
    }

    fn lint(text: &str, visitors: &mut VisitorSet, config: &LintConfig) -> Vec<Problem> {
        let cache = SourceCache::new(MemoryLoader::new().with_document("/api.yaml", text));
        let root = cache.load("/api.yaml").unwrap();
        let mut resolver = RefResolver::new(&cache);
        lint_document(&mut resolver, root, visitors, config)
    }

    fn recorder(name: &'static str, log: &Rc<RefCell<Vec<String>>>) -> Recorder {
        Recorder {
            name,
            log: Rc::clone(log),
        }
    }

    #[test]
    fn test_visit_order_per_node() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut visitors = VisitorSet::new()
            .with_decorator(recorder("decorator", &log))
            .with_rule(recorder("rule", &log))
            .with_preprocessor(recorder("pre", &log));

        lint("a: 1", &mut visitors, &LintConfig::default());
        assert_eq!(
            log.borrow()[..3],
            ["pre:#/".to_string(), "rule:#/".to_string(), "decorator:#/".to_string()]
        );
    }

    #[test]
    fn test_each_location_visited_once() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut visitors = VisitorSet::new().with_rule(recorder("rule", &log));

        lint(
            "a: {$ref: '#/defs/X'}\nb: {$ref: '#/defs/X'}\ndefs:\n  X: {type: string}",
            &mut visitors,
            &LintConfig::default(),
        );
        let seen = log.borrow();
        assert_eq!(seen.iter().filter(|p| *p == "rule:#/defs/X").count(), 1);
        assert_eq!(seen.iter().filter(|p| *p == "rule:#/defs/X/type").count(), 1);
    }

    #[test]
    fn test_circular_graph_terminates() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut visitors = VisitorSet::new().with_rule(recorder("rule", &log));

        let problems = lint(
            "Node:\n  properties:\n    next: {$ref: '#/Node'}\nloop: {$ref: '#/loop'}",
            &mut visitors,
            &LintConfig::default(),
        );
        assert!(problems.is_empty());
        assert!(log.borrow().contains(&"rule:#/Node/properties/next".to_string()));
    }

    #[test]
    fn test_skipped_visitors_do_not_run() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut visitors = VisitorSet::new()
            .with_rule(recorder("no-any", &log))
            .with_decorator(recorder("decorator", &log));
        let mut config = LintConfig::default();
        config.skip_rules(["no-any"]);
        config.skip_decorators(["decorator"]);

        let problems = lint("type: any", &mut visitors, &config);
        assert!(problems.is_empty());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_rule_severity_override() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut visitors = VisitorSet::new().with_rule(recorder("no-any", &log));
        let mut config = LintConfig::default();
        config.rules.insert("no-any".to_string(), RuleSeverity::Error);

        let problems = lint("type: any", &mut visitors, &config);
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].severity, Severity::Error);
        assert!(problems[0].is_rule("no-any"));
    }

    #[test]
    fn test_unresolved_refs_can_be_skipped() {
        let mut config = LintConfig::default();
        let problems = lint("a: {$ref: '#/missing'}", &mut VisitorSet::new(), &config);
        assert_eq!(problems.len(), 1);

        config.skip_rules([NO_UNRESOLVED_REFS]);
        let problems = lint("a: {$ref: '#/missing'}", &mut VisitorSet::new(), &config);
        assert!(problems.is_empty());
    }
}
