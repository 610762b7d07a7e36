use crate::error::LoadError;
use crate::location::Location;
use crate::node::Node;
use crate::pointer::{parse_ref, resolve_uri};
use crate::problem::{Problem, NO_UNRESOLVED_REFS};
use crate::source::SourceCache;
use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;
use thiserror::Error;

/// The target of a ref.
///
/// Identity is the target location: every ref that lands on the same node
/// gets the same `Rc<ResolvedNode>`.
#[derive(Debug)]
pub struct ResolvedNode {
    /// The target subtree as it appears in its source. Nested refs are left
    /// in place and resolved relative to `location` by whoever descends.
    pub content: Node,
    pub location: Location,
    /// Location of the first ref that led here.
    pub origin: Location,
    circular: Cell<bool>,
}

impl ResolvedNode {
    /// `true` once some ref re-entered this target while it was being walked.
    pub fn is_circular(&self) -> bool {
        self.circular.get()
    }

    fn mark_circular(&self) {
        self.circular.set(true);
    }
}

/// A ref that could not be resolved. Recoverable: it becomes a [`Problem`]
/// at the ref's own location and the walk carries on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RefError {
    #[error("Can't resolve $ref {reference}: {missing} does not exist")]
    Broken { reference: String, missing: String },

    #[error("Can't resolve $ref {reference}: {error}")]
    Load {
        reference: String,
        #[source]
        error: LoadError,
    },

    #[error("Can't resolve $ref {reference}: the path runs through a ref that points back into itself")]
    Looping { reference: String },
}

impl RefError {
    pub fn into_problem(self, at: &Location) -> Problem {
        Problem::error(self.to_string())
            .with_location(at)
            .with_rule(NO_UNRESOLVED_REFS)
    }
}

/// Resolves ref strings across sources for one entrypoint.
///
/// The walker that drives it marks the locations it is currently descending
/// through with [`enter`](Self::enter) / [`leave`](Self::leave); a ref that
/// lands on one of those is flagged circular and must not be descended again.
pub struct RefResolver<'c> {
    cache: &'c SourceCache,
    resolved: HashMap<String, Rc<ResolvedNode>>,
    edges: HashMap<(String, String), String>,
    in_progress: HashSet<String>,
}

impl<'c> RefResolver<'c> {
    pub fn new(cache: &'c SourceCache) -> Self {
        Self {
            cache,
            resolved: HashMap::new(),
            edges: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    pub fn cache(&self) -> &'c SourceCache {
        self.cache
    }

    /// Marks `absolute_pointer` as being walked. Returns `false` if it already was.
    pub fn enter(&mut self, absolute_pointer: &str) -> bool {
        self.in_progress.insert(absolute_pointer.to_string())
    }

    pub fn leave(&mut self, absolute_pointer: &str) {
        self.in_progress.remove(absolute_pointer);
    }

    pub fn is_in_progress(&self, absolute_pointer: &str) -> bool {
        self.in_progress.contains(absolute_pointer)
    }

    /// Resolves `reference` as written at `at`, the location of the ref node.
    pub fn resolve(&mut self, reference: &str, at: &Location) -> Result<Rc<ResolvedNode>, RefError> {
        let edge = (at.absolute_pointer(), reference.to_string());
        if let Some(known) = self.edges.get(&edge).and_then(|id| self.resolved.get(id)) {
            let known = Rc::clone(known);
            self.flag_reentry(&known);
            return Ok(known);
        }

        let mut chain = HashSet::new();
        let resolved = self.resolve_chain(reference, at, &mut chain)?;
        self.edges.insert(edge, resolved.location.absolute_pointer());
        Ok(resolved)
    }

    fn resolve_chain(
        &mut self,
        reference: &str,
        at: &Location,
        chain: &mut HashSet<String>,
    ) -> Result<Rc<ResolvedNode>, RefError> {
        let parsed = parse_ref(reference);
        let source = match &parsed.uri {
            Some(uri) => {
                let absolute_ref = resolve_uri(&at.source.absolute_ref, uri);
                self.cache
                    .load(&absolute_ref)
                    .map_err(|error| RefError::Load {
                        reference: reference.to_string(),
                        error,
                    })?
            }
            None => Arc::clone(&at.source),
        };

        let (location, content) = self.follow(
            Location::root(Arc::clone(&source)),
            &source.root,
            &parsed.pointer,
            reference,
            chain,
        )?;
        let id = location.absolute_pointer();

        // A ref that points at another ref: keep following.
        let next = match &content {
            Node::Ref(next) => Some(next.clone()),
            _ => None,
        };
        if let Some(next) = next {
            if !chain.insert(id.clone()) {
                log::debug!("ref chain through {id} loops back on itself");
                let node = self.intern(id, content, location, at);
                node.mark_circular();
                return Ok(node);
            }
            return self.resolve_chain(&next, &location, chain);
        }

        let node = self.intern(id, content, location, at);
        self.flag_reentry(&node);
        Ok(node)
    }

    /// Walks `tokens` from `start`, hopping through refs met on the way.
    fn follow(
        &mut self,
        start_location: Location,
        start: &Node,
        tokens: &[String],
        reference: &str,
        chain: &mut HashSet<String>,
    ) -> Result<(Location, Node), RefError> {
        let mut location = start_location;
        let mut current = start;
        for (index, token) in tokens.iter().enumerate() {
            if let Node::Ref(inner) = current {
                if !chain.insert(location.absolute_pointer()) {
                    return Err(RefError::Looping {
                        reference: reference.to_string(),
                    });
                }
                let hop = self.resolve_chain(inner, &location, chain)?;
                if hop.is_circular() && hop.content.is_ref() {
                    return Err(RefError::Looping {
                        reference: reference.to_string(),
                    });
                }
                return self.follow(
                    hop.location.clone(),
                    &hop.content,
                    &tokens[index..],
                    reference,
                    chain,
                );
            }
            let next = location.child([token]);
            current = current.child(token).ok_or_else(|| RefError::Broken {
                reference: reference.to_string(),
                missing: next.absolute_pointer(),
            })?;
            location = next;
        }
        Ok((location, current.clone()))
    }

    fn intern(&mut self, id: String, content: Node, location: Location, origin: &Location) -> Rc<ResolvedNode> {
        Rc::clone(self.resolved.entry(id).or_insert_with(|| {
            Rc::new(ResolvedNode {
                content,
                location,
                origin: origin.clone(),
                circular: Cell::new(false),
            })
        }))
    }

    fn flag_reentry(&self, node: &ResolvedNode) {
        if self.in_progress.contains(&node.location.absolute_pointer()) {
            log::trace!("circular ref into {}", node.location);
            node.mark_circular();
        }
    }
}
