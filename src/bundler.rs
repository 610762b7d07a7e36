//! Dereference and bundle transformations.
//!
//! Both modes walk the entry document depth-first in document order and
//! resolve refs through a [`RefResolver`]. Per-ref failures are recorded as
//! problems; neither mode fails as a whole once the entry document is loaded.

use crate::deref::{DerefGraph, DerefNode, NodeId};
use crate::error::BundleError;
use crate::location::Location;
use crate::node::{Node, Scalar};
use crate::pointer::{escape_pointer, is_mapping_ref, parse_pointer, parse_ref, ref_base_name};
use crate::problem::{Problem, Totals, BUNDLE_NAME_COLLISION, NO_CIRCULAR_REFS};
use crate::resolver::RefResolver;
use crate::serialization::OutputFormat;
use crate::source::Source;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BundleOptions {
    /// Inline every ref instead of merging external targets into components.
    pub dereference: bool,
    /// Component section used when neither the target nor the referencing
    /// site tells what kind of component an external target is.
    pub default_component_kind: String,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            dereference: false,
            default_component_kind: "schemas".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BundleOutput {
    Bundled(Node),
    Dereferenced(DerefGraph),
}

impl BundleOutput {
    /// A finite tree for serialization. Circular edges of a dereferenced
    /// graph become `$ref`s to the enclosing output node.
    pub fn to_node(&self) -> Node {
        match self {
            BundleOutput::Bundled(node) => node.clone(),
            BundleOutput::Dereferenced(graph) => graph.to_node(),
        }
    }

    pub fn dump(&self, format: OutputFormat) -> Result<String, BundleError> {
        self.to_node().dump(format)
    }

    pub fn as_bundled(&self) -> Option<&Node> {
        match self {
            BundleOutput::Bundled(node) => Some(node),
            BundleOutput::Dereferenced(_) => None,
        }
    }

    pub fn as_dereferenced(&self) -> Option<&DerefGraph> {
        match self {
            BundleOutput::Dereferenced(graph) => Some(graph),
            BundleOutput::Bundled(_) => None,
        }
    }
}

/// Which merged component came from where.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BundleMetadata {
    /// Output pointer of each merged component, mapped to the absolute
    /// pointer of the node it was copied from.
    pub components: IndexMap<String, String>,
}

impl BundleMetadata {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone)]
pub struct BundleResult {
    pub document: BundleOutput,
    pub problems: Vec<Problem>,
    pub metadata: BundleMetadata,
}

impl BundleResult {
    pub fn totals(&self) -> Totals {
        Totals::from_problems(&self.problems)
    }
}

/// Bundles or dereferences `root` according to `options`.
pub fn bundle_document(
    resolver: &mut RefResolver<'_>,
    root: Arc<Source>,
    options: &BundleOptions,
) -> BundleResult {
    let location = Location::root(Arc::clone(&root));
    if options.dereference {
        log::debug!("dereferencing {}", root.absolute_ref);
        let mut dereferencer = Dereferencer {
            resolver,
            graph: DerefGraph::new(),
            in_flight: HashMap::new(),
            problems: Vec::new(),
        };
        let id = dereferencer.build(&root.root, &location);
        dereferencer.graph.set_root(id);
        BundleResult {
            document: BundleOutput::Dereferenced(dereferencer.graph),
            problems: dereferencer.problems,
            metadata: BundleMetadata::default(),
        }
    } else {
        log::debug!("bundling {}", root.absolute_ref);
        let mut bundler = Bundler::new(resolver, Arc::clone(&root), options);
        let mut document = bundler.rewrite(&root.root, &location);
        bundler.merge_components(&mut document);
        BundleResult {
            document: BundleOutput::Bundled(document),
            problems: bundler.problems,
            metadata: bundler.metadata,
        }
    }
}

struct Dereferencer<'r, 'c> {
    resolver: &'r mut RefResolver<'c>,
    graph: DerefGraph,
    // Containers currently being materialized, by absolute location.
    in_flight: HashMap<String, NodeId>,
    problems: Vec<Problem>,
}

impl Dereferencer<'_, '_> {
    fn build(&mut self, node: &Node, location: &Location) -> NodeId {
        match node {
            Node::Ref(reference) => self.build_ref(reference, location),
            _ => {
                let id = self.graph.alloc();
                self.fill(id, node, location);
                id
            }
        }
    }

    fn fill(&mut self, id: NodeId, node: &Node, location: &Location) {
        let here = location.absolute_pointer();
        let container = matches!(node, Node::Mapping(_) | Node::Sequence(_));
        if container {
            self.in_flight.insert(here.clone(), id);
            self.resolver.enter(&here);
        }

        let built = match node {
            Node::Mapping(map) => DerefNode::Mapping(
                map.iter()
                    .map(|(key, value)| (key.clone(), self.build(value, &location.child([key]))))
                    .collect(),
            ),
            Node::Sequence(items) => DerefNode::Sequence(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| self.build(item, &location.child([index.to_string()])))
                    .collect(),
            ),
            Node::Scalar(scalar) => DerefNode::Scalar(scalar.clone()),
            Node::Ref(reference) => DerefNode::Unresolved(reference.clone()),
        };

        if container {
            self.resolver.leave(&here);
            self.in_flight.remove(&here);
        }
        self.graph.set(id, built);
    }

    fn build_ref(&mut self, reference: &str, location: &Location) -> NodeId {
        let target = match self.resolver.resolve(reference, location) {
            Ok(target) => target,
            Err(err) => {
                self.problems.push(err.into_problem(location));
                return self.unresolved(reference);
            }
        };

        let key = target.location.absolute_pointer();
        if let Some(&id) = self.in_flight.get(&key) {
            self.problems.push(
                Problem::warning(format!(
                    "Circular $ref {reference} re-enters {key}; text output writes it as a $ref to the enclosing node"
                ))
                .with_location(location)
                .with_rule(NO_CIRCULAR_REFS),
            );
            return id;
        }
        if target.content.is_ref() {
            self.problems.push(
                Problem::error(format!("Can't dereference {reference}: the ref chain loops back on itself"))
                    .with_location(location)
                    .with_rule(NO_CIRCULAR_REFS),
            );
            return self.unresolved(reference);
        }

        let id = self.graph.alloc();
        self.fill(id, &target.content, &target.location);
        id
    }

    fn unresolved(&mut self, reference: &str) -> NodeId {
        let id = self.graph.alloc();
        self.graph.set(id, DerefNode::Unresolved(reference.to_string()));
        id
    }
}

struct Bundler<'r, 'c> {
    resolver: &'r mut RefResolver<'c>,
    root: Arc<Source>,
    default_kind: String,
    // Merged components by kind, in the order they were first referenced.
    components: IndexMap<String, IndexMap<String, Node>>,
    // (kind, name) pairs defined natively or already merged.
    taken: HashSet<(String, String)>,
    // Native component slots that are only a ref, with that ref.
    native_refs: Vec<(String, String, String)>,
    // Absolute target pointer -> pointer inside the output document.
    imported: HashMap<String, String>,
    metadata: BundleMetadata,
    problems: Vec<Problem>,
}

impl<'r, 'c> Bundler<'r, 'c> {
    fn new(resolver: &'r mut RefResolver<'c>, root: Arc<Source>, options: &BundleOptions) -> Self {
        let mut taken = HashSet::new();
        let mut native_refs = Vec::new();
        if let Some(Node::Mapping(sections)) = root.root.child("components") {
            for (kind, section) in sections {
                let Node::Mapping(entries) = section else { continue };
                for (name, entry) in entries {
                    taken.insert((kind.clone(), name.clone()));
                    if let Node::Ref(reference) = entry {
                        native_refs.push((kind.clone(), name.clone(), reference.clone()));
                    }
                }
            }
        }
        Self {
            resolver,
            root,
            default_kind: options.default_component_kind.clone(),
            components: IndexMap::new(),
            taken,
            native_refs,
            imported: HashMap::new(),
            metadata: BundleMetadata::default(),
            problems: Vec::new(),
        }
    }

    fn rewrite(&mut self, node: &Node, location: &Location) -> Node {
        match node {
            Node::Ref(reference) => self.rewrite_ref(reference, location),
            Node::Mapping(map) => {
                let discriminator = location.pointer.ends_with("/discriminator/mapping");
                Node::Mapping(
                    map.iter()
                        .map(|(key, value)| {
                            let child = location.child([key]);
                            let value = match value {
                                Node::Scalar(Scalar::String(target))
                                    if discriminator && is_mapping_ref(target) =>
                                {
                                    match self.rewrite_ref(target, &child) {
                                        Node::Ref(pointer) => Node::string(pointer),
                                        other => other,
                                    }
                                }
                                _ => self.rewrite(value, &child),
                            };
                            (key.clone(), value)
                        })
                        .collect(),
                )
            }
            Node::Sequence(items) => Node::Sequence(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| self.rewrite(item, &location.child([index.to_string()])))
                    .collect(),
            ),
            Node::Scalar(_) => node.clone(),
        }
    }

    fn rewrite_ref(&mut self, reference: &str, location: &Location) -> Node {
        let target = match self.resolver.resolve(reference, location) {
            Ok(target) => target,
            Err(err) => {
                self.problems.push(err.into_problem(location));
                return Node::Ref(reference.to_string());
            }
        };

        if target.location.is_in(&self.root) {
            if location.is_in(&self.root) && parse_ref(reference).uri.is_none() {
                return Node::Ref(reference.to_string());
            }
            return Node::Ref(target.location.pointer.clone());
        }

        let key = target.location.absolute_pointer();
        if let Some(pointer) = self.imported.get(&key) {
            return Node::Ref(pointer.clone());
        }

        let (kind, name) = match self.adopt(&key) {
            Some(slot) => slot,
            None => match self.destination(&target.location, location) {
                Some((kind, name)) => {
                    let name = self.claim(&kind, name, &key, location);
                    (kind, name)
                }
                None if !self.resolver.is_in_progress(&key) => {
                    log::debug!("inlining {key} at {location}");
                    self.resolver.enter(&key);
                    let content = self.rewrite(&target.content, &target.location);
                    self.resolver.leave(&key);
                    return content;
                }
                None => {
                    let name = component_name(&target.location);
                    let kind = self.default_kind.clone();
                    let name = self.claim(&kind, name, &key, location);
                    (kind, name)
                }
            },
        };
        let pointer = format!("#/components/{}/{}", escape_pointer(&kind), escape_pointer(&name));
        log::debug!("merging {key} as {pointer}");
        self.imported.insert(key.clone(), pointer.clone());
        self.metadata.components.insert(pointer.clone(), key.clone());
        // Reserve the slot now so components keep first-reference order.
        self.components
            .entry(kind.clone())
            .or_default()
            .insert(name.clone(), Node::Scalar(Scalar::Null));

        self.resolver.enter(&key);
        let content = self.rewrite(&target.content, &target.location);
        self.resolver.leave(&key);

        if let Some(slot) = self.components.get_mut(&kind).and_then(|section| section.get_mut(&name)) {
            *slot = content;
        }
        Node::Ref(pointer)
    }

    /// Where an external target goes: `components/<kind>/<name>`, or `None`
    /// when the ref site is not a component context and the target is
    /// inlined instead.
    fn destination(&self, target: &Location, site: &Location) -> Option<(String, String)> {
        let tokens = parse_pointer(&target.pointer);
        if let [section, kind, name] = tokens.as_slice() {
            if section == "components" {
                return Some((kind.clone(), name.clone()));
            }
        }
        let site_tokens = parse_pointer(&site.pointer);
        let kind = match infer_kind(&site_tokens) {
            Some(kind) => kind,
            // A bare fragment in a secondary document is most likely a schema.
            None if !site.is_in(&self.root) && !site_tokens.iter().any(|t| t == "paths") => {
                self.default_kind.clone()
            }
            None => return None,
        };
        Some((kind, component_name(target)))
    }

    /// A native component slot that is only a ref to `key` takes the merged
    /// content under its own name.
    fn adopt(&mut self, key: &str) -> Option<(String, String)> {
        let root = Location::root(Arc::clone(&self.root));
        let candidates = self.native_refs.clone();
        for (kind, name, reference) in candidates {
            let slot = root.child(["components", kind.as_str(), name.as_str()]);
            let Ok(target) = self.resolver.resolve(&reference, &slot) else {
                continue;
            };
            if target.location.absolute_pointer() == key {
                return Some((kind, name));
            }
        }
        None
    }

    /// Reserves `name` under `kind`, renaming it with a numeric suffix when taken.
    fn claim(&mut self, kind: &str, name: String, key: &str, site: &Location) -> String {
        if self.taken.insert((kind.to_string(), name.clone())) {
            return name;
        }
        let mut suffix = 2;
        let renamed = loop {
            let candidate = format!("{name}-{suffix}");
            if self.taken.insert((kind.to_string(), candidate.clone())) {
                break candidate;
            }
            suffix += 1;
        };
        self.problems.push(
            Problem::warning(format!(
                "Component {kind}/{name} is already defined; {key} was merged as {kind}/{renamed}"
            ))
            .with_location(site)
            .with_rule(BUNDLE_NAME_COLLISION),
        );
        renamed
    }

    fn merge_components(&mut self, document: &mut Node) {
        if self.components.is_empty() {
            return;
        }
        let merged = std::mem::take(&mut self.components);
        let root_location = Location::root(Arc::clone(&self.root));

        let Node::Mapping(root) = document else {
            self.problems.push(
                Problem::error("Cannot merge external components: the document root is not a mapping")
                    .with_location(&root_location),
            );
            return;
        };
        let sections = root
            .entry("components".to_string())
            .or_insert_with(|| Node::Mapping(IndexMap::new()));
        let Node::Mapping(sections) = sections else {
            self.problems.push(
                Problem::error("Cannot merge external components: `components` is not a mapping")
                    .with_location(&root_location.child(["components"])),
            );
            return;
        };
        for (kind, entries) in merged {
            let section = sections
                .entry(kind.clone())
                .or_insert_with(|| Node::Mapping(IndexMap::new()));
            match section {
                Node::Mapping(section) => section.extend(entries),
                _ => self.problems.push(
                    Problem::error(format!("Cannot merge external components: `components/{kind}` is not a mapping"))
                        .with_location(&root_location.child(["components", kind.as_str()])),
                ),
            }
        }
    }
}

/// Last token of the target pointer, or the file name for a whole document.
fn component_name(target: &Location) -> String {
    parse_pointer(&target.pointer)
        .last()
        .cloned()
        .unwrap_or_else(|| ref_base_name(&target.source.absolute_ref).to_string())
}

/// Component kind implied by the nearest recognizable key above a ref site.
/// Property names are not keys, and nothing above `paths` or `webhooks` counts.
fn infer_kind(site: &[String]) -> Option<String> {
    for (index, token) in site.iter().enumerate().rev() {
        if index > 0 && matches!(site[index - 1].as_str(), "properties" | "patternProperties") {
            continue;
        }
        let kind = match token.as_str() {
            "paths" | "webhooks" => return None,
            "schema" | "schemas" | "items" | "properties" | "additionalProperties" | "allOf"
            | "anyOf" | "oneOf" | "not" => "schemas",
            "parameters" => "parameters",
            "responses" => "responses",
            "requestBody" | "requestBodies" => "requestBodies",
            "headers" => "headers",
            "examples" => "examples",
            "links" => "links",
            "callbacks" => "callbacks",
            "securitySchemes" => "securitySchemes",
            _ => continue,
        };
        return Some(kind.to_string());
    }
    None
}
