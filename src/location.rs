use crate::pointer::{escape_pointer, join_pointer, ROOT_POINTER};
use crate::source::Source;
use std::sync::Arc;

/// Identifies a node as a (source, pointer) pair.
#[derive(Debug, Clone)]
pub struct Location {
    pub source: Arc<Source>,
    pub pointer: String,
}

impl Location {
    pub fn new(source: Arc<Source>, pointer: impl Into<String>) -> Self {
        Self {
            source,
            pointer: pointer.into(),
        }
    }

    pub fn root(source: Arc<Source>) -> Self {
        Self::new(source, ROOT_POINTER)
    }

    /// Location of a descendant; `segments` are unescaped keys or indices.
    pub fn child<I, S>(&self, segments: I) -> Location
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let escaped: Vec<String> = segments
            .into_iter()
            .map(|segment| escape_pointer(segment.as_ref()))
            .collect();
        Location::new(
            Arc::clone(&self.source),
            join_pointer(&self.pointer, &escaped.join("/")),
        )
    }

    /// `source identity + pointer`, with the root pointer omitted.
    pub fn absolute_pointer(&self) -> String {
        if self.pointer == ROOT_POINTER {
            self.source.absolute_ref.clone()
        } else {
            format!("{}{}", self.source.absolute_ref, self.pointer)
        }
    }

    pub fn is_in(&self, source: &Source) -> bool {
        self.source.absolute_ref == source.absolute_ref
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.source.absolute_ref == other.source.absolute_ref && self.pointer == other.pointer
    }
}

impl Eq for Location {}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.absolute_pointer())
    }
}
