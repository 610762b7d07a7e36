use crate::error::LoadError;
use crate::loader::DocumentLoader;
use crate::node::Node;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

/// An immutable loaded document.
#[derive(Debug, PartialEq)]
pub struct Source {
    pub absolute_ref: String,
    pub root: Node,
}

impl Source {
    pub fn new(absolute_ref: impl Into<String>, root: Node) -> Self {
        Self {
            absolute_ref: absolute_ref.into(),
            root,
        }
    }
}

type LoadSlot = Arc<OnceLock<Result<Arc<Source>, LoadError>>>;

/// Run-scoped cache of loaded documents, keyed by absolute identity.
///
/// Create one per run and pass it to every entrypoint. Loading is
/// single-flight: concurrent callers asking for the same identity block on
/// the one in-flight load and receive the same `Arc<Source>`. Failures are
/// cached as well, so an identity has exactly one outcome per run.
pub struct SourceCache {
    loader: Box<dyn DocumentLoader>,
    slots: Mutex<HashMap<String, LoadSlot>>,
}

impl SourceCache {
    pub fn new(loader: impl DocumentLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the source for `absolute_ref`, loading it on first use.
    pub fn load(&self, absolute_ref: &str) -> Result<Arc<Source>, LoadError> {
        let slot = {
            let mut slots = self
                .slots
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            slots.entry(absolute_ref.to_string()).or_default().clone()
        };
        // The map lock is released here so unrelated identities load in parallel.
        slot.get_or_init(|| {
            log::debug!("loading source {absolute_ref}");
            self.loader
                .load(absolute_ref)
                .map(|root| Arc::new(Source::new(absolute_ref, root)))
        })
        .clone()
    }

    /// Number of identities requested so far, loaded or failed.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .map(|slots| slots.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
