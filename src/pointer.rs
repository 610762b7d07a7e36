//! JSON-Pointer style helpers used for `$ref` strings.
//!
//! All functions here are pure: they never touch a [`Source`](crate::source::Source)
//! or perform I/O.

use std::path::{Component, Path, PathBuf};

/// The root pointer of a document.
pub const ROOT_POINTER: &str = "#/";

/// A `$ref` string split into its document part and its unescaped pointer tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRef {
    /// The document part. `None` means the ref points into the same document.
    pub uri: Option<String>,
    /// Unescaped pointer tokens. Empty means the document root.
    pub pointer: Vec<String>,
}

/// Escapes a single pointer segment: `~` becomes `~0`, then `/` becomes `~1`.
pub fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Reverses [`escape_pointer`], percent-decoding the segment first.
pub fn unescape_pointer(segment: &str) -> String {
    let decoded = match urlencoding::decode(segment) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => segment.to_string(),
    };
    decoded.replace("~1", "/").replace("~0", "~")
}

/// Appends an already escaped `key` to `base`. An empty base is the root.
pub fn join_pointer(base: &str, key: &str) -> String {
    let base = if base.is_empty() { ROOT_POINTER } else { base };
    if base.ends_with('/') {
        format!("{base}{key}")
    } else {
        format!("{base}/{key}")
    }
}

/// Splits a ref on the first `#/`.
///
/// ```
/// use refbundle_core::pointer::parse_ref;
///
/// let parsed = parse_ref("./pets.yaml#/components/schemas/Pet");
/// assert_eq!(parsed.uri.as_deref(), Some("./pets.yaml"));
/// assert_eq!(parsed.pointer, vec!["components", "schemas", "Pet"]);
/// ```
pub fn parse_ref(reference: &str) -> ParsedRef {
    let (uri, pointer) = match reference.split_once("#/") {
        Some((uri, pointer)) => (uri, Some(pointer)),
        None => (reference, None),
    };
    // A lone `#` is an in-document ref to the root.
    let uri = uri.strip_suffix('#').unwrap_or(uri);
    ParsedRef {
        uri: (!uri.is_empty()).then(|| uri.to_string()),
        pointer: pointer.map(split_tokens).unwrap_or_default(),
    }
}

/// Splits a `#/`-prefixed pointer into unescaped tokens.
pub fn parse_pointer(pointer: &str) -> Vec<String> {
    let body = pointer
        .strip_prefix(ROOT_POINTER)
        .or_else(|| pointer.strip_prefix('#'))
        .unwrap_or(pointer);
    split_tokens(body)
}

fn split_tokens(body: &str) -> Vec<String> {
    body.split('/')
        .filter(|token| !token.is_empty())
        .map(unescape_pointer)
        .collect()
}

/// Last `/`-separated segment of a pointer, still escaped.
pub fn pointer_base_name(pointer: &str) -> &str {
    pointer.rsplit('/').next().unwrap_or(pointer)
}

/// File stem of the document part of a ref: `../models/pet.v1.yaml` gives `pet`.
pub fn ref_base_name(reference: &str) -> &str {
    let file = reference
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(reference);
    file.split('.').next().unwrap_or(file)
}

pub fn is_absolute_url(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

/// Heuristic used to tell a file/ref alias apart from a plain name.
pub fn is_mapping_ref(mapping: &str) -> bool {
    mapping.starts_with('#')
        || mapping.starts_with("https://")
        || mapping.starts_with("./")
        || mapping.starts_with("../")
        || mapping.contains('/')
}

/// Resolves `uri` against the identity of the document that contains it.
///
/// Absolute URLs pass through, relative refs against a URL base use standard
/// URL joining, and relative refs against a filesystem path are joined to the
/// base's directory and normalized lexically.
pub fn resolve_uri(base: &str, uri: &str) -> String {
    if is_absolute_url(uri) {
        return uri.to_string();
    }
    if is_absolute_url(base) {
        if let Ok(joined) = url::Url::parse(base).and_then(|base| base.join(uri)) {
            return joined.to_string();
        }
        log::warn!("could not join {uri} onto {base}; using it verbatim");
        return uri.to_string();
    }
    let directory = Path::new(base).parent().unwrap_or_else(|| Path::new(""));
    normalize_path(&directory.join(uri))
        .to_string_lossy()
        .into_owned()
}

/// Removes `.` and resolves `..` components without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
