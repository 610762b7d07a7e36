//! Document loading collaborators.
//!
//! The resolver never performs I/O itself; it asks a [`DocumentLoader`] for
//! the parsed tree of an absolute identity.

use crate::error::LoadError;
use crate::node::Node;
use crate::pointer::{is_absolute_url, normalize_path};
use std::collections::HashMap;
use std::path::PathBuf;

pub trait DocumentLoader: Send + Sync {
    /// Loads and parses the document identified by `absolute_ref`.
    fn load(&self, absolute_ref: &str) -> Result<Node, LoadError>;
}

fn parse(absolute_ref: &str, text: &str) -> Result<Node, LoadError> {
    Node::parse(text).map_err(|e| LoadError::Parse {
        absolute_ref: absolute_ref.to_string(),
        reason: e.to_string(),
    })
}

/// Reads documents from the filesystem, and from http(s) with the `remote` feature.
#[derive(Default)]
pub struct FileLoader {
    #[cfg(feature = "remote")]
    http: Option<HttpFetcher>,
}

impl FileLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables fetching of `http://` and `https://` documents.
    #[cfg(feature = "remote")]
    pub fn with_http(mut self, fetcher: HttpFetcher) -> Self {
        self.http = Some(fetcher);
        self
    }
}

impl DocumentLoader for FileLoader {
    fn load(&self, absolute_ref: &str) -> Result<Node, LoadError> {
        if is_absolute_url(absolute_ref) {
            #[cfg(feature = "remote")]
            if let Some(http) = &self.http {
                let text = http.fetch(absolute_ref)?;
                return parse(absolute_ref, &text);
            }
            return Err(LoadError::Unsupported {
                absolute_ref: absolute_ref.to_string(),
            });
        }

        log::debug!("reading {absolute_ref}");
        let text = std::fs::read_to_string(absolute_ref).map_err(|e| LoadError::NotFound {
            absolute_ref: absolute_ref.to_string(),
            reason: e.to_string(),
        })?;
        parse(absolute_ref, &text)
    }
}

/// Serves documents from memory, keyed by absolute identity.
#[derive(Default)]
pub struct MemoryLoader {
    documents: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, absolute_ref: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(absolute_ref, text);
        self
    }

    pub fn insert(&mut self, absolute_ref: impl Into<String>, text: impl Into<String>) {
        self.documents.insert(absolute_ref.into(), text.into());
    }
}

impl DocumentLoader for MemoryLoader {
    fn load(&self, absolute_ref: &str) -> Result<Node, LoadError> {
        let text = self
            .documents
            .get(absolute_ref)
            .ok_or_else(|| LoadError::NotFound {
                absolute_ref: absolute_ref.to_string(),
                reason: "not registered".to_string(),
            })?;
        parse(absolute_ref, text)
    }
}

/// Turns an entrypoint as given by a user into an absolute identity.
///
/// URLs pass through; relative paths are resolved against the current directory.
pub fn absolute_identity(entrypoint: &str) -> Result<String, LoadError> {
    if is_absolute_url(entrypoint) {
        return Ok(entrypoint.to_string());
    }
    let path = PathBuf::from(entrypoint);
    let path = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map_err(|e| LoadError::NotFound {
                absolute_ref: entrypoint.to_string(),
                reason: e.to_string(),
            })?
            .join(path)
    };
    Ok(normalize_path(&path).to_string_lossy().into_owned())
}

/// Blocking HTTP fetcher for remote documents.
#[cfg(feature = "remote")]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "remote")]
impl HttpFetcher {
    /// Creates a fetcher with the given request timeout.
    pub fn with_timeout(timeout: std::time::Duration) -> Result<Self, LoadError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("refbundle")
            .timeout(timeout)
            .build()
            .map_err(|e| LoadError::Fetch {
                url: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }

    pub fn fetch(&self, url: &str) -> Result<String, LoadError> {
        let fetch_error = |reason: String| LoadError::Fetch {
            url: url.to_string(),
            reason,
        };
        log::debug!("fetching {url}");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| fetch_error(e.to_string()))?;
        if !response.status().is_success() {
            return Err(fetch_error(format!("HTTP {}", response.status())));
        }
        response.text().map_err(|e| fetch_error(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_file_loader_reads_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pet.yaml");
        fs::write(&path, "type: object").unwrap();

        let node = FileLoader::new().load(path.to_str().unwrap()).unwrap();
        assert_eq!(node.at("#/type"), Some(&Node::string("object")));
    }

    #[test]
    fn test_file_loader_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.yaml");
        let err = FileLoader::new().load(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
    }

    #[test]
    fn test_file_loader_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        fs::write(&path, "a: [1, 2").unwrap();
        let err = FileLoader::new().load(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
    }

    #[cfg(not(feature = "remote"))]
    #[test]
    fn test_file_loader_rejects_urls_without_remote() {
        let err = FileLoader::new().load("https://example.com/api.yaml").unwrap_err();
        assert!(matches!(err, LoadError::Unsupported { .. }));
    }

    #[test]
    fn test_memory_loader() {
        let loader = MemoryLoader::new().with_document("/api.yaml", "openapi: 3.1.0");
        assert!(loader.load("/api.yaml").is_ok());
        assert!(loader.load("/other.yaml").is_err());
    }

    #[test]
    fn test_absolute_identity() {
        assert_eq!(
            absolute_identity("https://example.com/api.yaml").unwrap(),
            "https://example.com/api.yaml"
        );
        assert_eq!(absolute_identity("/specs/./api/../openapi.yaml").unwrap(), "/specs/openapi.yaml");
        let relative = absolute_identity("openapi.yaml").unwrap();
        assert!(PathBuf::from(&relative).is_absolute());
    }
}
