use miette::Diagnostic;
use thiserror::Error;

/// Fatal error for one entrypoint (or, for `Config`, for the whole run).
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum BundleError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to serialize the output document: {message}")]
    #[diagnostic(code(bundle::serialize))]
    Serialize { message: String },
}

/// A document could not be read or parsed.
///
/// Fatal when it is the entrypoint itself; for any other document it is
/// reported as a problem at the ref that asked for it.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum LoadError {
    #[error("Failed to read {absolute_ref}: {reason}")]
    #[diagnostic(
        code(load::not_found),
        help("Check that the file exists and that the ref path is relative to the referencing document.")
    )]
    NotFound { absolute_ref: String, reason: String },

    #[error("Failed to parse {absolute_ref}: {reason}")]
    #[diagnostic(
        code(load::parse),
        help("The document must be valid YAML or JSON.")
    )]
    Parse { absolute_ref: String, reason: String },

    #[error("Failed to fetch {url}: {reason}")]
    #[diagnostic(code(load::fetch))]
    Fetch { url: String, reason: String },

    #[error("No loader can handle {absolute_ref}")]
    #[diagnostic(
        code(load::unsupported),
        help("Remote documents require the `remote` feature.")
    )]
    Unsupported { absolute_ref: String },
}

/// Malformed configuration. Raised before any entrypoint is processed.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {reason}")]
    #[diagnostic(code(config::read))]
    Read { path: String, reason: String },

    #[error("Invalid config: {reason}")]
    #[diagnostic(
        code(config::invalid),
        help("See the `lint` and `bundle` sections of the configuration reference.")
    )]
    Invalid { reason: String },
}
