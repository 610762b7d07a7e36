use crate::bundler::{bundle_document, BundleOptions, BundleResult};
use crate::config::LintConfig;
use crate::error::BundleError;
use crate::loader::absolute_identity;
use crate::problem::Problem;
use crate::resolver::RefResolver;
use crate::source::SourceCache;
use crate::walk::{lint_document, VisitorSet};

/// Bundles (or, with `options.dereference`, dereferences) one entrypoint.
///
/// Problems with individual refs are returned in the result. Only a failure
/// to load the entrypoint itself is an error.
///
/// # Errors
///
/// Returns `BundleError::Load` if the entrypoint cannot be read or parsed.
pub fn bundle(entrypoint: &str, cache: &SourceCache, options: &BundleOptions) -> Result<BundleResult, BundleError> {
    let root = cache.load(&absolute_identity(entrypoint)?)?;
    let mut resolver = RefResolver::new(cache);
    Ok(bundle_document(&mut resolver, root, options))
}

/// Dereferences one entrypoint: the output contains no refs except where a
/// target could not be resolved.
pub fn dereference(entrypoint: &str, cache: &SourceCache) -> Result<BundleResult, BundleError> {
    let options = BundleOptions {
        dereference: true,
        ..BundleOptions::default()
    };
    bundle(entrypoint, cache, &options)
}

/// Runs the diagnostic walk over one entrypoint.
pub fn lint(
    entrypoint: &str,
    cache: &SourceCache,
    visitors: &mut VisitorSet,
    config: &LintConfig,
) -> Result<Vec<Problem>, BundleError> {
    let root = cache.load(&absolute_identity(entrypoint)?)?;
    let mut resolver = RefResolver::new(cache);
    Ok(lint_document(&mut resolver, root, visitors, config))
}
