// API error path tests
// These test error handling and conversions at the entrypoint boundary

use refbundle_core::{bundle, dereference, BundleError, BundleOptions, Config, ConfigError, LoadError, MemoryLoader, SourceCache};

fn cache_with(id: &str, text: &str) -> SourceCache {
    SourceCache::new(MemoryLoader::new().with_document(id, text))
}

#[test]
fn test_api_missing_entrypoint() {
    let cache = SourceCache::new(MemoryLoader::new());
    let result = bundle("/missing.yaml", &cache, &BundleOptions::default());
    if let Err(BundleError::Load(LoadError::NotFound { absolute_ref, .. })) = result {
        assert_eq!(absolute_ref, "/missing.yaml");
    } else {
        panic!("Expected a not-found load error");
    }
}

#[test]
fn test_api_unparseable_entrypoint() {
    let cache = cache_with("/api.yaml", "a: [unclosed");
    let result = dereference("/api.yaml", &cache);
    assert!(matches!(result, Err(BundleError::Load(LoadError::Parse { .. }))));
}

#[test]
fn test_api_load_failure_is_cached() {
    let cache = cache_with("/api.yaml", "a: [unclosed");
    let first = bundle("/api.yaml", &cache, &BundleOptions::default()).unwrap_err();
    let second = bundle("/api.yaml", &cache, &BundleOptions::default()).unwrap_err();
    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_api_broken_refs_are_not_fatal() {
    let cache = cache_with("/api.yaml", "a: {$ref: 'other.yaml#/X'}\nb: {$ref: '#/nope'}");
    let result = bundle("/api.yaml", &cache, &BundleOptions::default()).unwrap();
    assert_eq!(result.totals().errors, 2);
}

#[test]
fn test_api_remote_ref_without_remote_loader() {
    let cache = cache_with("/api.yaml", "a: {$ref: 'https://example.com/pet.yaml'}");
    let result = bundle("/api.yaml", &cache, &BundleOptions::default()).unwrap();
    assert_eq!(result.problems.len(), 1);
    assert!(result.problems[0].message.contains("https://example.com/pet.yaml"));
}

#[test]
fn test_api_config_error_converts() {
    let err: BundleError = Config::from_yaml_str("bundle: [1, 2]").unwrap_err().into();
    assert!(matches!(err, BundleError::Config(ConfigError::Invalid { .. })));
}

#[test]
fn test_api_error_display() {
    let err = BundleError::from(LoadError::Parse {
        absolute_ref: "/api.yaml".to_string(),
        reason: "bad indentation".to_string(),
    });
    assert_eq!(err.to_string(), "Failed to parse /api.yaml: bad indentation");

    let report = miette::Report::new(err);
    assert_eq!(report.code().map(|code| code.to_string()).as_deref(), Some("load::parse"));
}
