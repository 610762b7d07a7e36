use refbundle_core::resolver::{RefError, RefResolver};
use refbundle_core::{Location, MemoryLoader, Node, SourceCache};
use std::rc::Rc;

fn cache(documents: &[(&str, &str)]) -> SourceCache {
    let mut loader = MemoryLoader::new();
    for (id, text) in documents {
        loader.insert(*id, *text);
    }
    SourceCache::new(loader)
}

fn at(cache: &SourceCache, id: &str, pointer: &str) -> Location {
    Location::new(cache.load(id).unwrap(), pointer)
}

#[test]
fn test_cross_document_resolution() {
    let cache = cache(&[
        ("/specs/openapi.yaml", "x: {$ref: 'schemas/pet.yaml#/Pet'}"),
        ("/specs/schemas/pet.yaml", "Pet:\n  type: object\n  properties:\n    id: {type: integer}"),
    ]);
    let mut resolver = RefResolver::new(&cache);

    let site = at(&cache, "/specs/openapi.yaml", "#/x");
    let resolved = resolver.resolve("schemas/pet.yaml#/Pet", &site).unwrap();
    assert_eq!(resolved.location.source.absolute_ref, "/specs/schemas/pet.yaml");
    assert_eq!(resolved.location.pointer, "#/Pet");
    assert_eq!(resolved.content.at("#/properties/id/type"), Some(&Node::string("integer")));
    assert_eq!(resolved.origin, site);

    // Relative refs inside the second document resolve against it.
    // `#/x` is itself a ref, so the chain leads back to the same target.
    let nested = resolved.location.child(["properties"]);
    let back = resolver.resolve("../openapi.yaml#/x", &nested).unwrap();
    assert!(Rc::ptr_eq(&back, &resolved));
}

#[test]
fn test_whole_document_ref() {
    let cache = cache(&[
        ("/api.yaml", "x: {$ref: ./limit.yaml}"),
        ("/limit.yaml", "name: limit\nin: query"),
    ]);
    let mut resolver = RefResolver::new(&cache);

    let resolved = resolver.resolve("./limit.yaml", &at(&cache, "/api.yaml", "#/x")).unwrap();
    assert_eq!(resolved.location.pointer, "#/");
    assert_eq!(resolved.content.at("#/in"), Some(&Node::string("query")));
}

#[test]
fn test_identity_across_documents() {
    let cache = cache(&[
        ("/a.yaml", "x: {$ref: 'c.yaml#/Id'}"),
        ("/b.yaml", "y: {$ref: './c.yaml#/Id'}"),
        ("/c.yaml", "Id: {type: string}"),
    ]);
    let mut resolver = RefResolver::new(&cache);

    let from_a = resolver.resolve("c.yaml#/Id", &at(&cache, "/a.yaml", "#/x")).unwrap();
    let from_b = resolver.resolve("./c.yaml#/Id", &at(&cache, "/b.yaml", "#/y")).unwrap();
    assert!(Rc::ptr_eq(&from_a, &from_b));
    assert_eq!(cache.len(), 3);
}

#[test]
fn test_cross_document_cycle_is_flagged_on_reentry() {
    let cache = cache(&[
        ("/a.yaml", "A:\n  properties:\n    b: {$ref: 'b.yaml#/B'}"),
        ("/b.yaml", "B:\n  properties:\n    a: {$ref: 'a.yaml#/A'}"),
    ]);
    let mut resolver = RefResolver::new(&cache);

    let a = at(&cache, "/a.yaml", "#/A");
    resolver.enter(&a.absolute_pointer());
    let b = resolver.resolve("b.yaml#/B", &a.child(["properties", "b"])).unwrap();
    assert!(!b.is_circular());

    resolver.enter(&b.location.absolute_pointer());
    let again = resolver
        .resolve("a.yaml#/A", &b.location.child(["properties", "a"]))
        .unwrap();
    assert!(again.is_circular());
    assert_eq!(again.location, a);
}

#[test]
fn test_long_ref_chain_loop_terminates() {
    let documents: Vec<(String, String)> = (0..50)
        .map(|i| (format!("/doc{i}.yaml"), format!("X: {{$ref: 'doc{}.yaml#/X'}}", (i + 1) % 50)))
        .collect();
    let mut loader = MemoryLoader::new();
    for (id, text) in &documents {
        loader.insert(id.as_str(), text.as_str());
    }
    let cache = SourceCache::new(loader);
    let mut resolver = RefResolver::new(&cache);

    let resolved = resolver
        .resolve("doc0.yaml#/X", &at(&cache, "/doc0.yaml", "#/start"))
        .unwrap();
    assert!(resolved.is_circular());
}

#[test]
fn test_missing_document_is_a_load_error() {
    let cache = cache(&[("/api.yaml", "x: {$ref: 'nope.yaml'}")]);
    let mut resolver = RefResolver::new(&cache);

    let err = resolver
        .resolve("nope.yaml", &at(&cache, "/api.yaml", "#/x"))
        .unwrap_err();
    assert!(matches!(err, RefError::Load { .. }));
}

#[test]
fn test_percent_encoded_pointer() {
    let cache = cache(&[("/api.yaml", "paths:\n  /pets/{id}: {get: {summary: Pet}}")]);
    let mut resolver = RefResolver::new(&cache);

    let resolved = resolver
        .resolve("#/paths/~1pets~1%7Bid%7D/get", &at(&cache, "/api.yaml", "#/x"))
        .unwrap();
    assert_eq!(resolved.content.at("#/summary"), Some(&Node::string("Pet")));
}
