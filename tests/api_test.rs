use refbundle_core::api::{bundle, dereference};
use refbundle_core::{BundleOptions, MemoryLoader, OutputFormat, SourceCache};

fn petstore() -> SourceCache {
    SourceCache::new(
        MemoryLoader::new()
            .with_document(
                "/api/openapi.yaml",
                r#"
openapi: 3.1.0
info:
  title: My App
  version: "1.0"
paths:
  /pets:
    get:
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                $ref: ./pet.json#/Pet
"#,
            )
            .with_document(
                "/api/pet.json",
                r#"{ "Pet": { "type": "object", "properties": { "name": { "type": "string" } } } }"#,
            ),
    )
}

#[test]
fn test_simple_bundle_to_json() {
    let expected_json = serde_json::json!({
        "openapi": "3.1.0",
        "info": { "title": "My App", "version": "1.0" },
        "paths": {
            "/pets": {
                "get": {
                    "responses": {
                        "200": {
                            "description": "ok",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Pet" }
                                }
                            }
                        }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Pet": { "type": "object", "properties": { "name": { "type": "string" } } }
            }
        }
    });

    let result = bundle("/api/openapi.yaml", &petstore(), &BundleOptions::default()).unwrap();
    let json = result.document.dump(OutputFormat::Json).unwrap();
    let result_json: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(result_json, expected_json);
}

#[test]
fn test_key_order_is_preserved() {
    let result = bundle("/api/openapi.yaml", &petstore(), &BundleOptions::default()).unwrap();
    let json = result.document.dump(OutputFormat::Json).unwrap();

    let positions: Vec<usize> = ["\"openapi\"", "\"info\"", "\"paths\"", "\"components\""]
        .iter()
        .map(|key| json.find(key).unwrap())
        .collect();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn test_simple_dereference_to_yaml() {
    let result = dereference("/api/openapi.yaml", &petstore()).unwrap();
    let yaml = result.document.dump(OutputFormat::Yaml).unwrap();

    let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(
        value["paths"]["/pets"]["get"]["responses"]["200"]["content"]["application/json"]["schema"]["type"],
        serde_yaml::Value::String("object".to_string())
    );
    assert!(!yaml.contains("$ref"));
    assert!(!yaml.contains("components"));
}
