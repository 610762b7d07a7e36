use crate::node::{Node, Scalar};
use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Number;

/// Textual formats the output tree can be dumped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    #[default]
    Yaml,
}

impl OutputFormat {
    /// Picks a format from a file extension, if it names one.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "json" => Some(OutputFormat::Json),
            "yaml" | "yml" => Some(OutputFormat::Yaml),
            _ => None,
        }
    }
}

impl Node {
    /// Parses YAML or JSON text into a node tree.
    ///
    /// # Errors
    /// Returns a `serde_yaml::Error` if the text is not well-formed.
    pub fn parse(text: &str) -> Result<Node, serde_yaml::Error> {
        let value: serde_yaml::Value = serde_yaml::from_str(text)?;
        Ok(from_yaml(value))
    }

    /// Serializes the node tree into a pretty-printed JSON string.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Serializes the node tree into a YAML string.
    ///
    /// # Errors
    /// Returns a `serde_yaml::Error` if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Dumps the tree in the requested format.
    pub fn dump(&self, format: OutputFormat) -> Result<String, crate::error::BundleError> {
        let text = match format {
            OutputFormat::Json => self.to_json().map_err(|e| e.to_string()),
            OutputFormat::Yaml => self.to_yaml().map_err(|e| e.to_string()),
        };
        text.map_err(|message| crate::error::BundleError::Serialize { message })
    }
}

pub(crate) fn from_yaml(value: serde_yaml::Value) -> Node {
    use serde_yaml::Value;

    match value {
        Value::Null => Node::Scalar(Scalar::Null),
        Value::Bool(b) => Node::Scalar(Scalar::Bool(b)),
        Value::Number(n) => Node::Scalar(number_scalar(&n)),
        Value::String(s) => Node::string(s),
        Value::Sequence(items) => Node::Sequence(items.into_iter().map(from_yaml).collect()),
        Value::Mapping(mapping) => {
            if let Some(Value::String(reference)) = mapping.get("$ref") {
                if mapping.len() > 1 {
                    log::debug!("dropping {} sibling key(s) of $ref {reference}", mapping.len() - 1);
                }
                return Node::Ref(reference.clone());
            }
            let mut map = IndexMap::with_capacity(mapping.len());
            for (key, value) in mapping {
                match mapping_key(&key) {
                    Some(key) => {
                        map.insert(key, from_yaml(value));
                    }
                    None => log::debug!("skipping non-scalar mapping key {key:?}"),
                }
            }
            Node::Mapping(map)
        }
        Value::Tagged(tagged) => from_yaml(tagged.value),
    }
}

fn number_scalar(n: &serde_yaml::Number) -> Scalar {
    if let Some(i) = n.as_i64() {
        Scalar::Number(Number::from(i))
    } else if let Some(u) = n.as_u64() {
        Scalar::Number(Number::from(u))
    } else {
        // NaN and infinities have no JSON number form.
        let f = n.as_f64().unwrap_or(f64::NAN);
        Number::from_f64(f)
            .map(Scalar::Number)
            .unwrap_or_else(|| Scalar::String(n.to_string()))
    }
}

fn mapping_key(key: &serde_yaml::Value) -> Option<String> {
    use serde_yaml::Value;

    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some("null".to_string()),
        _ => None,
    }
}

impl Serialize for Node {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Node::Mapping(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
            Node::Sequence(items) => items.serialize(serializer),
            Node::Scalar(scalar) => scalar.serialize(serializer),
            Node::Ref(reference) => {
                let mut out = serializer.serialize_map(Some(1))?;
                out.serialize_entry("$ref", reference)?;
                out.end()
            }
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Scalar::Null => serializer.serialize_unit(),
            Scalar::Bool(b) => serializer.serialize_bool(*b),
            Scalar::Number(n) => n.serialize(serializer),
            Scalar::String(s) => serializer.serialize_str(s),
        }
    }
}
