use indexmap::IndexMap;
use serde_json::Number;

/// A parsed document node.
///
/// Refs are an explicit variant rather than a mapping that happens to carry a
/// `$ref` key, so "is this a ref" is always a `match`.
#[derive(Debug, PartialEq, Clone)]
pub enum Node {
    Mapping(IndexMap<String, Node>),
    Sequence(Vec<Node>),
    Scalar(Scalar),
    Ref(String),
}

#[derive(Debug, PartialEq, Clone)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl Node {
    pub fn string(value: impl Into<String>) -> Self {
        Node::Scalar(Scalar::String(value.into()))
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, Node::Ref(_))
    }

    pub fn as_mapping(&self) -> Option<&IndexMap<String, Node>> {
        match self {
            Node::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Looks up one unescaped pointer token: a mapping key, or a base-10
    /// index when this node is a sequence.
    pub fn child(&self, token: &str) -> Option<&Node> {
        match self {
            Node::Mapping(map) => map.get(token),
            Node::Sequence(items) => {
                if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                token.parse::<usize>().ok().and_then(|index| items.get(index))
            }
            _ => None,
        }
    }

    /// Walks a `#/`-prefixed pointer without following refs.
    pub fn at(&self, pointer: &str) -> Option<&Node> {
        crate::pointer::parse_pointer(pointer)
            .iter()
            .try_fold(self, |node, token| node.child(token))
    }

    /// Returns `true` when any ref node occurs in this subtree.
    pub fn contains_ref(&self) -> bool {
        match self {
            Node::Ref(_) => true,
            Node::Mapping(map) => map.values().any(Node::contains_ref),
            Node::Sequence(items) => items.iter().any(Node::contains_ref),
            Node::Scalar(_) => false,
        }
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::String(s) => write!(f, "{s}"),
        }
    }
}
