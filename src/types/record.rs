use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn default_weight() -> f64 {
    1.0
}

fn default_node_type() -> String {
    "unknown".to_string()
}

fn default_relationship_type() -> String {
    "related".to_string()
}

/// Attribute key marking a node as an entry point into the graph.
pub const ENTRY_POINT_ATTR: &str = "entry_point";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeRecord {
    pub id: String,

    #[serde(default = "default_node_type", rename = "type")]
    pub node_type: String,

    #[serde(default)]
    pub label: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source: Option<String>,

    #[serde(skip_serializing_if = "Map::is_empty", default)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelationshipRecord {
    pub source: String,

    pub target: String,

    #[serde(default = "default_weight")]
    pub weight: f64,

    #[serde(default = "default_relationship_type", rename = "type")]
    pub relationship_type: String,

    #[serde(skip_serializing_if = "Map::is_empty", default)]
    pub attributes: Map<String, Value>,
}

impl NodeRecord {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            node_type: default_node_type(),
            source: None,
            attributes: Map::new(),
        }
    }

    pub fn with_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = node_type.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn is_entry_point(&self) -> bool {
        matches!(self.attributes.get(ENTRY_POINT_ATTR), Some(Value::Bool(true)))
    }
}

impl RelationshipRecord {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            weight: default_weight(),
            relationship_type: default_relationship_type(),
            attributes: Map::new(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_type(mut self, relationship_type: impl Into<String>) -> Self {
        self.relationship_type = relationship_type.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationship_defaults_from_json() {
        let rel: RelationshipRecord =
            serde_json::from_str(r#"{"source": "a", "target": "b"}"#).unwrap();
        assert_eq!(rel.weight, 1.0);
        assert_eq!(rel.relationship_type, "related");
        assert!(rel.attributes.is_empty());
    }

    #[test]
    fn test_node_entry_point_flag() {
        let node = NodeRecord::new("urn:e:1").with_attribute(ENTRY_POINT_ATTR, Value::Bool(true));
        assert!(node.is_entry_point());
        assert!(!NodeRecord::new("urn:e:2").is_entry_point());

        let parsed: NodeRecord =
            serde_json::from_str(r#"{"id": "x", "type": "Entity", "attributes": {"entry_point": "yes"}}"#)
                .unwrap();
        assert_eq!(parsed.node_type, "Entity");
        assert!(!parsed.is_entry_point());
    }
}
