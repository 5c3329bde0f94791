use super::ElementType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where a filterable value lives on an element
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum ValueSource {
    /// Native attribute such as `slug` or `sectionId`
    Attribute(String),
    /// Custom field value keyed by field handle
    Field(String),
}

impl ValueSource {
    pub fn attribute(name: impl Into<String>) -> Self {
        Self::Attribute(name.into())
    }

    pub fn field(handle: impl Into<String>) -> Self {
        Self::Field(handle.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Attribute(name) | Self::Field(name) => name,
        }
    }
}

/// An outgoing relation from one element to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRelation {
    pub target_id: i64,
    /// Handle of the relation field the link was made through
    pub field: Option<String>,
}

/// A materialized content element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: i64,
    pub element_type: ElementType,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub relations: Vec<ElementRelation>,
}

impl Element {
    pub fn new(id: i64, element_type: ElementType) -> Self {
        Self {
            id,
            element_type,
            attributes: Map::new(),
            fields: Map::new(),
            relations: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn with_field(mut self, handle: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(handle.to_string(), value.into());
        self
    }

    pub fn with_relation(mut self, target_id: i64, field: Option<&str>) -> Self {
        self.relations.push(ElementRelation {
            target_id,
            field: field.map(str::to_string),
        });
        self
    }

    /// Native attribute value, `id` included
    pub fn attribute(&self, name: &str) -> Option<Value> {
        if name == "id" {
            return Some(Value::from(self.id));
        }
        self.attributes.get(name).cloned()
    }

    pub fn field(&self, handle: &str) -> Option<&Value> {
        self.fields.get(handle)
    }

    /// Resolve a value source against this element
    pub fn value(&self, source: &ValueSource) -> Option<Value> {
        match source {
            ValueSource::Attribute(name) => self.attribute(name),
            ValueSource::Field(handle) => self.field(handle).cloned(),
        }
    }

    /// Whether the element links to any of `target_ids`, optionally through one field
    pub fn is_related_to(&self, target_ids: &[i64], field: Option<&str>) -> bool {
        self.relations.iter().any(|relation| {
            target_ids.contains(&relation.target_id)
                && field.map_or(true, |f| relation.field.as_deref() == Some(f))
        })
    }

    /// Flattened array shape used when a query asks for raw rows
    pub fn to_array(&self) -> Value {
        let mut row = Map::new();
        row.insert("id".to_string(), Value::from(self.id));
        row.insert(
            "type".to_string(),
            Value::String(self.element_type.type_value().to_string()),
        );
        for (name, value) in &self.attributes {
            row.insert(name.clone(), value.clone());
        }
        for (handle, value) in &self.fields {
            row.insert(format!("field:{handle}"), value.clone());
        }
        Value::Object(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_resolution() {
        let element = Element::new(7, ElementType::Entry)
            .with_attribute("slug", "hello")
            .with_field("price", 12.5);

        assert_eq!(element.value(&ValueSource::attribute("id")), Some(json!(7)));
        assert_eq!(
            element.value(&ValueSource::attribute("slug")),
            Some(json!("hello"))
        );
        assert_eq!(element.value(&ValueSource::field("price")), Some(json!(12.5)));
        assert_eq!(element.value(&ValueSource::field("missing")), None);
    }

    #[test]
    fn test_relation_lookup() {
        let element = Element::new(1, ElementType::Entry)
            .with_relation(10, Some("categories"))
            .with_relation(11, None);

        assert!(element.is_related_to(&[10, 99], None));
        assert!(element.is_related_to(&[10], Some("categories")));
        assert!(!element.is_related_to(&[11], Some("categories")));
        assert!(!element.is_related_to(&[12], None));
    }

    #[test]
    fn test_array_shape() {
        let element = Element::new(3, ElementType::Tag)
            .with_attribute("title", "Rust")
            .with_field("color", "orange");

        let row = element.to_array();
        assert_eq!(row["id"], json!(3));
        assert_eq!(row["type"], json!("tag"));
        assert_eq!(row["title"], json!("Rust"));
        assert_eq!(row["field:color"], json!("orange"));
    }
}
