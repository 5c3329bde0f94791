use serde::{Deserialize, Serialize};

/// Custom field types that contribute condition rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    PlainText,
    Number,
    Dropdown { options: Vec<String> },
    Date,
    Entries,
    Categories,
}

/// A custom field attached to an element type's field layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub handle: String,
    pub name: String,
    pub field_type: FieldType,
}

impl FieldDefinition {
    pub fn new(handle: &str, name: &str, field_type: FieldType) -> Self {
        Self {
            handle: handle.to_string(),
            name: name.to_string(),
            field_type,
        }
    }

    /// Whether values of this field are relations to other elements
    pub fn is_relational(&self) -> bool {
        matches!(self.field_type, FieldType::Entries | FieldType::Categories)
    }
}
