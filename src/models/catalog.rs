use serde::{Deserialize, Serialize};

/// A named structural container (section, category group, volume, entry type)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: i64,
    pub handle: String,
    pub name: String,
}

impl CatalogEntry {
    pub fn new(id: i64, handle: &str, name: &str) -> Self {
        Self {
            id,
            handle: handle.to_string(),
            name: name.to_string(),
        }
    }
}

/// Snapshot of the structural containers elements can belong to.
///
/// Selection rules resolve their closed option sets from this snapshot, so a rule
/// built after a new category group is created offers that group too.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub sections: Vec<CatalogEntry>,
    pub entry_types: Vec<CatalogEntry>,
    pub category_groups: Vec<CatalogEntry>,
    pub tag_groups: Vec<CatalogEntry>,
    pub volumes: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_section(mut self, entry: CatalogEntry) -> Self {
        self.sections.push(entry);
        self
    }

    pub fn with_entry_type(mut self, entry: CatalogEntry) -> Self {
        self.entry_types.push(entry);
        self
    }

    pub fn with_category_group(mut self, entry: CatalogEntry) -> Self {
        self.category_groups.push(entry);
        self
    }

    pub fn with_tag_group(mut self, entry: CatalogEntry) -> Self {
        self.tag_groups.push(entry);
        self
    }

    pub fn with_volume(mut self, entry: CatalogEntry) -> Self {
        self.volumes.push(entry);
        self
    }

    /// Ids of the given entries rendered as option values
    pub fn option_values(entries: &[CatalogEntry]) -> Vec<String> {
        entries.iter().map(|entry| entry.id.to_string()).collect()
    }
}
