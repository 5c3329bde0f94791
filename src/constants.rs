//! # Engine Constants
//!
//! Criterion names, exclusivity groups, rule type identifiers and the default
//! operating limits of the query and condition engine.

/// Names of the criteria an [`ElementQuery`](crate::element_query::ElementQuery) accepts
pub mod criteria {
    pub const ID: &str = "id";
    pub const UID: &str = "uid";
    pub const SITE: &str = "site";
    pub const SITE_ID: &str = "siteId";
    pub const STATUS: &str = "status";
    pub const SLUG: &str = "slug";
    pub const TITLE: &str = "title";
    pub const DATE_CREATED: &str = "dateCreated";
    pub const DATE_UPDATED: &str = "dateUpdated";
    pub const RELATED_TO: &str = "relatedTo";

    // Entries
    pub const SECTION: &str = "section";
    pub const SECTION_ID: &str = "sectionId";
    pub const TYPE: &str = "type";
    pub const TYPE_ID: &str = "typeId";
    pub const AUTHOR_ID: &str = "authorId";
    pub const POST_DATE: &str = "postDate";

    // Categories
    pub const GROUP: &str = "group";
    pub const GROUP_ID: &str = "groupId";

    // Assets
    pub const VOLUME: &str = "volume";
    pub const VOLUME_ID: &str = "volumeId";
    pub const KIND: &str = "kind";
    pub const FILENAME: &str = "filename";

    // Users
    pub const EMAIL: &str = "email";
    pub const USERNAME: &str = "username";
}

/// Criteria that cannot be set together on one query
pub mod exclusivity {
    use super::criteria;

    /// Each group lists criteria that address the same logical filter
    pub const GROUPS: &[&[&str]] = &[
        &[criteria::SECTION, criteria::SECTION_ID],
        &[criteria::GROUP, criteria::GROUP_ID],
        &[criteria::SITE, criteria::SITE_ID],
        &[criteria::TYPE, criteria::TYPE_ID],
        &[criteria::VOLUME, criteria::VOLUME_ID],
    ];

    /// Returns the exclusivity group the criterion belongs to, if any
    pub fn group_of(name: &str) -> Option<&'static [&'static str]> {
        GROUPS.iter().copied().find(|group| group.contains(&name))
    }
}

/// Identifiers of the built-in condition rule types
pub mod rule_types {
    pub const ID: &str = "id";
    pub const SLUG: &str = "slug";
    pub const TITLE: &str = "title";
    pub const STATUS: &str = "status";
    pub const DATE_CREATED: &str = "dateCreated";
    pub const DATE_UPDATED: &str = "dateUpdated";
    pub const RELATED_TO: &str = "relatedTo";
    pub const SECTION: &str = "section";
    pub const ENTRY_TYPE: &str = "entryType";
    pub const AUTHOR: &str = "author";
    pub const POST_DATE: &str = "postDate";
    pub const CATEGORY_GROUP: &str = "categoryGroup";
    pub const TAG_GROUP: &str = "tagGroup";
    pub const VOLUME: &str = "volume";
    pub const FILE_KIND: &str = "fileKind";
    pub const FILENAME: &str = "filename";
    pub const EMAIL: &str = "email";
    pub const USERNAME: &str = "username";

    /// Prefix of rule types contributed by custom fields
    pub const FIELD_PREFIX: &str = "field:";

    /// Separator required in plugin-contributed identifiers (`vendor:Name`)
    pub const PLUGIN_NAMESPACE_SEPARATOR: char = ':';
}

/// Element statuses recognised by the status rule
pub mod statuses {
    pub const LIVE: &str = "live";
    pub const PENDING: &str = "pending";
    pub const EXPIRED: &str = "expired";
    pub const DISABLED: &str = "disabled";
    pub const ENABLED: &str = "enabled";
    pub const ACTIVE: &str = "active";
    pub const SUSPENDED: &str = "suspended";

    pub const ALL: &[&str] = &[LIVE, PENDING, EXPIRED, DISABLED, ENABLED, ACTIVE, SUSPENDED];
}

/// Asset file kinds offered by the file kind rule
pub mod file_kinds {
    pub const ALL: &[&str] = &[
        "access", "audio", "compressed", "excel", "flash", "html", "illustrator", "image",
        "javascript", "json", "pdf", "photoshop", "php", "powerpoint", "text", "video",
        "word", "xml", "unknown",
    ];
}

/// System-wide defaults
pub mod system {
    /// Rows fetched per storage round trip by a cursor
    pub const DEFAULT_PAGE_SIZE: u64 = 100;

    /// Maximum nesting depth of a condition tree
    pub const MAX_CONDITION_DEPTH: usize = 10;

    /// Maximum size of a serialized condition definition (256KB)
    pub const MAX_SERIALIZED_CONDITION_BYTES: usize = 256 * 1024;

    /// Table holding the shared element columns
    pub const ELEMENTS_TABLE: &str = "elements";

    /// Table holding custom field values
    pub const CONTENT_TABLE: &str = "content";

    /// Table holding element relations
    pub const RELATIONS_TABLE: &str = "relations";
}
