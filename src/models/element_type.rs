use crate::constants::{criteria, system};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Element type definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Entry,
    Asset,
    Category,
    Tag,
    User,
}

/// Attributes stored on the shared elements table for every element type
const SHARED_ATTRIBUTES: &[&str] = &[
    criteria::ID,
    criteria::UID,
    criteria::SITE_ID,
    criteria::STATUS,
    criteria::SLUG,
    criteria::TITLE,
    criteria::DATE_CREATED,
    criteria::DATE_UPDATED,
];

impl ElementType {
    pub const ALL: [ElementType; 5] = [
        Self::Entry,
        Self::Asset,
        Self::Category,
        Self::Tag,
        Self::User,
    ];

    /// Table holding the type-specific columns
    pub fn table(&self) -> &'static str {
        match self {
            Self::Entry => "entries",
            Self::Asset => "assets",
            Self::Category => "categories",
            Self::Tag => "tags",
            Self::User => "users",
        }
    }

    /// Discriminator stored in `elements.type`
    pub fn type_value(&self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::Asset => "asset",
            Self::Category => "category",
            Self::Tag => "tag",
            Self::User => "user",
        }
    }

    /// Table that stores the named native attribute for this element type
    pub fn attribute_table(&self, attribute: &str) -> &'static str {
        if SHARED_ATTRIBUTES.contains(&attribute) {
            system::ELEMENTS_TABLE
        } else {
            self.table()
        }
    }

    /// Whether the element type supports the given type-specific criterion
    pub fn supports_criterion(&self, name: &str) -> bool {
        if SHARED_ATTRIBUTES.contains(&name)
            || name == criteria::SITE
            || name == criteria::RELATED_TO
        {
            return true;
        }

        let specific: &[&str] = match self {
            Self::Entry => &[
                criteria::SECTION,
                criteria::SECTION_ID,
                criteria::TYPE,
                criteria::TYPE_ID,
                criteria::AUTHOR_ID,
                criteria::POST_DATE,
            ],
            Self::Asset => &[
                criteria::VOLUME,
                criteria::VOLUME_ID,
                criteria::KIND,
                criteria::FILENAME,
            ],
            Self::Category | Self::Tag => &[criteria::GROUP, criteria::GROUP_ID],
            Self::User => &[criteria::EMAIL, criteria::USERNAME],
        };
        specific.contains(&name)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_value())
    }
}

impl std::str::FromStr for ElementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entry" => Ok(Self::Entry),
            "asset" => Ok(Self::Asset),
            "category" => Ok(Self::Category),
            "tag" => Ok(Self::Tag),
            "user" => Ok(Self::User),
            _ => Err(format!("Invalid element type: {s}")),
        }
    }
}
