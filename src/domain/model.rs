use crate::utils::error::{ApiError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub type EntityId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Item,
    ItemSet,
    Media,
}

impl EntityKind {
    pub fn entity_class(&self) -> &'static str {
        match self {
            EntityKind::Item => "Item",
            EntityKind::ItemSet => "ItemSet",
            EntityKind::Media => "Media",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entity_class())
    }
}

/// A literal property value, e.g. one entry of `dcterms:title`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueLiteral {
    #[serde(rename = "@value")]
    pub value: String,
}

impl ValueLiteral {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Fields every API resource carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub values: BTreeMap<String, Vec<ValueLiteral>>,
}

impl Default for Resource {
    fn default() -> Self {
        Self {
            id: None,
            is_public: true,
            created: None,
            modified: None,
            values: BTreeMap::new(),
        }
    }
}

impl Resource {
    pub fn with_id(id: EntityId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// 第一個 `dcterms:title` 值
    pub fn title(&self) -> Option<&str> {
        self.values
            .get("dcterms:title")
            .and_then(|values| values.first())
            .map(|literal| literal.value.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(default)]
    pub item_sets: BTreeSet<EntityId>,
    #[serde(default)]
    pub media: Vec<Media>,
}

impl Item {
    pub fn with_id(id: EntityId) -> Self {
        Self {
            resource: Resource::with_id(id),
            ..Self::default()
        }
    }

    pub fn id(&self) -> Option<EntityId> {
        self.resource.id
    }

    pub fn media_ids(&self) -> Vec<EntityId> {
        self.media.iter().filter_map(|m| m.resource.id).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemSet {
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(default)]
    pub is_open: bool,
}

impl ItemSet {
    pub fn with_id(id: EntityId) -> Self {
        Self {
            resource: Resource::with_id(id),
            ..Self::default()
        }
    }

    pub fn id(&self) -> Option<EntityId> {
        self.resource.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Media {
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(default)]
    pub item_id: Option<EntityId>,
    #[serde(default)]
    pub ingester: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl Media {
    pub fn with_id(id: EntityId) -> Self {
        Self {
            resource: Resource::with_id(id),
            ..Self::default()
        }
    }

    /// A fresh, unsaved media record owned by `item_id`.
    pub fn owned_by(item_id: Option<EntityId>) -> Self {
        Self {
            item_id,
            ..Self::default()
        }
    }

    pub fn id(&self) -> Option<EntityId> {
        self.resource.id
    }
}

/// Any persisted record the API can hand to an adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Item(Item),
    ItemSet(ItemSet),
    Media(Media),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Item(_) => EntityKind::Item,
            Entity::ItemSet(_) => EntityKind::ItemSet,
            Entity::Media(_) => EntityKind::Media,
        }
    }

    pub fn resource(&self) -> &Resource {
        match self {
            Entity::Item(item) => &item.resource,
            Entity::ItemSet(item_set) => &item_set.resource,
            Entity::Media(media) => &media.resource,
        }
    }

    pub fn resource_mut(&mut self) -> &mut Resource {
        match self {
            Entity::Item(item) => &mut item.resource,
            Entity::ItemSet(item_set) => &mut item_set.resource,
            Entity::Media(media) => &mut media.resource,
        }
    }

    pub fn id(&self) -> Option<EntityId> {
        self.resource().id
    }
}

/// Typed access to one variant of [`Entity`].
pub trait EntityRecord: Clone + Into<Entity> + Send + Sync + 'static {
    const KIND: EntityKind;

    fn resource(&self) -> &Resource;
    fn resource_mut(&mut self) -> &mut Resource;
    fn downcast(entity: Entity) -> std::result::Result<Self, Entity>;
    fn downcast_ref(entity: &Entity) -> Option<&Self>;
    fn downcast_mut(entity: &mut Entity) -> Option<&mut Self>;

    fn from_entity(entity: Entity) -> Result<Self> {
        Self::downcast(entity).map_err(|other| mismatch(Self::KIND, other.kind()))
    }
}

pub(crate) fn mismatch(expected: EntityKind, found: EntityKind) -> ApiError {
    ApiError::EntityMismatch {
        expected: expected.entity_class().to_string(),
        found: found.entity_class().to_string(),
    }
}

macro_rules! entity_record {
    ($ty:ident, $variant:ident) => {
        impl From<$ty> for Entity {
            fn from(record: $ty) -> Self {
                Entity::$variant(record)
            }
        }

        impl EntityRecord for $ty {
            const KIND: EntityKind = EntityKind::$variant;

            fn resource(&self) -> &Resource {
                &self.resource
            }

            fn resource_mut(&mut self) -> &mut Resource {
                &mut self.resource
            }

            fn downcast(entity: Entity) -> std::result::Result<Self, Entity> {
                match entity {
                    Entity::$variant(record) => Ok(record),
                    other => Err(other),
                }
            }

            fn downcast_ref(entity: &Entity) -> Option<&Self> {
                match entity {
                    Entity::$variant(record) => Some(record),
                    _ => None,
                }
            }

            fn downcast_mut(entity: &mut Entity) -> Option<&mut Self> {
                match entity {
                    Entity::$variant(record) => Some(record),
                    _ => None,
                }
            }
        }
    };
}

entity_record!(Item, Item);
entity_record!(ItemSet, ItemSet);
entity_record!(Media, Media);
