use crate::domain::model::{Entity, EntityId, EntityKind, Item, ItemSet, Media};
use crate::domain::ports::EntityStore;
use crate::utils::error::{ApiError, Result};
use chrono::Utc;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Seed data for an [`InMemoryStore`], usually read from a JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixtures {
    #[serde(default)]
    pub item_sets: Vec<ItemSet>,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Fixtures {
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

/// Arena of API records keyed by identifier.
///
/// Items own their media; `media_owners` indexes media ids back to the
/// owning item. All kinds share one id sequence.
#[derive(Debug)]
pub struct InMemoryStore {
    items: BTreeMap<EntityId, Item>,
    item_sets: BTreeMap<EntityId, ItemSet>,
    media_owners: BTreeMap<EntityId, EntityId>,
    next_id: EntityId,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
            item_sets: BTreeMap::new(),
            media_owners: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// 載入種子資料；保留固定的 id，其餘自動編號
    pub fn from_fixtures(fixtures: Fixtures) -> Result<Self> {
        let mut store = Self::new();
        store.reserve_ids(&fixtures)?;

        for item_set in fixtures.item_sets {
            store.persist(Entity::ItemSet(item_set))?;
        }
        for item in fixtures.items {
            store.persist(Entity::Item(item))?;
        }

        tracing::debug!(
            "Loaded fixtures: {} item set(s), {} item(s), {} media",
            store.item_sets.len(),
            store.items.len(),
            store.media_owners.len()
        );
        Ok(store)
    }

    fn reserve_ids(&mut self, fixtures: &Fixtures) -> Result<()> {
        let max_id = fixtures
            .item_sets
            .iter()
            .filter_map(ItemSet::id)
            .chain(fixtures.items.iter().filter_map(Item::id))
            .chain(
                fixtures
                    .items
                    .iter()
                    .flat_map(|item| item.media.iter().filter_map(Media::id)),
            )
            .max()
            .unwrap_or(0);
        let next_id = max_id.checked_add(1).ok_or_else(|| {
            ApiError::bad_request(format!("Fixture id {} leaves no room for new records", max_id))
        })?;
        self.next_id = self.next_id.max(next_id);
        Ok(())
    }

    fn allocate_id(&mut self) -> Result<EntityId> {
        let id = self.next_id;
        self.next_id = id
            .checked_add(1)
            .ok_or_else(|| ApiError::bad_request("No identifiers left to assign"))?;
        Ok(id)
    }

    pub fn item(&self, id: EntityId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn item_set(&self, id: EntityId) -> Option<&ItemSet> {
        self.item_sets.get(&id)
    }

    pub fn media(&self, id: EntityId) -> Option<&Media> {
        let owner = self.media_owners.get(&id)?;
        self.items
            .get(owner)?
            .media
            .iter()
            .find(|media| media.id() == Some(id))
    }

    fn persist_item(&mut self, mut item: Item) -> Result<Item> {
        let now = Utc::now();
        let item_id = match item.resource.id {
            Some(id) => {
                if self.items.contains_key(&id) {
                    item.resource.modified = Some(now);
                }
                id
            }
            None => self.allocate_id()?,
        };
        item.resource.id = Some(item_id);
        item.resource.created.get_or_insert(now);

        if let Some(missing) = item
            .item_sets
            .iter()
            .find(|id| !self.item_sets.contains_key(*id))
        {
            return Err(ApiError::not_found(EntityKind::ItemSet.entity_class(), *missing));
        }

        for media in &mut item.media {
            if media.resource.id.is_none() {
                media.resource.id = Some(self.allocate_id()?);
            }
            media.resource.created.get_or_insert(now);
            media.item_id = Some(item_id);
        }

        self.media_owners.retain(|_, owner| *owner != item_id);
        for media_id in item.media_ids() {
            self.media_owners.insert(media_id, item_id);
        }

        self.items.insert(item_id, item.clone());
        Ok(item)
    }

    fn persist_item_set(&mut self, mut item_set: ItemSet) -> Result<ItemSet> {
        let now = Utc::now();
        let id = match item_set.resource.id {
            Some(id) => {
                if self.item_sets.contains_key(&id) {
                    item_set.resource.modified = Some(now);
                }
                id
            }
            None => self.allocate_id()?,
        };
        item_set.resource.id = Some(id);
        item_set.resource.created.get_or_insert(now);

        self.item_sets.insert(id, item_set.clone());
        Ok(item_set)
    }

    fn persist_media(&mut self, mut media: Media) -> Result<Media> {
        let item_id = media.item_id.ok_or_else(|| {
            ApiError::bad_request("Media must belong to an item before it can be stored")
        })?;
        if !self.items.contains_key(&item_id) {
            return Err(ApiError::not_found(EntityKind::Item.entity_class(), item_id));
        }

        let now = Utc::now();
        let media_id = match media.resource.id {
            Some(id) => {
                if self.media_owners.contains_key(&id) {
                    media.resource.modified = Some(now);
                }
                id
            }
            None => self.allocate_id()?,
        };
        media.resource.id = Some(media_id);
        media.resource.created.get_or_insert(now);

        // 媒體改掛到另一個項目時先從原項目移除
        if let Some(previous) = self.media_owners.insert(media_id, item_id) {
            if previous != item_id {
                if let Some(owner) = self.items.get_mut(&previous) {
                    owner.media.retain(|m| m.id() != Some(media_id));
                }
            }
        }

        if let Some(owner) = self.items.get_mut(&item_id) {
            match owner.media.iter_mut().find(|m| m.id() == Some(media_id)) {
                Some(slot) => *slot = media.clone(),
                None => owner.media.push(media.clone()),
            }
        }
        Ok(media)
    }
}

impl EntityStore for InMemoryStore {
    fn find(&self, kind: EntityKind, id: EntityId) -> Option<Entity> {
        match kind {
            EntityKind::Item => self.item(id).cloned().map(Entity::Item),
            EntityKind::ItemSet => self.item_set(id).cloned().map(Entity::ItemSet),
            EntityKind::Media => self.media(id).cloned().map(Entity::Media),
        }
    }

    fn exists(&self, kind: EntityKind, id: EntityId) -> bool {
        match kind {
            EntityKind::Item => self.items.contains_key(&id),
            EntityKind::ItemSet => self.item_sets.contains_key(&id),
            EntityKind::Media => self.media_owners.contains_key(&id),
        }
    }

    fn all(&self, kind: EntityKind) -> Vec<Entity> {
        match kind {
            EntityKind::Item => self.items.values().cloned().map(Entity::Item).collect(),
            EntityKind::ItemSet => self
                .item_sets
                .values()
                .cloned()
                .map(Entity::ItemSet)
                .collect(),
            EntityKind::Media => self
                .media_owners
                .keys()
                .filter_map(|id| self.media(*id))
                .cloned()
                .map(Entity::Media)
                .collect(),
        }
    }

    fn persist(&mut self, entity: Entity) -> Result<Entity> {
        match entity {
            Entity::Item(item) => self.persist_item(item).map(Entity::Item),
            Entity::ItemSet(item_set) => self.persist_item_set(item_set).map(Entity::ItemSet),
            Entity::Media(media) => self.persist_media(media).map(Entity::Media),
        }
    }

    fn remove(&mut self, kind: EntityKind, id: EntityId) -> Result<Entity> {
        let not_found = || ApiError::not_found(kind.entity_class(), id);
        match kind {
            EntityKind::Item => {
                let item = self.items.remove(&id).ok_or_else(not_found)?;
                self.media_owners.retain(|_, owner| *owner != id);
                Ok(Entity::Item(item))
            }
            EntityKind::ItemSet => {
                let item_set = self.item_sets.remove(&id).ok_or_else(not_found)?;
                for item in self.items.values_mut() {
                    item.item_sets.remove(&id);
                }
                Ok(Entity::ItemSet(item_set))
            }
            EntityKind::Media => {
                let owner_id = self.media_owners.remove(&id).ok_or_else(not_found)?;
                let owner = self.items.get_mut(&owner_id).ok_or_else(not_found)?;
                let position = owner
                    .media
                    .iter()
                    .position(|m| m.id() == Some(id))
                    .ok_or_else(not_found)?;
                Ok(Entity::Media(owner.media.remove(position)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixtures() -> Fixtures {
        Fixtures::from_json_str(
            r#"{
                "item_sets": [{"id": 1}, {"id": 2}],
                "items": [
                    {"id": 5, "item_sets": [1, 2], "media": [{"id": 10}, {"id": 11}]}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_fixtures_keep_ids_and_index_media() {
        let store = InMemoryStore::from_fixtures(fixtures()).unwrap();

        assert!(store.exists(EntityKind::ItemSet, 2));
        assert_eq!(store.media(11).and_then(|m| m.item_id), Some(5));
        assert_eq!(store.all(EntityKind::Media).len(), 2);
    }

    #[test]
    fn test_new_records_continue_the_sequence() {
        let mut store = InMemoryStore::from_fixtures(fixtures()).unwrap();

        let mut item = Item::default();
        item.media.push(Media::default());
        let stored = store.persist(Entity::Item(item)).unwrap();

        let Entity::Item(stored) = stored else {
            panic!("expected an item");
        };
        assert_eq!(stored.id(), Some(12));
        assert_eq!(stored.media_ids(), vec![13]);
        assert!(stored.resource.created.is_some());
        assert!(stored.resource.modified.is_none());
    }

    #[test]
    fn test_persist_item_drops_unlinked_media_index() {
        let mut store = InMemoryStore::from_fixtures(fixtures()).unwrap();

        let mut item = store.item(5).cloned().unwrap();
        item.media.retain(|m| m.id() == Some(10));
        store.persist(Entity::Item(item)).unwrap();

        assert!(store.exists(EntityKind::Media, 10));
        assert!(!store.exists(EntityKind::Media, 11));
        assert!(store.item(5).unwrap().resource.modified.is_some());
    }

    #[test]
    fn test_persist_item_rejects_missing_item_set() {
        let mut store = InMemoryStore::from_fixtures(fixtures()).unwrap();

        let mut item = Item::default();
        item.item_sets.insert(42);

        let err = store.persist(Entity::Item(item)).unwrap_err();
        assert_eq!(err.to_string(), "ItemSet entity with ID 42 not found");
    }

    #[test]
    fn test_remove_item_set_unlinks_members() {
        let mut store = InMemoryStore::from_fixtures(fixtures()).unwrap();

        store.remove(EntityKind::ItemSet, 1).unwrap();

        assert_eq!(store.item(5).unwrap().item_sets.len(), 1);
        assert!(store.remove(EntityKind::ItemSet, 1).is_err());
    }

    #[test]
    fn test_remove_item_cascades_media() {
        let mut store = InMemoryStore::from_fixtures(fixtures()).unwrap();

        store.remove(EntityKind::Item, 5).unwrap();

        assert!(store.find(EntityKind::Media, 10).is_none());
        assert!(store.all(EntityKind::Media).is_empty());
    }

    #[test]
    fn test_persist_media_attaches_to_owner() {
        let mut store = InMemoryStore::from_fixtures(fixtures()).unwrap();

        let stored = store
            .persist(Entity::Media(Media::owned_by(Some(5))))
            .unwrap();

        assert_eq!(stored.id(), Some(12));
        assert_eq!(store.item(5).unwrap().media_ids(), vec![10, 11, 12]);

        let orphan = store.persist(Entity::Media(Media::owned_by(Some(99))));
        assert!(matches!(orphan, Err(ApiError::NotFound { id: 99, .. })));
    }

    #[test]
    fn test_fixture_id_at_limit_is_rejected() {
        let fixtures =
            Fixtures::from_json_str(r#"{"item_sets": [{"id": 18446744073709551615}]}"#).unwrap();

        let err = InMemoryStore::from_fixtures(fixtures).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest { .. }));
    }

    #[test]
    fn test_exhausted_id_sequence_is_an_error() {
        let mut store = InMemoryStore::new();
        store.next_id = EntityId::MAX;

        let err = store
            .persist(Entity::ItemSet(ItemSet::default()))
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest { .. }));
        assert!(store.all(EntityKind::ItemSet).is_empty());
    }
}
