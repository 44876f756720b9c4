use crate::domain::model::{Entity, EntityId};
use std::cmp::Ordering;

pub const DEFAULT_PER_PAGE: usize = 25;

/// A single filter applied to a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Id(EntityId),
    IsPublic(bool),
    /// Case-insensitive substring match over property values.
    ValueContains(String),
    /// Item belongs to the given item set.
    InItemSet(EntityId),
    /// Media owned by the given item.
    OwnedBy(EntityId),
}

impl Constraint {
    pub fn matches(&self, entity: &Entity) -> bool {
        match self {
            Constraint::Id(id) => entity.id() == Some(*id),
            Constraint::IsPublic(flag) => entity.resource().is_public == *flag,
            Constraint::ValueContains(needle) => {
                let needle = needle.to_lowercase();
                entity
                    .resource()
                    .values
                    .values()
                    .flatten()
                    .any(|literal| literal.value.to_lowercase().contains(&needle))
            }
            Constraint::InItemSet(item_set_id) => match entity {
                Entity::Item(item) => item.item_sets.contains(item_set_id),
                _ => false,
            },
            Constraint::OwnedBy(item_id) => match entity {
                Entity::Media(media) => media.item_id == Some(*item_id),
                _ => false,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    IsPublic,
    Created,
    Modified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

/// Accumulates search constraints, ordering and paging for one request.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    constraints: Vec<Constraint>,
    sort: (SortField, SortOrder),
    page: Option<usize>,
    per_page: usize,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_PER_PAGE)
    }
}

impl QueryBuilder {
    pub fn new(per_page: usize) -> Self {
        Self {
            constraints: Vec::new(),
            sort: (SortField::Id, SortOrder::Asc),
            page: None,
            per_page: per_page.max(1),
        }
    }

    pub fn and_where(&mut self, constraint: Constraint) -> &mut Self {
        self.constraints.push(constraint);
        self
    }

    pub fn order_by(&mut self, field: SortField, order: SortOrder) -> &mut Self {
        self.sort = (field, order);
        self
    }

    /// Pages are 1-based; page 0 is treated as page 1.
    pub fn paginate(&mut self, page: usize, per_page: Option<usize>) -> &mut Self {
        self.page = Some(page.max(1));
        if let Some(per_page) = per_page {
            self.per_page = per_page.max(1);
        }
        self
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn sort(&self) -> (SortField, SortOrder) {
        self.sort
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        self.constraints.iter().all(|c| c.matches(entity))
    }

    /// 篩選、排序並分頁，回傳結果與分頁前的總數
    pub fn apply(&self, entities: Vec<Entity>) -> (Vec<Entity>, usize) {
        let mut matched: Vec<Entity> = entities.into_iter().filter(|e| self.matches(e)).collect();
        let total = matched.len();

        let (field, order) = self.sort;
        matched.sort_by(|a, b| {
            let ordering = compare(field, a, b).then_with(|| a.id().cmp(&b.id()));
            match order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        if let Some(page) = self.page {
            let offset = (page - 1).saturating_mul(self.per_page);
            matched = matched.into_iter().skip(offset).take(self.per_page).collect();
        }

        (matched, total)
    }
}

fn compare(field: SortField, a: &Entity, b: &Entity) -> Ordering {
    let (a, b) = (a.resource(), b.resource());
    match field {
        SortField::Id => a.id.cmp(&b.id),
        SortField::IsPublic => a.is_public.cmp(&b.is_public),
        SortField::Created => a.created.cmp(&b.created),
        SortField::Modified => a.modified.cmp(&b.modified),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Item, ValueLiteral};

    fn item(id: EntityId, item_sets: &[EntityId], is_public: bool) -> Entity {
        let mut item = Item::with_id(id);
        item.item_sets = item_sets.iter().copied().collect();
        item.resource.is_public = is_public;
        item.into()
    }

    #[test]
    fn test_in_item_set_constraint() {
        let mut qb = QueryBuilder::default();
        qb.and_where(Constraint::InItemSet(5));

        let (results, total) = qb.apply(vec![
            item(1, &[5], true),
            item(2, &[3], true),
            item(3, &[3, 5], true),
        ]);

        assert_eq!(total, 2);
        let ids: Vec<_> = results.iter().filter_map(Entity::id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_sort_desc_and_paginate() {
        let mut qb = QueryBuilder::new(2);
        qb.order_by(SortField::Id, SortOrder::Desc).paginate(2, None);

        let (results, total) = qb.apply((1..=5).map(|id| item(id, &[], true)).collect());

        assert_eq!(total, 5);
        let ids: Vec<_> = results.iter().filter_map(Entity::id).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn test_value_contains_is_case_insensitive() {
        let mut with_title = Item::with_id(1);
        with_title
            .resource
            .values
            .insert("dcterms:title".to_string(), vec![ValueLiteral::new("Harbor Postcard")]);

        let constraint = Constraint::ValueContains("postcard".to_string());
        assert!(constraint.matches(&with_title.into()));
        assert!(!constraint.matches(&item(2, &[], true)));
    }

    #[test]
    fn test_is_public_constraint() {
        let constraint = Constraint::IsPublic(false);
        assert!(constraint.matches(&item(1, &[], false)));
        assert!(!constraint.matches(&item(2, &[], true)));
    }
}
