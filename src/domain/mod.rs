// Domain layer: API records and the ports adapters and stores implement.

pub mod model;
pub mod ports;

pub use model::{Entity, EntityId, EntityKind, EntityRecord, Item, ItemSet, Media, Resource};
pub use ports::{EntityAdapter, EntityStore, ResourceAdapter};
