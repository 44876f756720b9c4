//! Resource adapters for items, item sets and media.

pub mod item;
pub mod item_set;
pub mod media;

pub use item::ItemAdapter;
pub use item_set::ItemSetAdapter;
pub use media::MediaAdapter;

use crate::domain::ports::ResourceAdapter;
use std::sync::Arc;

pub const ITEMS: &str = "items";
pub const ITEM_SETS: &str = "item_sets";
pub const MEDIA: &str = "media";

/// 依設定檔中的 adapter class 名稱建立 adapter
pub fn adapter_for_class(class: &str) -> Option<Arc<dyn ResourceAdapter>> {
    match class {
        "item" => Some(Arc::new(ItemAdapter)),
        "item_set" => Some(Arc::new(ItemSetAdapter)),
        "media" => Some(Arc::new(MediaAdapter)),
        _ => None,
    }
}
