use std::collections::BTreeMap;

use tokio::sync::RwLock;

use sklad_core::domain::item::{Item, ItemId, NewItem};

use super::{ItemRepository, RepositoryError};

#[derive(Default)]
struct Inventory {
    items: BTreeMap<ItemId, Item>,
    last_id: i64,
}

/// Item store kept in process memory. Ids are never reused, like the SQL table's
/// AUTOINCREMENT column.
#[derive(Default)]
pub struct InMemoryItemRepository {
    inventory: RwLock<Inventory>,
}

impl InMemoryItemRepository {
    pub async fn len(&self) -> usize {
        self.inventory.read().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait::async_trait]
impl ItemRepository for InMemoryItemRepository {
    async fn list_all(&self) -> Result<Vec<Item>, RepositoryError> {
        let inventory = self.inventory.read().await;
        Ok(inventory.items.values().cloned().collect())
    }

    async fn get(&self, id: ItemId) -> Result<Option<Item>, RepositoryError> {
        let inventory = self.inventory.read().await;
        Ok(inventory.items.get(&id).cloned())
    }

    async fn create(&self, item: NewItem) -> Result<Item, RepositoryError> {
        let mut inventory = self.inventory.write().await;
        inventory.last_id += 1;
        let item = item.into_item(ItemId(inventory.last_id));
        inventory.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn delete(&self, id: ItemId) -> Result<(), RepositoryError> {
        let mut inventory = self.inventory.write().await;
        inventory.items.remove(&id);
        Ok(())
    }

    async fn set_quantity(&self, id: ItemId, quantity: u32) -> Result<(), RepositoryError> {
        let mut inventory = self.inventory.write().await;
        let item = inventory.items.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;
        item.quantity = quantity;
        Ok(())
    }
}
