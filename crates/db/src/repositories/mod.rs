use async_trait::async_trait;
use thiserror::Error;

use sklad_core::domain::item::{Item, ItemId, NewItem};

pub mod item;
pub mod memory;

pub use item::SqlItemRepository;
pub use memory::InMemoryItemRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("item {0} not found")]
    NotFound(ItemId),
}

/// Persistence contract for stock items. Each mutating call commits or fails as a unit for
/// the one record it touches; quantities arrive already validated.
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// All items, ordered by id.
    async fn list_all(&self) -> Result<Vec<Item>, RepositoryError>;
    async fn get(&self, id: ItemId) -> Result<Option<Item>, RepositoryError>;
    async fn create(&self, item: NewItem) -> Result<Item, RepositoryError>;
    /// Removing an absent id is a no-op.
    async fn delete(&self, id: ItemId) -> Result<(), RepositoryError>;
    async fn set_quantity(&self, id: ItemId, quantity: u32) -> Result<(), RepositoryError>;
}
