use sqlx::Row;

use sklad_core::domain::item::{Item, ItemId, NewItem};

use super::{ItemRepository, RepositoryError};
use crate::DbPool;

pub struct SqlItemRepository {
    pool: DbPool,
}

impl SqlItemRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<Item, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let quantity: i64 =
        row.try_get("quantity").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let photo_ref: String =
        row.try_get("photo_ref").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let quantity = u32::try_from(quantity).map_err(|_| {
        RepositoryError::Decode(format!("item {id} has out-of-range quantity {quantity}"))
    })?;

    Ok(Item { id: ItemId(id), name, quantity, photo_ref })
}

#[async_trait::async_trait]
impl ItemRepository for SqlItemRepository {
    async fn list_all(&self) -> Result<Vec<Item>, RepositoryError> {
        let rows = sqlx::query("SELECT id, name, quantity, photo_ref FROM items ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_item).collect()
    }

    async fn get(&self, id: ItemId) -> Result<Option<Item>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, quantity, photo_ref FROM items WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_item(r)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, item: NewItem) -> Result<Item, RepositoryError> {
        let result = sqlx::query("INSERT INTO items (name, quantity, photo_ref) VALUES (?, ?, ?)")
            .bind(&item.name)
            .bind(i64::from(item.quantity))
            .bind(&item.photo_ref)
            .execute(&self.pool)
            .await?;

        Ok(item.into_item(ItemId(result.last_insert_rowid())))
    }

    async fn delete(&self, id: ItemId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM items WHERE id = ?").bind(id.0).execute(&self.pool).await?;
        Ok(())
    }

    async fn set_quantity(&self, id: ItemId, quantity: u32) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE items SET quantity = ? WHERE id = ?")
            .bind(i64::from(quantity))
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }
}
