use std::sync::Arc;

use tracing::{info, warn};

use sklad_core::dialog::{ActionOutcome, DialogAction, PhotoAttachment};
use sklad_core::domain::item::{parse_quantity, Item, ItemId, NewItem};
use sklad_core::errors::DialogError;
use sklad_db::repositories::{ItemRepository, RepositoryError};

use crate::events::EventContext;
use crate::media::MediaStore;
use crate::transport::ChatTransport;

/// Carries out the side effect a dialog transition asks for and reports what happened.
/// Every failure is folded into [`ActionOutcome::Failed`]; nothing here ends the process.
pub struct ConversationEngine {
    items: Arc<dyn ItemRepository>,
    media: Arc<dyn MediaStore>,
    photos: Arc<dyn ChatTransport>,
}

impl ConversationEngine {
    pub fn new(
        items: Arc<dyn ItemRepository>,
        media: Arc<dyn MediaStore>,
        photos: Arc<dyn ChatTransport>,
    ) -> Self {
        Self { items, media, photos }
    }

    pub async fn execute(&self, action: &DialogAction, ctx: &EventContext) -> ActionOutcome {
        let result = match action {
            DialogAction::ListItems => self.items.list_all().await.map(ActionOutcome::Listed),
            DialogAction::CreateItem { name, quantity, photo } => {
                return self.create(name, quantity, photo, ctx).await;
            }
            DialogAction::DeleteItem(id) => {
                self.items.delete(*id).await.map(|()| ActionOutcome::Deleted(*id))
            }
            DialogAction::ShowItem(id)
            | DialogAction::PrepareChange(id)
            | DialogAction::PrepareIssue(id) => {
                return match self.find(*id, ctx).await {
                    Ok(item) => ActionOutcome::Found(item),
                    Err(error) => ActionOutcome::Failed(error),
                };
            }
            DialogAction::SetQuantity { item_id, quantity } => self
                .items
                .set_quantity(*item_id, *quantity)
                .await
                .map(|()| ActionOutcome::QuantitySet { item_id: *item_id, quantity: *quantity }),
            DialogAction::IssueStock { item_id, requested } => {
                return self.issue(*item_id, *requested, ctx).await;
            }
        };

        match result {
            Ok(outcome) => outcome,
            Err(error) => ActionOutcome::Failed(store_failure(action.kind(), error, ctx)),
        }
    }

    async fn find(&self, id: ItemId, ctx: &EventContext) -> Result<Item, DialogError> {
        match self.items.get(id).await {
            Ok(Some(item)) => Ok(item),
            Ok(None) => Err(DialogError::NotFound(id)),
            Err(error) => Err(store_failure("get_item", error, ctx)),
        }
    }

    async fn create(
        &self,
        name: &str,
        raw_quantity: &str,
        photo: &PhotoAttachment,
        ctx: &EventContext,
    ) -> ActionOutcome {
        let quantity = match parse_quantity(raw_quantity) {
            Ok(quantity) => quantity,
            Err(error) => return ActionOutcome::Failed(error.into()),
        };

        let bytes = match self.photos.download_photo(&photo.file_id).await {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(
                    event_name = "media.photo.download_failed",
                    correlation_id = %ctx.correlation_id,
                    file_id = %photo.file_id,
                    error = %error,
                    "could not download item photo"
                );
                return ActionOutcome::Failed(DialogError::Media(error.to_string()));
            }
        };

        let photo_ref = match self.media.persist(&bytes).await {
            Ok(photo_ref) => photo_ref,
            Err(error) => {
                warn!(
                    event_name = "media.photo.persist_failed",
                    correlation_id = %ctx.correlation_id,
                    error = %error,
                    "could not store item photo"
                );
                return ActionOutcome::Failed(DialogError::Media(error.to_string()));
            }
        };

        let new_item = NewItem { name: name.to_owned(), quantity, photo_ref: photo_ref.clone() };
        match self.items.create(new_item).await {
            Ok(item) => {
                info!(
                    event_name = "store.item.created",
                    correlation_id = %ctx.correlation_id,
                    item_id = %item.id,
                    quantity = item.quantity,
                    "item added"
                );
                ActionOutcome::Created(item)
            }
            Err(error) => {
                let failure = store_failure("create_item", error, ctx);
                self.discard_photo(&photo_ref, ctx).await;
                ActionOutcome::Failed(failure)
            }
        }
    }

    /// Drops a stored photo that no item ended up referencing.
    async fn discard_photo(&self, photo_ref: &str, ctx: &EventContext) {
        if let Err(error) = self.media.remove(photo_ref).await {
            warn!(
                event_name = "media.photo.orphaned",
                correlation_id = %ctx.correlation_id,
                photo_ref = %photo_ref,
                error = %error,
                "could not remove photo of unsaved item"
            );
        }
    }

    /// Reads the current stock, refuses to go below zero, then writes the difference. Another
    /// operator's write between the read and the write is overwritten.
    async fn issue(&self, item_id: ItemId, requested: u32, ctx: &EventContext) -> ActionOutcome {
        let item = match self.find(item_id, ctx).await {
            Ok(item) => item,
            Err(error) => return ActionOutcome::Failed(error),
        };

        let remaining = match item.remaining_after_issue(requested) {
            Ok(remaining) => remaining,
            Err(error) => {
                info!(
                    event_name = "store.item.issue_refused",
                    correlation_id = %ctx.correlation_id,
                    item_id = %item_id,
                    requested,
                    available = item.quantity,
                    "not enough stock to issue"
                );
                return ActionOutcome::Failed(error);
            }
        };

        match self.items.set_quantity(item_id, remaining).await {
            Ok(()) => {
                info!(
                    event_name = "store.item.issued",
                    correlation_id = %ctx.correlation_id,
                    item_id = %item_id,
                    requested,
                    remaining,
                    "stock issued"
                );
                ActionOutcome::Issued { item, requested, remaining }
            }
            Err(error) => ActionOutcome::Failed(store_failure("issue_stock", error, ctx)),
        }
    }
}

fn store_failure(operation: &str, error: RepositoryError, ctx: &EventContext) -> DialogError {
    if let RepositoryError::NotFound(id) = error {
        return DialogError::NotFound(id);
    }

    warn!(
        event_name = "store.item.failed",
        correlation_id = %ctx.correlation_id,
        operation,
        error = %error,
        "item store operation failed"
    );
    DialogError::Store(error.to_string())
}
