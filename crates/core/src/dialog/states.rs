use serde::{Deserialize, Serialize};

use crate::dialog::menu::MenuAction;
use crate::dialog::reply::Reply;
use crate::dialog::session::Draft;
use crate::domain::item::{Item, ItemId};
use crate::errors::DialogError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialogState {
    #[default]
    Idle,
    TypingName,
    TypingQuantity,
    TypingPhoto,
    TypingDeleteId,
    TypingChangeId,
    TypingNewQuantity,
    ListingShown,
    TypingDetailId,
    TypingIssueId,
    ChoosingIssueQuantity,
}

impl DialogState {
    pub fn is_idle(self) -> bool {
        self == Self::Idle
    }
}

/// Transport-side handle of an inbound photo; the bytes are fetched only when needed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoAttachment {
    pub file_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DialogInput {
    Text(String),
    Photo(PhotoAttachment),
}

impl DialogInput {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Photo(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputClass {
    Start,
    Back,
    Menu(MenuAction),
    Details,
    Custom,
    Number(i64),
    Text,
    Photo(PhotoAttachment),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DialogAction {
    ListItems,
    CreateItem { name: String, quantity: String, photo: PhotoAttachment },
    DeleteItem(ItemId),
    ShowItem(ItemId),
    PrepareChange(ItemId),
    PrepareIssue(ItemId),
    SetQuantity { item_id: ItemId, quantity: u32 },
    IssueStock { item_id: ItemId, requested: u32 },
}

impl DialogAction {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ListItems => "list_items",
            Self::CreateItem { .. } => "create_item",
            Self::DeleteItem(_) => "delete_item",
            Self::ShowItem(_) => "show_item",
            Self::PrepareChange(_) => "prepare_change",
            Self::PrepareIssue(_) => "prepare_issue",
            Self::SetQuantity { .. } => "set_quantity",
            Self::IssueStock { .. } => "issue_stock",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    Listed(Vec<Item>),
    Created(Item),
    Deleted(ItemId),
    Found(Item),
    QuantitySet { item_id: ItemId, quantity: u32 },
    Issued { item: Item, requested: u32, remaining: u32 },
    Failed(DialogError),
}

/// Result of feeding one input to the machine. `to` and `draft` describe the session if
/// `action` (when present) succeeds; [`crate::dialog::settle`] decides the final shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: DialogState,
    pub to: DialogState,
    pub draft: Draft,
    pub action: Option<DialogAction>,
    pub reply: Option<Reply>,
}

impl Transition {
    /// Final session shape for a transition that carries no action.
    pub fn into_settled(self) -> Settled {
        Settled { state: self.to, draft: self.draft, reply: self.reply }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settled {
    pub state: DialogState,
    pub draft: Draft,
    pub reply: Option<Reply>,
}
