use thiserror::Error;

use crate::domain::item::ItemId;

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("input is not a whole number")]
    NotANumber,
    #[error("quantity must not be negative")]
    Negative,
    #[error("quantity is out of range")]
    TooLarge,
    #[error("issued quantity must be greater than zero")]
    ZeroIssue,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DialogError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("item {0} not found")]
    NotFound(ItemId),
    #[error("insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock { item_id: ItemId, requested: u32, available: u32 },
    #[error("store failure: {0}")]
    Store(String),
    #[error("media failure: {0}")]
    Media(String),
}

impl ValidationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotANumber => "Введите число.",
            Self::Negative => "Количество не может быть отрицательным.",
            Self::TooLarge => "Слишком большое число.",
            Self::ZeroIssue => "Количество для выдачи должно быть больше нуля.",
        }
    }
}

impl DialogError {
    /// Text shown to the operator. Store and media details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(error) => error.user_message().to_owned(),
            Self::NotFound(id) => format!("Предмет с id {id} не найден."),
            Self::InsufficientStock { requested, available, .. } => {
                format!("Недостаточно товара: на складе {available}, запрошено {requested}.")
            }
            Self::Store(_) => format!(
                "Не удалось выполнить операцию с базой данных. Попробуйте позже. (код: {})",
                self.diagnostic()
            ),
            Self::Media(_) => format!(
                "Не удалось сохранить фотографию. Попробуйте позже. (код: {})",
                self.diagnostic()
            ),
        }
    }

    pub fn diagnostic(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::Store(_) => "store",
            Self::Media(_) => "media",
        }
    }

    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Store(_) | Self::Media(_))
    }
}
