use serde::Serialize;

use crate::dialog::menu::{MenuAction, CUSTOM_QUANTITY_LABEL, DETAILS_LABEL, ISSUE_PRESETS};
use crate::domain::item::{Item, ItemId};
use crate::errors::{DialogError, ValidationError};

/// Outbound message: text, an optional image (a media store reference) and the labels the
/// transport should offer as quick replies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub suggestions: Vec<String>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), image: None, suggestions: Vec::new() }
    }

    pub fn image(mut self, photo_ref: impl Into<String>) -> Self {
        self.image = Some(photo_ref.into());
        self
    }

    pub fn suggest(mut self, label: impl Into<String>) -> Self {
        self.suggestions.push(label.into());
        self
    }

    pub fn suggest_all<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions.extend(labels.into_iter().map(Into::into));
        self
    }

    fn with_main_menu(self) -> Self {
        self.suggest_all(MenuAction::MAIN.map(MenuAction::label))
    }

    fn with_back(self) -> Self {
        self.suggest(MenuAction::Back.label())
    }
}

pub fn main_menu() -> Reply {
    Reply::text("Выберите действие:").with_main_menu()
}

pub fn cancelled() -> Reply {
    Reply::text("Действие отменено. Выберите действие:").with_main_menu()
}

pub fn session_expired() -> Reply {
    Reply::text("Диалог устарел, начните заново. Выберите действие:").with_main_menu()
}

pub fn prompt_name() -> Reply {
    Reply::text("Введите название предмета:").with_back()
}

pub fn prompt_quantity() -> Reply {
    Reply::text("Введите количество:").with_back()
}

pub fn prompt_photo() -> Reply {
    Reply::text("Отправьте фотографию предмета:").with_back()
}

pub fn photo_expected() -> Reply {
    Reply::text("Нужна фотография. Отправьте фото или нажмите «Назад».").with_back()
}

pub fn text_expected() -> Reply {
    Reply::text("Ожидается текстовое сообщение.").with_back()
}

pub fn prompt_delete_id() -> Reply {
    Reply::text("Введите id предмета, который нужно удалить:").with_back()
}

pub fn prompt_change_id() -> Reply {
    Reply::text("Введите id предмета, количество которого нужно изменить:").with_back()
}

pub fn prompt_detail_id() -> Reply {
    Reply::text("Введите id предмета:").with_back()
}

pub fn prompt_issue_id() -> Reply {
    Reply::text("Введите id товара для выдачи:").with_back()
}

pub fn validation_failed(error: ValidationError) -> Reply {
    Reply::text(error.user_message()).with_back()
}

pub fn number_expected() -> Reply {
    validation_failed(ValidationError::NotANumber)
}

pub fn item_list(items: &[Item]) -> Reply {
    let text = if items.is_empty() {
        "Склад пуст.".to_owned()
    } else {
        let lines = items
            .iter()
            .map(|item| format!("{}. {} — {} шт.", item.id, item.name, item.quantity))
            .collect::<Vec<_>>()
            .join("\n");
        format!("Список всех предметов:\n{lines}")
    };
    Reply::text(text).suggest(DETAILS_LABEL).with_back()
}

pub fn listing_choices() -> Reply {
    Reply::text("Нажмите «Подробнее», чтобы открыть карточку предмета, или «Назад».")
        .suggest(DETAILS_LABEL)
        .with_back()
}

pub fn item_card(item: &Item) -> Reply {
    Reply::text(format!(
        "id: {}\nНазвание: {}\nКоличество: {} шт.",
        item.id, item.name, item.quantity
    ))
    .image(item.photo_ref.clone())
    .with_main_menu()
}

pub fn item_created(item: &Item) -> Reply {
    Reply::text(format!("Предмет «{}» добавлен, id: {}.", item.name, item.id)).with_main_menu()
}

pub fn item_deleted(id: ItemId) -> Reply {
    Reply::text(format!("Предмет с id {id} удалён.")).with_main_menu()
}

pub fn prompt_new_quantity(item: &Item) -> Reply {
    Reply::text(format!(
        "«{}»: сейчас {} шт. Введите новое количество:",
        item.name, item.quantity
    ))
    .with_back()
}

pub fn quantity_updated(id: ItemId, quantity: u32) -> Reply {
    Reply::text(format!("Количество предмета с id {id} изменено на {quantity}.")).with_main_menu()
}

pub fn prompt_issue_quantity(item: &Item) -> Reply {
    Reply::text(format!("«{}»: на складе {} шт. Сколько выдать?", item.name, item.quantity))
        .image(item.photo_ref.clone())
        .suggest_all(ISSUE_PRESETS.map(|preset| preset.to_string()))
        .suggest(CUSTOM_QUANTITY_LABEL)
        .with_back()
}

pub fn issue_choices() -> Reply {
    Reply::text("Выберите количество или введите число.")
        .suggest_all(ISSUE_PRESETS.map(|preset| preset.to_string()))
        .suggest(CUSTOM_QUANTITY_LABEL)
        .with_back()
}

pub fn prompt_custom_issue_quantity() -> Reply {
    Reply::text("Введите количество для выдачи:").with_back()
}

pub fn issued(item: &Item, requested: u32, remaining: u32) -> Reply {
    Reply::text(format!(
        "Выдано {requested} шт. «{}». Остаток: {remaining} шт.",
        item.name
    ))
    .with_main_menu()
}

pub fn failure(error: &DialogError) -> Reply {
    Reply::text(error.user_message()).with_main_menu()
}
