use serde::{Deserialize, Serialize};

pub const START_COMMAND: &str = "/start";
pub const DETAILS_LABEL: &str = "Подробнее";
pub const CUSTOM_QUANTITY_LABEL: &str = "Другое количество";
pub const ISSUE_PRESETS: [u32; 5] = [1, 2, 3, 5, 10];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MenuAction {
    Add,
    Remove,
    List,
    ChangeQuantity,
    Issue,
    Back,
}

impl MenuAction {
    /// Actions offered on the main keyboard, in display order.
    pub const MAIN: [MenuAction; 5] =
        [Self::Add, Self::Remove, Self::List, Self::ChangeQuantity, Self::Issue];

    pub fn label(self) -> &'static str {
        match self {
            Self::Add => "Добавить предмет",
            Self::Remove => "Удалить предмет",
            Self::List => "Показать все предметы",
            Self::ChangeQuantity => "Изменить количество",
            Self::Issue => "Выдать товар",
            Self::Back => "Назад",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        Self::MAIN.into_iter().chain([Self::Back]).find(|action| action.label() == text)
    }
}

pub fn is_start_command(text: &str) -> bool {
    let text = text.trim();
    // Group chats address commands as `/start@bot_name`.
    text == START_COMMAND
        || text.strip_prefix(START_COMMAND).is_some_and(|rest| rest.starts_with('@'))
}
