use serde::Serialize;

use sklad_core::dialog::Reply;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KeyboardButton {
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReplyKeyboardMarkup {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    pub resize_keyboard: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReplyKeyboardRemove {
    pub remove_keyboard: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Keyboard(ReplyKeyboardMarkup),
    Remove(ReplyKeyboardRemove),
}

impl ReplyMarkup {
    /// One button per row, in suggestion order. A reply without suggestions hides whatever
    /// keyboard the previous message left open.
    pub fn for_reply(reply: &Reply) -> Self {
        if reply.suggestions.is_empty() {
            return Self::Remove(ReplyKeyboardRemove { remove_keyboard: true });
        }

        let keyboard = reply
            .suggestions
            .iter()
            .map(|label| vec![KeyboardButton { text: label.clone() }])
            .collect();
        Self::Keyboard(ReplyKeyboardMarkup { keyboard, resize_keyboard: true })
    }
}
