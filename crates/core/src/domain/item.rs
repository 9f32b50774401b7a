use std::fmt;
use std::num::IntErrorKind;

use serde::{Deserialize, Serialize};

use crate::errors::{DialogError, ValidationError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub i64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub quantity: u32,
    pub photo_ref: String,
}

/// Fields of an item that does not have a store-assigned id yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub quantity: u32,
    pub photo_ref: String,
}

impl NewItem {
    pub fn into_item(self, id: ItemId) -> Item {
        Item { id, name: self.name, quantity: self.quantity, photo_ref: self.photo_ref }
    }
}

impl Item {
    /// Stock left after issuing `requested` units. Never goes below zero.
    pub fn remaining_after_issue(&self, requested: u32) -> Result<u32, DialogError> {
        self.quantity.checked_sub(requested).ok_or(DialogError::InsufficientStock {
            item_id: self.id,
            requested,
            available: self.quantity,
        })
    }
}

/// Parses a whole number. Digit strings outside the `i64` range saturate so that they are
/// rejected as out of range later instead of being treated as free text.
pub fn parse_number(raw: &str) -> Option<i64> {
    match raw.trim().parse::<i64>() {
        Ok(value) => Some(value),
        Err(error) => match error.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    }
}

pub fn quantity_from(value: i64) -> Result<u32, ValidationError> {
    if value < 0 {
        return Err(ValidationError::Negative);
    }
    u32::try_from(value).map_err(|_| ValidationError::TooLarge)
}

/// Parses the raw quantity captured while adding an item.
pub fn parse_quantity(raw: &str) -> Result<u32, ValidationError> {
    let value = parse_number(raw).ok_or(ValidationError::NotANumber)?;
    quantity_from(value)
}
