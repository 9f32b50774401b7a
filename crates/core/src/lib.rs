pub mod config;
pub mod dialog;
pub mod domain;
pub mod errors;

pub use dialog::{
    ActionOutcome, DialogAction, DialogInput, DialogSession, DialogState, Draft,
    InMemorySessionStore, MenuAction, PhotoAttachment, Reply, SessionStore, Settled, Transition,
    UserId,
};
pub use domain::item::{Item, ItemId, NewItem};
pub use errors::{DialogError, ValidationError};
