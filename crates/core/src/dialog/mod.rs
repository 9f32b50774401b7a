pub mod engine;
pub mod menu;
pub mod reply;
pub mod session;
pub mod states;

pub use engine::{classify, settle, transition};
pub use menu::MenuAction;
pub use reply::Reply;
pub use session::{DialogSession, Draft, InMemorySessionStore, SessionStore, UserId};
pub use states::{
    ActionOutcome, DialogAction, DialogInput, DialogState, InputClass, PhotoAttachment, Settled,
    Transition,
};
