use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::dialog::states::DialogState;
use crate::domain::item::ItemId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Partial input collected across the turns of one multi-step action.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub name: Option<String>,
    /// Raw text as typed; parsed when the item is created.
    pub quantity: Option<String>,
    pub item_id: Option<ItemId>,
    /// Set when the typed quantity is an amount to issue rather than a new stock level.
    pub issuing: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogSession {
    pub state: DialogState,
    pub draft: Draft,
}

impl DialogSession {
    pub fn new(state: DialogState, draft: Draft) -> Self {
        Self { state, draft }
    }

    pub fn is_idle(&self) -> bool {
        self.state.is_idle()
    }
}

pub trait SessionStore: Send + Sync {
    /// Returns the user's session, or a fresh idle one.
    fn load(&self, user: UserId) -> DialogSession;
    fn save(&self, user: UserId, session: DialogSession);
    fn clear(&self, user: UserId);
}

/// Process-local sessions. Lost on restart.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<UserId, DialogSession>>,
}

impl InMemorySessionStore {
    pub fn active_sessions(&self) -> usize {
        match self.sessions.lock() {
            Ok(sessions) => sessions.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self, user: UserId) -> DialogSession {
        match self.sessions.lock() {
            Ok(sessions) => sessions.get(&user).cloned().unwrap_or_default(),
            Err(poisoned) => poisoned.into_inner().get(&user).cloned().unwrap_or_default(),
        }
    }

    fn save(&self, user: UserId, session: DialogSession) {
        match self.sessions.lock() {
            Ok(mut sessions) => sessions.insert(user, session),
            Err(poisoned) => poisoned.into_inner().insert(user, session),
        };
    }

    fn clear(&self, user: UserId) {
        match self.sessions.lock() {
            Ok(mut sessions) => sessions.remove(&user),
            Err(poisoned) => poisoned.into_inner().remove(&user),
        };
    }
}
