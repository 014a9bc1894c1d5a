//! The core models for a single chat widget session.
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Assistant,
}

/// One message in the conversation.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    text: String,
}

impl Turn {
    pub fn new(role: Role, text: &str) -> Self {
        Turn {
            role,
            text: text.to_string(),
        }
    }

    pub fn user(text: &str) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: &str) -> Self {
        Self::new(Role::Assistant, text)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Append-only history of turns. Order is the order turns are
/// replayed to the completion endpoint so there is intentionally no
/// way to remove, edit, or reorder them.
#[derive(Clone, Default, Serialize, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct Transcript(Vec<Turn>);

impl Transcript {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, turn: Turn) {
        self.0.push(turn)
    }

    /// Adds the greeting as the first assistant turn unless the
    /// conversation already started. Returns whether it was added.
    pub fn seed_if_empty(&mut self, greeting: &str) -> bool {
        if !self.0.is_empty() {
            return false;
        }
        self.0.push(Turn::assistant(greeting));
        true
    }

    pub fn turns(&self) -> &[Turn] {
        &self.0
    }

    pub fn last(&self) -> Option<&Turn> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Whether a completion request is outstanding for the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatState {
    Idle,
    Sending,
}

/// Notifications for the front end: re-render (and scroll to the
/// bottom) on every appended turn, toggle the typing indicator and
/// the submit affordance on state changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TranscriptEvent {
    Appended(Turn),
    StateChanged(ChatState),
    Reset,
}
