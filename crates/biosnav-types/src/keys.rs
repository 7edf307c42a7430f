//! Terminal key names and the raw bytes a remote console expects for them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Key that commits the highlighted entry on every supported console.
pub const CONFIRM_KEY: &str = "Enter";

/// Alternate spelling of the confirm action (double carriage return).
pub const RETURN_KEY: &str = "Return";

/// Cursor movement keys used by the navigation engine.
pub const UP_KEY: &str = "Up";
pub const DOWN_KEY: &str = "Down";

/// Known key names and their encodings.
///
/// Function keys follow the sequences the lab consoles were observed to
/// accept, which are not always the xterm defaults.
const KEY_CODES: &[(&str, &str)] = &[
    ("Enter_", "\r\r"),
    ("Enter", "\r"),
    ("Return", "\r\r"),
    ("Esc", "\x1b"),
    ("Escape", "\x1b"),
    ("Tab", "\t"),
    ("Insert", "\x1b[2~"),
    ("Del", "\x1b[3~"),
    ("Delete", "\x1b[3~"),
    ("F1", "\x1b[OP"),
    ("F2", "\x1b[OQ"),
    ("F3", "\x1b[OR"),
    ("F4", "\x1b[OS"),
    ("F5", "\x1b[15~"),
    ("F6", "\x1b[17~"),
    ("F7", "\x1b[18~"),
    ("F8", "\x1b[19~"),
    ("F9", "\x1b[20~"),
    ("F10", "\x1b[21~"),
    ("F11", "\x1b[23~"),
    ("F12", "\x1b[24~"),
    ("Down", "\x1b[B"),
    ("Up", "\x1b[A"),
];

/// Look up the encoding of a key by its exact table name.
pub fn key_code(name: &str) -> Option<&'static str> {
    KEY_CODES
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, code)| *code)
}

/// Upper-case the first character and lower-case the rest ("ESC" -> "Esc").
pub fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Canonical table name for a token, if the token names a known key.
pub fn canonical_key_name(token: &str) -> Option<&'static str> {
    let capitalized = capitalize(token);
    KEY_CODES
        .iter()
        .find(|(key, _)| *key == capitalized)
        .map(|(key, _)| *key)
}

/// One or more key tokens transmitted back to back to activate an option.
///
/// Tokens that name a known key are encoded through the key table; anything
/// else (e.g. `"!"` in `Esc` + `!`) is sent literally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeySequence(Vec<String>);

impl KeySequence {
    /// Create a sequence from the given tokens.
    pub fn new(tokens: Vec<String>) -> Self {
        Self(tokens)
    }

    /// A single-key sequence.
    pub fn single(token: impl Into<String>) -> Self {
        Self(vec![token.into()])
    }

    /// The generic confirm action.
    pub fn confirm() -> Self {
        Self::single(CONFIRM_KEY)
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    /// Whether this sequence is the plain confirm action, which requires the
    /// cursor to sit on the option before it is sent.
    pub fn is_confirm(&self) -> bool {
        matches!(self.0.as_slice(), [key] if key == CONFIRM_KEY || key == RETURN_KEY)
    }

    /// Encode all tokens into the bytes written to the console.
    ///
    /// An empty encoding falls back to a bare newline.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for token in &self.0 {
            match key_code(&capitalize(token)) {
                Some(code) => bytes.extend_from_slice(code.as_bytes()),
                None => bytes.extend_from_slice(token.as_bytes()),
            }
        }
        if bytes.is_empty() {
            bytes.push(b'\n');
        }
        bytes
    }
}

impl Default for KeySequence {
    fn default() -> Self {
        Self::confirm()
    }
}

impl From<&str> for KeySequence {
    fn from(token: &str) -> Self {
        Self::single(token)
    }
}

impl From<&[&str]> for KeySequence {
    fn from(tokens: &[&str]) -> Self {
        Self(tokens.iter().map(|t| t.to_string()).collect())
    }
}

impl fmt::Display for KeySequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("+"))
    }
}
