//! A single selectable entry on a console menu.

use crate::{KeySequence, OptionTag};
use serde::{Deserialize, Serialize};

/// One selectable entry, as captured from the console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuOption {
    /// Raw captured label, escape codes included, kept verbatim for matching
    pub name: String,
    /// 0-based position within the owning menu, in document order
    pub index: usize,
    /// Keys that activate this option
    pub key: KeySequence,
    /// Semantic classification, if any keyword matched
    pub tag: Option<OptionTag>,
}

impl MenuOption {
    /// Create a new menu option.
    pub fn new(name: impl Into<String>, index: usize, key: KeySequence, tag: Option<OptionTag>) -> Self {
        Self {
            name: name.into(),
            index,
            key,
            tag,
        }
    }

    /// Whether this option is committed with the plain confirm key and
    /// therefore needs the cursor moved onto it first.
    pub fn needs_cursor(&self) -> bool {
        self.key.is_confirm()
    }
}
