//! Perceived device state
//!
//! One perception = one screenshot plus one element-tree dump, captured
//! back to back at the start of a turn. Both parts are required; the
//! engine treats a capture failure as fatal.

use bytes::Bytes;

/// Snapshot of the device screen at the start of a turn.
#[derive(Debug, Clone)]
pub struct PerceivedState {
    /// PNG-encoded screenshot bytes.
    pub screenshot: Bytes,
    /// Element-tree dump of the current screen (XML page source).
    pub ui_tree: String,
}

impl PerceivedState {
    pub fn new(screenshot: Bytes, ui_tree: impl Into<String>) -> Self {
        Self {
            screenshot,
            ui_tree: ui_tree.into(),
        }
    }
}
