//! Host abstraction
//!
//! The engine never talks to a browser directly. Element lookup, class and
//! style mutation, frame scheduling and listener attachment all go through
//! [`Host`], implemented by the `web-sys` binding and by the in-memory
//! document used in tests.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::NavResult;

/// Engine-allocated id of a requested animation frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameId(pub u64);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

/// DOM access plus the scheduling primitives the engine needs.
///
/// All methods take `&self`; implementations use interior mutability the way
/// DOM handles do.
pub trait Host {
    /// Handle to a live element. Equality is node identity.
    type Node: Clone + PartialEq + fmt::Debug;

    // ========================
    // Lookup
    // ========================

    fn element_by_id(&self, id: &str) -> Option<Self::Node>;

    /// Elements matching `selector`, in document order
    fn query_all(&self, selector: &str) -> NavResult<Vec<Self::Node>>;

    /// Inclusive descendant test: a node contains itself
    fn contains(&self, ancestor: &Self::Node, node: &Self::Node) -> bool;

    /// Full URL of the current location
    fn location_href(&self) -> NavResult<String>;

    // ========================
    // Attributes, classes, styles
    // ========================

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;
    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) -> NavResult<()>;

    fn has_class(&self, node: &Self::Node, class: &str) -> bool;
    fn add_class(&self, node: &Self::Node, class: &str) -> NavResult<()>;
    fn remove_class(&self, node: &Self::Node, class: &str) -> NavResult<()>;

    /// Inline style property, empty when unset
    fn style_property(&self, node: &Self::Node, name: &str) -> String;
    /// Setting an empty value removes the property
    fn set_style_property(&self, node: &Self::Node, name: &str, value: &str) -> NavResult<()>;

    /// Natural content height in pixels
    fn scroll_height(&self, node: &Self::Node) -> i32;
    /// Force a synchronous layout so the next style write starts a transition
    fn force_layout(&self, node: &Self::Node);

    /// Append a `<style id=..>` with `css` to the document head
    fn inject_stylesheet(&self, id: &str, css: &str) -> NavResult<()>;

    // ========================
    // Scheduling and listeners
    // ========================

    /// Call back into the engine with `frame` for `group` on the next frame
    fn request_frame(&self, group: &str, frame: FrameId) -> NavResult<()>;
    fn cancel_frame(&self, frame: FrameId);

    /// Attach click and keydown handlers for `group` to `toggle`, removing the
    /// handlers previously attached for `group` from whatever node held them
    fn listen_toggle(&self, group: &str, toggle: &Self::Node) -> NavResult<()>;

    /// Route `transitionend` on `panel` to the engine for `group`.
    /// Must be idempotent for the same node.
    fn listen_transition_end(&self, group: &str, panel: &Self::Node) -> NavResult<()>;
}

/// Keys that activate a toggle from the keyboard
pub fn is_activation_key(key: &str, key_code: u32) -> bool {
    matches!(key, "Enter" | " " | "Spacebar") || key_code == 13 || key_code == 32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_keys() {
        assert!(is_activation_key("Enter", 0));
        assert!(is_activation_key(" ", 0));
        assert!(is_activation_key("Spacebar", 0));
        assert!(is_activation_key("", 13));
        assert!(is_activation_key("", 32));
        assert!(!is_activation_key("Tab", 9));
        assert!(!is_activation_key("a", 65));
    }
}
