//! Admin Nav - collapsible sidebar submenus for the admin console
//!
//! This library keeps the sidebar's submenu groups (employees, attendance,
//! requests) coherent:
//! - Interruptible open/close height animation per panel
//! - Outside-click collapse that never hides the active page
//! - Active-link highlighting from the current location
//! - Auto-expansion of the active group, unless the user closed it
//! - Idempotent wiring with a bounded retry for late markup
//!
//! The engine is written against the [`host::Host`] trait. The `wasm`
//! feature provides the browser implementation; [`memory::MemoryHost`] is a
//! headless one.
//!
//! ## Example
//! ```rust
//! use admin_nav::prelude::*;
//!
//! let config = NavConfig::default();
//! let host = SidebarLayout::admin().build(&config, "https://hr.example.com/admin/employees/new");
//! let mut menu = NavMenu::new(config).unwrap();
//!
//! // Highlight, auto-open and wire everything
//! let (_retry, status) = RetryLoop::start(&mut menu, &host);
//! assert_eq!(status, BootStatus::Ready);
//!
//! // Let the opening animation play out
//! host.settle(&mut menu);
//! assert_eq!(menu.animation_state(&host, "employees"), Some(AnimationState::Open));
//! ```

pub mod animation;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod host;
pub mod memory;
pub mod menu;
pub mod resolver;

// Re-export common types
pub mod prelude {
    pub use crate::animation::{AnimationState, PanelAnimation, Sequence, Stage};
    pub use crate::bootstrap::{BootStatus, RetryLoop, TickOutcome};
    pub use crate::config::{AnimationConfig, ClassNames, GroupConfig, LinkConfig, NavConfig, RetryConfig};
    pub use crate::error::{NavError, NavResult};
    pub use crate::host::{FrameId, Host};
    pub use crate::memory::{MemoryHost, MemoryNode, SidebarLayout};
    pub use crate::menu::{GroupSnapshot, MenuSnapshot, NavMenu, SubmenuGroupState};
    pub use crate::resolver::LinkTarget;
}

#[cfg(feature = "wasm")]
pub mod wasm;
