//! Submenu controller and auto-open synchronizer
//!
//! [`NavMenu`] owns the per-group records (wiring, user intent, auto-open and
//! animation sequence) in a map keyed by group. Nothing is stored on DOM
//! nodes. The host calls back into the `on_*` methods from its event
//! listeners; each one swallows DOM failures and degrades to a no-op.

use std::collections::HashMap;

use serde::Serialize;

use crate::animation::{set_expanded, AnimationState, PanelAnimation, PanelContext};
use crate::config::{GroupConfig, NavConfig};
use crate::error::{NavError, NavResult};
use crate::host::{FrameId, Host};
use crate::resolver;

/// Engine-side record of one submenu group
#[derive(Debug, Clone, Default)]
pub struct SubmenuGroupState {
    /// Click/keyboard handlers are attached to the current toggle
    pub wired: bool,
    /// The user collapsed the group; suppresses auto-open while the active
    /// link stays inside it
    pub user_closed: bool,
    /// The group has been auto-expanded once
    pub auto_opened: bool,
    pub animation: PanelAnimation,
}

/// Nodes a group was wired against
#[derive(Debug, Clone)]
struct BoundNodes<N> {
    toggle: N,
    panel: N,
    wrapper: N,
    indicator: Option<N>,
}

/// Serializable view of every group, for inspection and tracing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuSnapshot {
    pub groups: Vec<GroupSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSnapshot {
    pub key: String,
    pub present: bool,
    pub wired: bool,
    /// The wired group found its decorative caret
    pub indicator: bool,
    pub user_closed: bool,
    pub auto_opened: bool,
    pub state: AnimationState,
    pub aria_expanded: Option<String>,
}

/// The sidebar menu engine
#[derive(Debug)]
pub struct NavMenu<N> {
    config: NavConfig,
    states: HashMap<String, SubmenuGroupState>,
    bound: HashMap<String, BoundNodes<N>>,
    next_frame: u64,
}

impl<N: Clone + PartialEq + std::fmt::Debug> NavMenu<N> {
    /// Create an engine for a validated configuration
    pub fn new(config: NavConfig) -> NavResult<Self> {
        config.validate()?;
        let states = config
            .groups
            .iter()
            .map(|g| (g.key.clone(), SubmenuGroupState::default()))
            .collect();
        Ok(Self {
            config,
            states,
            bound: HashMap::new(),
            next_frame: 0,
        })
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    pub fn state(&self, key: &str) -> Option<&SubmenuGroupState> {
        self.states.get(key)
    }

    pub fn is_wired(&self, key: &str) -> bool {
        self.states.get(key).is_some_and(|s| s.wired)
    }

    fn group_config(&self, key: &str) -> NavResult<GroupConfig> {
        self.config
            .group(key)
            .cloned()
            .ok_or_else(|| NavError::UnknownGroup(key.to_string()))
    }

    fn allocate_frame(&mut self) -> FrameId {
        self.next_frame += 1;
        FrameId(self.next_frame)
    }

    // ========================
    // Wiring
    // ========================

    /// Attach handlers for one group. Returns false when a required element is
    /// missing; nothing is attached in that case.
    pub fn wire<H: Host<Node = N>>(&mut self, host: &H, key: &str) -> bool {
        match self.try_wire(host, key) {
            Ok(wired) => wired,
            Err(err) => {
                log::debug!("[{key}] wiring failed: {err}");
                false
            }
        }
    }

    fn try_wire<H: Host<Node = N>>(&mut self, host: &H, key: &str) -> NavResult<bool> {
        let group = self.group_config(key)?;
        let (Some(toggle), Some(panel), Some(wrapper)) = (
            host.element_by_id(&group.toggle_id),
            host.element_by_id(&group.panel_id),
            host.element_by_id(&group.wrapper_id),
        ) else {
            log::trace!("[{key}] elements not in document yet");
            return Ok(false);
        };
        let indicator = group
            .indicator_id
            .as_deref()
            .and_then(|id| host.element_by_id(id));

        if let Some(bound) = self.bound.get_mut(key) {
            if bound.toggle == toggle {
                bound.panel = panel;
                bound.wrapper = wrapper;
                bound.indicator = indicator;
                return Ok(true);
            }
            log::debug!("[{key}] toggle node replaced, resetting group state");
            if let Some(state) = self.states.get_mut(key) {
                state.animation.cancel(host);
                *state = SubmenuGroupState::default();
            }
            self.bound.remove(key);
        }

        host.listen_toggle(key, &toggle)?;
        self.bound.insert(
            key.to_string(),
            BoundNodes {
                toggle,
                panel,
                wrapper,
                indicator,
            },
        );
        self.states.entry(key.to_string()).or_default().wired = true;
        log::debug!("[{key}] wired");
        Ok(true)
    }

    /// Attempt every group; true only when all of them are wired
    pub fn wire_all<H: Host<Node = N>>(&mut self, host: &H) -> bool {
        let keys: Vec<String> = self.config.groups.iter().map(|g| g.key.clone()).collect();
        keys.iter()
            .map(|key| self.wire(host, key))
            .fold(true, |all, wired| all && wired)
    }

    // ========================
    // Animation entry points
    // ========================

    /// Animate `key`'s panel towards `open`. Returns false if the panel is
    /// absent or a DOM operation failed.
    pub fn transition<H: Host<Node = N>>(&mut self, host: &H, key: &str, open: bool) -> bool {
        match self.try_transition(host, key, open) {
            Ok(started) => started,
            Err(err) => {
                log::debug!("[{key}] transition failed: {err}");
                false
            }
        }
    }

    fn try_transition<H: Host<Node = N>>(&mut self, host: &H, key: &str, open: bool) -> NavResult<bool> {
        let frame = self.allocate_frame();
        self.with_panel(host, key, |animation, ctx| {
            animation.transition(ctx, open, frame).map(|_| true)
        })
    }

    /// Frame callback scheduled by a transition
    pub fn on_animation_frame<H: Host<Node = N>>(&mut self, host: &H, key: &str, frame: FrameId) {
        match self.with_panel(host, key, |animation, ctx| animation.on_frame(ctx, frame)) {
            Ok(false) => log::trace!("[{key}] ignoring stale {frame}"),
            Ok(true) => {}
            Err(err) => log::debug!("[{key}] frame step failed: {err}"),
        }
    }

    /// `transitionend` on `key`'s panel
    pub fn on_transition_end<H: Host<Node = N>>(&mut self, host: &H, key: &str, property: &str) {
        let result = self.with_panel(host, key, |animation, ctx| {
            animation.on_transition_end(ctx, property)
        });
        if let Err(err) = result {
            log::debug!("[{key}] settle failed: {err}");
        }
    }

    /// Run one animation step against the live panel of `key`.
    /// Ok(false) when the panel is not in the document.
    fn with_panel<H, F>(&mut self, host: &H, key: &str, step: F) -> NavResult<bool>
    where
        H: Host<Node = N>,
        F: FnOnce(&mut PanelAnimation, &PanelContext<'_, H>) -> NavResult<bool>,
    {
        let group = self.group_config(key)?;
        let Some((panel, toggle)) = self.live_nodes(host, &group) else {
            return Ok(false);
        };
        let state = self.states.entry(group.key.clone()).or_default();
        let ctx = PanelContext {
            host,
            config: &self.config,
            group: &group.key,
            panel: &panel,
            toggle: toggle.as_ref(),
        };
        step(&mut state.animation, &ctx)
    }

    /// Panel and toggle as currently in the document. Auto-open may run
    /// before a group is wired, so this never relies on the bound nodes.
    fn live_nodes<H: Host<Node = N>>(&self, host: &H, group: &GroupConfig) -> Option<(N, Option<N>)> {
        let panel = host
            .element_by_id(&group.panel_id)
            .or_else(|| self.bound.get(&group.key).map(|b| b.panel.clone()))?;
        let toggle = host.element_by_id(&group.toggle_id);
        Some((panel, toggle))
    }

    // ========================
    // User interaction
    // ========================

    /// Click (or keyboard activation) on `key`'s toggle. The host has already
    /// prevented the default action and stopped propagation.
    pub fn on_toggle_click<H: Host<Node = N>>(&mut self, host: &H, key: &str) -> bool {
        let Some(bound) = self.bound.get(key) else {
            return false;
        };
        let panel = bound.panel.clone();
        let will_open = host.has_class(&panel, &self.config.classes.hidden);
        if !self.transition(host, key, will_open) {
            return false;
        }
        if let Some(state) = self.states.get_mut(key) {
            state.user_closed = !will_open;
        }
        log::debug!(
            "[{key}] user {}",
            if will_open { "opened" } else { "closed" }
        );
        true
    }

    /// Document-level click. Collapses every wired group the click landed
    /// outside of, unless its panel holds the active link.
    pub fn on_document_click<H: Host<Node = N>>(&mut self, host: &H, target: &N) {
        let keys: Vec<String> = self.config.groups.iter().map(|g| g.key.clone()).collect();
        for key in keys {
            if let Err(err) = self.close_if_outside(host, &key, target) {
                log::debug!("[{key}] outside-click handling failed: {err}");
            }
        }
    }

    fn close_if_outside<H: Host<Node = N>>(&mut self, host: &H, key: &str, target: &N) -> NavResult<()> {
        let Some(bound) = self.bound.get(key) else {
            return Ok(());
        };
        if host.contains(&bound.wrapper, target) {
            return Ok(());
        }
        let panel = bound.panel.clone();
        if self.panel_holds_active_link(host, &panel)? {
            return Ok(());
        }
        if host.has_class(&panel, &self.config.classes.hidden) {
            return Ok(());
        }
        if self.transition(host, key, false) {
            if let Some(state) = self.states.get_mut(key) {
                state.user_closed = true;
            }
            log::debug!("[{key}] closed by outside click");
        }
        Ok(())
    }

    fn panel_holds_active_link<H: Host<Node = N>>(&self, host: &H, panel: &N) -> NavResult<bool> {
        let selector = format!("a.{}", self.config.classes.active_link);
        Ok(host
            .query_all(&selector)?
            .iter()
            .any(|link| host.contains(panel, link)))
    }

    // ========================
    // Active link
    // ========================

    /// Full highlight pass: resolve the active link, then sync auto-open
    pub fn highlight<H: Host<Node = N>>(&mut self, host: &H) -> Option<N> {
        for group in &self.config.groups {
            if let Some(toggle) = host.element_by_id(&group.toggle_id) {
                if let Err(err) = host.remove_class(&toggle, &self.config.classes.active_parent) {
                    log::debug!("[{}] could not clear parent marker: {err}", group.key);
                }
            }
        }
        let active = match resolver::resolve_active_link(host, &self.config) {
            Ok(active) => active,
            Err(err) => {
                log::debug!("active link resolution failed: {err}");
                None
            }
        };
        self.sync_auto_open(host, active.as_ref());
        active
    }

    /// Expand and mark the group holding `active` unless the user closed it,
    /// and drop stale close intent from every other group.
    pub fn sync_auto_open<H: Host<Node = N>>(&mut self, host: &H, active: Option<&N>) {
        let Some(active) = active else {
            return;
        };
        let groups = self.config.groups.clone();
        for group in &groups {
            if let Err(err) = self.sync_group(host, group, active) {
                log::debug!("[{}] auto-open failed: {err}", group.key);
            }
        }
    }

    fn sync_group<H: Host<Node = N>>(&mut self, host: &H, group: &GroupConfig, active: &N) -> NavResult<()> {
        let inside = host
            .element_by_id(&group.panel_id)
            .is_some_and(|panel| host.contains(&panel, active));
        let state = self.states.entry(group.key.clone()).or_default();
        if !inside {
            if state.user_closed {
                log::trace!("[{}] active link left group, clearing close intent", group.key);
            }
            state.user_closed = false;
            return Ok(());
        }

        if state.user_closed {
            log::trace!("[{}] holds the active link but was closed by the user", group.key);
            return Ok(());
        }

        if !state.auto_opened {
            if self.try_transition(host, &group.key, true)? {
                self.states.entry(group.key.clone()).or_default().auto_opened = true;
                log::debug!("[{}] auto-opened for active link", group.key);
            }
        } else {
            // Already auto-opened once: reveal without replaying the animation.
            self.with_panel(host, &group.key, |animation, ctx| {
                ctx.host.remove_class(ctx.panel, &ctx.config.classes.hidden)?;
                set_expanded(ctx, true)?;
                if !animation.is_animating() {
                    animation.mark_settled(true);
                }
                Ok(true)
            })?;
        }
        if let Some(toggle) = host.element_by_id(&group.toggle_id) {
            host.add_class(&toggle, &self.config.classes.active_parent)?;
        }
        Ok(())
    }

    // ========================
    // Inspection
    // ========================

    /// Rendered state of `key`'s panel, read from the live element
    pub fn animation_state<H: Host<Node = N>>(&self, host: &H, key: &str) -> Option<AnimationState> {
        let group = self.config.group(key)?;
        let panel = host.element_by_id(&group.panel_id)?;
        let hidden = host.has_class(&panel, &self.config.classes.hidden);
        Some(
            self.states
                .get(key)
                .map(|s| s.animation.state(hidden))
                .unwrap_or(if hidden { AnimationState::Closed } else { AnimationState::Open }),
        )
    }

    pub fn snapshot<H: Host<Node = N>>(&self, host: &H) -> MenuSnapshot {
        let groups = self
            .config
            .groups
            .iter()
            .map(|group| {
                let state = self.states.get(&group.key).cloned().unwrap_or_default();
                let toggle = host.element_by_id(&group.toggle_id);
                GroupSnapshot {
                    key: group.key.clone(),
                    present: host.element_by_id(&group.panel_id).is_some(),
                    wired: state.wired,
                    indicator: self
                        .bound
                        .get(&group.key)
                        .is_some_and(|b| b.indicator.is_some()),
                    user_closed: state.user_closed,
                    auto_opened: state.auto_opened,
                    state: self
                        .animation_state(host, &group.key)
                        .unwrap_or(AnimationState::Closed),
                    aria_expanded: toggle.and_then(|t| host.attribute(&t, "aria-expanded")),
                }
            })
            .collect();
        MenuSnapshot { groups }
    }
}
