//! Panel open/close animation
//!
//! Each panel runs at most one sequence at a time:
//!
//! ```text
//! Idle ──transition()──▶ Animating(AwaitingFrame) ──frame──▶ Animating(AwaitingTransitionEnd)
//!                               │                                   │
//!                               └──────────── settle ◀──────────────┘ (max-height end)
//!                                              ▼
//!                                           Settled
//! ```
//!
//! Starting a transition abandons whatever sequence is running: its frame is
//! cancelled and any late frame or `transitionend` for it falls through as a
//! no-op. The starting point is always read back from the live element (the
//! hidden class and any pinned `max-height`) instead of the last target, so a
//! half-finished animation is never mistaken for a settled one.

use serde::Serialize;

use crate::config::NavConfig;
use crate::error::NavResult;
use crate::host::{FrameId, Host};

/// Inline properties owned by the animation while it runs
const TRANSITIONAL_PROPERTIES: [&str; 5] =
    ["transition", "max-height", "opacity", "overflow", "will-change"];

/// Rendered state of a panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnimationState {
    Closed,
    Opening,
    Open,
    Closing,
}

/// What the running sequence is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    AwaitingFrame(FrameId),
    AwaitingTransitionEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Sequence {
    #[default]
    Idle,
    Animating { open: bool, stage: Stage },
    Settled { open: bool },
}

/// Everything one animation step needs to touch
pub struct PanelContext<'a, H: Host> {
    pub host: &'a H,
    pub config: &'a NavConfig,
    pub group: &'a str,
    pub panel: &'a H::Node,
    /// Receives `aria-expanded`; absent when the toggle is not in the document
    pub toggle: Option<&'a H::Node>,
}

/// Animation sequence of a single panel
#[derive(Debug, Clone, Default)]
pub struct PanelAnimation {
    sequence: Sequence,
}

impl PanelAnimation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sequence(&self) -> Sequence {
        self.sequence
    }

    pub fn is_animating(&self) -> bool {
        matches!(self.sequence, Sequence::Animating { .. })
    }

    /// Rendered state, given whether the panel currently carries the hidden class
    pub fn state(&self, hidden: bool) -> AnimationState {
        match self.sequence {
            Sequence::Animating { open: true, .. } => AnimationState::Opening,
            Sequence::Animating { open: false, .. } => AnimationState::Closing,
            _ if hidden => AnimationState::Closed,
            _ => AnimationState::Open,
        }
    }

    /// Drop the running sequence, cancelling its frame if one is pending
    pub fn cancel<H: Host>(&mut self, host: &H) {
        if let Sequence::Animating {
            stage: Stage::AwaitingFrame(frame),
            ..
        } = self.sequence
        {
            host.cancel_frame(frame);
        }
        self.sequence = Sequence::Idle;
    }

    /// Record a state reached without animating
    pub fn mark_settled(&mut self, open: bool) {
        self.sequence = Sequence::Settled { open };
    }

    /// Start moving the panel towards `open`. `frame` is the id the engine
    /// allocated for the follow-up frame callback.
    pub fn transition<H: Host>(
        &mut self,
        ctx: &PanelContext<'_, H>,
        open: bool,
        frame: FrameId,
    ) -> NavResult<()> {
        self.cancel(ctx.host);

        let host = ctx.host;
        let panel = ctx.panel;
        let hidden = host.has_class(panel, &ctx.config.classes.hidden);
        let pinned = pinned_height(&host.style_property(panel, "max-height"));
        let start_open = !hidden && pinned.is_none();

        if !open && hidden && pinned.is_none() {
            // Already collapsed; a transition to 0 from an unset height never ends.
            set_expanded(ctx, false)?;
            clear_transitional_styles(ctx, false)?;
            self.sequence = Sequence::Settled { open: false };
            log::trace!("[{}] close requested on collapsed panel", ctx.group);
            return Ok(());
        }

        host.listen_transition_end(ctx.group, panel)?;
        host.set_style_property(panel, "overflow", "hidden")?;
        host.set_style_property(panel, "will-change", "max-height, opacity")?;

        if open {
            host.remove_class(panel, &ctx.config.classes.hidden)?;
            host.set_style_property(panel, "opacity", "0")?;
            host.set_style_property(panel, "max-height", "0px")?;
        } else if start_open {
            let height = host.scroll_height(panel);
            host.set_style_property(panel, "max-height", &format!("{height}px"))?;
        }

        host.request_frame(ctx.group, frame)?;
        self.sequence = Sequence::Animating {
            open,
            stage: Stage::AwaitingFrame(frame),
        };
        set_expanded(ctx, open)?;

        log::trace!(
            "[{}] {} from {} ({})",
            ctx.group,
            if open { "opening" } else { "closing" },
            if start_open { "open" } else if hidden { "hidden" } else { "mid-flight" },
            frame
        );
        Ok(())
    }

    /// Frame callback. Returns false when `frame` belongs to an abandoned sequence.
    pub fn on_frame<H: Host>(&mut self, ctx: &PanelContext<'_, H>, frame: FrameId) -> NavResult<bool> {
        let open = match self.sequence {
            Sequence::Animating {
                open,
                stage: Stage::AwaitingFrame(pending),
            } if pending == frame => open,
            _ => return Ok(false),
        };

        let host = ctx.host;
        let panel = ctx.panel;
        host.set_style_property(panel, "transition", &ctx.config.animation.transition_value())?;

        let current = pinned_height(&host.style_property(panel, "max-height")).unwrap_or(0.0);
        let target = if open {
            f64::from(host.scroll_height(panel))
        } else {
            host.force_layout(panel);
            0.0
        };

        // No height change means no transitionend will ever arrive.
        if ctx.config.animation.height_ms == 0 || (target - current).abs() < f64::EPSILON {
            self.settle(ctx, open)?;
            return Ok(true);
        }

        host.set_style_property(panel, "max-height", &format!("{target}px"))?;
        host.set_style_property(panel, "opacity", if open { "1" } else { "0" })?;
        self.sequence = Sequence::Animating {
            open,
            stage: Stage::AwaitingTransitionEnd,
        };
        Ok(true)
    }

    /// `transitionend` callback. Only the `max-height` end of a sequence that
    /// is past its frame settles it.
    pub fn on_transition_end<H: Host>(
        &mut self,
        ctx: &PanelContext<'_, H>,
        property: &str,
    ) -> NavResult<bool> {
        if !property.is_empty() && property != "max-height" {
            return Ok(false);
        }
        match self.sequence {
            Sequence::Animating {
                open,
                stage: Stage::AwaitingTransitionEnd,
            } => {
                self.settle(ctx, open)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn settle<H: Host>(&mut self, ctx: &PanelContext<'_, H>, open: bool) -> NavResult<()> {
        clear_transitional_styles(ctx, open)?;
        self.sequence = Sequence::Settled { open };
        log::trace!("[{}] settled {}", ctx.group, if open { "open" } else { "closed" });
        Ok(())
    }
}

fn clear_transitional_styles<H: Host>(ctx: &PanelContext<'_, H>, open: bool) -> NavResult<()> {
    for property in TRANSITIONAL_PROPERTIES {
        ctx.host.set_style_property(ctx.panel, property, "")?;
    }
    if !open {
        ctx.host.add_class(ctx.panel, &ctx.config.classes.hidden)?;
    }
    Ok(())
}

pub(crate) fn set_expanded<H: Host>(ctx: &PanelContext<'_, H>, expanded: bool) -> NavResult<()> {
    if let Some(toggle) = ctx.toggle {
        ctx.host
            .set_attribute(toggle, "aria-expanded", if expanded { "true" } else { "false" })?;
    }
    Ok(())
}

/// Numeric `max-height` in pixels; `None` for unset, `none` or `auto`
fn pinned_height(value: &str) -> Option<f64> {
    value.trim().strip_suffix("px")?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pinned_height_parsing() {
        assert_eq!(pinned_height("120px"), Some(120.0));
        assert_eq!(pinned_height("0px"), Some(0.0));
        assert_eq!(pinned_height(" 42.5px "), Some(42.5));
        assert_eq!(pinned_height(""), None);
        assert_eq!(pinned_height("none"), None);
        assert_eq!(pinned_height("auto"), None);
    }

    #[test]
    fn test_state_from_sequence() {
        let mut anim = PanelAnimation::new();
        assert_eq!(anim.state(true), AnimationState::Closed);
        assert_eq!(anim.state(false), AnimationState::Open);

        anim.sequence = Sequence::Animating {
            open: true,
            stage: Stage::AwaitingFrame(FrameId(1)),
        };
        assert_eq!(anim.state(false), AnimationState::Opening);

        anim.sequence = Sequence::Animating {
            open: false,
            stage: Stage::AwaitingTransitionEnd,
        };
        assert_eq!(anim.state(false), AnimationState::Closing);

        anim.mark_settled(false);
        assert_eq!(anim.state(true), AnimationState::Closed);
        assert!(!anim.is_animating());
    }
}
