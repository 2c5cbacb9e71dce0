//! Visibility debounce state machine
//!
//! Turns a stream of "visible / not visible" observations into
//! [`GateAction`]s: construct once the section has stayed visible for the
//! init delay, pause after it has been out of view for the pause delay, and
//! resume immediately on return. Time is injected so the gate never reads a
//! clock itself.
//!
//! ```text
//! Idle ──visible──▶ PendingInit ──due──▶ Active ──hidden──▶ PendingPause ──due──▶ Paused
//!  ▲                    │                  ▲                     │                  │
//!  └──────hidden────────┘                  └──────visible────────┘                  │
//!                                          ▲                                        │
//!                                          └───────────visible (Resume)─────────────┘
//! ```

use crate::config::GateConfig;
use std::time::Instant;

/// Gate state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Nothing constructed
    Idle,
    /// Construction scheduled
    PendingInit {
        /// When construction fires
        due: Instant,
    },
    /// Widget constructed and running
    Active,
    /// Pause scheduled
    PendingPause {
        /// When the pause fires
        due: Instant,
    },
    /// Widget constructed but paused
    Paused,
}

/// Action the host must apply to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateAction {
    /// Construct and register the widget
    Init,
    /// Pause the live widget
    Pause,
    /// Resume the paused widget
    Resume,
}

/// Vertical extent in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    /// Top edge
    pub top: f64,
    /// Height
    pub height: f64,
}

impl Extent {
    /// Create an extent
    #[inline]
    #[must_use]
    pub fn new(top: f64, height: f64) -> Self {
        Self { top, height }
    }

    /// Bottom edge
    #[inline]
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Fraction of `section` inside `viewport` grown by `margin` on both sides
#[must_use]
pub fn intersection_ratio(section: Extent, viewport: Extent, margin: f64) -> f64 {
    let root_top = viewport.top - margin;
    let root_bottom = viewport.bottom() + margin;

    if section.height <= 0.0 {
        let inside = section.top >= root_top && section.top <= root_bottom;
        return if inside { 1.0 } else { 0.0 };
    }

    let overlap = section.bottom().min(root_bottom) - section.top.max(root_top);
    (overlap / section.height).clamp(0.0, 1.0)
}

/// Debounced visibility gate for one section
#[derive(Debug, Clone)]
pub struct VisibilityGate {
    config: GateConfig,
    state: GateState,
}

impl VisibilityGate {
    /// Create new idle gate
    #[inline]
    #[must_use]
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            state: GateState::Idle,
        }
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> GateState {
        self.state
    }

    /// Gate configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Check if a widget has been constructed and not reset
    #[inline]
    #[must_use]
    pub fn is_constructed(&self) -> bool {
        matches!(
            self.state,
            GateState::Active | GateState::PendingPause { .. } | GateState::Paused
        )
    }

    /// Feed a visibility observation
    ///
    /// Returns an action that must be applied immediately (only `Resume`).
    /// Delayed actions come out of [`poll`](Self::poll).
    pub fn observe(&mut self, visible: bool, now: Instant) -> Option<GateAction> {
        let (next, action) = match (self.state, visible) {
            (GateState::Idle, true) => (
                GateState::PendingInit {
                    due: now + self.config.init_delay(),
                },
                None,
            ),
            (GateState::PendingInit { .. }, false) => (GateState::Idle, None),
            (GateState::Active, false) => (
                GateState::PendingPause {
                    due: now + self.config.pause_delay(),
                },
                None,
            ),
            (GateState::PendingPause { .. }, true) => (GateState::Active, None),
            (GateState::Paused, true) => (GateState::Active, Some(GateAction::Resume)),
            (state, _) => (state, None),
        };
        if next != self.state {
            tracing::trace!(from = ?self.state, to = ?next, visible, "gate transition");
        }
        self.state = next;
        action
    }

    /// Feed section and viewport geometry
    ///
    /// Visible means a non-zero intersection at or above the threshold.
    pub fn observe_geometry(
        &mut self,
        section: Extent,
        viewport: Extent,
        now: Instant,
    ) -> Option<GateAction> {
        let ratio = intersection_ratio(section, viewport, f64::from(self.config.root_margin_px));
        let visible = ratio > 0.0 && ratio >= self.config.threshold;
        self.observe(visible, now)
    }

    /// Fire any timer that is due at `now`
    pub fn poll(&mut self, now: Instant) -> Option<GateAction> {
        match self.state {
            GateState::PendingInit { due } if now >= due => {
                self.state = GateState::Active;
                Some(GateAction::Init)
            }
            GateState::PendingPause { due } if now >= due => {
                self.state = GateState::Paused;
                Some(GateAction::Pause)
            }
            _ => None,
        }
    }

    /// Next time [`poll`](Self::poll) can produce an action
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            GateState::PendingInit { due } | GateState::PendingPause { due } => Some(due),
            _ => None,
        }
    }

    /// Forget any construction and pending timers
    pub fn reset(&mut self) {
        self.state = GateState::Idle;
    }
}

impl Default for VisibilityGate {
    fn default() -> Self {
        Self::new(GateConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn gate_inits_after_delay() {
        let t0 = Instant::now();
        let mut gate = VisibilityGate::default();

        assert_eq!(gate.observe(true, t0), None);
        assert_eq!(gate.poll(t0 + ms(49)), None);
        assert_eq!(gate.poll(t0 + ms(50)), Some(GateAction::Init));
        assert_eq!(gate.state(), GateState::Active);
        assert!(gate.is_constructed());
    }

    #[test]
    fn gate_hidden_before_init_cancels() {
        let t0 = Instant::now();
        let mut gate = VisibilityGate::default();

        gate.observe(true, t0);
        gate.observe(false, t0 + ms(10));
        assert_eq!(gate.state(), GateState::Idle);
        assert_eq!(gate.poll(t0 + ms(100)), None);
    }

    #[test]
    fn gate_pause_and_resume() {
        let t0 = Instant::now();
        let mut gate = VisibilityGate::default();
        gate.observe(true, t0);
        gate.poll(t0 + ms(50));

        gate.observe(false, t0 + ms(100));
        assert_eq!(gate.next_deadline(), Some(t0 + ms(900)));
        assert_eq!(gate.poll(t0 + ms(899)), None);
        assert_eq!(gate.poll(t0 + ms(900)), Some(GateAction::Pause));
        assert_eq!(gate.state(), GateState::Paused);

        assert_eq!(gate.observe(true, t0 + ms(1000)), Some(GateAction::Resume));
        assert_eq!(gate.state(), GateState::Active);
    }

    #[test]
    fn gate_quick_return_cancels_pause() {
        let t0 = Instant::now();
        let mut gate = VisibilityGate::default();
        gate.observe(true, t0);
        gate.poll(t0 + ms(50));

        gate.observe(false, t0 + ms(100));
        assert_eq!(gate.observe(true, t0 + ms(300)), None);
        assert_eq!(gate.poll(t0 + ms(2000)), None);
        assert_eq!(gate.state(), GateState::Active);
    }

    #[test]
    fn gate_repeated_hidden_keeps_first_deadline() {
        let t0 = Instant::now();
        let mut gate = VisibilityGate::default();
        gate.observe(true, t0);
        gate.poll(t0 + ms(50));

        gate.observe(false, t0 + ms(100));
        gate.observe(false, t0 + ms(500));
        assert_eq!(gate.next_deadline(), Some(t0 + ms(900)));
    }

    #[test]
    fn gate_reset_returns_to_idle() {
        let t0 = Instant::now();
        let mut gate = VisibilityGate::default();
        gate.observe(true, t0);
        gate.poll(t0 + ms(50));

        gate.reset();
        assert_eq!(gate.state(), GateState::Idle);
        assert!(!gate.is_constructed());
    }

    #[test]
    fn ratio_uses_root_margin() {
        let viewport = Extent::new(0.0, 800.0);
        // Section starts 100px below the fold: only visible through the margin
        let section = Extent::new(900.0, 1000.0);

        assert_eq!(intersection_ratio(section, viewport, 0.0), 0.0);
        let with_margin = intersection_ratio(section, viewport, 200.0);
        assert!((with_margin - 0.1).abs() < 1e-9);
    }

    #[test]
    fn ratio_zero_height_section() {
        let viewport = Extent::new(0.0, 800.0);
        assert_eq!(intersection_ratio(Extent::new(400.0, 0.0), viewport, 0.0), 1.0);
        assert_eq!(intersection_ratio(Extent::new(1400.0, 0.0), viewport, 0.0), 0.0);
    }

    #[test]
    fn geometry_respects_threshold() {
        let t0 = Instant::now();
        let viewport = Extent::new(0.0, 800.0);
        let mut gate = VisibilityGate::default();

        // 10% visible through the margin, below the 15% threshold
        gate.observe_geometry(Extent::new(900.0, 1000.0), viewport, t0);
        assert_eq!(gate.state(), GateState::Idle);

        // 50% visible
        gate.observe_geometry(Extent::new(500.0, 1000.0), viewport, t0);
        assert!(matches!(gate.state(), GateState::PendingInit { .. }));
    }
}
