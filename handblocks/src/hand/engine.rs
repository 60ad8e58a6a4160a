//! Gesture event engine.
//!
//! Turns per-frame classifier output into edge-triggered events.  Pinch,
//! point and two-finger pinch emit start/end pairs; open palm fires on the
//! rising edge only; taps are matched against a short pinch history and
//! rate-limited by a cooldown.  Losing the hand (or disabling tracking)
//! clears all carried state without emitting end events.

use std::collections::VecDeque;

use tracing::debug;

use super::classifier::{classify, GestureConfig};
use super::pose::HandPose;
use crate::ipc::sexp::sexp_bool;

// ── Events ─────────────────────────────────────────────────

/// Discrete gesture events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureEventKind {
    PinchStart,
    PinchEnd,
    PointStart,
    PointEnd,
    TwoFingerPinchStart,
    TwoFingerPinchEnd,
    /// Rising edge only; there is no matching end event.
    OpenPalm,
    Tap,
}

impl GestureEventKind {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PinchStart => "pinch-start",
            Self::PinchEnd => "pinch-end",
            Self::PointStart => "point-start",
            Self::PointEnd => "point-end",
            Self::TwoFingerPinchStart => "two-finger-pinch-start",
            Self::TwoFingerPinchEnd => "two-finger-pinch-end",
            Self::OpenPalm => "open-palm",
            Self::Tap => "tap",
        }
    }
}

/// An event emitted during a single frame.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureEvent {
    pub kind: GestureEventKind,
    pub hand: HandPose,
    pub timestamp_ms: f64,
}

// ── Pinch history ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinchHistoryEntry {
    pub pinching: bool,
    pub timestamp_ms: f64,
}

/// Bounded FIFO of recent pinch samples, oldest evicted first.
#[derive(Debug, Clone, Default)]
pub struct PinchHistory {
    entries: VecDeque<PinchHistoryEntry>,
}

impl PinchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample, evicting the oldest beyond `capacity`.
    pub fn push(&mut self, entry: PinchHistoryEntry, capacity: usize) {
        self.entries.push_back(entry);
        while self.entries.len() > capacity.max(1) {
            self.entries.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PinchHistoryEntry> {
        self.entries.iter()
    }

    /// Rapid pinch-and-release: the last two samples are (pinched, released)
    /// no more than `max_interval_ms` apart.
    pub fn is_tap(&self, max_interval_ms: f64) -> bool {
        let n = self.entries.len();
        if n < 2 {
            return false;
        }
        let prev = &self.entries[n - 2];
        let last = &self.entries[n - 1];
        prev.pinching && !last.pinching && last.timestamp_ms - prev.timestamp_ms <= max_interval_ms
    }
}

// ── Frame state ────────────────────────────────────────────

/// Boolean gesture flags carried between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GestureSnapshot {
    pub is_pinching: bool,
    pub is_pointing: bool,
    pub is_two_finger_pinch: bool,
    pub is_open_palm: bool,
}

/// Engine output for one frame.  Replaced wholesale every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureFrameState {
    pub hand: Option<HandPose>,
    pub is_pinching: bool,
    pub is_open_palm: bool,
    pub is_pointing: bool,
    pub is_two_finger_pinch: bool,
    pub pinch_strength: f32,
    pub pinch_distance: f32,
    pub pinch_normalized: f32,
    pub two_finger_distance: f32,
    pub two_finger_normalized: f32,
    /// Events produced this frame only.
    pub events: Vec<GestureEvent>,
    pub updated_at_ms: f64,
}

impl GestureFrameState {
    /// No hand, no gestures.
    pub fn empty(updated_at_ms: f64) -> Self {
        Self {
            hand: None,
            is_pinching: false,
            is_open_palm: false,
            is_pointing: false,
            is_two_finger_pinch: false,
            pinch_strength: 0.0,
            pinch_distance: 0.0,
            pinch_normalized: 0.0,
            two_finger_distance: 0.0,
            two_finger_normalized: 0.0,
            events: Vec::new(),
            updated_at_ms,
        }
    }

    pub fn has_event(&self, kind: GestureEventKind) -> bool {
        self.events.iter().any(|e| e.kind == kind)
    }

    pub fn event_kinds(&self) -> Vec<GestureEventKind> {
        self.events.iter().map(|e| e.kind).collect()
    }

    /// S-expression for IPC.
    pub fn to_sexp(&self) -> String {
        format!("({})", self.sexp_fields())
    }

    /// Plist body without the enclosing parens, for embedding in a message.
    pub fn sexp_fields(&self) -> String {
        let hand = self
            .hand
            .as_ref()
            .map(|h| format!(":{}", h.handedness.as_str()))
            .unwrap_or_else(|| "nil".to_string());
        let events = if self.events.is_empty() {
            "nil".to_string()
        } else {
            let names: Vec<String> = self
                .events
                .iter()
                .map(|e| format!(":{}", e.kind.as_str()))
                .collect();
            format!("({})", names.join(" "))
        };
        format!(
            ":t {:.1} :hand {} :pinching {} :open-palm {} :pointing {} :two-finger-pinch {} :pinch-strength {:.3} :pinch-normalized {:.3} :two-finger-normalized {:.3} :events {}",
            self.updated_at_ms,
            hand,
            sexp_bool(self.is_pinching),
            sexp_bool(self.is_open_palm),
            sexp_bool(self.is_pointing),
            sexp_bool(self.is_two_finger_pinch),
            self.pinch_strength,
            self.pinch_normalized,
            self.two_finger_normalized,
            events,
        )
    }
}

/// Edge detection shared by the start/end gesture pairs.
fn transition(
    previous: bool,
    current: bool,
    start: GestureEventKind,
    end: GestureEventKind,
) -> Option<GestureEventKind> {
    match (previous, current) {
        (false, true) => Some(start),
        (true, false) => Some(end),
        _ => None,
    }
}

// ── Engine ─────────────────────────────────────────────────

/// Stateful per-frame reducer over hand poses.
pub struct GestureEngine {
    /// Configuration.
    pub config: GestureConfig,
    /// Flags from the previous frame.
    previous: GestureSnapshot,
    /// Recent pinch samples for tap detection.
    history: PinchHistory,
    /// Time of the last emitted tap.
    last_tap_ms: Option<f64>,
}

impl Default for GestureEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureEngine {
    /// Create a new engine with default thresholds.
    pub fn new() -> Self {
        Self::with_config(GestureConfig::default())
    }

    pub fn with_config(config: GestureConfig) -> Self {
        Self {
            config,
            previous: GestureSnapshot::default(),
            history: PinchHistory::new(),
            last_tap_ms: None,
        }
    }

    /// Advance one frame.
    ///
    /// `hand` is the latest pose from whichever source is active, or `None`
    /// when tracking was lost this frame.
    pub fn update(&mut self, hand: Option<&HandPose>, enabled: bool, now_ms: f64) -> GestureFrameState {
        let hand = match hand {
            Some(h) if enabled && self.config.enabled => h,
            _ => {
                if self.previous != GestureSnapshot::default() {
                    debug!("Hand lost or tracking disabled; clearing gesture state");
                }
                self.reset();
                return GestureFrameState::empty(now_ms);
            }
        };

        let c = classify(hand, &self.config);

        self.history.push(
            PinchHistoryEntry {
                pinching: c.is_pinching,
                timestamp_ms: now_ms,
            },
            self.config.history_capacity,
        );

        let prev = self.previous;
        let mut kinds = Vec::new();

        kinds.extend(transition(
            prev.is_pinching,
            c.is_pinching,
            GestureEventKind::PinchStart,
            GestureEventKind::PinchEnd,
        ));
        kinds.extend(transition(
            prev.is_pointing,
            c.is_pointing,
            GestureEventKind::PointStart,
            GestureEventKind::PointEnd,
        ));
        kinds.extend(transition(
            prev.is_two_finger_pinch,
            c.is_two_finger_pinch,
            GestureEventKind::TwoFingerPinchStart,
            GestureEventKind::TwoFingerPinchEnd,
        ));
        if !prev.is_open_palm && c.is_open_palm {
            kinds.push(GestureEventKind::OpenPalm);
        }

        let tap_ready = self
            .last_tap_ms
            .map_or(true, |last| now_ms - last > self.config.tap_cooldown_ms);
        if tap_ready && self.history.is_tap(self.config.tap_max_interval_ms) {
            kinds.push(GestureEventKind::Tap);
            self.last_tap_ms = Some(now_ms);
        }

        self.previous = GestureSnapshot {
            is_pinching: c.is_pinching,
            is_pointing: c.is_pointing,
            is_two_finger_pinch: c.is_two_finger_pinch,
            is_open_palm: c.is_open_palm,
        };

        if !kinds.is_empty() {
            debug!("Gesture events at {:.1}ms on {:?}: {:?}", now_ms, hand.handedness, kinds);
        }

        let events = kinds
            .into_iter()
            .map(|kind| GestureEvent {
                kind,
                hand: hand.clone(),
                timestamp_ms: now_ms,
            })
            .collect();

        GestureFrameState {
            hand: Some(hand.clone()),
            is_pinching: c.is_pinching,
            is_open_palm: c.is_open_palm,
            is_pointing: c.is_pointing,
            is_two_finger_pinch: c.is_two_finger_pinch,
            pinch_strength: c.pinch.strength,
            pinch_distance: c.pinch.distance,
            pinch_normalized: c.pinch.normalized,
            two_finger_distance: c.two_finger.distance,
            two_finger_normalized: c.two_finger.normalized,
            events,
            updated_at_ms: now_ms,
        }
    }

    /// Clear carried state: history, previous flags, tap cooldown.
    pub fn reset(&mut self) {
        self.previous = GestureSnapshot::default();
        self.history.clear();
        self.last_tap_ms = None;
    }

    /// Flags carried from the last processed frame.
    pub fn snapshot(&self) -> GestureSnapshot {
        self.previous
    }

    pub fn history(&self) -> &PinchHistory {
        &self.history
    }

    /// Whether the gesture that `kind` starts is currently held.
    pub fn is_active(&self, kind: GestureEventKind) -> bool {
        match kind {
            GestureEventKind::PinchStart => self.previous.is_pinching,
            GestureEventKind::PointStart => self.previous.is_pointing,
            GestureEventKind::TwoFingerPinchStart => self.previous.is_two_finger_pinch,
            GestureEventKind::OpenPalm => self.previous.is_open_palm,
            _ => false,
        }
    }

    /// Generate s-expression for IPC status.
    pub fn status_sexp(&self) -> String {
        format!(
            "(:enabled {} :pinching {} :pointing {} :two-finger-pinch {} :open-palm {} :history {} :last-tap {})",
            sexp_bool(self.config.enabled),
            sexp_bool(self.previous.is_pinching),
            sexp_bool(self.previous.is_pointing),
            sexp_bool(self.previous.is_two_finger_pinch),
            sexp_bool(self.previous.is_open_palm),
            self.history.len(),
            self.last_tap_ms
                .map(|t| format!("{:.1}", t))
                .unwrap_or_else(|| "nil".to_string()),
        )
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::pose::fixtures::{fist, open_hand, pinch_hand, pointing_hand, two_finger_hand};
    use crate::hand::pose::Handedness;
    use GestureEventKind::*;

    fn entry(pinching: bool, timestamp_ms: f64) -> PinchHistoryEntry {
        PinchHistoryEntry {
            pinching,
            timestamp_ms,
        }
    }

    #[test]
    fn test_new_engine() {
        let engine = GestureEngine::new();
        assert!(engine.config.enabled);
        assert_eq!(engine.snapshot(), GestureSnapshot::default());
        assert!(engine.history().is_empty());
    }

    #[test]
    fn test_history_bounded() {
        let mut history = PinchHistory::new();
        for i in 0..20 {
            history.push(entry(i % 2 == 0, i as f64), 12);
        }
        assert_eq!(history.len(), 12);
        // Oldest evicted first.
        assert_eq!(history.iter().next().map(|e| e.timestamp_ms), Some(8.0));
    }

    #[test]
    fn test_is_tap_pattern() {
        let mut history = PinchHistory::new();
        assert!(!history.is_tap(220.0));
        history.push(entry(true, 0.0), 12);
        assert!(!history.is_tap(220.0));
        history.push(entry(false, 220.0), 12);
        assert!(history.is_tap(220.0), "interval equal to max counts");

        let mut slow = PinchHistory::new();
        slow.push(entry(true, 0.0), 12);
        slow.push(entry(false, 221.0), 12);
        assert!(!slow.is_tap(220.0));

        let mut wrong_order = PinchHistory::new();
        wrong_order.push(entry(false, 0.0), 12);
        wrong_order.push(entry(true, 50.0), 12);
        assert!(!wrong_order.is_tap(220.0));
    }

    #[test]
    fn test_pinch_start_end_once_per_edge() {
        let mut engine = GestureEngine::new();
        let f = engine.update(Some(&fist(Handedness::Right, 0.0)), true, 0.0);
        assert!(f.events.is_empty(), "unexpected {:?}", f.event_kinds());

        let f = engine.update(Some(&pinch_hand(0.1, 0.0)), true, 16.0);
        assert!(f.has_event(PinchStart));
        // Held: no repeat.
        let f = engine.update(Some(&pinch_hand(0.1, 0.0)), true, 32.0);
        assert!(!f.has_event(PinchStart));
        assert!(f.is_pinching);
        assert!(engine.is_active(PinchStart));

        let f = engine.update(Some(&pinch_hand(0.9, 0.0)), true, 400.0);
        assert!(f.has_event(PinchEnd));
        let f = engine.update(Some(&pinch_hand(0.9, 0.0)), true, 416.0);
        assert!(!f.has_event(PinchEnd));
    }

    #[test]
    fn test_point_start_end() {
        let mut engine = GestureEngine::new();
        engine.update(Some(&fist(Handedness::Right, 0.0)), true, 0.0);
        let f = engine.update(Some(&pointing_hand(Handedness::Right, 0.0)), true, 16.0);
        assert_eq!(f.event_kinds(), vec![PointStart]);
        assert!(f.is_pointing);
        let f = engine.update(Some(&fist(Handedness::Right, 0.0)), true, 32.0);
        assert_eq!(f.event_kinds(), vec![PointEnd]);
    }

    #[test]
    fn test_two_finger_pinch_start_end() {
        let mut engine = GestureEngine::new();
        engine.update(Some(&two_finger_hand(1.0, 0.0)), true, 0.0);
        let f = engine.update(Some(&two_finger_hand(0.1, 0.0)), true, 16.0);
        assert!(f.has_event(TwoFingerPinchStart));
        assert!((f.two_finger_normalized - 0.1).abs() < 1e-3);
        let f = engine.update(Some(&two_finger_hand(1.0, 0.0)), true, 32.0);
        assert!(f.has_event(TwoFingerPinchEnd));
    }

    #[test]
    fn test_open_palm_rising_edge_only() {
        let mut engine = GestureEngine::new();
        let f = engine.update(Some(&open_hand(Handedness::Right, 0.0)), true, 0.0);
        assert_eq!(f.event_kinds(), vec![OpenPalm]);
        let f = engine.update(Some(&open_hand(Handedness::Right, 0.0)), true, 16.0);
        assert!(f.events.is_empty());
        // Falling edge emits nothing.
        let f = engine.update(Some(&fist(Handedness::Right, 0.0)), true, 32.0);
        assert!(f.events.is_empty(), "unexpected {:?}", f.event_kinds());
        let f = engine.update(Some(&open_hand(Handedness::Right, 0.0)), true, 48.0);
        assert_eq!(f.event_kinds(), vec![OpenPalm]);
    }

    #[test]
    fn test_pinch_release_tap_scenario() {
        let mut engine = GestureEngine::new();
        engine.update(Some(&open_hand(Handedness::Right, 0.0)), true, 1000.0);

        let f = engine.update(Some(&pinch_hand(0.1, 0.0)), true, 1100.0);
        assert_eq!(f.event_kinds(), vec![PinchStart]);

        let f = engine.update(Some(&open_hand(Handedness::Right, 0.0)), true, 1250.0);
        let kinds = f.event_kinds();
        let end = kinds.iter().position(|k| *k == PinchEnd).expect("pinch-end");
        let tap = kinds.iter().position(|k| *k == Tap).expect("tap");
        assert!(end < tap, "pinch-end must precede tap: {:?}", kinds);
    }

    #[test]
    fn test_slow_release_is_not_tap() {
        let mut engine = GestureEngine::new();
        engine.update(Some(&pinch_hand(0.1, 0.0)), true, 0.0);
        let f = engine.update(Some(&open_hand(Handedness::Right, 0.0)), true, 300.0);
        assert!(f.has_event(PinchEnd));
        assert!(!f.has_event(Tap));
    }

    #[test]
    fn test_tap_cooldown() {
        let mut engine = GestureEngine::new();
        let open = open_hand(Handedness::Right, 0.0);
        let pinch = pinch_hand(0.1, 0.0);

        engine.update(Some(&pinch), true, 0.0);
        let f = engine.update(Some(&open), true, 100.0);
        assert!(f.has_event(Tap));

        // Same pattern 150ms after the tap: suppressed.
        engine.update(Some(&pinch), true, 200.0);
        let f = engine.update(Some(&open), true, 250.0);
        assert!(f.has_event(PinchEnd));
        assert!(!f.has_event(Tap), "tap inside cooldown");

        // Exactly at the cooldown boundary still suppressed (strictly greater).
        engine.update(Some(&pinch), true, 320.0);
        let f = engine.update(Some(&open), true, 360.0);
        assert!(!f.has_event(Tap));

        engine.update(Some(&pinch), true, 500.0);
        let f = engine.update(Some(&open), true, 550.0);
        assert!(f.has_event(Tap));
    }

    #[test]
    fn test_hand_lost_clears_state_without_end_events() {
        let mut engine = GestureEngine::new();
        engine.update(Some(&pinch_hand(0.1, 0.0)), true, 0.0);
        engine.update(Some(&pointing_hand(Handedness::Right, 0.0)), true, 16.0);
        assert!(engine.is_active(PointStart));

        let f = engine.update(None, true, 32.0);
        assert!(f.hand.is_none());
        assert!(f.events.is_empty());
        assert_eq!(f.updated_at_ms, 32.0);
        assert_eq!(engine.snapshot(), GestureSnapshot::default());
        assert!(engine.history().is_empty());

        // Recovery starts from scratch: pointing again is a fresh start.
        let f = engine.update(Some(&pointing_hand(Handedness::Right, 0.0)), true, 48.0);
        assert_eq!(f.event_kinds(), vec![PointStart]);
    }

    #[test]
    fn test_disabled_resets() {
        let mut engine = GestureEngine::new();
        engine.update(Some(&pinch_hand(0.1, 0.0)), true, 0.0);
        let f = engine.update(Some(&pinch_hand(0.1, 0.0)), false, 16.0);
        assert_eq!(f, GestureFrameState::empty(16.0));
        assert!(engine.history().is_empty());

        engine.config.enabled = false;
        let f = engine.update(Some(&pinch_hand(0.1, 0.0)), true, 32.0);
        assert!(f.hand.is_none());
    }

    #[test]
    fn test_event_order_within_frame() {
        let mut engine = GestureEngine::new();
        // Pinching, open palm, not pointing.
        engine.update(Some(&pinch_hand(0.1, 0.0)), true, 0.0);
        // Release into a pointing fist: pinch-end, point-start, then tap.
        let f = engine.update(Some(&pointing_hand(Handedness::Right, 0.0)), true, 50.0);
        assert_eq!(f.event_kinds(), vec![PinchEnd, PointStart, Tap]);
    }

    #[test]
    fn test_events_carry_hand_and_time() {
        let mut engine = GestureEngine::new();
        let f = engine.update(Some(&open_hand(Handedness::Left, 7.0)), true, 9.0);
        let event = &f.events[0];
        assert_eq!(event.kind, OpenPalm);
        assert_eq!(event.hand.handedness, Handedness::Left);
        assert_eq!(event.timestamp_ms, 9.0);
    }

    #[test]
    fn test_frame_sexp() {
        let mut engine = GestureEngine::new();
        let f = engine.update(Some(&open_hand(Handedness::Right, 0.0)), true, 5.0);
        let sexp = f.to_sexp();
        assert!(sexp.contains(":hand :right"));
        assert!(sexp.contains(":open-palm t"));
        assert!(sexp.contains(":events (:open-palm)"));
        assert!(lexpr::from_str(&sexp).is_ok());

        let empty = GestureFrameState::empty(1.0).to_sexp();
        assert!(empty.contains(":hand nil"));
        assert!(empty.contains(":events nil"));
    }

    #[test]
    fn test_status_sexp() {
        let engine = GestureEngine::new();
        let status = engine.status_sexp();
        assert!(status.contains(":enabled t"));
        assert!(status.contains(":last-tap nil"));
    }

    #[test]
    fn test_event_names() {
        assert_eq!(PinchStart.as_str(), "pinch-start");
        assert_eq!(TwoFingerPinchEnd.as_str(), "two-finger-pinch-end");
        assert_eq!(OpenPalm.as_str(), "open-palm");
        assert_eq!(Tap.as_str(), "tap");
    }
}
