//! Mode arbiter: finger count + base mode -> what the hand does this frame.

use std::fmt;

/// The user-selected intent, flipped by the toggle key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BaseMode {
    #[default]
    Write,
    Erase,
}

impl BaseMode {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            BaseMode::Write => BaseMode::Erase,
            BaseMode::Erase => BaseMode::Write,
        }
    }
}

impl fmt::Display for BaseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseMode::Write => write!(f, "WRITE"),
            BaseMode::Erase => write!(f, "ERASE"),
        }
    }
}

/// What the renderer does with the cursor this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ActionMode {
    Drawing,
    Erasing,
    #[default]
    Idle,
}

impl fmt::Display for ActionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionMode::Drawing => write!(f, "DRAWING"),
            ActionMode::Erasing => write!(f, "ERASING"),
            ActionMode::Idle => write!(f, "IDLE"),
        }
    }
}

/// Finger counts that select drawing and erasing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GestureThresholds {
    pub fingers_for_draw: u8,
    pub fingers_for_erase: u8,
}

impl Default for GestureThresholds {
    fn default() -> Self {
        Self {
            fingers_for_draw: 2,
            fingers_for_erase: 4,
        }
    }
}

/// Result of arbitrating one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Arbitration {
    pub mode: ActionMode,
    /// The finger count differs from the previous frame. The stroke renderer
    /// must drop both continuity slots when this is set.
    pub mode_changed: bool,
}

/// Pure mapping from count and base mode to an action.
///
/// Erasing wins whenever the erase threshold is met, so with equal thresholds
/// the draw gesture never draws.
pub fn action_for(count: u8, base: BaseMode, thresholds: GestureThresholds) -> ActionMode {
    if count >= thresholds.fingers_for_erase {
        ActionMode::Erasing
    } else if count == thresholds.fingers_for_draw && base == BaseMode::Write {
        ActionMode::Drawing
    } else {
        ActionMode::Idle
    }
}

/// Remembers the previous frame's finger count to detect gesture changes.
///
/// The change trigger is deliberately the raw count, not the resulting
/// [`ActionMode`]: a 2 -> 3 flicker breaks the stroke even though neither
/// count draws.
#[derive(Clone, Copy, Debug, Default)]
pub struct ModeArbiter {
    thresholds: GestureThresholds,
    last_count: u8,
}

impl ModeArbiter {
    pub fn new(thresholds: GestureThresholds) -> Self {
        Self {
            thresholds,
            last_count: 0,
        }
    }

    pub fn last_count(&self) -> u8 {
        self.last_count
    }

    pub fn arbitrate(&mut self, count: u8, base: BaseMode) -> Arbitration {
        let mode_changed = count != self.last_count;
        self.last_count = count;
        Arbitration {
            mode: action_for(count, base, self.thresholds),
            mode_changed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(0, BaseMode::Write, ActionMode::Idle ; "fist idles")]
    #[test_case(1, BaseMode::Write, ActionMode::Idle ; "one finger moves")]
    #[test_case(2, BaseMode::Write, ActionMode::Drawing ; "two fingers draw")]
    #[test_case(2, BaseMode::Erase, ActionMode::Idle ; "two fingers in erase mode idle")]
    #[test_case(3, BaseMode::Write, ActionMode::Idle ; "three fingers idle")]
    #[test_case(4, BaseMode::Write, ActionMode::Erasing ; "four fingers erase")]
    #[test_case(5, BaseMode::Write, ActionMode::Erasing ; "open palm erases")]
    #[test_case(5, BaseMode::Erase, ActionMode::Erasing ; "open palm erases in erase mode")]
    fn default_thresholds(count: u8, base: BaseMode, want: ActionMode) {
        assert_eq!(action_for(count, base, GestureThresholds::default()), want);
    }

    #[test]
    fn erase_wins_when_thresholds_coincide() {
        let thresholds = GestureThresholds {
            fingers_for_draw: 2,
            fingers_for_erase: 2,
        };
        assert_eq!(action_for(2, BaseMode::Write, thresholds), ActionMode::Erasing);
        assert_eq!(action_for(2, BaseMode::Erase, thresholds), ActionMode::Erasing);
    }

    #[test]
    fn change_flag_tracks_raw_count() {
        let mut arbiter = ModeArbiter::new(GestureThresholds::default());
        let first = arbiter.arbitrate(2, BaseMode::Write);
        assert_eq!(
            first,
            Arbitration {
                mode: ActionMode::Drawing,
                mode_changed: true
            }
        );
        assert!(!arbiter.arbitrate(2, BaseMode::Write).mode_changed);

        // Same action mode on both sides, still a change.
        let mut arbiter = ModeArbiter::new(GestureThresholds::default());
        arbiter.arbitrate(1, BaseMode::Write);
        let flicker = arbiter.arbitrate(3, BaseMode::Write);
        assert_eq!(flicker.mode, ActionMode::Idle);
        assert!(flicker.mode_changed);
        assert_eq!(arbiter.last_count(), 3);
    }

    #[test]
    fn toggling_base_mode_round_trips() {
        assert_eq!(BaseMode::Write.toggled(), BaseMode::Erase);
        assert_eq!(BaseMode::Write.toggled().toggled(), BaseMode::Write);
    }
}
