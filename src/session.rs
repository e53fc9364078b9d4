//! Per-session state and the per-frame tick.
//!
//! A [`Session`] owns everything that changes while the board runs: the
//! canvas, the stroke slots, the arbiter's memory of the previous finger count,
//! and the user's base mode, color and brush size. Key presses reach it only
//! through [`Session::apply_event`], which is also where a mode toggle or a
//! clear breaks the stroke in progress.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::arbiter::{ActionMode, BaseMode, GestureThresholds, ModeArbiter};
use crate::canvas::Canvas;
use crate::classifier::{self, FingerSet, Thresholds};
use crate::config::BoardConfig;
use crate::error::Result;
use crate::landmarks::HandReading;
use crate::stroke::{self, StrokeCursor, StrokeStyle, Tool};
use crate::types::{FrameBuffer, FrameSize, Point, Rgb};

/// Where the cursor comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputSource {
    /// Hand landmarks from the camera.
    Hand,
    /// The window pointer, used when no camera frames are available.
    Pointer,
}

/// Discrete user commands, applied between ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    ToggleMode,
    CycleColor,
    CycleBrush,
    ClearCanvas,
    SaveCanvas,
    Quit,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventOutcome {
    Continue,
    Saved(PathBuf),
    Quit,
}

/// Pointer position and primary button, sampled once per tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PointerState {
    pub position: Option<Point>,
    pub pressed: bool,
}

/// Read-only status of one tick, for the display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickReport {
    pub mode: ActionMode,
    pub finger_count: u8,
    pub extended: FingerSet,
    pub cursor: Option<Point>,
    /// The canvas was reinitialized because the frame size changed.
    pub canvas_reset: bool,
}

#[derive(Debug)]
pub struct Session {
    config: BoardConfig,
    source: InputSource,
    base_mode: BaseMode,
    color_index: usize,
    brush_radius: u32,
    arbiter: ModeArbiter,
    strokes: StrokeCursor,
    canvas: Canvas,
    pointer_was_pressed: bool,
}

impl Session {
    pub fn new(config: BoardConfig, size: FrameSize, source: InputSource) -> Self {
        let arbiter = ModeArbiter::new(GestureThresholds {
            fingers_for_draw: config.fingers_for_draw,
            fingers_for_erase: config.fingers_for_erase,
        });
        Self {
            canvas: Canvas::new(size, config.background),
            color_index: config.default_color_index,
            brush_radius: config.brush_radius,
            config,
            source,
            base_mode: BaseMode::Write,
            arbiter,
            strokes: StrokeCursor::default(),
            pointer_was_pressed: false,
        }
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn source(&self) -> InputSource {
        self.source
    }

    pub fn base_mode(&self) -> BaseMode {
        self.base_mode
    }

    pub fn brush_radius(&self) -> u32 {
        self.brush_radius
    }

    pub fn current_color(&self) -> Rgb {
        self.config.palette[self.color_index].1
    }

    pub fn current_color_name(&self) -> &str {
        &self.config.palette[self.color_index].0
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn strokes(&self) -> StrokeCursor {
        self.strokes
    }

    /// Stop reading hands and follow the pointer from now on.
    pub fn fall_back_to_pointer(&mut self) {
        if self.source != InputSource::Pointer {
            info!("switching cursor source to pointer");
            self.source = InputSource::Pointer;
            self.strokes.reset();
            self.pointer_was_pressed = false;
        }
    }

    fn style(&self) -> StrokeStyle {
        StrokeStyle {
            brush: Tool {
                radius: self.brush_radius,
                color: self.current_color(),
            },
            eraser: Tool {
                radius: self.config.eraser_radius,
                color: self.config.background,
            },
            max_jump: self.config.max_jump,
        }
    }

    /// Apply one user command. Mode toggles and clears always end the stroke
    /// in progress.
    ///
    /// # Errors
    ///
    /// Only [`SessionEvent::SaveCanvas`] can fail, when the PNG cannot be written.
    pub fn apply_event(&mut self, event: SessionEvent) -> Result<EventOutcome> {
        match event {
            SessionEvent::ToggleMode => {
                self.base_mode = self.base_mode.toggled();
                self.strokes.reset();
                info!(mode = %self.base_mode, "mode changed");
            }
            SessionEvent::CycleColor => {
                self.color_index = (self.color_index + 1) % self.config.palette.len();
                info!(color = self.current_color_name(), "color changed");
            }
            SessionEvent::CycleBrush => {
                let sizes = &self.config.brush_sizes;
                let current = sizes
                    .iter()
                    .position(|&s| s == self.brush_radius)
                    .unwrap_or(0);
                self.brush_radius = sizes[(current + 1) % sizes.len()];
                info!(radius = self.brush_radius, "brush size changed");
            }
            SessionEvent::ClearCanvas => {
                self.canvas.clear();
                self.strokes.reset();
                info!("canvas cleared");
            }
            SessionEvent::SaveCanvas => {
                let path = self
                    .canvas
                    .save_snapshot(&self.config.output_dir, &chrono::Local::now())?;
                return Ok(EventOutcome::Saved(path));
            }
            SessionEvent::Quit => return Ok(EventOutcome::Quit),
        }
        Ok(EventOutcome::Continue)
    }

    /// One camera tick: classify the detection, arbitrate, render.
    pub fn hand_tick(&mut self, size: FrameSize, reading: &HandReading) -> TickReport {
        let canvas_reset = self.canvas.ensure_size(size);
        if canvas_reset {
            self.strokes.reset();
        }

        let thresholds = Thresholds {
            thumb: self.config.thumb_threshold,
            finger: self.config.finger_threshold,
        };
        let gesture = classifier::classify(reading, size, thresholds);
        let arbitration = self.arbiter.arbitrate(gesture.extended_count, self.base_mode);
        if arbitration.mode_changed {
            debug!(
                fingers = gesture.extended_count,
                extended = ?gesture.extended.iter().collect::<Vec<_>>(),
                mode = %arbitration.mode,
                "gesture changed"
            );
        }

        let style = self.style();
        stroke::render(
            &mut self.canvas,
            &mut self.strokes,
            arbitration.mode,
            gesture.cursor,
            arbitration.mode_changed,
            &style,
        );

        TickReport {
            mode: arbitration.mode,
            finger_count: gesture.extended_count,
            extended: gesture.extended,
            cursor: gesture.cursor,
            canvas_reset,
        }
    }

    /// One pointer tick. While the button is held the base mode decides
    /// between drawing and erasing; pressing or releasing starts a new stroke.
    pub fn pointer_tick(&mut self, size: FrameSize, pointer: PointerState) -> TickReport {
        let canvas_reset = self.canvas.ensure_size(size);
        if canvas_reset {
            self.strokes.reset();
        }

        let edge = pointer.pressed != self.pointer_was_pressed;
        self.pointer_was_pressed = pointer.pressed;

        let mode = match (pointer.pressed, self.base_mode) {
            (false, _) => ActionMode::Idle,
            (true, BaseMode::Write) => ActionMode::Drawing,
            (true, BaseMode::Erase) => ActionMode::Erasing,
        };

        let style = self.style();
        stroke::render(
            &mut self.canvas,
            &mut self.strokes,
            mode,
            pointer.position,
            edge,
            &style,
        );

        TickReport {
            mode,
            finger_count: 0,
            extended: FingerSet::default(),
            cursor: pointer.position,
            canvas_reset,
        }
    }

    /// Blend the canvas over `frame` with the configured weights.
    ///
    /// # Errors
    ///
    /// Fails if `frame` does not match the canvas size.
    pub fn composite(&self, frame: &mut FrameBuffer) -> Result<()> {
        self.canvas
            .composite_over(frame, self.config.canvas_weight, self.config.frame_weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::tests::curled_hand;
    use crate::landmarks::{Finger, HandLandmarks, Landmark, index};
    use pretty_assertions::assert_eq;

    const SIZE: FrameSize = FrameSize {
        width: 200,
        height: 100,
    };

    /// A hand with `count` fingers up (index first) and, when the index finger
    /// is up, its tip at pixel (`x`, `y`) on a 200x100 frame.
    fn hand(count: usize, x: i32, y: i32) -> HandReading {
        let mut h: HandLandmarks = curled_hand();
        let order = [Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky, Finger::Thumb];
        for finger in order.iter().take(count) {
            match finger {
                Finger::Thumb => h.joints[index::THUMB_TIP] = Landmark::new(0.25, 0.60),
                f => h.joints[f.tip()] = Landmark::new(0.5, 0.40),
            }
        }
        if count >= 1 {
            // Stays above the index PIP joint (0.5) for the y values used here.
            h.joints[index::INDEX_TIP] =
                Landmark::new(x as f32 / 200.0 + 0.001, y as f32 / 100.0 + 0.001);
        }
        HandReading::Hand(h)
    }

    fn session() -> Session {
        Session::new(BoardConfig::default(), SIZE, InputSource::Hand)
    }

    fn ink_count(s: &Session) -> usize {
        let bg = s.config().background.pack();
        s.canvas().pixels().iter().filter(|&&p| p != bg).count()
    }

    #[test]
    fn two_fingers_draw_and_keep_continuity() {
        let mut s = session();
        let first = s.hand_tick(SIZE, &hand(2, 50, 40));
        assert_eq!(first.mode, ActionMode::Drawing);
        assert_eq!(first.finger_count, 2);
        let second = s.hand_tick(SIZE, &hand(2, 60, 40));
        assert_eq!(second.mode, ActionMode::Drawing);
        assert_eq!(s.strokes().last_draw_point, Some(Point::new(60, 40)));
        assert_eq!(s.canvas().pixel(55, 40), Some(s.current_color()));
    }

    #[test]
    fn count_change_clears_slots_even_when_idle_on_both_sides() {
        let mut s = session();
        s.hand_tick(SIZE, &hand(2, 50, 40));
        assert!(s.strokes().last_draw_point.is_some());
        let report = s.hand_tick(SIZE, &hand(3, 52, 40));
        assert_eq!(report.mode, ActionMode::Idle);
        assert!(s.strokes().is_empty());
    }

    #[test]
    fn losing_the_hand_is_idle_not_erase() {
        let mut s = session();
        s.hand_tick(SIZE, &hand(2, 50, 40));
        let before = s.canvas().clone();
        let report = s.hand_tick(SIZE, &HandReading::NoHand);
        assert_eq!(report.mode, ActionMode::Idle);
        assert_eq!(report.cursor, None);
        assert_eq!(s.canvas(), &before);
        assert!(s.strokes().is_empty());
    }

    #[test]
    fn open_palm_erases() {
        let mut s = session();
        s.hand_tick(SIZE, &hand(2, 100, 40));
        assert!(ink_count(&s) > 0);
        let report = s.hand_tick(SIZE, &hand(5, 100, 40));
        assert_eq!(report.mode, ActionMode::Erasing);
        assert_eq!(ink_count(&s), 0);
    }

    #[test]
    fn erase_base_mode_stops_drawing() {
        let mut s = session();
        s.apply_event(SessionEvent::ToggleMode).unwrap();
        assert_eq!(s.base_mode(), BaseMode::Erase);
        let report = s.hand_tick(SIZE, &hand(2, 50, 40));
        assert_eq!(report.mode, ActionMode::Idle);
        assert_eq!(ink_count(&s), 0);
    }

    #[test]
    fn toggle_and_clear_break_the_stroke() {
        let mut s = session();
        s.hand_tick(SIZE, &hand(2, 50, 40));
        s.apply_event(SessionEvent::ToggleMode).unwrap();
        assert!(s.strokes().is_empty());
        s.apply_event(SessionEvent::ToggleMode).unwrap();

        s.hand_tick(SIZE, &hand(2, 50, 40));
        s.apply_event(SessionEvent::ClearCanvas).unwrap();
        assert!(s.strokes().is_empty());
        assert_eq!(ink_count(&s), 0);

        // Same count as before the clear: no connecting line back to (50,40).
        s.hand_tick(SIZE, &hand(2, 90, 40));
        assert_eq!(s.canvas().pixel(70, 40), Some(s.config().background));
    }

    #[test]
    fn resolution_change_reinitializes_canvas() {
        let mut s = session();
        s.hand_tick(SIZE, &hand(2, 50, 40));
        let bigger = FrameSize {
            width: 400,
            height: 200,
        };
        let report = s.hand_tick(bigger, &HandReading::NoHand);
        assert!(report.canvas_reset);
        assert_eq!(s.canvas().size(), bigger);
        assert_eq!(ink_count(&s), 0);
    }

    #[test]
    fn far_off_frame_fingertip_is_clamped_not_fatal() {
        let mut s = session();
        s.hand_tick(SIZE, &hand(2, 50, 40));
        let inked = ink_count(&s);

        let HandReading::Hand(mut far) = hand(2, 50, 40) else {
            unreachable!();
        };
        far.joints[index::INDEX_TIP] = Landmark::new(1.0e8, 0.40);
        let report = s.hand_tick(SIZE, &HandReading::Hand(far));

        assert_eq!(report.mode, ActionMode::Drawing);
        assert_eq!(report.cursor.map(|p| p.x), Some(400));
        // Off the surface and beyond the jump guard: nothing new is painted.
        assert_eq!(ink_count(&s), inked);
    }

    #[test]
    fn color_and_brush_cycle() {
        let mut s = session();
        assert_eq!(s.current_color_name(), "Green");
        s.apply_event(SessionEvent::CycleColor).unwrap();
        assert_eq!(s.current_color_name(), "Blue");
        for _ in 0..8 {
            s.apply_event(SessionEvent::CycleColor).unwrap();
        }
        assert_eq!(s.current_color_name(), "Blue", "a full lap returns to the same color");

        assert_eq!(s.brush_radius(), 8);
        s.apply_event(SessionEvent::CycleBrush).unwrap();
        assert_eq!(s.brush_radius(), 12);
        for _ in 0..4 {
            s.apply_event(SessionEvent::CycleBrush).unwrap();
        }
        assert_eq!(s.brush_radius(), 5);
    }

    #[test]
    fn brush_outside_cycle_jumps_to_second_entry() {
        let config = BoardConfig {
            brush_radius: 7,
            ..BoardConfig::default()
        };
        let mut s = Session::new(config, SIZE, InputSource::Hand);
        s.apply_event(SessionEvent::CycleBrush).unwrap();
        assert_eq!(s.brush_radius(), 8);
    }

    #[test]
    fn quit_and_save_outcomes() {
        let config = BoardConfig {
            output_dir: std::env::temp_dir(),
            ..BoardConfig::default()
        };
        let mut s = Session::new(config, SIZE, InputSource::Hand);
        assert_eq!(s.apply_event(SessionEvent::Quit).unwrap(), EventOutcome::Quit);
        match s.apply_event(SessionEvent::SaveCanvas).unwrap() {
            EventOutcome::Saved(path) => {
                assert!(path.exists());
                let _ = std::fs::remove_file(path);
            }
            other => panic!("expected a saved file, got {other:?}"),
        }
    }

    #[test]
    fn pointer_draws_while_pressed_and_restarts_on_press() {
        let mut s = session();
        s.fall_back_to_pointer();
        assert_eq!(s.source(), InputSource::Pointer);

        let at = |x, y, pressed| PointerState {
            position: Some(Point::new(x, y)),
            pressed,
        };
        assert_eq!(s.pointer_tick(SIZE, at(20, 20, false)).mode, ActionMode::Idle);
        assert_eq!(ink_count(&s), 0);

        s.pointer_tick(SIZE, at(20, 50, true));
        s.pointer_tick(SIZE, at(40, 50, true));
        assert_eq!(s.canvas().pixel(30, 50), Some(s.current_color()));

        s.pointer_tick(SIZE, at(60, 80, false));
        assert!(s.strokes().is_empty());
        // New press far from (40,50) but within the jump limit: not joined.
        s.pointer_tick(SIZE, at(80, 50, true));
        assert_eq!(s.canvas().pixel(60, 50), Some(s.config().background));
    }

    #[test]
    fn pointer_erases_in_erase_mode() {
        let mut s = session();
        s.fall_back_to_pointer();
        let p = PointerState {
            position: Some(Point::new(100, 50)),
            pressed: true,
        };
        s.pointer_tick(SIZE, p);
        assert!(ink_count(&s) > 0);
        s.apply_event(SessionEvent::ToggleMode).unwrap();
        let report = s.pointer_tick(SIZE, p);
        assert_eq!(report.mode, ActionMode::Erasing);
        assert_eq!(ink_count(&s), 0);
    }

    #[test]
    fn composite_uses_configured_weights() {
        let s = session();
        let mut frame = FrameBuffer::filled(SIZE.width, SIZE.height, s.config().background);
        s.composite(&mut frame).unwrap();
        assert!(frame.pixels.iter().all(|&p| p == s.config().background.pack()));
    }
}
