//! Stroke continuity: turn one sampled cursor position per frame into
//! connected ink.
//!
//! Each frame the active tool stamps a disk at the cursor and, if it was
//! already active on the previous frame close by, a thick segment from the
//! previous point. The two tools keep separate "last point" slots; a slot only
//! survives while its tool stays active frame after frame.

use tracing::trace;

use crate::arbiter::ActionMode;
use crate::canvas::Canvas;
use crate::types::{Point, Rgb};

/// Brush settings for one tool.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tool {
    pub radius: u32,
    pub color: Rgb,
}

/// Everything the renderer needs for one frame besides the canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeStyle {
    pub brush: Tool,
    pub eraser: Tool,
    /// Points farther apart than this are not joined.
    pub max_jump: f64,
}

/// The last point of the stroke in progress, per tool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StrokeCursor {
    pub last_draw_point: Option<Point>,
    pub last_erase_point: Option<Point>,
}

impl StrokeCursor {
    /// Forget both strokes; the next point starts fresh.
    pub fn reset(&mut self) {
        self.last_draw_point = None;
        self.last_erase_point = None;
    }

    pub fn is_empty(&self) -> bool {
        self.last_draw_point.is_none() && self.last_erase_point.is_none()
    }
}

/// Stamp `tool` at `at`, joining from `last` when it is close enough, and
/// return the new last point.
fn extend_stroke(
    canvas: &mut Canvas,
    last: Option<Point>,
    at: Point,
    tool: Tool,
    max_jump: f64,
) -> Option<Point> {
    canvas.fill_disk(at, tool.radius, tool.color);
    if let Some(prev) = last {
        let distance = prev.distance(at);
        if distance < max_jump {
            canvas.stroke_line(prev, at, tool.radius * 2, tool.color);
        } else {
            trace!(?prev, ?at, distance, "jump too long, starting a new stroke");
        }
    }
    Some(at)
}

/// Apply one frame to the canvas.
///
/// `mode_changed` (finger count changed since last frame) drops both slots
/// before anything is drawn. A missing cursor behaves like [`ActionMode::Idle`]:
/// nothing is painted and both slots are cleared.
pub fn render(
    canvas: &mut Canvas,
    cursor: &mut StrokeCursor,
    mode: ActionMode,
    at: Option<Point>,
    mode_changed: bool,
    style: &StrokeStyle,
) {
    if mode_changed {
        cursor.reset();
    }

    let Some(at) = at else {
        cursor.reset();
        return;
    };

    match mode {
        ActionMode::Drawing => {
            cursor.last_erase_point = None;
            cursor.last_draw_point =
                extend_stroke(canvas, cursor.last_draw_point, at, style.brush, style.max_jump);
        }
        ActionMode::Erasing => {
            cursor.last_draw_point = None;
            cursor.last_erase_point =
                extend_stroke(canvas, cursor.last_erase_point, at, style.eraser, style.max_jump);
        }
        ActionMode::Idle => cursor.reset(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FrameSize;
    use pretty_assertions::assert_eq;

    const BG: Rgb = Rgb::new(20, 20, 20);
    const INK: Rgb = Rgb::new(255, 0, 0);

    fn style(radius: u32) -> StrokeStyle {
        StrokeStyle {
            brush: Tool { radius, color: INK },
            eraser: Tool {
                radius: radius * 2,
                color: BG,
            },
            max_jump: 100.0,
        }
    }

    fn canvas() -> Canvas {
        Canvas::new(
            FrameSize {
                width: 320,
                height: 240,
            },
            BG,
        )
    }

    #[test]
    fn continuity_joins_close_points() {
        let mut c = canvas();
        let mut cursor = StrokeCursor {
            last_draw_point: Some(Point::new(10, 10)),
            last_erase_point: None,
        };
        render(&mut c, &mut cursor, ActionMode::Drawing, Some(Point::new(15, 10)), false, &style(1));

        // Disk at the new point.
        assert_eq!(c.pixel(15, 10), Some(INK));
        assert_eq!(c.pixel(16, 10), Some(INK));
        // Segment back to the old point, outside the disk.
        assert_eq!(c.pixel(11, 10), Some(INK));
        assert_eq!(c.pixel(10, 10), Some(INK));
        assert_eq!(cursor.last_draw_point, Some(Point::new(15, 10)));
    }

    #[test]
    fn jump_guard_skips_long_segments() {
        let mut c = canvas();
        let mut cursor = StrokeCursor {
            last_draw_point: Some(Point::new(0, 0)),
            last_erase_point: None,
        };
        render(&mut c, &mut cursor, ActionMode::Drawing, Some(Point::new(200, 200)), false, &style(8));

        assert_eq!(c.pixel(200, 200), Some(INK));
        assert_eq!(c.pixel(100, 100), Some(BG));
        assert_eq!(c.pixel(50, 50), Some(BG));
        // Only the disk: a full 17x17 bounding box at most.
        let painted = c.pixels().iter().filter(|&&p| p == INK.pack()).count();
        assert!(painted <= 17 * 17);
        assert_eq!(cursor.last_draw_point, Some(Point::new(200, 200)));
    }

    #[test]
    fn distance_exactly_at_threshold_is_not_joined() {
        let mut c = canvas();
        let mut cursor = StrokeCursor {
            last_draw_point: Some(Point::new(10, 50)),
            last_erase_point: None,
        };
        render(&mut c, &mut cursor, ActionMode::Drawing, Some(Point::new(110, 50)), false, &style(2));
        assert_eq!(c.pixel(60, 50), Some(BG));
    }

    #[test]
    fn mode_change_drops_slots_before_drawing() {
        let mut c = canvas();
        let mut cursor = StrokeCursor {
            last_draw_point: Some(Point::new(40, 40)),
            last_erase_point: Some(Point::new(1, 1)),
        };
        render(&mut c, &mut cursor, ActionMode::Drawing, Some(Point::new(50, 40)), true, &style(1));
        assert_eq!(c.pixel(45, 40), Some(BG));
        assert_eq!(
            cursor,
            StrokeCursor {
                last_draw_point: Some(Point::new(50, 40)),
                last_erase_point: None,
            }
        );
    }

    #[test]
    fn missing_cursor_never_touches_canvas() {
        let mut c = canvas();
        c.fill_disk(Point::new(30, 30), 5, INK);
        let before = c.clone();
        let mut cursor = StrokeCursor {
            last_draw_point: Some(Point::new(30, 30)),
            last_erase_point: Some(Point::new(30, 30)),
        };
        for mode in [ActionMode::Drawing, ActionMode::Erasing, ActionMode::Idle] {
            render(&mut c, &mut cursor, mode, None, false, &style(4));
            assert_eq!(c, before);
            assert!(cursor.is_empty());
        }
    }

    #[test]
    fn idle_is_idempotent() {
        let mut c = canvas();
        c.fill_disk(Point::new(60, 60), 8, INK);
        let before = c.clone();
        let mut cursor = StrokeCursor::default();
        for i in 0..10 {
            render(&mut c, &mut cursor, ActionMode::Idle, Some(Point::new(60 + i, 60)), false, &style(8));
        }
        assert_eq!(c, before);
        assert!(cursor.is_empty());
    }

    #[test]
    fn erasing_paints_background_and_keeps_its_own_slot() {
        let mut c = canvas();
        let s = style(3);
        let mut cursor = StrokeCursor::default();
        render(&mut c, &mut cursor, ActionMode::Drawing, Some(Point::new(100, 100)), false, &s);
        render(&mut c, &mut cursor, ActionMode::Drawing, Some(Point::new(140, 100)), false, &s);
        assert_eq!(c.pixel(120, 100), Some(INK));

        render(&mut c, &mut cursor, ActionMode::Erasing, Some(Point::new(100, 100)), true, &s);
        assert_eq!(cursor.last_draw_point, None);
        render(&mut c, &mut cursor, ActionMode::Erasing, Some(Point::new(140, 100)), false, &s);
        assert_eq!(c.pixel(120, 100), Some(BG));
        assert_eq!(cursor.last_erase_point, Some(Point::new(140, 100)));
    }

    fn inked_canvas() -> Canvas {
        let mut c = canvas();
        c.fill_disk(Point::new(160, 120), 400, INK);
        c
    }

    #[test]
    fn eraser_line_is_twice_the_eraser_radius_wide() {
        let mut c = inked_canvas();
        let mut cursor = StrokeCursor {
            last_draw_point: None,
            last_erase_point: Some(Point::new(100, 120)),
        };
        // Eraser radius 6, so the connecting segment is 12 px wide.
        render(&mut c, &mut cursor, ActionMode::Erasing, Some(Point::new(160, 120)), false, &style(3));

        assert_eq!(c.pixel(130, 120), Some(BG));
        assert_eq!(c.pixel(130, 126), Some(BG));
        assert_eq!(c.pixel(130, 114), Some(BG));
        assert_eq!(c.pixel(130, 127), Some(INK));
        assert_eq!(c.pixel(130, 113), Some(INK));
    }

    #[test]
    fn eraser_jump_guard_stamps_only_the_new_disk() {
        for (from, to) in [(20, 200), (20, 120)] {
            let mut c = inked_canvas();
            let mut cursor = StrokeCursor {
                last_draw_point: None,
                last_erase_point: Some(Point::new(from, 120)),
            };
            render(&mut c, &mut cursor, ActionMode::Erasing, Some(Point::new(to, 120)), false, &style(3));

            assert_eq!(c.pixel(to, 120), Some(BG));
            assert_eq!(c.pixel(to - 6, 120), Some(BG));
            assert_eq!(c.pixel(to - 7, 120), Some(INK));
            assert_eq!(c.pixel((from + to) / 2, 120), Some(INK));
            assert_eq!(cursor.last_erase_point, Some(Point::new(to, 120)));
        }
    }
}
