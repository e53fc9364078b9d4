// Window + software drawing utilities.
// Visual effects provided here:
// 1) A window that shows the camera image with the canvas blended on top.
// 2) A crosshair that follows the hand (or mouse) cursor.
// 3) A tiny 5x7 bitmap font for the status line, plus a swatch of the ink color.
// Key presses are translated into session events here and nowhere else.

use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

use crate::arbiter::{ActionMode, BaseMode};
use crate::error::{Error, Result};
use crate::session::{InputSource, PointerState, SessionEvent};
use crate::types::{FrameBuffer, Point, Rgb};

/// Keyboard bindings, in the order they are polled.
const BINDINGS: [(Key, SessionEvent); 6] = [
    (Key::Space, SessionEvent::ToggleMode),
    (Key::C, SessionEvent::CycleColor),
    (Key::S, SessionEvent::CycleBrush),
    (Key::R, SessionEvent::ClearCanvas),
    (Key::P, SessionEvent::SaveCanvas),
    (Key::Escape, SessionEvent::Quit),
];

pub struct Drawer {
    window: Window, // the on-screen window you see
}

impl Drawer {
    /// Create a window sized to the frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WindowInit`] if the platform refuses the window.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        Ok(Self { window })
    }

    /// Push the pixels for this frame to the screen. Also pumps window events,
    /// so key and mouse state are fresh afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WindowUpdate`] if minifb rejects the buffer.
    pub fn present(&mut self, framebuffer: &FrameBuffer) -> Result<()> {
        self.window
            .update_with_buffer(&framebuffer.pixels, framebuffer.width, framebuffer.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))
    }

    /// Process window events without presenting a new frame.
    pub fn pump(&mut self) {
        self.window.update();
    }

    /// Returns false when the user closes the window.
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    /// Session events for keys pressed since the last update (no key repeat).
    pub fn poll_events(&self) -> Vec<SessionEvent> {
        BINDINGS
            .iter()
            .filter(|(key, _)| self.window.is_key_pressed(*key, KeyRepeat::No))
            .map(|(_, event)| *event)
            .collect()
    }

    /// Mouse position (clamped to the window) and left button state.
    #[allow(clippy::cast_possible_truncation)]
    pub fn pointer(&self) -> PointerState {
        PointerState {
            position: self
                .window
                .get_mouse_pos(MouseMode::Clamp)
                .map(|(x, y)| Point::new(x.max(0.0) as i32, y.max(0.0) as i32)),
            pressed: self.window.get_mouse_down(MouseButton::Left),
        }
    }
}

/* ---------- Software drawing: pixels, crosshair, swatch, tiny bitmap font ---------- */

/// Put a pixel on the framebuffer if (x,y) is inside bounds.
#[inline]
fn put_pixel(fb: &mut FrameBuffer, x: i32, y: i32, color: u32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= fb.width || y >= fb.height {
        return;
    }
    let idx = y * fb.width + x;
    fb.pixels[idx] = color;
}

/// Draw a thin line between (x0,y0) and (x1,y1) using Bresenham.
fn draw_line(fb: &mut FrameBuffer, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
    let (mut x0, mut y0) = (x0, y0);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put_pixel(fb, x0, y0, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Draw a crosshair centered at `at`, with a small gap in the middle.
pub fn draw_crosshair(fb: &mut FrameBuffer, at: Point, size: i32, color: u32) {
    let (cx, cy) = (at.x, at.y);
    draw_line(fb, cx - size, cy, cx - 3, cy, color);
    draw_line(fb, cx + 3, cy, cx + size, cy, color);
    draw_line(fb, cx, cy - size, cx, cy - 3, color);
    draw_line(fb, cx, cy + 3, cx, cy + size, color);
    put_pixel(fb, cx, cy, color);
}

/// Filled square with a 1-pixel white border.
pub fn draw_swatch(fb: &mut FrameBuffer, x: i32, y: i32, size: i32, color: Rgb) {
    for yy in y..y + size {
        for xx in x..x + size {
            let edge = yy == y || yy == y + size - 1 || xx == x || xx == x + size - 1;
            put_pixel(fb, xx, yy, if edge { 0x00FF_FFFF } else { color.pack() });
        }
    }
}

/* ---------- 5x7 bitmap font (the uppercase subset the status line uses) ---------- */

/// Return a 5x7 glyph bitmap for a limited character set.
/// Each u8 is a row; the low 5 bits are the pixels (bit 4 = leftmost).
#[rustfmt::skip]
fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    macro_rules! g { ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
        Some([$a,$b,$c,$d,$e,$f,$g])
    }; }

    match ch.to_ascii_uppercase() {
        '0' => g!(0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110),
        '1' => g!(0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110),
        '2' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111),
        '3' => g!(0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110),
        '4' => g!(0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010),
        '5' => g!(0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110),
        '6' => g!(0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110),
        '7' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000),
        '8' => g!(0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110),
        '9' => g!(0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100),

        'A' => g!(0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'B' => g!(0b11110,0b10001,0b10001,0b11110,0b10001,0b10001,0b11110),
        'D' => g!(0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100),
        'E' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b11111),
        'F' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b10000),
        'G' => g!(0b01110,0b10001,0b10000,0b10111,0b10001,0b10001,0b01111),
        'H' => g!(0b10001,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'I' => g!(0b01110,0b00100,0b00100,0b00100,0b00100,0b00100,0b01110),
        'L' => g!(0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111),
        'M' => g!(0b10001,0b11011,0b10101,0b10101,0b10001,0b10001,0b10001),
        'N' => g!(0b10001,0b11001,0b10101,0b10011,0b10001,0b10001,0b10001),
        'O' => g!(0b01110,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'P' => g!(0b11110,0b10001,0b10001,0b11110,0b10000,0b10000,0b10000),
        'R' => g!(0b11110,0b10001,0b10001,0b11110,0b10100,0b10010,0b10001),
        'S' => g!(0b01111,0b10000,0b10000,0b01110,0b00001,0b00001,0b11110),
        'T' => g!(0b11111,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        'U' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'W' => g!(0b10001,0b10001,0b10001,0b10101,0b10101,0b10101,0b01010),

        ' ' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000),
        '|' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        ':' => g!(0b00000,0b00100,0b00000,0b00000,0b00100,0b00000,0b00000),
        '.' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00100,0b00000),

        _ => None,
    }
}

/// Draw a single 5x7 character at (x,y), each font pixel `scale` screen pixels,
/// with a black drop shadow for contrast.
fn draw_char_5x7(fb: &mut FrameBuffer, x: i32, y: i32, ch: char, color: u32, scale: i32) {
    let Some(rows) = glyph5x7(ch) else { return };
    for (pass_color, offset) in [(0x0000_0000, scale.max(1)), (color, 0)] {
        for (ry, rowbits) in rows.iter().enumerate() {
            for rx in 0..5 {
                if rowbits & (1 << (4 - rx)) == 0 {
                    continue;
                }
                let px = x + rx * scale + offset;
                let py = y + ry as i32 * scale + offset;
                for sy in 0..scale {
                    for sx in 0..scale {
                        put_pixel(fb, px + sx, py + sy, pass_color);
                    }
                }
            }
        }
    }
}

/// Draw a text string using 5x7 glyphs. Unknown characters leave a blank cell.
pub fn draw_text_5x7(fb: &mut FrameBuffer, mut x: i32, y: i32, text: &str, color: u32, scale: i32) {
    for ch in text.chars() {
        draw_char_5x7(fb, x, y, ch, color, scale);
        x += 6 * scale; // 5 pixels glyph width + 1 pixel spacing
    }
}

/// Everything the status overlay shows. Read-only snapshot of the session.
#[derive(Clone, Copy, Debug)]
pub struct HudStatus {
    pub base_mode: BaseMode,
    pub action: ActionMode,
    pub source: InputSource,
    pub fingers: u8,
    pub brush_radius: u32,
    pub color: Rgb,
    pub fps: f32,
    pub cursor: Option<Point>,
}

/// Format the two status lines.
pub fn hud_lines(status: &HudStatus) -> [String; 2] {
    let input = match status.source {
        InputSource::Hand => "HAND",
        InputSource::Pointer => "MOUSE",
    };
    [
        format!(
            "{} | {} | FINGERS: {} | BRUSH: {}",
            status.base_mode, status.action, status.fingers, status.brush_radius
        ),
        format!("INPUT: {input} | FPS: {:.1}", status.fps),
    ]
}

/// Paint the status overlay and the cursor crosshair onto the composited frame.
pub fn draw_hud(fb: &mut FrameBuffer, status: &HudStatus) {
    let scale = if fb.width >= 1280 { 3 } else { 2 };
    let line_h = 10 * scale;
    let mode_color = match status.base_mode {
        BaseMode::Write => 0x0000_FF00,
        BaseMode::Erase => 0x00FF_0000,
    };

    let [first, second] = hud_lines(status);
    draw_text_5x7(fb, 10, 10, &first, mode_color, scale);
    draw_text_5x7(fb, 10, 10 + line_h, &second, 0x00FF_FF00, scale);
    draw_swatch(fb, 10, 10 + 2 * line_h, 4 * line_h / 3, status.color);

    if let (Some(at), InputSource::Hand) = (status.cursor, status.source) {
        draw_crosshair(fb, at, 20 * scale / 2, 0x0000_FFFF);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn status() -> HudStatus {
        HudStatus {
            base_mode: BaseMode::Write,
            action: ActionMode::Drawing,
            source: InputSource::Hand,
            fingers: 2,
            brush_radius: 8,
            color: Rgb::new(0, 255, 0),
            fps: 29.97,
            cursor: Some(Point::new(50, 50)),
        }
    }

    #[test]
    fn status_lines_render_with_known_glyphs() {
        let lines = hud_lines(&status());
        assert_eq!(lines[0], "WRITE | DRAWING | FINGERS: 2 | BRUSH: 8");
        assert_eq!(lines[1], "INPUT: HAND | FPS: 30.0");
        for line in &lines {
            assert!(line.chars().all(|c| glyph5x7(c).is_some()), "{line}");
        }
        for label in ["ERASE", "ERASING", "IDLE", "MOUSE"] {
            assert!(label.chars().all(|c| glyph5x7(c).is_some()), "{label}");
        }
    }

    #[test]
    fn hud_draws_crosshair_and_swatch_without_panicking_at_edges() {
        let mut fb = FrameBuffer::filled(200, 120, Rgb::new(0, 0, 0));
        let mut s = status();
        s.cursor = Some(Point::new(199, 119));
        draw_hud(&mut fb, &s);
        assert_eq!(fb.pixels[119 * 200 + 199], 0x0000_FFFF);
        // Swatch interior (scale 2: starts at y = 50, 26 px square).
        assert_eq!(fb.pixels[60 * 200 + 20], Rgb::new(0, 255, 0).pack());
    }

    #[test]
    fn pointer_input_hides_crosshair() {
        let mut fb = FrameBuffer::filled(200, 200, Rgb::new(0, 0, 0));
        let mut s = status();
        s.source = InputSource::Pointer;
        s.cursor = Some(Point::new(150, 150));
        draw_hud(&mut fb, &s);
        assert_eq!(fb.pixels[150 * 200 + 150], 0);
    }
}
