// The persistent drawing surface.
// Visual expectation: whatever ink is stamped here stays until it is erased,
// cleared, or the camera changes resolution. Each frame it is blended over the
// live camera image for display; the blend never writes back into the canvas.

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use image::{ImageBuffer, Rgb as ImageRgb, RgbImage};
use tracing::info;

use crate::error::{Error, Result};
use crate::types::{FrameBuffer, FrameSize, Point, Rgb};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Canvas {
    surface: FrameBuffer,
    background: Rgb,
}

impl Canvas {
    /// A canvas of `size` filled with the background color.
    pub fn new(size: FrameSize, background: Rgb) -> Self {
        Self {
            surface: FrameBuffer::filled(size.width, size.height, background),
            background,
        }
    }

    /// Reallocate at `width` x `height` and fill with the background, dropping all ink.
    pub fn initialize(&mut self, width: usize, height: usize) {
        self.surface = FrameBuffer::filled(width, height, self.background);
    }

    /// Follow the source frame size. Returns true if the canvas was reinitialized.
    pub fn ensure_size(&mut self, size: FrameSize) -> bool {
        if self.surface.size() == size {
            return false;
        }
        info!(
            from = ?self.surface.size(),
            to = ?size,
            "frame size changed, reinitializing canvas"
        );
        self.initialize(size.width, size.height);
        true
    }

    /// Wipe all ink but keep the current size.
    pub fn clear(&mut self) {
        self.surface.pixels.fill(self.background.pack());
    }

    pub fn size(&self) -> FrameSize {
        self.surface.size()
    }

    pub fn pixels(&self) -> &[u32] {
        &self.surface.pixels
    }

    /// Color at (x, y), or None outside the surface.
    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgb> {
        self.index(x, y).map(|i| Rgb::unpack(self.surface.pixels[i]))
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.surface.width || y >= self.surface.height {
            return None;
        }
        Some(y * self.surface.width + x)
    }

    /// Bounding box of `[min, max]` clipped to the surface, as inclusive pixel ranges.
    fn clip(&self, min: (i32, i32), max: (i32, i32)) -> Option<((i32, i32), (i32, i32))> {
        let w = i32::try_from(self.surface.width).unwrap_or(i32::MAX);
        let h = i32::try_from(self.surface.height).unwrap_or(i32::MAX);
        let x0 = min.0.max(0);
        let y0 = min.1.max(0);
        let x1 = max.0.min(w - 1);
        let y1 = max.1.min(h - 1);
        (x0 <= x1 && y0 <= y1).then_some(((x0, y0), (x1, y1)))
    }

    /// Stamp a solid disk. Pixels whose center lies within `radius` are painted.
    pub fn fill_disk(&mut self, center: Point, radius: u32, color: Rgb) {
        let r = i32::try_from(radius).unwrap_or(i32::MAX / 2);
        let r2 = i64::from(r) * i64::from(r);
        let Some(((x0, y0), (x1, y1))) =
            self.clip(
                (center.x.saturating_sub(r), center.y.saturating_sub(r)),
                (center.x.saturating_add(r), center.y.saturating_add(r)),
            )
        else {
            return;
        };

        let px = color.pack();
        let w = self.surface.width;
        for y in y0..=y1 {
            let dy = i64::from(y) - i64::from(center.y);
            let row = y as usize * w;
            for x in x0..=x1 {
                let dx = i64::from(x) - i64::from(center.x);
                if dx * dx + dy * dy <= r2 {
                    self.surface.pixels[row + x as usize] = px;
                }
            }
        }
    }

    /// Stroke a straight segment `width` pixels thick with round caps.
    ///
    /// Every pixel whose center is within `width / 2` of the segment is
    /// painted, so consecutive disks of radius `width / 2` are joined without gaps.
    pub fn stroke_line(&mut self, from: Point, to: Point, width: u32, color: Rgb) {
        let half = f64::from(width) / 2.0;
        let reach = half.ceil() as i32;
        let Some(((x0, y0), (x1, y1))) = self.clip(
            (
                from.x.min(to.x).saturating_sub(reach),
                from.y.min(to.y).saturating_sub(reach),
            ),
            (
                from.x.max(to.x).saturating_add(reach),
                from.y.max(to.y).saturating_add(reach),
            ),
        ) else {
            return;
        };

        let (ax, ay) = (f64::from(from.x), f64::from(from.y));
        let (dx, dy) = (f64::from(to.x) - ax, f64::from(to.y) - ay);
        let len2 = dx * dx + dy * dy;
        let half2 = half * half;

        let px = color.pack();
        let w = self.surface.width;
        for y in y0..=y1 {
            let row = y as usize * w;
            for x in x0..=x1 {
                let (qx, qy) = (f64::from(x) - ax, f64::from(y) - ay);
                // Project onto the segment, clamped to its ends.
                let t = if len2 > 0.0 {
                    ((qx * dx + qy * dy) / len2).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let (ex, ey) = (qx - t * dx, qy - t * dy);
                if ex * ex + ey * ey <= half2 {
                    self.surface.pixels[row + x as usize] = px;
                }
            }
        }
    }

    /// Blend the canvas over a camera frame in place:
    /// `out = canvas * canvas_weight + frame * frame_weight`, per channel, saturating.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CameraFrame`] if the frame and canvas sizes differ.
    pub fn composite_over(
        &self,
        frame: &mut FrameBuffer,
        canvas_weight: f32,
        frame_weight: f32,
    ) -> Result<()> {
        if frame.size() != self.surface.size() {
            return Err(Error::CameraFrame("composite: dimension mismatch".into()));
        }

        #[inline]
        fn mix(c: u8, f: u8, cw: f32, fw: f32) -> u8 {
            (f32::from(c) * cw + f32::from(f) * fw).round().clamp(0.0, 255.0) as u8
        }

        for (out, &ink) in frame.pixels.iter_mut().zip(&self.surface.pixels) {
            let c = Rgb::unpack(ink);
            let f = Rgb::unpack(*out);
            *out = Rgb::new(
                mix(c.r, f.r, canvas_weight, frame_weight),
                mix(c.g, f.g, canvas_weight, frame_weight),
                mix(c.b, f.b, canvas_weight, frame_weight),
            )
            .pack();
        }
        Ok(())
    }

    /// Copy the canvas into an `image` RGB buffer.
    pub fn to_image(&self) -> RgbImage {
        let w = u32::try_from(self.surface.width).unwrap_or(u32::MAX);
        let h = u32::try_from(self.surface.height).unwrap_or(u32::MAX);
        ImageBuffer::from_fn(w, h, |x, y| {
            let c = Rgb::unpack(self.surface.pixels[y as usize * self.surface.width + x as usize]);
            ImageRgb([c.r, c.g, c.b])
        })
    }

    /// Write a `drawing_YYYYmmdd_HHMMSS.png` snapshot into `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Export`] if encoding or writing the file fails.
    pub fn save_snapshot<Tz>(&self, dir: &Path, at: &DateTime<Tz>) -> Result<PathBuf>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let path = dir.join(format!("drawing_{}.png", at.format("%Y%m%d_%H%M%S")));
        self.to_image().save(&path)?;
        info!(path = %path.display(), "drawing saved");
        Ok(path)
    }
}
