//! Board configuration. Fixed at construction; the session never mutates it.
//!
//! [`BoardConfig`] carries every tunable with the defaults the board ships
//! with. [`Args`] is the command line surface that maps onto it.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::error::{Error, Result};
use crate::types::Rgb;

/// Dark gray used for the empty canvas and by the eraser.
pub const DEFAULT_BACKGROUND: Rgb = Rgb::new(20, 20, 20);

/// The fixed draw palette, in cycle order.
pub const DEFAULT_PALETTE: [(&str, Rgb); 8] = [
    ("Red", Rgb::new(255, 0, 0)),
    ("Green", Rgb::new(0, 255, 0)),
    ("Blue", Rgb::new(0, 0, 255)),
    ("Yellow", Rgb::new(255, 255, 0)),
    ("Magenta", Rgb::new(255, 0, 255)),
    ("Cyan", Rgb::new(0, 255, 255)),
    ("White", Rgb::new(255, 255, 255)),
    ("Black", Rgb::new(0, 0, 0)),
];

/// Brush radii visited by the "cycle brush size" key.
pub const DEFAULT_BRUSH_SIZES: [u32; 6] = [5, 8, 12, 20, 30, 50];

#[derive(Clone, Debug, PartialEq)]
pub struct BoardConfig {
    /// Exact finger count that draws while the base mode is Write.
    pub fingers_for_draw: u8,
    /// Finger count at or above which the hand erases, regardless of base mode.
    pub fingers_for_erase: u8,
    pub brush_radius: u32,
    pub eraser_radius: u32,
    pub brush_sizes: Vec<u32>,
    pub background: Rgb,
    pub palette: Vec<(String, Rgb)>,
    pub default_color_index: usize,
    /// Consecutive points farther apart than this (pixels) are not joined.
    pub max_jump: f64,
    /// Normalized tip-to-joint distance above which the thumb counts as extended.
    pub thumb_threshold: f32,
    /// Normalized margin the fingertip must rise above its second joint.
    pub finger_threshold: f32,
    pub canvas_weight: f32,
    pub frame_weight: f32,
    pub camera_index: u32,
    pub camera_width: u32,
    pub camera_height: u32,
    /// Surface size used when no camera is available (pointer fallback).
    pub fallback_width: usize,
    pub fallback_height: usize,
    pub mirror: bool,
    pub output_dir: PathBuf,
    /// Program (plus args) that speaks the landmark detector protocol.
    pub detector_command: Option<Vec<String>>,
    pub detector_confidence: f32,
    /// How long one frame may wait for a detector reply before it counts as no hand.
    pub detector_timeout: Duration,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            fingers_for_draw: 2,
            fingers_for_erase: 4,
            brush_radius: 8,
            eraser_radius: 40,
            brush_sizes: DEFAULT_BRUSH_SIZES.to_vec(),
            background: DEFAULT_BACKGROUND,
            palette: DEFAULT_PALETTE
                .iter()
                .map(|(name, c)| ((*name).to_string(), *c))
                .collect(),
            default_color_index: 1,
            max_jump: 100.0,
            thumb_threshold: 0.08,
            finger_threshold: 0.02,
            canvas_weight: 0.6,
            frame_weight: 0.4,
            camera_index: 0,
            camera_width: 1280,
            camera_height: 720,
            fallback_width: 1280,
            fallback_height: 720,
            mirror: true,
            output_dir: PathBuf::from("."),
            detector_command: None,
            detector_confidence: 0.7,
            detector_timeout: Duration::from_millis(1000),
        }
    }
}

impl BoardConfig {
    /// Reject settings the pipeline cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first offending option.
    pub fn validate(&self) -> Result<()> {
        if self.fingers_for_draw > 5 || self.fingers_for_erase > 5 {
            return Err(Error::Config("finger thresholds must be within 0..=5".into()));
        }
        if self.brush_radius == 0 || self.eraser_radius == 0 {
            return Err(Error::Config("brush and eraser radius must be positive".into()));
        }
        if self.brush_sizes.is_empty() || self.brush_sizes.contains(&0) {
            return Err(Error::Config("brush size cycle must be non-empty and positive".into()));
        }
        if self.palette.is_empty() {
            return Err(Error::Config("palette must contain at least one color".into()));
        }
        if self.default_color_index >= self.palette.len() {
            return Err(Error::Config("default color index is outside the palette".into()));
        }
        if !(self.max_jump > 0.0) {
            return Err(Error::Config("jump threshold must be positive".into()));
        }
        if self.thumb_threshold < 0.0 || self.finger_threshold < 0.0 {
            return Err(Error::Config("extension thresholds must not be negative".into()));
        }
        for (name, w) in [("canvas", self.canvas_weight), ("frame", self.frame_weight)] {
            if !(0.0..=1.0).contains(&w) {
                return Err(Error::Config(format!("{name} weight must be within 0..=1")));
            }
        }
        if self.detector_timeout.is_zero() {
            return Err(Error::Config("detector timeout must be positive".into()));
        }
        if self.fallback_width == 0 || self.fallback_height == 0 {
            return Err(Error::Config("fallback surface must not be empty".into()));
        }
        Ok(())
    }
}

/// Draw on a virtual canvas with hand gestures.
///
/// Two extended fingers write, four or more erase, anything else just moves
/// the cursor. Space toggles write/erase, C cycles color, S cycles brush size,
/// R clears, P saves a PNG, Esc quits.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// Finger count that draws in write mode.
    #[arg(long, default_value_t = 2)]
    pub fingers_for_draw: u8,

    /// Finger count at or above which the hand erases.
    #[arg(long, default_value_t = 4)]
    pub fingers_for_erase: u8,

    /// Initial brush radius in pixels.
    #[arg(long, default_value_t = 8)]
    pub brush_radius: u32,

    /// Eraser radius in pixels.
    #[arg(long, default_value_t = 40)]
    pub eraser_radius: u32,

    /// Canvas background as `r,g,b`.
    #[arg(long, value_parser = parse_rgb, default_value = "20,20,20")]
    pub background: Rgb,

    /// Maximum distance in pixels between consecutive points that still get joined.
    #[arg(long, default_value_t = 100.0)]
    pub max_jump: f64,

    /// Thumb extension threshold (normalized units).
    #[arg(long, default_value_t = 0.08)]
    pub thumb_threshold: f32,

    /// Finger extension margin (normalized units).
    #[arg(long, default_value_t = 0.02)]
    pub finger_threshold: f32,

    /// Camera device index.
    #[arg(long, default_value_t = 0)]
    pub camera: u32,

    /// Requested camera width.
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Requested camera height.
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Show the camera unmirrored.
    #[arg(long)]
    pub no_mirror: bool,

    /// Directory that receives saved drawings.
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Landmark detector command, e.g. `python3 hand_detect.py`.
    #[arg(long, num_args = 1.., value_delimiter = ' ')]
    pub detector: Option<Vec<String>>,

    /// Minimum detector score for a hand to be used.
    #[arg(long, default_value_t = 0.7)]
    pub detector_confidence: f32,

    /// Milliseconds to wait for each detector reply.
    #[arg(long, default_value_t = 1000)]
    pub detector_timeout_ms: u64,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,
}

impl Args {
    /// Build a validated config, keeping defaults for anything not on the CLI.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the combination is unusable.
    pub fn into_config(self) -> Result<BoardConfig> {
        let config = BoardConfig {
            fingers_for_draw: self.fingers_for_draw,
            fingers_for_erase: self.fingers_for_erase,
            brush_radius: self.brush_radius,
            eraser_radius: self.eraser_radius,
            background: self.background,
            max_jump: self.max_jump,
            thumb_threshold: self.thumb_threshold,
            finger_threshold: self.finger_threshold,
            camera_index: self.camera,
            camera_width: self.width,
            camera_height: self.height,
            mirror: !self.no_mirror,
            output_dir: self.output_dir,
            detector_command: self.detector.filter(|cmd| !cmd.is_empty()),
            detector_confidence: self.detector_confidence.clamp(0.0, 1.0),
            detector_timeout: Duration::from_millis(self.detector_timeout_ms),
            ..BoardConfig::default()
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_rgb(s: &str) -> std::result::Result<Rgb, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [r, g, b] = parts.as_slice() else {
        return Err(format!("expected r,g,b but got {s:?}"));
    };
    let channel = |v: &str| v.parse::<u8>().map_err(|e| format!("{v:?}: {e}"));
    Ok(Rgb::new(channel(r)?, channel(g)?, channel(b)?))
}
