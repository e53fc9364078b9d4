//! # gesture-board
//!
//! Draw on a persistent virtual canvas with one hand in front of a camera.
//!
//! Each frame an external landmark detector reports the hand's 21 joints. The
//! number of extended fingers picks what the index fingertip does:
//!
//! | Fingers | Write mode | Erase mode |
//! |---|---|---|
//! | 2 | draw | move |
//! | 4 or 5 | erase | erase |
//! | anything else, or no hand | move | move |
//!
//! The per-frame pipeline is
//! [`classifier`] -> [`arbiter`] -> [`stroke`] -> [`canvas`], driven by a
//! [`session::Session`]. Capture ([`camera`]), detection ([`landmarks`]) and
//! display ([`draw`]) are thin collaborators around it.

pub mod arbiter;
pub mod camera;
pub mod canvas;
pub mod classifier;
pub mod config;
pub mod draw;
pub mod error;
pub mod landmarks;
pub mod session;
pub mod stroke;
pub mod types;

pub use error::{Error, Result};
