//! Hand landmarks and the external detector that produces them.
//!
//! The detector runs as a child process (typically a MediaPipe script). Each
//! frame we write a small header followed by raw RGB bytes to its stdin, and
//! it answers with one JSON line listing the hands it found:
//!
//! ```text
//! -> u32 width | u32 height | u32 channels (little endian) | width*height*3 bytes
//! <- {"hands":[{"handedness":"Right","score":0.97,"landmarks":[{"x":..,"y":..,"z":..}, ...21]}],"error":null}
//! ```
//!
//! The process must print `READY` on its own line once it has loaded its model.
//! Pipe I/O happens on a worker thread so a stalled detector costs one frame's
//! timeout instead of freezing the window.

use std::io::{self, BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::RgbFrame;

/// Number of joints per hand in the MediaPipe hand model.
pub const LANDMARK_COUNT: usize = 21;

/// Joint indices, MediaPipe ordering.
pub mod index {
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_PIP: usize = 6;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_PIP: usize = 14;
    pub const RING_TIP: usize = 16;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_TIP: usize = 20;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    /// Landmark index of the fingertip.
    pub const fn tip(self) -> usize {
        match self {
            Finger::Thumb => index::THUMB_TIP,
            Finger::Index => index::INDEX_TIP,
            Finger::Middle => index::MIDDLE_TIP,
            Finger::Ring => index::RING_TIP,
            Finger::Pinky => index::PINKY_TIP,
        }
    }

    /// Landmark index of the second joint from the tip (IP for the thumb, PIP otherwise).
    pub const fn second_joint(self) -> usize {
        match self {
            Finger::Thumb => index::THUMB_IP,
            Finger::Index => index::INDEX_PIP,
            Finger::Middle => index::MIDDLE_PIP,
            Finger::Ring => index::RING_PIP,
            Finger::Pinky => index::PINKY_PIP,
        }
    }
}

/// A joint position in image-fraction coordinates, origin top-left.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Finite and no more than one frame-width outside the image. Anything else
    /// is a detector glitch.
    pub fn is_plausible(self) -> bool {
        const RANGE: std::ops::RangeInclusive<f32> = -1.0..=2.0;
        RANGE.contains(&self.x) && RANGE.contains(&self.y)
    }

    pub fn distance(self, other: Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// One hand's 21 joints for a single frame.
#[derive(Clone, Debug, PartialEq)]
pub struct HandLandmarks {
    pub joints: [Landmark; LANDMARK_COUNT],
}

impl HandLandmarks {
    pub fn new(joints: [Landmark; LANDMARK_COUNT]) -> Self {
        Self { joints }
    }

    pub fn tip(&self, finger: Finger) -> Landmark {
        self.joints[finger.tip()]
    }

    pub fn second_joint(&self, finger: Finger) -> Landmark {
        self.joints[finger.second_joint()]
    }

    /// The index fingertip drives the drawing cursor.
    pub fn cursor_anchor(&self) -> Landmark {
        self.joints[index::INDEX_TIP]
    }
}

/// What the detector saw this frame.
#[derive(Clone, Debug, PartialEq)]
pub enum HandReading {
    NoHand,
    Hand(HandLandmarks),
}

/// Anything that can turn a camera frame into at most one hand.
pub trait LandmarkSource {
    /// Detect a hand in `frame`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Detector`] (or [`Error::Io`]) when the source itself
    /// failed. "No hand in view" is `Ok(HandReading::NoHand)`, not an error.
    fn detect(&mut self, frame: &RgbFrame) -> Result<HandReading>;
}

/* ---------------------------- wire format ---------------------------- */

#[derive(Deserialize, Debug)]
struct LandmarkJson {
    x: f32,
    y: f32,
}

#[derive(Deserialize, Debug)]
struct HandJson {
    #[serde(default)]
    handedness: String,
    score: f32,
    landmarks: Vec<LandmarkJson>,
}

#[derive(Deserialize, Debug)]
struct DetectionJson {
    #[serde(default)]
    hands: Vec<HandJson>,
    #[serde(default)]
    error: Option<String>,
}

/// Parse one detector response line and keep the first confident, complete hand.
fn parse_detection(line: &str, min_score: f32) -> Result<HandReading> {
    let result: DetectionJson = serde_json::from_str(line.trim())
        .map_err(|e| Error::Detector(format!("bad response {:?}: {e}", line.trim())))?;

    if let Some(error) = result.error {
        warn!(%error, "detector reported an error");
        return Ok(HandReading::NoHand);
    }

    for hand in result.hands {
        if hand.score < min_score {
            continue;
        }
        if hand.landmarks.len() != LANDMARK_COUNT {
            warn!(count = hand.landmarks.len(), "expected {LANDMARK_COUNT} landmarks");
            continue;
        }

        let mut joints = [Landmark::default(); LANDMARK_COUNT];
        for (slot, lm) in joints.iter_mut().zip(&hand.landmarks) {
            *slot = Landmark::new(lm.x, lm.y);
        }
        if let Some(bad) = joints.iter().find(|j| !j.is_plausible()) {
            warn!(x = bad.x, y = bad.y, "discarding hand with out-of-range landmark");
            continue;
        }
        debug!(
            handedness = %hand.handedness,
            score = hand.score,
            "hand detected, index tip=({:.3},{:.3})",
            joints[index::INDEX_TIP].x,
            joints[index::INDEX_TIP].y
        );
        return Ok(HandReading::Hand(HandLandmarks::new(joints)));
    }

    Ok(HandReading::NoHand)
}

/// How long a freshly spawned detector gets to load its model.
const READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Landmark detector running as a child process.
///
/// At most one frame is in flight. While the detector is still working on an
/// earlier frame, new frames are reported as no hand without being sent.
#[derive(Debug)]
pub struct SubprocessDetector {
    process: Child,
    frames: Sender<RgbFrame>,
    replies: Receiver<io::Result<String>>,
    in_flight: bool,
    min_score: f32,
    timeout: Duration,
}

/// Worker side: announce the READY line, then answer frames until either end closes.
fn serve_frames(
    mut stdin: ChildStdin,
    mut stdout: BufReader<ChildStdout>,
    frames: Receiver<RgbFrame>,
    replies: Sender<io::Result<String>>,
) {
    let mut line = String::new();
    let ready = stdout.read_line(&mut line).map(|_| line);
    if replies.send(ready).is_err() {
        return;
    }

    for frame in frames {
        let reply = write_frame(&mut stdin, &frame).and_then(|()| {
            let mut response = String::new();
            match stdout.read_line(&mut response)? {
                0 => Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "detector closed its output",
                )),
                _ => Ok(response),
            }
        });
        let failed = reply.is_err();
        if replies.send(reply).is_err() || failed {
            return;
        }
    }
}

fn write_frame(stdin: &mut ChildStdin, frame: &RgbFrame) -> io::Result<()> {
    stdin.write_all(&frame.width.to_le_bytes())?;
    stdin.write_all(&frame.height.to_le_bytes())?;
    stdin.write_all(&3u32.to_le_bytes())?;
    stdin.write_all(&frame.data)?;
    stdin.flush()
}

impl SubprocessDetector {
    /// Start `command` and wait for its `READY` line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Detector`] if the command is empty, cannot be spawned,
    /// or does not announce itself in time.
    pub fn spawn(command: &[String], min_score: f32, timeout: Duration) -> Result<Self> {
        Self::spawn_with_ready_timeout(command, min_score, timeout, READY_TIMEOUT)
    }

    fn spawn_with_ready_timeout(
        command: &[String],
        min_score: f32,
        timeout: Duration,
        ready_timeout: Duration,
    ) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| Error::Detector("empty detector command".into()))?;

        info!(%program, "starting hand landmark detector");
        let mut process = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| Error::Detector(format!("spawn {program}: {e}")))?;

        let (Some(stdin), Some(stdout)) = (process.stdin.take(), process.stdout.take()) else {
            let _ = process.kill();
            return Err(Error::Detector("detector pipes unavailable".into()));
        };

        let (frame_tx, frame_rx) = mpsc::channel();
        let (reply_tx, reply_rx) = mpsc::channel();
        let stdout = BufReader::new(stdout);
        if let Err(e) = thread::Builder::new()
            .name("landmark-detector".into())
            .spawn(move || serve_frames(stdin, stdout, frame_rx, reply_tx))
        {
            let _ = process.kill();
            return Err(e.into());
        }

        // From here on dropping `detector` kills the child.
        let detector = Self {
            process,
            frames: frame_tx,
            replies: reply_rx,
            in_flight: false,
            min_score,
            timeout,
        };

        let ready = match detector.replies.recv_timeout(ready_timeout) {
            Ok(Ok(line)) => line,
            Ok(Err(e)) => return Err(e.into()),
            Err(RecvTimeoutError::Timeout) => {
                return Err(Error::Detector(format!(
                    "detector not ready after {ready_timeout:?}"
                )));
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(Error::Detector("detector exited before READY".into()));
            }
        };
        if ready.trim() != "READY" {
            return Err(Error::Detector(format!(
                "detector did not signal ready, got {:?}",
                ready.trim()
            )));
        }
        info!("hand landmark detector ready");
        Ok(detector)
    }

    fn worker_gone() -> Error {
        Error::Detector("detector worker stopped".into())
    }
}

impl LandmarkSource for SubprocessDetector {
    fn detect(&mut self, frame: &RgbFrame) -> Result<HandReading> {
        if self.in_flight {
            match self.replies.try_recv() {
                Ok(Ok(_)) => {
                    debug!("dropping late detector reply");
                    self.in_flight = false;
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(TryRecvError::Empty) => return Ok(HandReading::NoHand),
                Err(TryRecvError::Disconnected) => return Err(Self::worker_gone()),
            }
        }

        if frame.width == 0 || frame.height == 0 {
            return Ok(HandReading::NoHand);
        }

        self.frames
            .send(frame.clone())
            .map_err(|_| Self::worker_gone())?;
        self.in_flight = true;

        match self.replies.recv_timeout(self.timeout) {
            Ok(reply) => {
                self.in_flight = false;
                parse_detection(&reply?, self.min_score)
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(timeout = ?self.timeout, "detector reply timed out, treating frame as no hand");
                Ok(HandReading::NoHand)
            }
            Err(RecvTimeoutError::Disconnected) => Err(Self::worker_gone()),
        }
    }
}

impl Drop for SubprocessDetector {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

/// Used when no detector is configured: never sees a hand.
#[derive(Debug, Default)]
pub struct NoDetector;

impl LandmarkSource for NoDetector {
    fn detect(&mut self, _frame: &RgbFrame) -> Result<HandReading> {
        Ok(HandReading::NoHand)
    }
}
