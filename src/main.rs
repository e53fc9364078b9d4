// What you SEE:
// • The mirrored camera feed with your drawing blended on top.
// • Two fingers up: ink follows your index fingertip. Four or more: erase.
// • Space toggles write/erase, C color, S brush size, R clear, P save PNG, ESC quits.
// • No camera or no detector: draw with the left mouse button instead.

use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{debug, error, info, warn};

use gesture_board::camera::{CameraCapture, CapturedFrame};
use gesture_board::config::{Args, BoardConfig};
use gesture_board::draw::{Drawer, HudStatus, draw_hud};
use gesture_board::landmarks::{HandReading, LandmarkSource, NoDetector, SubprocessDetector};
use gesture_board::session::{EventOutcome, InputSource, PointerState, Session, TickReport};
use gesture_board::types::{FrameBuffer, FrameSize, Rgb};
use gesture_board::{Error, Result};

/// Backdrop shown in place of the camera when drawing with the mouse.
const BLANK_FRAME: Rgb = Rgb::new(30, 30, 30);

fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt().with_max_level(args.log_level).init();

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Open the camera, or None (pointer fallback) if there is none.
fn open_camera(config: &BoardConfig) -> Option<CameraCapture> {
    match CameraCapture::new(
        config.camera_index,
        config.camera_width,
        config.camera_height,
        config.mirror,
    ) {
        Ok(cam) => Some(cam),
        Err(e) => {
            warn!("{e}; falling back to mouse input");
            None
        }
    }
}

/// Start the configured detector, or None if there is none or it fails.
fn open_detector(config: &BoardConfig) -> Option<Box<dyn LandmarkSource>> {
    let Some(command) = &config.detector_command else {
        warn!("no landmark detector configured (--detector); falling back to mouse input");
        return None;
    };
    match SubprocessDetector::spawn(
        command,
        config.detector_confidence,
        config.detector_timeout,
    ) {
        Ok(detector) => Some(Box::new(detector)),
        Err(e) => {
            warn!("{e}; falling back to mouse input");
            None
        }
    }
}

/// Frames-per-second over one-second windows.
struct FpsCounter {
    window_start: Instant,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            window_start: Instant::now(),
            frames: 0,
            fps: 0.0,
        }
    }

    fn tick(&mut self) -> f32 {
        self.frames += 1;
        let elapsed = self.window_start.elapsed();
        if elapsed >= Duration::from_secs(1) {
            self.fps = self.frames as f32 / elapsed.as_secs_f32();
            debug!("FPS: {:.1}", self.fps);
            self.frames = 0;
            self.window_start = Instant::now();
        }
        self.fps
    }
}

/// The blocking part of a tick: the next camera frame, if there is a camera.
/// A camera failure drops the camera and switches the session to the pointer.
fn acquire(camera: &mut Option<CameraCapture>, session: &mut Session) -> Option<CapturedFrame> {
    let cam = camera.as_mut()?;
    match cam.next_frame() {
        Ok(frame) => Some(frame),
        Err(e) => {
            warn!("{e}; switching to mouse input");
            *camera = None;
            session.fall_back_to_pointer();
            None
        }
    }
}

/// One tick from frame to composited screen. Errors here are per-tick only.
fn tick(
    camera: &mut Option<CameraCapture>,
    detector: &mut dyn LandmarkSource,
    session: &mut Session,
    pointer: PointerState,
) -> Result<(FrameBuffer, TickReport)> {
    let fallback = FrameSize {
        width: session.config().fallback_width,
        height: session.config().fallback_height,
    };
    let captured = acquire(camera, session);

    let (mut screen, report) = match (session.source(), captured) {
        (InputSource::Hand, Some(frame)) => {
            let reading = detector.detect(&frame.rgb).unwrap_or_else(|e| {
                warn!("{e}; treating frame as no hand");
                HandReading::NoHand
            });
            let report = session.hand_tick(frame.display.size(), &reading);
            (frame.display, report)
        }
        (_, captured) => {
            let screen = captured.map_or_else(
                || FrameBuffer::filled(fallback.width, fallback.height, BLANK_FRAME),
                |frame| frame.display,
            );
            let report = session.pointer_tick(screen.size(), pointer);
            (screen, report)
        }
    };

    session.composite(&mut screen)?;
    Ok((screen, report))
}

fn run(config: BoardConfig) -> Result<()> {
    let mut camera = open_camera(&config);
    let detector = camera.as_ref().and_then(|_| open_detector(&config));

    let (source, size) = match (&camera, &detector) {
        (Some(cam), Some(_)) => {
            let (w, h) = cam.resolution();
            (InputSource::Hand, FrameSize { width: w as usize, height: h as usize })
        }
        (Some(cam), None) => {
            let (w, h) = cam.resolution();
            (InputSource::Pointer, FrameSize { width: w as usize, height: h as usize })
        }
        (None, _) => (
            InputSource::Pointer,
            FrameSize {
                width: config.fallback_width,
                height: config.fallback_height,
            },
        ),
    };
    let mut detector: Box<dyn LandmarkSource> = match detector {
        Some(detector) => detector,
        None => Box::new(NoDetector),
    };

    let mut drawer = Drawer::new(
        "Gesture Drawing Board - ESC to exit",
        size.width,
        size.height,
    )?;
    let mut session = Session::new(config, size, source);
    let mut fps = FpsCounter::new();

    info!(
        draw = session.config().fingers_for_draw,
        erase = session.config().fingers_for_erase,
        ?source,
        "drawing session started"
    );

    'ticks: while drawer.is_open() {
        match tick(&mut camera, detector.as_mut(), &mut session, drawer.pointer()) {
            Ok((mut screen, report)) => {
                let status = HudStatus {
                    base_mode: session.base_mode(),
                    action: report.mode,
                    source: session.source(),
                    fingers: report.finger_count,
                    brush_radius: session.brush_radius(),
                    color: session.current_color(),
                    fps: fps.tick(),
                    cursor: report.cursor,
                };
                draw_hud(&mut screen, &status);
                if let Err(e) = drawer.present(&screen) {
                    warn!("{e}");
                }
            }
            Err(e) => {
                warn!("tick failed: {e}");
                drawer.pump();
            }
        }

        for event in drawer.poll_events() {
            match session.apply_event(event) {
                Ok(EventOutcome::Quit) => {
                    info!("quit requested");
                    break 'ticks;
                }
                Ok(EventOutcome::Saved(_) | EventOutcome::Continue) => {}
                Err(Error::Export(e)) => warn!("could not save drawing: {e}"),
                Err(e) => warn!("{e}"),
            }
        }
    }

    info!("drawing session complete");
    Ok(())
}
