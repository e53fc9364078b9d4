// Opens a camera and converts its frames for the two consumers of each tick:
// the window/canvas (packed 0x00RRGGBB) and the landmark detector (raw RGB bytes).
// Frames are mirrored by default so moving your hand right moves the cursor right.

use image::RgbImage;
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    },
};
use tracing::info;

use crate::error::{Error, Result};
use crate::types::{FrameBuffer, RgbFrame};

/// One camera frame in both layouts.
#[derive(Clone, Debug)]
pub struct CapturedFrame {
    pub display: FrameBuffer,
    pub rgb: RgbFrame,
}

/// Pack a decoded RGB image for the window, optionally mirrored left-right.
pub fn convert_frame(mut img: RgbImage, mirror: bool) -> CapturedFrame {
    if mirror {
        image::imageops::flip_horizontal_in_place(&mut img);
    }

    let (w, h) = img.dimensions();
    let pixels = img
        .pixels()
        .map(|p| (u32::from(p[0]) << 16) | (u32::from(p[1]) << 8) | u32::from(p[2]))
        .collect();

    CapturedFrame {
        display: FrameBuffer {
            width: w as usize,
            height: h as usize,
            pixels,
        },
        rgb: RgbFrame {
            width: w,
            height: h,
            data: img.into_raw(),
        },
    }
}

// A small wrapper around nokhwa::Camera so the tick loop stays clean.
pub struct CameraCapture {
    cam: Camera,
    width: u32,
    height: u32,
    mirror: bool,
}

impl CameraCapture {
    /// Open camera `index` near the requested resolution (the driver may pick another).
    ///
    /// # Errors
    ///
    /// Returns [`Error::CameraInit`] if the device cannot be created or started.
    pub fn new(index: u32, width: u32, height: u32, mirror: bool) -> Result<Self> {
        let fmt = CameraFormat::new(Resolution::new(width, height), FrameFormat::YUYV, 30);
        let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

        let mut cam = Camera::new(CameraIndex::Index(index), req)
            .map_err(|e| Error::CameraInit(format!("Create camera: {e}")))?;
        cam.open_stream()
            .map_err(|e| Error::CameraInit(format!("Open stream: {e}")))?;

        let actual = cam.resolution();
        info!(
            index,
            width = actual.width(),
            height = actual.height(),
            "camera opened"
        );

        Ok(Self {
            cam,
            width: actual.width(),
            height: actual.height(),
            mirror,
        })
    }

    /// Grab one frame. Blocks until the camera delivers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CameraFrame`] if fetching or decoding fails.
    pub fn next_frame(&mut self) -> Result<CapturedFrame> {
        let frame = self
            .cam
            .frame()
            .map_err(|e| Error::CameraFrame(format!("Fetch frame: {e}")))?;
        let rgb_img = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::CameraFrame(format!("Decode RGB: {e}")))?;
        Ok(convert_frame(rgb_img, self.mirror))
    }

    /// Report the actual resolution the camera is delivering.
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
