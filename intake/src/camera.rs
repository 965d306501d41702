//! Live camera sessions.
//!
//! The manager is the only owner of a device stream. Callers go through
//! [`CameraSessionManager::open`], [`CameraSessionManager::capture_frame`] and
//! [`CameraSessionManager::close`]; they never stop tracks themselves.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use log::{debug, info};
use shared::{FacingMode, MediaType};

use crate::error::{CaptureError, DeviceAccessDenied};

/// A single RGBA sample of the live video at the stream's native resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// A captured frame encoded as a still image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    pub width: u32,
    pub height: u32,
    pub media_type: MediaType,
    pub bytes: Vec<u8>,
}

/// Host-provided live video stream.
pub trait VideoStream {
    fn resolution(&self) -> (u32, u32);

    fn sample_frame(&self) -> Result<RawFrame, CaptureError>;

    /// Stops every track of the underlying stream.
    fn stop(&mut self);
}

/// Host-provided access to video capture devices.
#[allow(async_fn_in_trait)]
pub trait MediaDevices {
    type Stream: VideoStream;

    async fn request_stream(&self, facing: FacingMode) -> Result<Self::Stream, DeviceAccessDenied>;
}

/// Media devices of a host with no camera at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDevices;

/// Stream type of [`NoDevices`]; it has no values.
#[derive(Debug)]
pub enum NoStream {}

impl VideoStream for NoStream {
    fn resolution(&self) -> (u32, u32) {
        match *self {}
    }

    fn sample_frame(&self) -> Result<RawFrame, CaptureError> {
        match *self {}
    }

    fn stop(&mut self) {
        match *self {}
    }
}

impl MediaDevices for NoDevices {
    type Stream = NoStream;

    async fn request_stream(&self, _facing: FacingMode) -> Result<NoStream, DeviceAccessDenied> {
        Err(DeviceAccessDenied::new("no video input devices on this host"))
    }
}

pub struct CameraSession<S: VideoStream> {
    stream: S,
    facing: FacingMode,
}

impl<S: VideoStream> CameraSession<S> {
    pub fn facing(&self) -> FacingMode {
        self.facing
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }
}

pub struct CameraSessionManager<S: VideoStream> {
    session: Option<CameraSession<S>>,
    capture_quality: u8,
}

impl<S: VideoStream> CameraSessionManager<S> {
    pub fn new(capture_quality: u8) -> Self {
        Self {
            session: None,
            capture_quality: capture_quality.clamp(1, 100),
        }
    }

    /// Requests a stream from `devices` and makes it the active session.
    pub async fn open<D>(&mut self, devices: &D, facing: FacingMode) -> Result<(), DeviceAccessDenied>
    where
        D: MediaDevices<Stream = S>,
    {
        self.close();
        let stream = devices.request_stream(facing).await?;
        self.adopt(stream, facing);
        Ok(())
    }

    /// Takes ownership of an already granted stream. Any prior session is
    /// closed first so that at most one stream is live.
    pub fn adopt(&mut self, stream: S, facing: FacingMode) {
        self.close();
        let (width, height) = stream.resolution();
        info!("Camera session opened ({facing}, {width}x{height})");
        self.session = Some(CameraSession { stream, facing });
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&CameraSession<S>> {
        self.session.as_ref()
    }

    /// The live stream, for hosts that bind it to a preview element.
    pub fn preview_stream(&self) -> Option<&S> {
        self.session.as_ref().map(CameraSession::stream)
    }

    /// Samples the current frame and encodes it as JPEG. The stream keeps
    /// running.
    pub fn capture_frame(&self) -> Result<CapturedFrame, CaptureError> {
        let session = self.session.as_ref().ok_or(CaptureError::NoActiveSession)?;
        let frame = session.stream.sample_frame()?;
        encode_frame(frame, self.capture_quality)
    }

    /// Stops the stream and drops the session. Closing without a session is a
    /// no-op.
    pub fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.stream.stop();
            debug!("Camera session closed");
        }
    }
}

impl<S: VideoStream> Drop for CameraSessionManager<S> {
    fn drop(&mut self) {
        self.close();
    }
}

fn encode_frame(frame: RawFrame, quality: u8) -> Result<CapturedFrame, CaptureError> {
    let RawFrame { width, height, rgba } = frame;
    if width == 0 || height == 0 {
        return Err(CaptureError::NotReady);
    }
    let image = RgbaImage::from_raw(width, height, rgba)
        .ok_or(CaptureError::MalformedFrame { width, height })?;
    // JPEG carries no alpha channel.
    let rgb = DynamicImage::ImageRgba8(image).to_rgb8();

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality).encode_image(&rgb)?;

    Ok(CapturedFrame {
        width,
        height,
        media_type: MediaType::Jpeg,
        bytes,
    })
}
