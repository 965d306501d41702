//! Browser-backed camera access and timers.

use std::future::Future;
use std::time::Duration;

use intake::{CaptureError, DeviceAccessDenied, MediaDevices, RawFrame, Timer, VideoStream};
use js_sys::{Object, Reflect};
use shared::FacingMode;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    CanvasRenderingContext2d, HtmlCanvasElement, HtmlVideoElement, MediaStream,
    MediaStreamConstraints, MediaStreamTrack,
};

/// `navigator.mediaDevices`, video only.
pub struct BrowserMediaDevices;

impl MediaDevices for BrowserMediaDevices {
    type Stream = BrowserStream;

    async fn request_stream(&self, facing: FacingMode) -> Result<BrowserStream, DeviceAccessDenied> {
        let window = web_sys::window().ok_or_else(|| DeviceAccessDenied::new("no window available"))?;
        let devices = window.navigator().media_devices().map_err(describe)?;

        let video = Object::new();
        Reflect::set(&video, &"facingMode".into(), &facing.to_string().into()).map_err(describe)?;
        let constraints = MediaStreamConstraints::new();
        constraints.set_video(&video);
        constraints.set_audio(&JsValue::FALSE);

        let promise = devices
            .get_user_media_with_constraints(&constraints)
            .map_err(describe)?;
        let stream: MediaStream = JsFuture::from(promise)
            .await
            .map_err(describe)?
            .dyn_into()
            .map_err(describe)?;

        log::info!("Camera stream granted ({} facing)", facing);
        BrowserStream::attach(stream.clone()).map_err(|e| {
            stop_tracks(&stream);
            describe(e)
        })
    }
}

/// A granted stream plus the offscreen elements used to sample it.
pub struct BrowserStream {
    stream: MediaStream,
    video: HtmlVideoElement,
    canvas: HtmlCanvasElement,
}

impl BrowserStream {
    fn attach(stream: MediaStream) -> Result<Self, JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("no document available"))?;

        let video: HtmlVideoElement = document.create_element("video")?.dyn_into()?;
        video.set_muted(true);
        video.set_autoplay(true);
        video.set_attribute("playsinline", "")?;
        video.set_src_object(Some(&stream));
        // Resolves once frames flow; sampling before then reports NotReady.
        let _ = video.play()?;

        let canvas: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;

        Ok(Self { stream, video, canvas })
    }

    pub fn media_stream(&self) -> &MediaStream {
        &self.stream
    }

    fn context(&self) -> Result<CanvasRenderingContext2d, CaptureError> {
        self.canvas
            .get_context("2d")
            .map_err(capture_error)?
            .ok_or_else(|| CaptureError::Device("2d canvas context unavailable".into()))?
            .dyn_into()
            .map_err(|_| CaptureError::Device("unexpected canvas context type".into()))
    }
}

impl VideoStream for BrowserStream {
    fn resolution(&self) -> (u32, u32) {
        (self.video.video_width(), self.video.video_height())
    }

    fn sample_frame(&self) -> Result<RawFrame, CaptureError> {
        let (width, height) = self.resolution();
        if width == 0 || height == 0 {
            return Err(CaptureError::NotReady);
        }

        self.canvas.set_width(width);
        self.canvas.set_height(height);
        let context = self.context()?;
        context
            .draw_image_with_html_video_element(&self.video, 0.0, 0.0)
            .map_err(capture_error)?;
        let data = context
            .get_image_data(0.0, 0.0, f64::from(width), f64::from(height))
            .map_err(capture_error)?;

        Ok(RawFrame {
            width,
            height,
            rgba: data.data().0,
        })
    }

    fn stop(&mut self) {
        stop_tracks(&self.stream);
        self.video.set_src_object(None);
        log::info!("Camera stream stopped");
    }
}

fn stop_tracks(stream: &MediaStream) {
    for track in stream.get_tracks().iter() {
        if let Ok(track) = track.dyn_into::<MediaStreamTrack>() {
            track.stop();
        }
    }
}

/// Pulls `name: message` out of a rejected DOM promise.
fn js_reason(err: &JsValue) -> String {
    let field = |key: &str| {
        Reflect::get(err, &JsValue::from_str(key))
            .ok()
            .and_then(|v| v.as_string())
    };
    match (field("name"), field("message")) {
        (Some(name), Some(message)) if !message.is_empty() => format!("{name}: {message}"),
        (Some(text), _) | (None, Some(text)) => text,
        (None, None) => err.as_string().unwrap_or_else(|| "unknown error".to_string()),
    }
}

fn describe(err: impl Into<JsValue>) -> DeviceAccessDenied {
    DeviceAccessDenied::new(js_reason(&err.into()))
}

fn capture_error(err: JsValue) -> CaptureError {
    CaptureError::Device(js_reason(&err))
}

pub struct BrowserTimer;

impl Timer for BrowserTimer {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        gloo_timers::future::sleep(duration)
    }
}
