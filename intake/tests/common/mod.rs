#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use intake::{
    AnalysisService, CaptureError, DetectionError, DeviceAccessDenied, MediaDevices, RawFrame,
    Timer, VideoStream,
};
use shared::{AnalysisRequest, AnalysisResponse, FacingMode};

pub fn solid_frame(width: u32, height: u32) -> RawFrame {
    RawFrame {
        width,
        height,
        rgba: [200u8, 150, 120, 255].repeat((width * height) as usize),
    }
}

/// Stream handed out by [`FakeDevices`]; counts itself in `active` until stopped.
pub struct FakeStream {
    active: Rc<Cell<usize>>,
    stopped: bool,
    frame: Result<RawFrame, CaptureError>,
    samples: Rc<Cell<usize>>,
}

impl FakeStream {
    pub fn new(active: &Rc<Cell<usize>>, frame: Result<RawFrame, CaptureError>) -> Self {
        active.set(active.get() + 1);
        Self {
            active: Rc::clone(active),
            stopped: false,
            frame,
            samples: Rc::new(Cell::new(0)),
        }
    }
}

impl VideoStream for FakeStream {
    fn resolution(&self) -> (u32, u32) {
        match &self.frame {
            Ok(frame) => (frame.width, frame.height),
            Err(_) => (0, 0),
        }
    }

    fn sample_frame(&self) -> Result<RawFrame, CaptureError> {
        assert!(!self.stopped, "sampled a stopped stream");
        self.samples.set(self.samples.get() + 1);
        self.frame.clone()
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.active.set(self.active.get() - 1);
        }
    }
}

#[derive(Clone)]
pub struct FakeDevices {
    active: Rc<Cell<usize>>,
    requests: Rc<Cell<usize>>,
    deny: Option<String>,
    frame: Result<RawFrame, CaptureError>,
}

impl FakeDevices {
    pub fn granting(frame: RawFrame) -> Self {
        Self {
            active: Rc::new(Cell::new(0)),
            requests: Rc::new(Cell::new(0)),
            deny: None,
            frame: Ok(frame),
        }
    }

    pub fn denying(reason: &str) -> Self {
        Self {
            deny: Some(reason.to_string()),
            ..Self::granting(solid_frame(4, 4))
        }
    }

    pub fn with_broken_frames(error: CaptureError) -> Self {
        Self {
            frame: Err(error),
            ..Self::granting(solid_frame(4, 4))
        }
    }

    /// Streams granted and not yet stopped.
    pub fn active_streams(&self) -> usize {
        self.active.get()
    }

    pub fn requests(&self) -> usize {
        self.requests.get()
    }

    pub fn make_stream(&self) -> FakeStream {
        FakeStream::new(&self.active, self.frame.clone())
    }
}

impl MediaDevices for FakeDevices {
    type Stream = FakeStream;

    async fn request_stream(&self, _facing: FacingMode) -> Result<FakeStream, DeviceAccessDenied> {
        self.requests.set(self.requests.get() + 1);
        match &self.deny {
            Some(reason) => Err(DeviceAccessDenied::new(reason.clone())),
            None => Ok(self.make_stream()),
        }
    }
}

/// Analysis service answering from a queue of scripted responses.
#[derive(Clone, Default)]
pub struct ScriptedService {
    responses: Rc<RefCell<VecDeque<Result<AnalysisResponse, DetectionError>>>>,
    requests: Rc<RefCell<Vec<AnalysisRequest>>>,
}

impl ScriptedService {
    pub fn answering(responses: Vec<Result<AnalysisResponse, DetectionError>>) -> Self {
        Self {
            responses: Rc::new(RefCell::new(responses.into())),
            requests: Rc::default(),
        }
    }

    pub fn requests(&self) -> Vec<AnalysisRequest> {
        self.requests.borrow().clone()
    }
}

impl AnalysisService for ScriptedService {
    async fn submit(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, DetectionError> {
        self.requests.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(DetectionError::service(Some(503), "no scripted response")))
    }
}

/// Service that never answers.
pub struct SilentService;

impl AnalysisService for SilentService {
    async fn submit(&self, _request: &AnalysisRequest) -> Result<AnalysisResponse, DetectionError> {
        futures::future::pending().await
    }
}

pub struct TokioTimer;

impl Timer for TokioTimer {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        tokio::time::sleep(duration)
    }
}

pub fn response(label: &str, confidence: f32) -> AnalysisResponse {
    AnalysisResponse {
        condition_label: label.to_string(),
        confidence_percent: confidence,
        severity: None,
    }
}
