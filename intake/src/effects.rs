use std::fmt;

use shared::FacingMode;

use crate::camera::MediaDevices;
use crate::detection::{AnalysisPayload, AnalysisService, DetectionPipeline, DetectionResult, Timer};
use crate::error::{DetectionError, DeviceAccessDenied};

/// Generation number tying an asynchronous completion to the request that
/// started it. Issued in strictly increasing order by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(pub(crate) u64);

impl Ticket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Asynchronous work requested by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    AcquireStream { ticket: Ticket, facing: FacingMode },
    Analyze { ticket: Ticket, payload: AnalysisPayload },
    LiveDetect { ticket: Ticket, payload: AnalysisPayload },
}

impl Effect {
    pub fn ticket(&self) -> Ticket {
        match self {
            Effect::AcquireStream { ticket, .. }
            | Effect::Analyze { ticket, .. }
            | Effect::LiveDetect { ticket, .. } => *ticket,
        }
    }
}

/// Result of an [`Effect`], fed back through `AcquisitionController::complete`.
#[derive(Debug)]
pub enum Completion<S> {
    StreamAcquired {
        ticket: Ticket,
        result: Result<S, DeviceAccessDenied>,
    },
    Analysis {
        ticket: Ticket,
        result: Result<DetectionResult, DetectionError>,
    },
    LivePass {
        ticket: Ticket,
        result: Result<DetectionResult, DetectionError>,
    },
}

pub struct EffectRunner<D, A, T> {
    devices: D,
    pipeline: DetectionPipeline<A, T>,
}

impl<D, A, T> EffectRunner<D, A, T>
where
    D: MediaDevices,
    A: AnalysisService,
    T: Timer,
{
    pub fn new(devices: D, pipeline: DetectionPipeline<A, T>) -> Self {
        Self { devices, pipeline }
    }

    pub fn pipeline(&self) -> &DetectionPipeline<A, T> {
        &self.pipeline
    }

    pub async fn run(&self, effect: Effect) -> Completion<D::Stream> {
        match effect {
            Effect::AcquireStream { ticket, facing } => Completion::StreamAcquired {
                ticket,
                result: self.devices.request_stream(facing).await,
            },
            Effect::Analyze { ticket, payload } => Completion::Analysis {
                ticket,
                result: self.pipeline.detect(&payload).await,
            },
            Effect::LiveDetect { ticket, payload } => Completion::LivePass {
                ticket,
                result: self.pipeline.detect(&payload).await,
            },
        }
    }
}
