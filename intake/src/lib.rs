//! Image intake for skin-image screening: file and camera acquisition,
//! acceptance checks, previews and submission to an analysis service.

pub mod camera;
pub mod config;
pub mod controller;
pub mod detection;
pub mod effects;
pub mod error;
pub mod preview;
pub mod validator;

pub use camera::{
    CameraSessionManager, CapturedFrame, MediaDevices, NoDevices, NoStream, RawFrame, VideoStream,
};
pub use config::IntakeConfig;
pub use controller::{
    AcquisitionController, AcquisitionState, AnalysisReport, CameraPhase, CandidateSource, Handoff,
    ImageCandidate, LiveDetection, Outcome, Selection, StateKind,
};
pub use detection::{AnalysisPayload, AnalysisService, DetectionPipeline, DetectionResult, Timer};
pub use effects::{Completion, Effect, EffectRunner, Ticket};
pub use error::{
    AcquisitionError, CaptureError, ConfigError, ContractViolation, DetectionError, DeviceAccessDenied,
};
pub use validator::{ConstraintKind, FileMetadata, FileValidator, ValidationResult};
