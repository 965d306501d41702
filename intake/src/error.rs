use std::time::Duration;

use crate::controller::{Operation, StateKind};

/// Calling an operation from a state that does not permit it. The controller
/// rejects the call and leaves its state untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation} is not permitted while {state}")]
pub struct ContractViolation {
    pub operation: Operation,
    pub state: StateKind,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("camera access denied: {reason}")]
pub struct DeviceAccessDenied {
    pub reason: String,
}

impl DeviceAccessDenied {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("no active camera session")]
    NoActiveSession,
    #[error("camera stream has no frame yet")]
    NotReady,
    #[error("frame buffer does not match {width}x{height}")]
    MalformedFrame { width: u32, height: u32 },
    #[error("frame encoding failed: {0}")]
    Encoding(String),
    #[error("frame capture failed: {0}")]
    Device(String),
}

impl From<image::ImageError> for CaptureError {
    fn from(err: image::ImageError) -> Self {
        CaptureError::Encoding(err.to_string())
    }
}

/// Failures of a detection request. All of them are recoverable and leave the
/// caller free to retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DetectionError {
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),
    #[error("analysis service error: {message}")]
    ServiceError {
        status: Option<u16>,
        message: String,
    },
    #[error("analysis timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl DetectionError {
    pub fn service(status: Option<u16>, message: impl Into<String>) -> Self {
        DetectionError::ServiceError {
            status,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AcquisitionError {
    #[error(transparent)]
    Contract(#[from] ContractViolation),
    #[error("camera unavailable: {0}")]
    CameraUnavailable(#[from] DeviceAccessDenied),
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
