//! The acquisition state machine.
//!
//! Every operation is synchronous. Work that has to wait on the host (reading
//! file bytes, device access, analysis requests) is handed out as a [`Ticket`]
//! or an [`Effect`] and comes back through [`AcquisitionController::file_loaded`]
//! or [`AcquisitionController::complete`]. A completion is applied only while
//! the state still waits on its ticket; anything else is stale and dropped.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;
use shared::{CandidateId, FacingMode, MediaType};

use crate::camera::{CameraSessionManager, CapturedFrame, VideoStream};
use crate::config::IntakeConfig;
use crate::detection::{AnalysisPayload, DetectionResult};
use crate::effects::{Completion, Effect, Ticket};
use crate::error::{AcquisitionError, ContractViolation, DetectionError, DeviceAccessDenied};
use crate::preview::{Preview, PreviewRenderer};
use crate::validator::{
    ConstraintKind, ConstraintViolation, FileMetadata, FileValidator, ValidationResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StateKind {
    Empty,
    Validating,
    Invalid,
    Ready,
    CameraOpen,
    Analyzing,
    Complete,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    SelectFile,
    OpenCamera,
    CaptureFrame,
    StartLiveDetection,
    Analyze,
    Retry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CandidateSource {
    File { name: String },
    CapturedFrame { width: u32, height: u32 },
}

/// An image that passed acceptance and can be submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageCandidate {
    id: CandidateId,
    source: CandidateSource,
    media_type: MediaType,
    bytes: Arc<[u8]>,
    preview: Preview,
}

impl ImageCandidate {
    pub fn id(&self) -> CandidateId {
        self.id
    }

    pub fn source(&self) -> &CandidateSource {
        &self.source
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn preview(&self) -> &Preview {
        &self.preview
    }

    pub fn display_name(&self) -> &str {
        match &self.source {
            CandidateSource::File { name } => name,
            CandidateSource::CapturedFrame { .. } => "Camera capture",
        }
    }

    pub fn payload(&self) -> AnalysisPayload {
        AnalysisPayload {
            bytes: Arc::clone(&self.bytes),
            media_type: self.media_type,
        }
    }
}

/// A file whose metadata was accepted and whose bytes are being read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub ticket: Ticket,
    pub file: FileMetadata,
    pub media_type: MediaType,
}

/// A file that failed acceptance, kept so the user can see what was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedFile {
    pub file: FileMetadata,
    pub validation: ValidationResult,
}

pub type LivePassOutcome = Result<DetectionResult, DetectionError>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LiveDetection {
    pub detecting: bool,
    pub in_flight: Option<Ticket>,
    /// Result of the most recent pass; each pass overwrites it.
    pub latest: Option<LivePassOutcome>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CameraPhase {
    Acquiring { ticket: Ticket },
    Streaming(LiveDetection),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveView {
    pub facing: FacingMode,
    pub phase: CameraPhase,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum AcquisitionState {
    #[default]
    Empty,
    Validating {
        pending: PendingFile,
    },
    Invalid {
        rejected: RejectedFile,
    },
    Ready {
        candidate: ImageCandidate,
    },
    CameraOpen {
        live: LiveView,
    },
    Analyzing {
        candidate: ImageCandidate,
        ticket: Ticket,
    },
    Complete {
        candidate: ImageCandidate,
        result: DetectionResult,
    },
    Failed {
        candidate: ImageCandidate,
        error: DetectionError,
    },
}

impl AcquisitionState {
    pub fn kind(&self) -> StateKind {
        match self {
            AcquisitionState::Empty => StateKind::Empty,
            AcquisitionState::Validating { .. } => StateKind::Validating,
            AcquisitionState::Invalid { .. } => StateKind::Invalid,
            AcquisitionState::Ready { .. } => StateKind::Ready,
            AcquisitionState::CameraOpen { .. } => StateKind::CameraOpen,
            AcquisitionState::Analyzing { .. } => StateKind::Analyzing,
            AcquisitionState::Complete { .. } => StateKind::Complete,
            AcquisitionState::Failed { .. } => StateKind::Failed,
        }
    }

    pub fn candidate(&self) -> Option<&ImageCandidate> {
        match self {
            AcquisitionState::Ready { candidate }
            | AcquisitionState::Analyzing { candidate, .. }
            | AcquisitionState::Complete { candidate, .. }
            | AcquisitionState::Failed { candidate, .. } => Some(candidate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Rejected(ValidationResult),
    /// The host should read the file's bytes and pass them to
    /// [`AcquisitionController::file_loaded`] with this ticket.
    ReadBytes(Ticket),
}

/// What the results view receives once an analysis finishes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub candidate_id: CandidateId,
    pub source: CandidateSource,
    pub result: DetectionResult,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Handoff {
    Completed(AnalysisReport),
    /// The failed candidate is still held; [`AcquisitionController::retry`]
    /// resubmits it.
    Failed {
        candidate_id: CandidateId,
        error: DetectionError,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Applied,
    Discarded,
    Surfaced(AcquisitionError),
    Handoff(Handoff),
}

pub struct AcquisitionController<S: VideoStream> {
    state: AcquisitionState,
    generation: u64,
    validator: FileValidator,
    renderer: PreviewRenderer,
    camera: CameraSessionManager<S>,
    facing: FacingMode,
}

impl<S: VideoStream> AcquisitionController<S> {
    pub fn new(config: &IntakeConfig) -> Self {
        Self {
            state: AcquisitionState::Empty,
            generation: 0,
            validator: FileValidator::new(&config.accept),
            renderer: PreviewRenderer,
            camera: CameraSessionManager::new(config.camera.capture_quality),
            facing: config.camera.facing,
        }
    }

    pub fn state(&self) -> &AcquisitionState {
        &self.state
    }

    pub fn kind(&self) -> StateKind {
        self.state.kind()
    }

    pub fn validator(&self) -> &FileValidator {
        &self.validator
    }

    pub fn camera_active(&self) -> bool {
        self.camera.is_active()
    }

    pub fn preview_stream(&self) -> Option<&S> {
        self.camera.preview_stream()
    }

    pub fn live_detection(&self) -> Option<&LiveDetection> {
        match &self.state {
            AcquisitionState::CameraOpen {
                live:
                    LiveView {
                        phase: CameraPhase::Streaming(detection),
                        ..
                    },
            } => Some(detection),
            _ => None,
        }
    }

    pub fn set_facing(&mut self, facing: FacingMode) {
        self.facing = facing;
    }

    pub fn select_file(&mut self, file: FileMetadata) -> Result<Selection, ContractViolation> {
        self.ensure_idle(Operation::SelectFile)?;
        // A live camera is torn down before the new candidate exists.
        self.camera.close();

        match self.validator.accept(&file) {
            Err(validation) => {
                self.reject(file, validation.clone());
                Ok(Selection::Rejected(validation))
            }
            Ok(media_type) => {
                let ticket = self.issue();
                debug!("Reading {} ({media_type}) under {ticket}", file.name);
                self.state = AcquisitionState::Validating {
                    pending: PendingFile {
                        ticket,
                        file,
                        media_type,
                    },
                };
                Ok(Selection::ReadBytes(ticket))
            }
        }
    }

    pub fn file_loaded(&mut self, ticket: Ticket, bytes: Result<Vec<u8>, String>) -> Outcome {
        let pending = match std::mem::take(&mut self.state) {
            AcquisitionState::Validating { pending } if pending.ticket == ticket => pending,
            other => {
                debug!("Discarding file read {ticket}; state is {}", other.kind());
                self.state = other;
                return Outcome::Discarded;
            }
        };
        let PendingFile {
            mut file,
            media_type,
            ..
        } = pending;

        let bytes = match bytes {
            Ok(bytes) => bytes,
            Err(reason) => {
                warn!("Reading {} failed: {reason}", file.name);
                let violation = ConstraintViolation {
                    kind: ConstraintKind::Read,
                    message: format!("Could not read {}: {reason}", file.name),
                };
                self.reject(file, ValidationResult::single(violation));
                return Outcome::Applied;
            }
        };

        // The declared size is advisory; the bytes are what gets submitted.
        file.size_bytes = bytes.len() as u64;
        if let Some(violation) = self.validator.check_size(file.size_bytes) {
            self.reject(file, ValidationResult::single(violation));
            return Outcome::Applied;
        }

        let preview = self.renderer.render(&bytes, media_type);
        let candidate = ImageCandidate {
            id: CandidateId::new(),
            source: CandidateSource::File { name: file.name },
            media_type,
            bytes: bytes.into(),
            preview,
        };
        debug!("Candidate {} ready", candidate.id);
        self.state = AcquisitionState::Ready { candidate };
        Outcome::Applied
    }

    /// Returns to `Empty` from any state, releasing the camera and the
    /// held candidate. Pending completions become stale.
    pub fn clear(&mut self) {
        self.camera.close();
        if !matches!(self.state, AcquisitionState::Empty) {
            debug!("Clearing {}", self.state.kind());
        }
        self.state = AcquisitionState::Empty;
    }

    pub fn open_camera(&mut self) -> Result<Option<Effect>, ContractViolation> {
        self.ensure_idle(Operation::OpenCamera)?;
        if let AcquisitionState::CameraOpen { .. } = self.state {
            return Ok(None);
        }

        self.camera.close();
        let ticket = self.issue();
        let facing = self.facing;
        debug!("Requesting {facing} camera under {ticket}");
        self.state = AcquisitionState::CameraOpen {
            live: LiveView {
                facing,
                phase: CameraPhase::Acquiring { ticket },
            },
        };
        Ok(Some(Effect::AcquireStream { ticket, facing }))
    }

    /// Closes the camera from any of its sub-states. Calling it with no
    /// camera open does nothing.
    pub fn close_camera(&mut self) -> bool {
        self.camera.close();
        if let AcquisitionState::CameraOpen { .. } = self.state {
            debug!("Camera closed by user");
            self.state = AcquisitionState::Empty;
            true
        } else {
            false
        }
    }

    /// Turns the current frame into a candidate. The stream is stopped
    /// whether or not the capture succeeds.
    pub fn capture_frame(&mut self) -> Result<(), AcquisitionError> {
        if self.live_detection().is_none() {
            return Err(self.violation(Operation::CaptureFrame).into());
        }

        let captured = self.camera.capture_frame();
        self.camera.close();

        match captured {
            Ok(frame) => {
                let candidate = self.candidate_from_frame(frame);
                debug!("Captured frame as candidate {}", candidate.id);
                self.state = AcquisitionState::Ready { candidate };
                Ok(())
            }
            Err(err) => {
                warn!("Frame capture failed: {err}");
                self.state = AcquisitionState::Empty;
                Err(err.into())
            }
        }
    }

    /// Turns on live detection and starts a pass unless one is in flight.
    /// Detection stays off when the first frame cannot be sampled.
    pub fn start_live_detection(&mut self) -> Result<Option<Effect>, AcquisitionError> {
        let Some(detection) = self.live_detection_mut() else {
            return Err(self.violation(Operation::StartLiveDetection).into());
        };
        if let Some(ticket) = detection.in_flight {
            debug!("Live pass {ticket} still in flight");
            detection.detecting = true;
            return Ok(None);
        }

        let effect = self.begin_live_pass()?;
        if let Some(detection) = self.live_detection_mut() {
            detection.detecting = true;
        }
        Ok(Some(effect))
    }

    /// Interval tick. Starts the next pass when detection is on and the
    /// previous pass has finished.
    pub fn poll_live_detection(&mut self) -> Option<Effect> {
        let detection = self.live_detection_mut()?;
        if !detection.detecting || detection.in_flight.is_some() {
            return None;
        }
        match self.begin_live_pass() {
            Ok(effect) => Some(effect),
            Err(err) => {
                warn!("Skipping live pass: {err}");
                None
            }
        }
    }

    pub fn stop_live_detection(&mut self) {
        if let Some(detection) = self.live_detection_mut() {
            detection.detecting = false;
            detection.in_flight = None;
        }
    }

    pub fn analyze(&mut self) -> Result<Effect, ContractViolation> {
        match std::mem::take(&mut self.state) {
            AcquisitionState::Ready { candidate } => Ok(self.submit(candidate)),
            other => Err(self.restore(other, Operation::Analyze)),
        }
    }

    pub fn retry(&mut self) -> Result<Effect, ContractViolation> {
        match std::mem::take(&mut self.state) {
            AcquisitionState::Failed { candidate, .. } => Ok(self.submit(candidate)),
            other => Err(self.restore(other, Operation::Retry)),
        }
    }

    pub fn complete(&mut self, completion: Completion<S>) -> Outcome {
        match completion {
            Completion::StreamAcquired { ticket, result } => self.stream_acquired(ticket, result),
            Completion::Analysis { ticket, result } => self.analysis_finished(ticket, result),
            Completion::LivePass { ticket, result } => self.live_pass_finished(ticket, result),
        }
    }

    /// Releases everything; used when the hosting view goes away.
    pub fn teardown(&mut self) {
        self.camera.close();
        self.state = AcquisitionState::Empty;
    }

    fn stream_acquired(&mut self, ticket: Ticket, result: Result<S, DeviceAccessDenied>) -> Outcome {
        let facing = match &self.state {
            AcquisitionState::CameraOpen {
                live:
                    LiveView {
                        facing,
                        phase: CameraPhase::Acquiring { ticket: waiting },
                    },
            } if *waiting == ticket => *facing,
            _ => {
                if let Ok(mut stream) = result {
                    warn!("Stopping camera stream {ticket} granted after it was abandoned");
                    stream.stop();
                }
                return Outcome::Discarded;
            }
        };

        match result {
            Ok(stream) => {
                self.camera.adopt(stream, facing);
                self.state = AcquisitionState::CameraOpen {
                    live: LiveView {
                        facing,
                        phase: CameraPhase::Streaming(LiveDetection::default()),
                    },
                };
                Outcome::Applied
            }
            Err(denied) => {
                warn!("Camera unavailable: {denied}");
                self.state = AcquisitionState::Empty;
                Outcome::Surfaced(AcquisitionError::CameraUnavailable(denied))
            }
        }
    }

    fn analysis_finished(
        &mut self,
        ticket: Ticket,
        result: Result<DetectionResult, DetectionError>,
    ) -> Outcome {
        let candidate = match std::mem::take(&mut self.state) {
            AcquisitionState::Analyzing {
                candidate,
                ticket: waiting,
            } if waiting == ticket => candidate,
            other => {
                debug!("Discarding analysis {ticket}; state is {}", other.kind());
                self.state = other;
                return Outcome::Discarded;
            }
        };

        match result {
            Ok(result) => {
                info!(
                    "Analysis complete: {} ({:.1}%)",
                    result.condition_label, result.confidence_percent
                );
                let report = AnalysisReport {
                    candidate_id: candidate.id,
                    source: candidate.source.clone(),
                    result: result.clone(),
                };
                self.state = AcquisitionState::Complete { candidate, result };
                Outcome::Handoff(Handoff::Completed(report))
            }
            Err(error) => {
                warn!("Analysis failed: {error}");
                let candidate_id = candidate.id;
                self.state = AcquisitionState::Failed {
                    candidate,
                    error: error.clone(),
                };
                Outcome::Handoff(Handoff::Failed {
                    candidate_id,
                    error,
                })
            }
        }
    }

    fn live_pass_finished(&mut self, ticket: Ticket, result: LivePassOutcome) -> Outcome {
        match self.live_detection_mut() {
            Some(detection) if detection.in_flight == Some(ticket) => {
                if let Err(err) = &result {
                    warn!("Live pass {ticket} failed: {err}");
                }
                detection.in_flight = None;
                detection.latest = Some(result);
                Outcome::Applied
            }
            _ => {
                debug!("Discarding live pass {ticket}");
                Outcome::Discarded
            }
        }
    }

    fn begin_live_pass(&mut self) -> Result<Effect, AcquisitionError> {
        let frame = self.camera.capture_frame()?;
        let ticket = self.issue();
        if let Some(detection) = self.live_detection_mut() {
            detection.in_flight = Some(ticket);
        }
        debug!("Live pass {ticket} on {}x{} frame", frame.width, frame.height);
        Ok(Effect::LiveDetect {
            ticket,
            payload: AnalysisPayload {
                bytes: frame.bytes.into(),
                media_type: frame.media_type,
            },
        })
    }

    fn submit(&mut self, candidate: ImageCandidate) -> Effect {
        let ticket = self.issue();
        let payload = candidate.payload();
        info!(
            "Submitting candidate {} ({} bytes) under {ticket}",
            candidate.id,
            candidate.size_bytes()
        );
        self.state = AcquisitionState::Analyzing { candidate, ticket };
        Effect::Analyze { ticket, payload }
    }

    fn candidate_from_frame(&self, frame: CapturedFrame) -> ImageCandidate {
        let CapturedFrame {
            width,
            height,
            media_type,
            bytes,
        } = frame;
        let preview = self.renderer.render(&bytes, media_type);
        ImageCandidate {
            id: CandidateId::new(),
            source: CandidateSource::CapturedFrame { width, height },
            media_type,
            bytes: bytes.into(),
            preview,
        }
    }

    fn reject(&mut self, file: FileMetadata, validation: ValidationResult) {
        debug!("Rejected {}: {:?}", file.name, validation.kinds());
        self.state = AcquisitionState::Invalid {
            rejected: RejectedFile { file, validation },
        };
    }

    fn live_detection_mut(&mut self) -> Option<&mut LiveDetection> {
        match &mut self.state {
            AcquisitionState::CameraOpen {
                live:
                    LiveView {
                        phase: CameraPhase::Streaming(detection),
                        ..
                    },
            } => Some(detection),
            _ => None,
        }
    }

    fn ensure_idle(&self, operation: Operation) -> Result<(), ContractViolation> {
        match self.state {
            AcquisitionState::Analyzing { .. } => Err(self.violation(operation)),
            _ => Ok(()),
        }
    }

    fn restore(&mut self, state: AcquisitionState, operation: Operation) -> ContractViolation {
        self.state = state;
        self.violation(operation)
    }

    fn violation(&self, operation: Operation) -> ContractViolation {
        ContractViolation {
            operation,
            state: self.state.kind(),
        }
    }

    fn issue(&mut self) -> Ticket {
        self.generation += 1;
        Ticket(self.generation)
    }
}
