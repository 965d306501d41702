//! Drives the acquisition controller for files on disk.

use std::path::Path;

use intake::{
    AcquisitionController, AcquisitionError, AcquisitionState, DetectionResult, EffectRunner,
    FileMetadata, Handoff, NoDevices, NoStream, Outcome, Selection,
};
use serde::Serialize;
use shared::MediaType;
use strum::IntoEnumIterator;

use crate::client::{ReqwestAnalysisService, TokioTimer};

pub type Runner = EffectRunner<NoDevices, ReqwestAnalysisService, TokioTimer>;

const UNKNOWN_MIME: &str = "application/octet-stream";

/// What happened to one input file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Report {
    Rejected {
        file: String,
        violations: Vec<String>,
    },
    Accepted {
        file: String,
        size_bytes: u64,
        dimensions: Option<(u32, u32)>,
    },
    Analyzed {
        file: String,
        result: DetectionResult,
    },
    Failed {
        file: String,
        attempts: u32,
        error: String,
    },
}

impl Report {
    pub fn is_success(&self) -> bool {
        matches!(self, Report::Accepted { .. } | Report::Analyzed { .. })
    }
}

/// Declared type for a path, the way a browser derives it from the extension.
pub fn declared_mime(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let media_type = match ext.as_deref() {
        Some("jpeg") => Some(MediaType::Jpeg),
        Some(ext) => MediaType::iter().find(|t| t.extension() == ext),
        None => None,
    };
    media_type.map_or_else(|| UNKNOWN_MIME.to_string(), |t| t.mime().to_string())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn violations(state: &AcquisitionState) -> Vec<String> {
    match state {
        AcquisitionState::Invalid { rejected } => rejected
            .validation
            .violations()
            .iter()
            .map(|v| v.message.clone())
            .collect(),
        _ => Vec::new(),
    }
}

/// Runs a file through acceptance and loading, leaving the controller
/// `Ready` or `Invalid`.
pub async fn load_file(
    controller: &mut AcquisitionController<NoStream>,
    path: &Path,
) -> Result<Report, AcquisitionError> {
    let file = display_name(path);
    let size_bytes = tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0);
    let metadata = FileMetadata::new(file.clone(), declared_mime(path), size_bytes);

    match controller.select_file(metadata)? {
        Selection::Rejected(validation) => Ok(Report::Rejected {
            file,
            violations: validation.violations().iter().map(|v| v.message.clone()).collect(),
        }),
        Selection::ReadBytes(ticket) => {
            let bytes = tokio::fs::read(path).await.map_err(|e| e.to_string());
            controller.file_loaded(ticket, bytes);
            match controller.state() {
                AcquisitionState::Ready { candidate } => Ok(Report::Accepted {
                    file,
                    size_bytes: candidate.size_bytes(),
                    dimensions: candidate.preview().dimensions,
                }),
                state => Ok(Report::Rejected {
                    file,
                    violations: violations(state),
                }),
            }
        }
    }
}

/// Loads and analyses a file, retrying failed submissions up to `retries` times.
pub async fn analyze_file(
    controller: &mut AcquisitionController<NoStream>,
    runner: &Runner,
    path: &Path,
    retries: u32,
) -> Result<Report, AcquisitionError> {
    let file = match load_file(controller, path).await? {
        Report::Accepted { file, .. } => file,
        report => return Ok(report),
    };

    let mut effect = controller.analyze()?;
    let mut attempts = 1;
    loop {
        let completion = runner.run(effect).await;
        match controller.complete(completion) {
            Outcome::Handoff(Handoff::Completed(report)) => {
                log::info!("{} analysed as candidate {}", file, report.candidate_id);
                return Ok(Report::Analyzed {
                    file,
                    result: report.result,
                });
            }
            Outcome::Handoff(Handoff::Failed { error, .. }) if attempts > retries => {
                return Ok(Report::Failed {
                    file,
                    attempts,
                    error: error.to_string(),
                });
            }
            Outcome::Handoff(Handoff::Failed { error, .. }) => {
                log::warn!("Attempt {} for {} failed: {}; retrying", attempts, file, error);
                attempts += 1;
                effect = controller.retry()?;
            }
            Outcome::Surfaced(err) => return Err(err),
            Outcome::Applied | Outcome::Discarded => {
                log::error!("Unexpected completion for {} in {}", file, controller.kind());
                return Ok(Report::Failed {
                    file,
                    attempts,
                    error: "analysis did not complete".to_string(),
                });
            }
        }
    }
}

/// Requests a camera from the host. Returns `Ok(false)` when access is
/// denied or no camera exists.
pub async fn check_camera(
    controller: &mut AcquisitionController<NoStream>,
    runner: &Runner,
) -> Result<bool, AcquisitionError> {
    let Some(effect) = controller.open_camera()? else {
        return Ok(true);
    };
    match controller.complete(runner.run(effect).await) {
        Outcome::Surfaced(AcquisitionError::CameraUnavailable(denied)) => {
            log::warn!("Camera unavailable: {}", denied);
            Ok(false)
        }
        Outcome::Surfaced(err) => Err(err),
        _ => Ok(true),
    }
}
