mod common;

use std::time::Duration;

use common::{FakeDevices, FakeStream, ScriptedService, TokioTimer, response, solid_frame};
use intake::config::AcceptPolicy;
use intake::controller::Operation;
use intake::{
    AcquisitionController, AcquisitionError, AcquisitionState, CameraPhase, CandidateSource,
    CaptureError, Completion, ConstraintKind, ContractViolation, DetectionError, DetectionPipeline,
    Effect, EffectRunner, FileMetadata, Handoff, IntakeConfig, Outcome, Selection, StateKind,
    Ticket,
};

const MIB: u64 = 1024 * 1024;

type Runner = EffectRunner<FakeDevices, ScriptedService, TokioTimer>;

fn controller() -> AcquisitionController<FakeStream> {
    AcquisitionController::new(&IntakeConfig::default())
}

fn runner(devices: &FakeDevices, service: &ScriptedService) -> Runner {
    EffectRunner::new(
        devices.clone(),
        DetectionPipeline::new(service.clone(), TokioTimer, Duration::from_secs(5)),
    )
}

fn read_ticket(selection: Selection) -> Ticket {
    match selection {
        Selection::ReadBytes(ticket) => ticket,
        Selection::Rejected(validation) => panic!("unexpected rejection: {validation:?}"),
    }
}

fn load_jpeg(controller: &mut AcquisitionController<FakeStream>, name: &str) {
    let ticket = read_ticket(
        controller
            .select_file(FileMetadata::new(name, "image/jpeg", 2 * MIB))
            .unwrap(),
    );
    assert_eq!(controller.file_loaded(ticket, Ok(vec![0xFF, 0xD8, 0xFF])), Outcome::Applied);
}

async fn open_streaming(
    controller: &mut AcquisitionController<FakeStream>,
    runner: &Runner,
) {
    let effect = controller.open_camera().unwrap().expect("acquire effect");
    let completion = runner.run(effect).await;
    assert_eq!(controller.complete(completion), Outcome::Applied);
    assert!(controller.live_detection().is_some());
}

#[tokio::test]
async fn test_file_scenario_through_completion() {
    let devices = FakeDevices::granting(solid_frame(4, 4));
    let service = ScriptedService::answering(vec![Ok(response("Eczema", 94.5))]);
    let runner = runner(&devices, &service);
    let mut controller = controller();

    let selection = controller
        .select_file(FileMetadata::new("arm.png", "image/png", 12 * MIB))
        .unwrap();
    assert!(matches!(selection, Selection::Rejected(ref v) if v.kinds() == vec![ConstraintKind::Size]));
    assert_eq!(controller.kind(), StateKind::Invalid);

    let selection = controller
        .select_file(FileMetadata::new("rash.gif", "image/gif", 2_000_000))
        .unwrap();
    assert!(matches!(selection, Selection::Rejected(ref v) if v.kinds() == vec![ConstraintKind::Type]));

    load_jpeg(&mut controller, "mole.jpg");
    let candidate = controller.state().candidate().expect("ready candidate");
    assert!(candidate.preview().data_url.starts_with("data:image/jpeg;base64,"));
    assert_eq!(controller.kind(), StateKind::Ready);

    let effect = controller.analyze().unwrap();
    assert_eq!(controller.kind(), StateKind::Analyzing);

    let again = controller.analyze().unwrap_err();
    assert_eq!(
        again,
        ContractViolation {
            operation: Operation::Analyze,
            state: StateKind::Analyzing
        }
    );
    assert_eq!(controller.kind(), StateKind::Analyzing);

    let outcome = controller.complete(runner.run(effect).await);
    let Outcome::Handoff(Handoff::Completed(report)) = outcome else {
        panic!("expected completed handoff, got {outcome:?}");
    };
    assert_eq!(report.result.condition_label, "Eczema");
    assert_eq!(report.result.confidence_percent, 94.5);
    assert_eq!(report.source, CandidateSource::File { name: "mole.jpg".into() });

    match controller.state() {
        AcquisitionState::Complete { result, candidate } => {
            assert_eq!(result.condition_label, "Eczema");
            assert_eq!(candidate.id(), report.candidate_id);
        }
        other => panic!("expected Complete, got {other:?}"),
    }
    assert_eq!(service.requests()[0].mime_type, "image/jpeg");
}

#[test]
fn test_clear_discards_pending_read() {
    let mut controller = controller();
    let ticket = read_ticket(
        controller
            .select_file(FileMetadata::new("mole.jpg", "image/jpeg", 1024))
            .unwrap(),
    );
    assert_eq!(controller.kind(), StateKind::Validating);

    controller.clear();
    assert_eq!(controller.kind(), StateKind::Empty);

    assert_eq!(controller.file_loaded(ticket, Ok(vec![1, 2, 3])), Outcome::Discarded);
    assert_eq!(controller.kind(), StateKind::Empty);
    assert!(controller.state().candidate().is_none());
}

#[test]
fn test_newer_selection_wins_over_older_read() {
    let mut controller = controller();
    let first = read_ticket(
        controller
            .select_file(FileMetadata::new("first.jpg", "image/jpeg", 10))
            .unwrap(),
    );
    let second = read_ticket(
        controller
            .select_file(FileMetadata::new("second.png", "image/png", 10))
            .unwrap(),
    );
    assert!(second > first);

    assert_eq!(controller.file_loaded(first, Ok(vec![1])), Outcome::Discarded);
    assert_eq!(controller.file_loaded(second, Ok(vec![2])), Outcome::Applied);
    let candidate = controller.state().candidate().unwrap();
    assert_eq!(candidate.display_name(), "second.png");
}

#[test]
fn test_loaded_bytes_are_checked_against_the_ceiling() {
    let config = IntakeConfig {
        accept: AcceptPolicy {
            max_file_bytes: 8,
            ..AcceptPolicy::default()
        },
        ..IntakeConfig::default()
    };
    let mut controller: AcquisitionController<FakeStream> = AcquisitionController::new(&config);
    let ticket = read_ticket(
        controller
            .select_file(FileMetadata::new("liar.jpg", "image/jpeg", 4))
            .unwrap(),
    );
    controller.file_loaded(ticket, Ok(vec![0; 16]));

    match controller.state() {
        AcquisitionState::Invalid { rejected } => {
            assert_eq!(rejected.validation.kinds(), vec![ConstraintKind::Size]);
            assert_eq!(rejected.file.size_bytes, 16);
        }
        other => panic!("expected Invalid, got {other:?}"),
    }
}

#[test]
fn test_read_failure_is_reported_as_violation() {
    let mut controller = controller();
    let ticket = read_ticket(
        controller
            .select_file(FileMetadata::new("gone.jpg", "image/jpeg", 10))
            .unwrap(),
    );
    controller.file_loaded(ticket, Err("file was removed".into()));

    match controller.state() {
        AcquisitionState::Invalid { rejected } => {
            assert_eq!(rejected.validation.kinds(), vec![ConstraintKind::Read]);
        }
        other => panic!("expected Invalid, got {other:?}"),
    }
    assert!(controller.analyze().is_err());
}

#[test]
fn test_analyze_outside_ready_is_rejected_without_state_change() {
    let mut controller = controller();
    let err = controller.analyze().unwrap_err();
    assert_eq!(err.state, StateKind::Empty);
    assert_eq!(controller.kind(), StateKind::Empty);

    controller
        .select_file(FileMetadata::new("x.gif", "image/gif", 10))
        .unwrap();
    let before = controller.state().clone();
    let err = controller.analyze().unwrap_err();
    assert_eq!(err.state, StateKind::Invalid);
    assert_eq!(controller.state(), &before);
}

#[tokio::test]
async fn test_open_camera_discards_candidate() {
    let devices = FakeDevices::granting(solid_frame(8, 6));
    let runner = runner(&devices, &ScriptedService::default());
    let mut controller = controller();
    load_jpeg(&mut controller, "mole.jpg");

    let effect = controller.open_camera().unwrap().unwrap();
    assert!(matches!(effect, Effect::AcquireStream { .. }));
    assert_eq!(controller.kind(), StateKind::CameraOpen);
    assert!(controller.state().candidate().is_none());

    controller.complete(runner.run(effect).await);
    assert!(controller.camera_active());
    assert_eq!(devices.active_streams(), 1);
    assert!(controller.state().candidate().is_none());

    // Opening again while open is a no-op.
    assert_eq!(controller.open_camera().unwrap(), None);
    assert_eq!(devices.requests(), 1);
}

#[tokio::test]
async fn test_denied_camera_reverts_to_empty() {
    let devices = FakeDevices::denying("Permission denied");
    let runner = runner(&devices, &ScriptedService::default());
    let mut controller = controller();

    let effect = controller.open_camera().unwrap().unwrap();
    let outcome = controller.complete(runner.run(effect).await);

    assert!(matches!(
        outcome,
        Outcome::Surfaced(AcquisitionError::CameraUnavailable(ref denied)) if denied.reason == "Permission denied"
    ));
    assert_eq!(controller.kind(), StateKind::Empty);
    assert!(!controller.camera_active());
    assert_eq!(devices.active_streams(), 0);

    // The user may retry.
    assert!(controller.open_camera().unwrap().is_some());
}

#[tokio::test]
async fn test_capture_frame_releases_stream() {
    let devices = FakeDevices::granting(solid_frame(8, 6));
    let runner = runner(&devices, &ScriptedService::default());
    let mut controller = controller();
    open_streaming(&mut controller, &runner).await;

    controller.capture_frame().unwrap();

    assert_eq!(devices.active_streams(), 0);
    assert!(!controller.camera_active());
    let candidate = controller.state().candidate().expect("captured candidate");
    assert_eq!(
        candidate.source(),
        &CandidateSource::CapturedFrame { width: 8, height: 6 }
    );
    assert_eq!(candidate.preview().dimensions, Some((8, 6)));
    assert_eq!(controller.kind(), StateKind::Ready);
    assert!(controller.analyze().is_ok());
}

#[tokio::test]
async fn test_failed_capture_still_releases_stream() {
    let devices = FakeDevices::with_broken_frames(CaptureError::NotReady);
    let runner = runner(&devices, &ScriptedService::default());
    let mut controller = controller();
    open_streaming(&mut controller, &runner).await;
    assert_eq!(devices.active_streams(), 1);

    let err = controller.capture_frame().unwrap_err();
    assert_eq!(err, AcquisitionError::Capture(CaptureError::NotReady));
    assert_eq!(devices.active_streams(), 0);
    assert_eq!(controller.kind(), StateKind::Empty);
}

#[tokio::test]
async fn test_capture_before_stream_is_granted_is_rejected() {
    let devices = FakeDevices::granting(solid_frame(4, 4));
    let mut controller = controller();
    let _effect = controller.open_camera().unwrap().unwrap();

    let err = controller.capture_frame().unwrap_err();
    assert!(matches!(err, AcquisitionError::Contract(_)));
    assert_eq!(devices.active_streams(), 0);
}

#[tokio::test]
async fn test_stream_granted_after_close_is_stopped() {
    let devices = FakeDevices::granting(solid_frame(4, 4));
    let runner = runner(&devices, &ScriptedService::default());
    let mut controller = controller();

    let effect = controller.open_camera().unwrap().unwrap();
    assert!(controller.close_camera());
    assert_eq!(controller.kind(), StateKind::Empty);

    let completion = runner.run(effect).await;
    assert_eq!(devices.active_streams(), 1);
    assert_eq!(controller.complete(completion), Outcome::Discarded);
    assert_eq!(devices.active_streams(), 0);
    assert!(!controller.camera_active());
}

#[tokio::test]
async fn test_close_camera_is_idempotent() {
    let devices = FakeDevices::granting(solid_frame(4, 4));
    let runner = runner(&devices, &ScriptedService::default());
    let mut controller = controller();
    open_streaming(&mut controller, &runner).await;

    assert!(controller.close_camera());
    assert!(!controller.close_camera());
    assert_eq!(devices.active_streams(), 0);
    assert_eq!(controller.kind(), StateKind::Empty);
}

#[tokio::test]
async fn test_live_detection_allows_one_pass_in_flight() {
    let devices = FakeDevices::granting(solid_frame(4, 4));
    let service = ScriptedService::answering(vec![
        Ok(response("Psoriasis", 61.0)),
        Ok(response("Eczema", 88.0)),
    ]);
    let runner = runner(&devices, &service);
    let mut controller = controller();
    open_streaming(&mut controller, &runner).await;

    let first = controller.start_live_detection().unwrap().expect("first pass");
    assert_eq!(controller.start_live_detection().unwrap(), None);
    assert_eq!(controller.poll_live_detection(), None);

    assert_eq!(controller.complete(runner.run(first).await), Outcome::Applied);
    let live = controller.live_detection().unwrap();
    assert!(live.detecting);
    assert_eq!(live.in_flight, None);
    assert_eq!(
        live.latest.as_ref().unwrap().as_ref().unwrap().condition_label,
        "Psoriasis"
    );

    let second = controller.poll_live_detection().expect("next pass");
    controller.complete(runner.run(second).await);
    let latest = controller.live_detection().unwrap().latest.clone().unwrap().unwrap();
    assert_eq!(latest.condition_label, "Eczema");

    // Live detection never leaves the camera.
    assert_eq!(controller.kind(), StateKind::CameraOpen);
    assert_eq!(devices.active_streams(), 1);
}

#[tokio::test]
async fn test_failed_live_pass_does_not_stop_detection() {
    let devices = FakeDevices::granting(solid_frame(4, 4));
    let service = ScriptedService::answering(vec![Err(DetectionError::NetworkUnavailable(
        "offline".into(),
    ))]);
    let runner = runner(&devices, &service);
    let mut controller = controller();
    open_streaming(&mut controller, &runner).await;

    let pass = controller.start_live_detection().unwrap().unwrap();
    controller.complete(runner.run(pass).await);

    let live = controller.live_detection().unwrap();
    assert!(matches!(live.latest, Some(Err(DetectionError::NetworkUnavailable(_)))));
    assert!(controller.poll_live_detection().is_some());
}

#[tokio::test]
async fn test_closing_camera_discards_in_flight_pass() {
    let devices = FakeDevices::granting(solid_frame(4, 4));
    let service = ScriptedService::answering(vec![Ok(response("Eczema", 70.0))]);
    let runner = runner(&devices, &service);
    let mut controller = controller();
    open_streaming(&mut controller, &runner).await;

    let pass = controller.start_live_detection().unwrap().unwrap();
    controller.close_camera();
    assert_eq!(devices.active_streams(), 0);

    assert_eq!(controller.complete(runner.run(pass).await), Outcome::Discarded);
    assert_eq!(controller.kind(), StateKind::Empty);
    assert_eq!(controller.poll_live_detection(), None);
}

#[tokio::test]
async fn test_stop_live_detection_cancels_pending_pass() {
    let devices = FakeDevices::granting(solid_frame(4, 4));
    let service = ScriptedService::answering(vec![Ok(response("Eczema", 70.0))]);
    let runner = runner(&devices, &service);
    let mut controller = controller();
    open_streaming(&mut controller, &runner).await;

    let pass = controller.start_live_detection().unwrap().unwrap();
    controller.stop_live_detection();
    assert_eq!(controller.poll_live_detection(), None);
    assert_eq!(controller.complete(runner.run(pass).await), Outcome::Discarded);
    assert!(controller.live_detection().unwrap().latest.is_none());
}

#[test]
fn test_live_detection_requires_streaming_camera() {
    let mut controller = controller();
    let err = controller.start_live_detection().unwrap_err();
    assert!(matches!(
        err,
        AcquisitionError::Contract(ContractViolation {
            operation: Operation::StartLiveDetection,
            state: StateKind::Empty
        })
    ));
    assert_eq!(controller.poll_live_detection(), None);
}

#[tokio::test]
async fn test_unready_stream_leaves_live_detection_off() {
    let devices = FakeDevices::with_broken_frames(CaptureError::NotReady);
    let runner = runner(&devices, &ScriptedService::default());
    let mut controller = controller();
    open_streaming(&mut controller, &runner).await;

    let err = controller.start_live_detection().unwrap_err();
    assert_eq!(err, AcquisitionError::Capture(CaptureError::NotReady));

    let detection = controller.live_detection().unwrap();
    assert!(!detection.detecting);
    assert_eq!(detection.in_flight, None);
    assert_eq!(controller.poll_live_detection(), None);
    assert_eq!(devices.active_streams(), 1);
}

#[tokio::test]
async fn test_selecting_file_tears_down_camera() {
    let devices = FakeDevices::granting(solid_frame(4, 4));
    let runner = runner(&devices, &ScriptedService::default());
    let mut controller = controller();
    open_streaming(&mut controller, &runner).await;

    let selection = controller
        .select_file(FileMetadata::new("mole.jpg", "image/jpeg", 100))
        .unwrap();
    assert!(matches!(selection, Selection::ReadBytes(_)));
    assert_eq!(devices.active_streams(), 0);
    assert!(!controller.camera_active());
    assert_eq!(controller.kind(), StateKind::Validating);
}

#[tokio::test]
async fn test_clear_from_camera_leaves_nothing_open() {
    let devices = FakeDevices::granting(solid_frame(4, 4));
    let runner = runner(&devices, &ScriptedService::default());
    let mut controller = controller();
    open_streaming(&mut controller, &runner).await;

    controller.clear();
    assert_eq!(controller.kind(), StateKind::Empty);
    assert_eq!(devices.active_streams(), 0);
}

#[tokio::test]
async fn test_failed_analysis_can_be_retried() {
    let devices = FakeDevices::granting(solid_frame(4, 4));
    let service = ScriptedService::answering(vec![
        Err(DetectionError::Timeout(Duration::from_secs(30))),
        Ok(response("Melanoma", 55.5)),
    ]);
    let runner = runner(&devices, &service);
    let mut controller = controller();
    load_jpeg(&mut controller, "mole.jpg");

    let effect = controller.analyze().unwrap();
    let outcome = controller.complete(runner.run(effect).await);
    assert!(matches!(
        outcome,
        Outcome::Handoff(Handoff::Failed { error: DetectionError::Timeout(_), .. })
    ));
    assert_eq!(controller.kind(), StateKind::Failed);
    assert!(controller.analyze().is_err());

    let effect = controller.retry().unwrap();
    let outcome = controller.complete(runner.run(effect).await);
    assert!(matches!(outcome, Outcome::Handoff(Handoff::Completed(_))));
    assert_eq!(controller.kind(), StateKind::Complete);
    assert_eq!(service.requests().len(), 2);
}

#[tokio::test]
async fn test_clear_during_analysis_discards_result() {
    let devices = FakeDevices::granting(solid_frame(4, 4));
    let service = ScriptedService::answering(vec![Ok(response("Eczema", 94.5))]);
    let runner = runner(&devices, &service);
    let mut controller = controller();
    load_jpeg(&mut controller, "mole.jpg");

    let effect = controller.analyze().unwrap();
    controller.clear();
    assert_eq!(controller.complete(runner.run(effect).await), Outcome::Discarded);
    assert_eq!(controller.kind(), StateKind::Empty);
}

#[test]
fn test_operations_rejected_while_analyzing() {
    let mut controller = controller();
    load_jpeg(&mut controller, "mole.jpg");
    controller.analyze().unwrap();

    let err = controller
        .select_file(FileMetadata::new("other.jpg", "image/jpeg", 10))
        .unwrap_err();
    assert_eq!(err.operation, Operation::SelectFile);
    assert_eq!(controller.open_camera().unwrap_err().operation, Operation::OpenCamera);
    assert_eq!(controller.kind(), StateKind::Analyzing);
}

#[test]
fn test_dropping_controller_stops_stream() {
    let devices = FakeDevices::granting(solid_frame(4, 4));
    let mut controller = controller();
    let Effect::AcquireStream { ticket, .. } = controller.open_camera().unwrap().unwrap() else {
        panic!("expected stream request");
    };
    controller.complete(Completion::StreamAcquired {
        ticket,
        result: Ok(devices.make_stream()),
    });
    assert!(matches!(
        controller.state(),
        AcquisitionState::CameraOpen { live } if matches!(live.phase, CameraPhase::Streaming(_))
    ));
    assert_eq!(devices.active_streams(), 1);

    drop(controller);
    assert_eq!(devices.active_streams(), 0);
}
