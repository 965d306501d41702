use super::super::{Model, Msg};
use super::utils::first_file;
use gloo_file::File as GlooFile;
use gloo_timers::callback::Interval;
use intake::{Completion, Effect, FileMetadata, Handoff, Outcome, Selection, Ticket};
use crate::media::BrowserStream;
use std::rc::Rc;
use wasm_bindgen_futures::spawn_local;
use web_sys::{ClipboardEvent, DragEvent, FileList};
use yew::prelude::*;

/// Runs an effect off the update loop and feeds its completion back in.
pub fn spawn_effect(model: &Model, ctx: &Context<Model>, effect: Effect) {
    let runner = Rc::clone(&model.runner);
    let link = ctx.link().clone();
    log::debug!("Running effect {}", effect.ticket());
    spawn_local(async move {
        let completion = runner.run(effect).await;
        link.send_message(Msg::Completed(completion));
    });
}

pub fn handle_file_chosen(model: &mut Model, ctx: &Context<Model>, file: GlooFile) -> bool {
    let metadata = FileMetadata::new(file.name(), file.raw_mime_type(), file.size());
    model.live_interval = None;
    model.file_reader = None;

    match model.controller.select_file(metadata) {
        Ok(Selection::Rejected(validation)) => {
            log::warn!("Rejected {}: {:?}", file.name(), validation.kinds());
            model.error = None;
        }
        Ok(Selection::ReadBytes(ticket)) => {
            model.error = None;
            let link = ctx.link().clone();
            let reader = gloo_file::callbacks::read_as_bytes(&file, move |bytes| {
                link.send_message(Msg::FileLoaded(ticket, bytes.map_err(|e| e.to_string())));
            });
            model.file_reader = Some(reader);
        }
        Err(violation) => model.error = Some(violation.to_string()),
    }

    true
}

pub fn handle_file_loaded(model: &mut Model, ticket: Ticket, bytes: Result<Vec<u8>, String>) -> bool {
    model.file_reader = None;
    !matches!(model.controller.file_loaded(ticket, bytes), Outcome::Discarded)
}

pub fn handle_clear(model: &mut Model) -> bool {
    model.file_reader = None;
    model.live_interval = None;
    model.error = None;
    model.controller.clear();
    true
}

pub fn handle_open_camera(model: &mut Model, ctx: &Context<Model>) -> bool {
    model.file_reader = None;
    match model.controller.open_camera() {
        Ok(Some(effect)) => {
            model.error = None;
            spawn_effect(model, ctx, effect);
            true
        }
        Ok(None) => false,
        Err(violation) => {
            model.error = Some(violation.to_string());
            true
        }
    }
}

pub fn handle_close_camera(model: &mut Model) -> bool {
    model.live_interval = None;
    model.controller.close_camera()
}

pub fn handle_capture_frame(model: &mut Model) -> bool {
    model.live_interval = None;
    match model.controller.capture_frame() {
        Ok(()) => model.error = None,
        Err(e) => {
            log::warn!("Capture failed: {}", e);
            model.error = Some(e.to_string());
        }
    }
    true
}

pub fn handle_start_live_detection(model: &mut Model, ctx: &Context<Model>) -> bool {
    match model.controller.start_live_detection() {
        Ok(first_pass) => {
            if let Some(effect) = first_pass {
                spawn_effect(model, ctx, effect);
            }
            if model.live_interval.is_none() {
                let link = ctx.link().clone();
                let interval = Interval::new(model.config.detection.live_interval_ms, move || {
                    link.send_message(Msg::LiveTick)
                });
                model.live_interval = Some(interval);
            }
            model.error = None;
        }
        Err(e) => model.error = Some(e.to_string()),
    }
    true
}

pub fn handle_stop_live_detection(model: &mut Model) -> bool {
    model.live_interval = None;
    model.controller.stop_live_detection();
    true
}

pub fn handle_live_tick(model: &mut Model, ctx: &Context<Model>) -> bool {
    match model.controller.poll_live_detection() {
        Some(effect) => {
            spawn_effect(model, ctx, effect);
            true
        }
        None => false,
    }
}

pub fn handle_analyze(model: &mut Model, ctx: &Context<Model>) -> bool {
    match model.controller.analyze() {
        Ok(effect) => {
            model.error = None;
            spawn_effect(model, ctx, effect);
        }
        Err(violation) => model.error = Some(violation.to_string()),
    }
    true
}

pub fn handle_retry(model: &mut Model, ctx: &Context<Model>) -> bool {
    match model.controller.retry() {
        Ok(effect) => {
            model.error = None;
            spawn_effect(model, ctx, effect);
        }
        Err(violation) => model.error = Some(violation.to_string()),
    }
    true
}

pub fn handle_completed(model: &mut Model, completion: Completion<BrowserStream>) -> bool {
    match model.controller.complete(completion) {
        Outcome::Discarded => false,
        Outcome::Applied => true,
        Outcome::Surfaced(e) => {
            model.live_interval = None;
            model.error = Some(e.to_string());
            true
        }
        Outcome::Handoff(Handoff::Completed(report)) => {
            log::info!(
                "Candidate {} analysed: {} ({:.1}%)",
                report.candidate_id,
                report.result.condition_label,
                report.result.confidence_percent
            );
            true
        }
        Outcome::Handoff(Handoff::Failed { candidate_id, error }) => {
            log::warn!("Candidate {} failed: {}", candidate_id, error);
            true
        }
    }
}

pub fn handle_drop(model: &mut Model, ctx: &Context<Model>, event: DragEvent) -> bool {
    event.prevent_default();
    model.is_dragging = false;

    if let Some(data_transfer) = event.data_transfer() {
        if let Some(file_list) = data_transfer.files() {
            process_file_list(ctx, file_list);
        }
    }

    true
}

pub fn handle_paste(_model: &mut Model, ctx: &Context<Model>, event: ClipboardEvent) -> bool {
    if let Some(data_transfer) = event.clipboard_data() {
        if let Some(file_list) = data_transfer.files() {
            if file_list.length() > 0 {
                event.prevent_default();
                process_file_list(ctx, file_list);
                return true;
            }
        }
    }
    false
}

/// Only the first file is taken; acceptance is left to the validator.
pub fn process_file_list(ctx: &Context<Model>, file_list: FileList) {
    if file_list.length() > 1 {
        log::info!("{} files provided, using the first", file_list.length());
    }
    if let Some(file) = first_file(&file_list) {
        ctx.link().send_message(Msg::FileChosen(file));
    }
}
