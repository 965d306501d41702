use gloo_events::EventListener;
use gloo_file::callbacks::FileReader;
use gloo_timers::callback::Interval;
use intake::{AcquisitionController, Completion, DetectionPipeline, EffectRunner, IntakeConfig, Ticket};
use std::rc::Rc;
use wasm_bindgen::JsCast;
use web_sys::{ClipboardEvent, DragEvent, HtmlVideoElement};
use yew::prelude::*;

mod api;
mod components;
mod media;

use api::HttpAnalysisService;
use components::{camera_panel, handlers, header, preview_area, results, upload_section, utils};
use media::{BrowserMediaDevices, BrowserStream, BrowserTimer};

const SHIPPED_CONFIG: &str = include_str!("../../config/intake.yaml");

type Runner = EffectRunner<BrowserMediaDevices, HttpAnalysisService, BrowserTimer>;

// Yew msg components
pub enum Msg {
    // File intake
    FileChosen(gloo_file::File),
    FileLoaded(Ticket, Result<Vec<u8>, String>),
    Clear,

    // Camera
    OpenCamera,
    CloseCamera,
    CaptureFrame,
    StartLiveDetection,
    StopLiveDetection,
    LiveTick,

    // Analysis
    Analyze,
    Retry,
    Completed(Completion<BrowserStream>),

    // UI states
    SetDragging(bool),

    // Input events
    HandleDrop(DragEvent),
    HandlePaste(ClipboardEvent),
}

// Main component
pub struct Model {
    pub controller: AcquisitionController<BrowserStream>,
    pub runner: Rc<Runner>,
    pub config: IntakeConfig,
    pub file_reader: Option<FileReader>,
    pub live_interval: Option<Interval>,
    pub error: Option<String>,
    pub is_dragging: bool,
    pub video_ref: NodeRef,
    paste_listener: Option<EventListener>,
}

fn load_config() -> IntakeConfig {
    match IntakeConfig::from_yaml_str(SHIPPED_CONFIG) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Bundled intake config rejected, using defaults: {}", e);
            IntakeConfig::default()
        }
    }
}

impl Component for Model {
    type Message = Msg;
    type Properties = ();

    fn create(ctx: &Context<Self>) -> Self {
        let config = load_config();
        let pipeline = DetectionPipeline::new(
            HttpAnalysisService::new(config.detection.endpoint.clone()),
            BrowserTimer,
            config.detection.request_timeout(),
        );

        let mut model = Self {
            controller: AcquisitionController::new(&config),
            runner: Rc::new(EffectRunner::new(BrowserMediaDevices, pipeline)),
            config,
            file_reader: None,
            live_interval: None,
            error: None,
            is_dragging: false,
            video_ref: NodeRef::default(),
            paste_listener: None,
        };

        if let Some(window) = web_sys::window() {
            let link = ctx.link().clone();
            let listener = EventListener::new(&window, "paste", move |event| {
                if let Some(clipboard_event) = event.dyn_ref::<ClipboardEvent>() {
                    link.send_message(Msg::HandlePaste(clipboard_event.clone()));
                }
            });
            model.paste_listener = Some(listener);
        }

        model
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::FileChosen(file) => handlers::handle_file_chosen(self, ctx, file),
            Msg::FileLoaded(ticket, bytes) => handlers::handle_file_loaded(self, ticket, bytes),
            Msg::Clear => handlers::handle_clear(self),

            Msg::OpenCamera => handlers::handle_open_camera(self, ctx),
            Msg::CloseCamera => handlers::handle_close_camera(self),
            Msg::CaptureFrame => handlers::handle_capture_frame(self),
            Msg::StartLiveDetection => handlers::handle_start_live_detection(self, ctx),
            Msg::StopLiveDetection => handlers::handle_stop_live_detection(self),
            Msg::LiveTick => handlers::handle_live_tick(self, ctx),

            Msg::Analyze => handlers::handle_analyze(self, ctx),
            Msg::Retry => handlers::handle_retry(self, ctx),
            Msg::Completed(completion) => handlers::handle_completed(self, completion),

            Msg::SetDragging(is_dragging) => {
                self.is_dragging = is_dragging;
                true
            }

            Msg::HandleDrop(event) => handlers::handle_drop(self, ctx, event),
            Msg::HandlePaste(event) => handlers::handle_paste(self, ctx, event),
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        html! {
            <div class="container">
                { header::render_header() }

                <main class="main-content">
                { upload_section::render_upload_section(self, ctx) }
                { preview_area::render_preview_area(self, ctx) }
                { camera_panel::render_camera_panel(self, ctx) }
                { utils::render_error_message(self) }
                { results::render_results(self, ctx) }
                </main>

                <footer class="app-footer">
                    { upload_section::render_disclaimer() }
                </footer>
            </div>
        }
    }

    fn rendered(&mut self, _ctx: &Context<Self>, _first_render: bool) {
        let Some(video) = self.video_ref.cast::<HtmlVideoElement>() else {
            return;
        };
        let stream = self.controller.preview_stream().map(BrowserStream::media_stream);
        if video.src_object().as_ref() != stream {
            video.set_src_object(stream);
        }
    }

    fn destroy(&mut self, _ctx: &Context<Self>) {
        self.live_interval = None;
        self.file_reader = None;
        self.controller.teardown();
    }
}

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("App starting...");
    yew::Renderer::<Model>::new().render();
}
