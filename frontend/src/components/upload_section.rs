use super::super::Model;
use super::super::Msg;
use super::utils::{debounce, first_file, format_megabytes};
use intake::AcquisitionState;
use intake::controller::RejectedFile;
use wasm_bindgen::JsCast;
use web_sys::{DragEvent, HtmlInputElement};
use yew::prelude::*;

const CAPTURE_TIPS: [&str; 5] = [
    "Ensure good lighting - natural light works best",
    "Keep the camera steady and focused",
    "Capture the affected area clearly without blur",
    "Include some surrounding skin for context",
    "Avoid using filters or editing the image",
];

pub fn render_upload_section(model: &Model, ctx: &Context<Model>) -> Html {
    let rejected = match model.controller.state() {
        AcquisitionState::Empty => None,
        AcquisitionState::Invalid { rejected } => Some(rejected),
        _ => return html! {},
    };

    html! {
        <div class="upload-section">
            { render_file_input_area(model, ctx) }
            { rejected.map_or_else(|| html! {}, render_rejection) }
            { render_tips() }
        </div>
    }
}

fn render_file_input_area(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link();
    let validator = model.controller.validator();

    let handle_change = link.batch_callback(|e: Event| {
        let input: HtmlInputElement = e.target_unchecked_into();
        let file = input.files().as_ref().and_then(first_file);
        input.set_value("");
        file.map(Msg::FileChosen)
    });

    let handle_drag_over = link.callback(|e: DragEvent| {
        e.prevent_default();
        Msg::SetDragging(true)
    });

    let handle_drag_leave = link.callback(|e: DragEvent| {
        e.prevent_default();
        Msg::SetDragging(false)
    });

    let handle_drop = link.callback(Msg::HandleDrop);
    let trigger_file_input = Callback::from(|_| {
        let input = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id("file-input"));
        if let Some(html_input) = input.and_then(|i| i.dyn_into::<web_sys::HtmlElement>().ok()) {
            html_input.click();
        }
    });

    html! {
        <>
            <input
                type="file"
                id="file-input"
                accept={validator.accept_attribute()}
                style="display: none;"
                onchange={handle_change}
            />

            <div class="button-container">
                <button
                    id="upload-button"
                    class="analyze-btn"
                    onclick={debounce(300, {
                        let trigger_file_input = trigger_file_input.clone();
                        move || trigger_file_input.emit(())
                    })}
                >
                    <i class="fa-solid fa-upload"></i> {" Select Image"}
                </button>
                <button
                    id="camera-button"
                    class="analyze-btn"
                    onclick={debounce(300, {
                        let link = link.clone();
                        move || link.send_message(Msg::OpenCamera)
                    })}
                >
                    <i class="fa-solid fa-camera"></i> {" Use Camera"}
                </button>
            </div>

            <div
                id="drop-zone"
                class={classes!("upload-area", model.is_dragging.then_some("drag-over"))}
                ondragover={handle_drag_over}
                ondragleave={handle_drag_leave}
                ondrop={handle_drop}
                onclick={debounce(300, {
                    let trigger_file_input = trigger_file_input.clone();
                    move || trigger_file_input.emit(())
                })}
            >
                <div class="upload-placeholder">
                    <i class="fa-solid fa-cloud-arrow-up"></i>
                    <p>{"Drag & drop an image here, paste, or click"}</p>
                    <p class="file-types">
                        { format!("Supported formats: {} (max {})", validator.accepted_labels(), validator.max_size_label()) }
                    </p>
                </div>
            </div>
        </>
    }
}

fn render_rejection(rejected: &RejectedFile) -> Html {
    html! {
        <div class="rejected-file">
            <p class="rejected-name">
                <i class="fa-solid fa-file-circle-xmark"></i>
                { format!(" {} ({})", rejected.file.name, format_megabytes(rejected.file.size_bytes)) }
            </p>
            <ul class="violations">
                { for rejected.validation.violations().iter().map(|v| html! {
                    <li class={classes!("violation", v.kind.to_string())}>{ v.message.clone() }</li>
                }) }
            </ul>
        </div>
    }
}

fn render_tips() -> Html {
    html! {
        <div class="capture-tips">
            <h3><i class="fa-solid fa-lightbulb"></i>{" Tips for best results:"}</h3>
            <ul>
                { for CAPTURE_TIPS.iter().map(|tip| html! { <li>{ *tip }</li> }) }
            </ul>
        </div>
    }
}

pub fn render_disclaimer() -> Html {
    html! {
        <p class="disclaimer">
            {"This tool provides an automated screening estimate, not a diagnosis. \
              Consult a qualified dermatologist about any skin concern."}
        </p>
    }
}
