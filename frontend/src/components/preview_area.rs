use super::super::{Model, Msg};
use super::utils::{debounce, format_megabytes};
use intake::{AcquisitionState, ImageCandidate};
use yew::prelude::*;

pub fn render_preview_area(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link().clone();

    let (candidate, analyzing) = match model.controller.state() {
        AcquisitionState::Validating { pending } => {
            return html! {
                <div id="preview-container">
                    <div class="loading-preview">
                        <i class="fa-solid fa-spinner fa-spin fa-2x"></i>
                        <p style="margin-left: 10px;">{ format!("Loading {}...", pending.file.name) }</p>
                    </div>
                </div>
            };
        }
        AcquisitionState::Ready { candidate } => (candidate, false),
        AcquisitionState::Analyzing { candidate, .. } => (candidate, true),
        _ => return html! {},
    };

    html! {
        <div id="preview-container">
            { render_candidate_preview(candidate) }
            <div class="button-container">
                <button
                    id="clear-btn"
                    class="analyze-btn"
                    style="background-color: var(--clear-color);"
                    disabled={analyzing}
                    onclick={debounce(300, {
                        let link = link.clone();
                        move || link.send_message(Msg::Clear)
                    })}
                >
                    <i class="fa-solid fa-trash"></i>{" Remove"}
                </button>
                <button
                    class="analyze-btn"
                    onclick={debounce(300, {
                        let link = link.clone();
                        move || link.send_message(Msg::Analyze)
                    })}
                    disabled={analyzing}
                >
                    { render_analyze_button_content(candidate, analyzing) }
                </button>
            </div>
        </div>
    }
}

pub fn render_candidate_preview(candidate: &ImageCandidate) -> Html {
    let preview = candidate.preview();
    let dimensions = preview
        .dimensions
        .map(|(w, h)| format!(" · {}×{}", w, h))
        .unwrap_or_default();

    html! {
        <div class="candidate-preview">
            <img id="actual-image-preview"
                src={preview.data_url.clone()}
                alt={candidate.display_name().to_string()} />
            <p class="candidate-details">
                <span class="candidate-name">{ candidate.display_name().to_string() }</span>
                <span class="candidate-size">
                    { format!(" {}{}", format_megabytes(candidate.size_bytes()), dimensions) }
                </span>
            </p>
        </div>
    }
}

fn render_analyze_button_content(candidate: &ImageCandidate, analyzing: bool) -> Html {
    if analyzing {
        html! { <><i class="fa-solid fa-spinner fa-spin"></i>{" Analyzing..."}</> }
    } else {
        let filename = candidate.display_name();
        let display_name = if filename.chars().count() > 20 {
            format!("{}...", filename.chars().take(17).collect::<String>())
        } else {
            filename.to_string()
        };

        html! { <><i class="fa-solid fa-magnifying-glass"></i>{ format!(" Analyze \"{}\"", display_name) }</> }
    }
}
