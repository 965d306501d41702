use super::super::{Model, Msg};
use super::preview_area::render_candidate_preview;
use super::utils::debounce;
use intake::{AcquisitionState, DetectionError, DetectionResult, ImageCandidate};
use yew::prelude::*;

pub fn render_results(model: &Model, ctx: &Context<Model>) -> Html {
    match model.controller.state() {
        AcquisitionState::Complete { candidate, result } => render_complete(candidate, result, ctx),
        AcquisitionState::Failed { candidate, error } => render_failed(candidate, error, ctx),
        _ => html! {},
    }
}

pub fn render_confidence_meter(confidence: f32) -> Html {
    html! {
        <div class="confidence-meter">
            <div class="meter-label">{"Confidence:"}</div>
            <div class="meter">
                <div class="meter-fill" style={format!("width: {}%", confidence)}></div>
            </div>
            <div class="meter-value">{format!("{:.1}%", confidence)}</div>
        </div>
    }
}

fn render_complete(candidate: &ImageCandidate, result: &DetectionResult, ctx: &Context<Model>) -> Html {
    let link = ctx.link().clone();

    html! {
        <div class="results-container">
            { render_candidate_preview(candidate) }
            <div class="result-header">
                <h2 title={format!("Analysis results for: {}", candidate.display_name())}>
                    <i class="fa-solid fa-notes-medical"></i>
                    { format!(" {}", result.condition_label) }
                </h2>
                { render_confidence_meter(result.confidence_percent) }
                {
                    if let Some(severity) = &result.severity {
                        html! {
                            <p class={classes!("severity", severity.to_lowercase())}>
                                { format!("Severity: {}", severity) }
                            </p>
                        }
                    } else {
                        html! {}
                    }
                }
            </div>
            <div class="button-container">
                <button
                    class="analyze-btn"
                    onclick={debounce(300, {
                        let link = link.clone();
                        move || link.send_message(Msg::Clear)
                    })}
                >
                    <i class="fa-solid fa-rotate-left"></i>{" Analyze Another Image"}
                </button>
            </div>
        </div>
    }
}

fn failure_hint(error: &DetectionError) -> &'static str {
    match error {
        DetectionError::NetworkUnavailable(_) => "Check your connection and try again.",
        DetectionError::Timeout(_) => "The analysis service took too long to answer.",
        DetectionError::ServiceError { .. } => "The analysis service could not process this image.",
    }
}

fn render_failed(candidate: &ImageCandidate, error: &DetectionError, ctx: &Context<Model>) -> Html {
    let link = ctx.link().clone();

    html! {
        <div class="results-container failed">
            { render_candidate_preview(candidate) }
            <div class="error-message">
                <i class="fa-solid fa-circle-exclamation"></i>
                <p>{ error.to_string() }</p>
                <p class="hint">{ failure_hint(error) }</p>
            </div>
            <div class="button-container">
                <button
                    class="analyze-btn"
                    onclick={debounce(300, {
                        let link = link.clone();
                        move || link.send_message(Msg::Retry)
                    })}
                >
                    <i class="fa-solid fa-rotate-right"></i>{" Retry"}
                </button>
                <button
                    class="analyze-btn"
                    style="background-color: var(--clear-color);"
                    onclick={debounce(300, {
                        let link = link.clone();
                        move || link.send_message(Msg::Clear)
                    })}
                >
                    <i class="fa-solid fa-trash"></i>{" Remove"}
                </button>
            </div>
        </div>
    }
}
