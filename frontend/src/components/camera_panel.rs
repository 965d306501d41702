use super::super::{Model, Msg};
use super::results::render_confidence_meter;
use super::utils::debounce;
use intake::controller::LiveView;
use intake::{AcquisitionState, CameraPhase, LiveDetection};
use yew::prelude::*;

pub fn render_camera_panel(model: &Model, ctx: &Context<Model>) -> Html {
    let AcquisitionState::CameraOpen { live } = model.controller.state() else {
        return html! {};
    };
    let link = ctx.link().clone();

    html! {
        <div class="camera-panel">
            <div class="camera-viewport">
                <video ref={model.video_ref.clone()} autoplay=true muted=true playsinline=true />
                { render_phase_overlay(live) }
            </div>
            <div class="button-container">
                { render_stream_controls(live, ctx) }
                <button
                    class="analyze-btn"
                    style="background-color: var(--clear-color);"
                    onclick={debounce(300, {
                        let link = link.clone();
                        move || link.send_message(Msg::CloseCamera)
                    })}
                >
                    <i class="fa-solid fa-xmark"></i>{" Close Camera"}
                </button>
            </div>
        </div>
    }
}

fn render_phase_overlay(live: &LiveView) -> Html {
    match &live.phase {
        CameraPhase::Acquiring { .. } => html! {
            <div class="camera-overlay">
                <i class="fa-solid fa-spinner fa-spin fa-2x"></i>
                <p>{ format!("Requesting {} camera access...", live.facing) }</p>
            </div>
        },
        CameraPhase::Streaming(detection) => render_live_result(detection),
    }
}

fn render_stream_controls(live: &LiveView, ctx: &Context<Model>) -> Html {
    let CameraPhase::Streaming(detection) = &live.phase else {
        return html! {};
    };
    let link = ctx.link().clone();

    let detecting = detection.detecting;
    let (toggle_label, toggle_icon) = if detecting {
        (" Stop Live Detection", "fa-solid fa-stop")
    } else {
        (" Live Detection", "fa-solid fa-wave-square")
    };

    html! {
        <>
            <button
                id="capture-btn"
                class="analyze-btn"
                onclick={debounce(300, {
                    let link = link.clone();
                    move || link.send_message(Msg::CaptureFrame)
                })}
            >
                <i class="fa-solid fa-camera"></i>{" Capture"}
            </button>
            <button
                class="analyze-btn"
                style="background-color: var(--primary-color);"
                onclick={debounce(300, {
                    let link = link.clone();
                    move || {
                        link.send_message(if detecting {
                            Msg::StopLiveDetection
                        } else {
                            Msg::StartLiveDetection
                        })
                    }
                })}
            >
                <i class={toggle_icon}></i>{ toggle_label }
            </button>
        </>
    }
}

fn render_live_result(detection: &LiveDetection) -> Html {
    if !detection.detecting && detection.latest.is_none() {
        return html! {};
    }

    let body = match &detection.latest {
        Some(Ok(result)) => html! {
            <>
                <p class="live-label">{ result.condition_label.clone() }</p>
                { render_confidence_meter(result.confidence_percent) }
            </>
        },
        Some(Err(e)) => html! { <p class="live-error">{ e.to_string() }</p> },
        None => html! { <p class="live-waiting">{"Analyzing live feed..."}</p> },
    };

    html! {
        <div class={classes!("live-result", detection.in_flight.is_some().then_some("in-flight"))}>
            { body }
        </div>
    }
}
