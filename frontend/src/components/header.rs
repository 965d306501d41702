use yew::prelude::*;

/// Renders the application header
pub fn render_header() -> Html {
    html! {
        <header class="app-header">
            <h1><i class="fa-solid fa-microscope"></i> {" Skin Image Analysis"}</h1>
            <p class="subtitle">{"Upload a photo or use your camera to screen a skin concern"}</p>
        </header>
    }
}
