use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use shared::MediaType;

/// Displayable form of a candidate image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub data_url: String,
    /// Pixel dimensions, when the bytes decode as an image.
    pub dimensions: Option<(u32, u32)>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PreviewRenderer;

impl PreviewRenderer {
    pub fn render(&self, bytes: &[u8], media_type: MediaType) -> Preview {
        Preview {
            data_url: format!("data:{};base64,{}", media_type.mime(), STANDARD.encode(bytes)),
            dimensions: decode_dimensions(bytes),
        }
    }
}

fn decode_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}
