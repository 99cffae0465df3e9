//! Challenge rendering.
//!
//! The transport hands over an opaque challenge string; the dashboard needs
//! an image it can drop into an `<img>` tag. Same shape the web stack uses:
//! a base64 PNG data URI.

use base64::Engine;

/// Render a raw pairing challenge as a `data:image/png;base64,…` URI.
pub fn render_data_uri(raw: &str) -> anyhow::Result<String> {
    let code = qrcode::QrCode::new(raw.as_bytes())?;
    let img = code
        .render::<image::Luma<u8>>()
        .min_dimensions(256, 256)
        .build();

    let mut png = Vec::new();
    image::DynamicImage::ImageLuma8(img)
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)?;

    Ok(format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    ))
}
