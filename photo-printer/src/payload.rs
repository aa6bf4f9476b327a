//! Image payload decoding
//!
//! Clients send either a raw base64 string or a `data:image/<type>;base64,` URL
//! (what `canvas.toDataURL()` produces). Both forms decode to the same bytes.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use image::ImageFormat;

use crate::error::{PrintError, PrintResult};

/// Standard alphabet, padding optional, trailing bits tolerated
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decoded image payload
#[derive(Debug, Clone)]
pub struct DecodedPayload {
    /// Raw encoded image bytes (PNG, JPEG, ...)
    pub bytes: Vec<u8>,
    /// Format sniffed from the bytes
    pub format: ImageFormat,
    /// Subtype declared by the data URL, e.g. `png`
    pub declared_type: Option<String>,
}

impl DecodedPayload {
    /// File extension matching the sniffed format
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("img")
    }
}

/// Decode a base64 image payload, with or without a data URL prefix
pub fn decode_image_payload(input: &str) -> PrintResult<DecodedPayload> {
    let (declared_type, data) = split_data_url(input)?;

    // Line-wrapped base64 is common when the payload went through a form field
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(PrintError::Decode("missing image payload".to_string()));
    }

    let bytes = LENIENT
        .decode(compact.as_bytes())
        .map_err(|e| PrintError::Decode(format!("invalid base64: {}", e)))?;

    let format = image::guess_format(&bytes)
        .map_err(|e| PrintError::Decode(format!("unrecognized image data: {}", e)))?;

    tracing::debug!(
        bytes = bytes.len(),
        format = ?format,
        declared = ?declared_type,
        "Decoded image payload"
    );

    Ok(DecodedPayload {
        bytes,
        format,
        declared_type,
    })
}

/// Split an optional `data:image/<type>;base64,` prefix from the payload
///
/// Returns the declared image subtype (lowercased) and the base64 part.
fn split_data_url(input: &str) -> PrintResult<(Option<String>, &str)> {
    let trimmed = input.trim();

    let is_data_url = trimmed
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"));
    if !is_data_url {
        return Ok((None, trimmed));
    }

    let rest = &trimmed[5..];
    let comma = rest
        .find(',')
        .ok_or_else(|| PrintError::Decode("data URL has no payload".to_string()))?;
    let header = rest[..comma].to_ascii_lowercase();
    let data = &rest[comma + 1..];

    let media_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| PrintError::Decode("data URL is not base64 encoded".to_string()))?;

    match media_type.strip_prefix("image/") {
        Some(subtype) if !subtype.is_empty() => Ok((Some(subtype.to_string()), data)),
        _ => Err(PrintError::Decode(format!(
            "data URL media type is not an image: '{}'",
            media_type
        ))),
    }
}
