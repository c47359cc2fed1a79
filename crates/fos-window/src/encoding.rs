//! `btoa` / `atob`

use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use fos_dom::DomError;

const FORGIVING: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Base64-encode a Latin-1 string
pub fn btoa(data: &str) -> Result<String, DomError> {
    let bytes = data
        .chars()
        .map(|c| u8::try_from(u32::from(c)))
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|_| {
            DomError::InvalidCharacter("The string to be encoded contains characters outside of the Latin1 range.".into())
        })?;
    Ok(STANDARD.encode(bytes))
}

/// Forgiving-base64 decode into a Latin-1 string
pub fn atob(data: &str) -> Result<String, DomError> {
    let invalid = || DomError::InvalidCharacter("The string to be decoded contains invalid characters.".into());

    let mut cleaned: String = data
        .chars()
        .filter(|c| !matches!(c, '\t' | '\n' | '\u{c}' | '\r' | ' '))
        .collect();
    if cleaned.len() % 4 == 0 {
        for _ in 0..2 {
            if cleaned.ends_with('=') {
                cleaned.pop();
            }
        }
    }
    if cleaned.len() % 4 == 1 || !cleaned.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/') {
        return Err(invalid());
    }

    let bytes = FORGIVING.decode(cleaned.as_bytes()).map_err(|_| invalid())?;
    Ok(bytes.into_iter().map(char::from).collect())
}
