//! Container unwrapping and text decoding for KML documents.

use std::io::{Cursor, Read};

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE};

use super::FormatError;

const ZIP_MAGIC: &[u8; 2] = b"PK";
const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];

/// Returns the KML bytes, unpacking a KMZ archive when `bytes` is one.
pub(super) fn unwrap_container(bytes: &[u8]) -> Result<Vec<u8>, FormatError> {
    if !bytes.starts_with(ZIP_MAGIC) {
        return Ok(bytes.to_vec());
    }

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| FormatError::Archive(e.to_string()))?;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| FormatError::Archive(e.to_string()))?;
        if !entry.name().to_ascii_lowercase().ends_with(".kml") {
            continue;
        }

        tracing::debug!(entry = entry.name(), "Reading KML from KMZ archive");
        let mut content = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut content)
            .map_err(|e| FormatError::Archive(e.to_string()))?;
        return Ok(content);
    }

    Err(FormatError::NoKmlEntry)
}

/// Decodes document bytes into text.
///
/// A UTF-16 byte-order mark selects UTF-16 directly. Otherwise the
/// candidates UTF-8, UTF-16LE, UTF-16BE, Latin-1 and Windows-1252 are tried
/// in order and the first clean decode wins. UTF-16 without a mark is only
/// accepted when the result looks like markup, since almost any even-length
/// byte string is valid UTF-16. Latin-1 maps every byte, so decoding never
/// fails and Windows-1252 is never reached.
pub(super) fn decode_text(bytes: &[u8]) -> String {
    if bytes.starts_with(&UTF16_LE_BOM) {
        return UTF_16LE.decode_with_bom_removal(bytes).0.into_owned();
    }
    if bytes.starts_with(&UTF16_BE_BOM) {
        return UTF_16BE.decode_with_bom_removal(bytes).0.into_owned();
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    for encoding in [UTF_16LE, UTF_16BE] {
        if let Some(text) = decode_utf16_strict(encoding, bytes) {
            if text.trim_start_matches('\u{feff}').trim_start().starts_with('<') {
                tracing::debug!(encoding = encoding.name(), "Decoded KML without BOM");
                return text;
            }
        }
    }

    decode_latin1(bytes)
}

/// Strips leading byte-order marks and surrounding whitespace.
pub(super) fn clean_text(text: &str) -> &str {
    text.trim().trim_start_matches('\u{feff}').trim()
}

fn decode_utf16_strict(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}
