//! Recovery of true frame dimensions from PNG-encoded entries.
//!
//! Directory width/height fields are one byte each and saturate, so a 512x512
//! or 1024x1024 PNG frame is recorded as `0` (meaning "256").  The PNG IHDR
//! chunk always follows the signature at a fixed position, which lets us read
//! the real size without decoding the image.

use crate::icondir::IconDirEntry;

//===========================================================================//

/// The 8-byte signature that all PNG streams start with.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

// Signature (8) + IHDR length (4) + "IHDR" (4) + width (4) + height (4).
const MIN_SNIFF_LEN: usize = 24;
const IHDR_WIDTH_OFFSET: usize = 16;
const IHDR_HEIGHT_OFFSET: usize = 20;

//===========================================================================//

/// Returns true if `payload` begins with the PNG signature.
pub fn is_png(payload: &[u8]) -> bool {
    payload.starts_with(&PNG_SIGNATURE)
}

/// Reads the big-endian IHDR width and height of a PNG payload, or `None` if
/// the payload is too short or not a PNG.
pub fn png_dimensions(payload: &[u8]) -> Option<(u32, u32)> {
    if payload.len() < MIN_SNIFF_LEN || !is_png(payload) {
        return None;
    }
    let read_be = |offset: usize| {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&payload[offset..offset + 4]);
        u32::from_be_bytes(bytes)
    };
    Some((read_be(IHDR_WIDTH_OFFSET), read_be(IHDR_HEIGHT_OFFSET)))
}

/// Overwrites the logical width/height of every entry whose payload is a PNG
/// with the size recorded in its IHDR chunk.  Entries that are not PNG, are
/// shorter than a PNG header, or point outside `data` keep their directory
/// dimensions.
pub fn refine_png_dimensions(data: &[u8], entries: &mut [IconDirEntry]) {
    for (index, entry) in entries.iter_mut().enumerate() {
        if (entry.payload_size() as usize) < MIN_SNIFF_LEN {
            continue;
        }
        let start = entry.payload_offset() as usize;
        let header = match data.get(start..start.saturating_add(MIN_SNIFF_LEN)) {
            Some(header) => header,
            None => continue,
        };
        if let Some((width, height)) = png_dimensions(header) {
            if width == 0 || height == 0 {
                continue;
            }
            if (width, height) != (entry.width(), entry.height()) {
                tracing::debug!(
                    index,
                    directory_width = entry.width(),
                    directory_height = entry.height(),
                    width,
                    height,
                    "PNG header overrides directory size"
                );
            }
            entry.set_dimensions(width, height);
            entry.set_png(true);
        }
    }
}

//===========================================================================//


//===========================================================================//
