//! File-level conveniences built on the codec.

use crate::cancel::CancellationToken;
use crate::encode::encode_ico;
use crate::error::{IconError, Result};
use crate::icondir::IconDir;
use crate::image::IconImage;
use crate::options::EncodeOptions;
use std::io::Write;
use std::path::Path;

//===========================================================================//

/// Writes `data` to `path` atomically: the bytes go to a temporary file in
/// the same directory, which then replaces `path`.  A failure leaves any
/// existing file at `path` untouched.
pub fn write_ico_file(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| IconError::from(e).with_path(path))?;
    file.write_all(data)
        .and_then(|_| file.as_file().sync_all())
        .map_err(|e| IconError::from(e).with_path(path))?;
    file.persist(path)
        .map_err(|e| IconError::from(e.error).with_path(path))?;
    tracing::debug!(path = %path.display(), bytes = data.len(), "wrote ICO file");
    Ok(())
}

/// Loads any image format the `image` crate understands, encodes it at every
/// requested size and writes the ICO file to `dst`.  Nothing is written if
/// encoding fails or is cancelled.
pub fn convert_file(
    src: &Path,
    dst: &Path,
    options: &EncodeOptions,
    cancel: &CancellationToken,
) -> Result<()> {
    let source = image::open(src)
        .map_err(IconError::from)
        .and_then(|image| IconImage::from_dynamic(&image))
        .map_err(|e| e.with_path(src))?;
    let data = encode_ico(&source, options, cancel).map_err(|e| e.with_path(src))?;
    write_ico_file(dst, &data)
}

/// Decodes the entry of the given size from an ICO file held in `data`.
pub fn extract_resolution(
    data: &[u8],
    width: u32,
    height: u32,
) -> Result<IconImage> {
    let icondir = IconDir::read(data)?;
    icondir.find(width, height)?.decode(data)
}

//===========================================================================//


//===========================================================================//
