//! Conversion of a decoded image into ICO frame payloads.

use crate::bmpdepth::row_stride;
use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::icondir::{IcoBuilder, IconImagePayload};
use crate::image::{IconImage, BMP_HEADER_LEN};
use crate::options::EncodeOptions;
use byteorder::{LittleEndian, WriteBytesExt};
use std::collections::BTreeSet;

//===========================================================================//

/// Encodes an image as a frame, choosing PNG when the larger dimension is at
/// least `png_threshold` and a 32-bpp DIB otherwise.
pub fn encode_payload(
    image: &IconImage,
    png_threshold: u32,
) -> Result<IconImagePayload> {
    if image.width().max(image.height()) >= png_threshold {
        encode_png(image)
    } else {
        encode_dib(image)
    }
}

/// Encodes an image as a PNG frame.
pub fn encode_png(image: &IconImage) -> Result<IconImagePayload> {
    let mut data = Vec::new();
    image.write_png(&mut data)?;
    Ok(IconImagePayload::png(image.width(), image.height(), data))
}

/// Encodes an image as a 32-bpp DIB frame: a BITMAPINFOHEADER whose height
/// counts both the color rows and the mask rows, BGRA rows from the bottom
/// up, then an all-zero AND mask.  Transparency is carried entirely by the
/// alpha channel.
pub fn encode_dib(image: &IconImage) -> Result<IconImagePayload> {
    let width = image.width();
    let height = image.height();
    let row_size = 4 * width as usize;
    let mask_row_size = row_stride(width, 1);
    let image_size = (row_size + mask_row_size) * height as usize;
    let mut data =
        Vec::<u8>::with_capacity(BMP_HEADER_LEN as usize + image_size);

    data.write_u32::<LittleEndian>(BMP_HEADER_LEN)?;
    data.write_i32::<LittleEndian>(width as i32)?;
    data.write_i32::<LittleEndian>(2 * height as i32)?;
    data.write_u16::<LittleEndian>(1)?; // planes
    data.write_u16::<LittleEndian>(32)?; // bits per pixel
    data.write_u32::<LittleEndian>(0)?; // compression
    data.write_u32::<LittleEndian>(image_size as u32)?;
    data.write_i32::<LittleEndian>(0)?; // horz ppm
    data.write_i32::<LittleEndian>(0)?; // vert ppm
    data.write_u32::<LittleEndian>(0)?; // colors used
    data.write_u32::<LittleEndian>(0)?; // colors important
    debug_assert_eq!(data.len(), BMP_HEADER_LEN as usize);

    for row in image.rgba_data().chunks_exact(row_size).rev() {
        for px in row.chunks_exact(4) {
            data.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
        }
    }
    data.resize(data.len() + mask_row_size * height as usize, 0);

    debug_assert_eq!(data.len(), BMP_HEADER_LEN as usize + image_size);
    Ok(IconImagePayload::dib(width, height, data))
}

/// Resamples `source` to each requested size and encodes the frames into a
/// complete ICO file.  Cancellation is checked before every size; nothing is
/// returned unless every frame was encoded.
pub fn encode_ico(
    source: &IconImage,
    options: &EncodeOptions,
    cancel: &CancellationToken,
) -> Result<Vec<u8>> {
    let sizes: BTreeSet<u32> = options.sizes.iter().copied().collect();
    if sizes.is_empty() {
        size_error!("No icon sizes requested");
    }
    let mut builder = IcoBuilder::new();
    for &size in sizes.iter() {
        cancel.check()?;
        let resized = source.resize(size, options.filter)?;
        let payload = encode_payload(&resized, options.png_threshold)?;
        tracing::debug!(
            size,
            png = payload.is_png(),
            bytes = payload.data().len(),
            "encoded icon frame"
        );
        builder.add(payload);
    }
    let output = builder.to_bytes()?;
    tracing::info!(
        sizes = ?sizes,
        bytes = output.len(),
        "created multi-resolution ICO"
    );
    Ok(output)
}

//===========================================================================//


//===========================================================================//
