use crate::bmpdepth::{row_stride, BmpDepth};
use crate::error::Result;
use crate::options::ResizeFilter;
use byteorder::{LittleEndian, ReadBytesExt};
use image::{DynamicImage, RgbaImage};
use std::io::{Read, Write};

//===========================================================================//

// The size of a BITMAPINFOHEADER struct, in bytes.
pub(crate) const BMP_HEADER_LEN: u32 = 40;

// Size limits for images in an ICO file:
const MIN_SIZE: u32 = 1;
const MAX_SIZE: u32 = 65535;

//===========================================================================//

/// A decoded image: straight (non-premultiplied) RGBA pixels in row-major
/// order from top to bottom.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IconImage {
    width: u32,
    height: u32,
    rgba_data: Vec<u8>,
}

impl IconImage {
    /// Creates a new image with the given dimensions and RGBA data.  Returns
    /// an error if either dimension is outside 1..=65535 or if `rgba_data`
    /// does not hold exactly `4 * width * height` bytes.
    pub fn from_rgba_data(
        width: u32,
        height: u32,
        rgba_data: Vec<u8>,
    ) -> Result<IconImage> {
        check_dimensions(width, height)?;
        let expected_data_len = (width as u64) * (height as u64) * 4;
        if (rgba_data.len() as u64) != expected_data_len {
            size_error!(
                "Invalid data length (was {}, but must be {} for {}x{} image)",
                rgba_data.len(),
                expected_data_len,
                width,
                height
            );
        }
        Ok(IconImage { width, height, rgba_data })
    }

    /// Converts any image the `image` crate can hold into RGBA form.
    pub fn from_dynamic(image: &DynamicImage) -> Result<IconImage> {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        IconImage::from_rgba_data(width, height, rgba.into_raw())
    }

    /// Converts this image into an `image::DynamicImage`.
    pub fn to_dynamic(&self) -> DynamicImage {
        DynamicImage::ImageRgba8(self.to_rgba_image())
    }

    fn to_rgba_image(&self) -> RgbaImage {
        let mut buffer = RgbaImage::new(self.width, self.height);
        buffer.copy_from_slice(&self.rgba_data);
        buffer
    }

    /// Returns the width of the image, in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the image, in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the RGBA data for this image, in row-major order from top to
    /// bottom.
    pub fn rgba_data(&self) -> &[u8] {
        &self.rgba_data
    }

    /// Resamples the image to exactly `size` x `size` pixels.
    pub fn resize(&self, size: u32, filter: ResizeFilter) -> Result<IconImage> {
        check_dimensions(size, size)?;
        if self.width == size && self.height == size {
            return Ok(self.clone());
        }
        let resized = image::imageops::resize(
            &self.to_rgba_image(),
            size,
            size,
            filter.filter_type(),
        );
        IconImage::from_rgba_data(size, size, resized.into_raw())
    }

    /// Decodes an image from a PNG stream.  Palette, grayscale and 16-bit
    /// images are normalized to 8-bit RGBA.
    pub fn read_png<R: Read>(reader: R) -> Result<IconImage> {
        let mut decoder = png::Decoder::new(reader);
        decoder.set_transformations(png::Transformations::normalize_to_color8());
        let mut png_reader = decoder.read_info()?;
        let mut buffer = vec![0u8; png_reader.output_buffer_size()];
        let frame = png_reader.next_frame(&mut buffer)?;
        buffer.truncate(frame.buffer_size());
        let rgba_data = match frame.color_type {
            png::ColorType::Rgba => buffer,
            png::ColorType::Rgb => buffer
                .chunks_exact(3)
                .flat_map(|px| [px[0], px[1], px[2], u8::MAX])
                .collect(),
            png::ColorType::GrayscaleAlpha => buffer
                .chunks_exact(2)
                .flat_map(|px| [px[0], px[0], px[0], px[1]])
                .collect(),
            png::ColorType::Grayscale => {
                buffer.iter().flat_map(|&v| [v, v, v, u8::MAX]).collect()
            }
            png::ColorType::Indexed => {
                format_error!("PNG palette was not expanded");
            }
        };
        IconImage::from_rgba_data(frame.width, frame.height, rgba_data)
    }

    /// Encodes the image as an 8-bit RGBA PNG stream.
    pub fn write_png<W: Write>(&self, writer: W) -> Result<()> {
        let mut encoder = png::Encoder::new(writer, self.width, self.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&self.rgba_data)?;
        writer.finish()?;
        Ok(())
    }

    /// Reads the pixel size from a BITMAPINFOHEADER, halving the stored
    /// height (which counts both the color rows and the AND-mask rows).
    pub(crate) fn read_dib_size<R: Read>(reader: &mut R) -> Result<(u32, u32)> {
        let header_size = reader.read_u32::<LittleEndian>()?;
        if header_size != BMP_HEADER_LEN {
            format_error!(
                "Invalid BMP header size (was {}, must be {})",
                header_size,
                BMP_HEADER_LEN
            );
        }
        let width = reader.read_i32::<LittleEndian>()?;
        let height = reader.read_i32::<LittleEndian>()?;
        if width < MIN_SIZE as i32 {
            format_error!(
                "Invalid BMP width (was {}, but must be at least {})",
                width,
                MIN_SIZE
            );
        }
        if height % 2 != 0 || height / 2 < MIN_SIZE as i32 {
            format_error!(
                "Invalid height field in BMP header \
                 (was {}, but must be a positive multiple of 2)",
                height
            );
        }
        Ok((width as u32, (height / 2) as u32))
    }

    /// Decodes a DIB icon payload (BITMAPINFOHEADER, optional color table,
    /// bottom-up color rows, then the 1-bpp AND mask).
    pub(crate) fn read_dib(data: &[u8]) -> Result<IconImage> {
        let mut reader = data;
        let (width, height) = IconImage::read_dib_size(&mut reader)?;
        check_dimensions(width, height)?;
        let _planes = reader.read_u16::<LittleEndian>()?;
        let bits_per_pixel = reader.read_u16::<LittleEndian>()?;
        let compression = reader.read_u32::<LittleEndian>()?;
        if compression != 0 {
            format_error!(
                "Unsupported BMP compression (was {}, must be 0)",
                compression
            );
        }
        let _image_size = reader.read_u32::<LittleEndian>()?;
        let _horz_ppm = reader.read_i32::<LittleEndian>()?;
        let _vert_ppm = reader.read_i32::<LittleEndian>()?;
        let colors_used = reader.read_u32::<LittleEndian>()? as usize;
        let _colors_important = reader.read_u32::<LittleEndian>()?;

        let depth = match BmpDepth::from_bits_per_pixel(bits_per_pixel) {
            Some(depth) => depth,
            None => format_error!(
                "Unsupported BMP bits-per-pixel ({})",
                bits_per_pixel
            ),
        };
        let num_colors = match colors_used {
            n if n > 0 && n < depth.palette_len() => n,
            _ => depth.palette_len(),
        };
        let mut color_table = Vec::<[u8; 3]>::with_capacity(num_colors);
        for _ in 0..num_colors {
            let mut quad = [0u8; 4];
            reader.read_exact(&mut quad)?;
            color_table.push([quad[2], quad[1], quad[0]]);
        }

        let w = width as usize;
        let h = height as usize;
        let row_size = depth.row_stride(width);
        let mask_row_size = row_stride(width, 1);
        let color_len = row_size * h;
        if reader.len() < color_len {
            format_error!(
                "Truncated BMP color data (need {} bytes, have {})",
                color_len,
                reader.len()
            );
        }
        let (color_rows, mask_rows) = reader.split_at(color_len);

        let mut rgba = vec![u8::MAX; w * h * 4];
        for (row, src) in color_rows.chunks_exact(row_size).enumerate() {
            let dest_row = h - row - 1;
            for x in 0..w {
                let pixel = sample(depth, src, x, &color_table);
                let start = 4 * (dest_row * w + x);
                rgba[start..start + 4].copy_from_slice(&pixel);
            }
        }

        // Older 32-bpp icons leave the alpha channel zeroed and rely on the
        // AND mask instead.
        let alpha_unused = depth == BmpDepth::ThirtyTwo
            && rgba.chunks_exact(4).all(|px| px[3] == 0);
        if alpha_unused {
            rgba.chunks_exact_mut(4).for_each(|px| px[3] = u8::MAX);
        }
        if depth != BmpDepth::ThirtyTwo || alpha_unused {
            if mask_rows.len() < mask_row_size * h {
                format_error!(
                    "Truncated BMP mask data (need {} bytes, have {})",
                    mask_row_size * h,
                    mask_rows.len()
                );
            }
            for (row, src) in mask_rows.chunks_exact(mask_row_size).take(h).enumerate() {
                let dest_row = h - row - 1;
                for x in 0..w {
                    if (src[x / 8] >> (7 - x % 8)) & 1 == 1 {
                        rgba[4 * (dest_row * w + x) + 3] = 0;
                    }
                }
            }
        }
        IconImage::from_rgba_data(width, height, rgba)
    }
}

//===========================================================================//

fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if !(MIN_SIZE..=MAX_SIZE).contains(&width)
        || !(MIN_SIZE..=MAX_SIZE).contains(&height)
    {
        size_error!(
            "Invalid image size {}x{} (each side must be {} to {})",
            width,
            height,
            MIN_SIZE,
            MAX_SIZE
        );
    }
    Ok(())
}

fn sample(depth: BmpDepth, row: &[u8], x: usize, table: &[[u8; 3]]) -> [u8; 4] {
    match depth {
        _ if depth.is_indexed() => {
            let bits = depth.bits_per_pixel() as usize;
            let bit = x * bits;
            let shift = 8 - bits - bit % 8;
            let index = (row[bit / 8] >> shift) as usize & ((1 << bits) - 1);
            let [r, g, b] = table.get(index).copied().unwrap_or([0, 0, 0]);
            [r, g, b, u8::MAX]
        }
        BmpDepth::Sixteen => {
            let color = u16::from_le_bytes([row[2 * x], row[2 * x + 1]]);
            let scale = |c: u16| ((c & 0x1f) * 255 / 31) as u8;
            [scale(color >> 10), scale(color >> 5), scale(color), u8::MAX]
        }
        BmpDepth::TwentyFour => {
            let px = &row[3 * x..3 * x + 3];
            [px[2], px[1], px[0], u8::MAX]
        }
        _ => {
            let px = &row[4 * x..4 * x + 4];
            [px[2], px[1], px[0], px[3]]
        }
    }
}

//===========================================================================//


//===========================================================================//
