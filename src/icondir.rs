use crate::error::{IconError, Result};
use crate::image::IconImage;
use crate::sniff::{is_png, refine_png_dimensions};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Write;

//===========================================================================//

/// Size of the ICONDIR header, in bytes.
pub const HEADER_LEN: usize = 6;

/// Size of one ICONDIRENTRY, in bytes.
pub const ENTRY_LEN: usize = 16;

// The only resource type this crate reads or writes (1 = icon).
const ICON_TYPE: u16 = 1;

//===========================================================================//

/// Maps a one-byte directory dimension to pixels, treating 0 as 256.
pub fn normalize_dimension(byte: u8) -> u32 {
    if byte == 0 {
        256
    } else {
        byte as u32
    }
}

/// Maps a pixel dimension to its one-byte directory form.  A byte of zero
/// indicates a size of 256 or more.
pub fn dimension_byte(size: u32) -> u8 {
    if size > 255 {
        0
    } else {
        size as u8
    }
}

//===========================================================================//

/// The directory of an ICO file: its entries, without payload data.  Payloads
/// stay in the caller's buffer and are sliced out on demand.
#[derive(Clone, Debug)]
pub struct IconDir {
    entries: Vec<IconDirEntry>,
}

impl IconDir {
    /// Parses the header and directory entries of an ICO file held in `data`,
    /// then refines the size of any PNG-encoded entry from its IHDR chunk.
    pub fn read(data: &[u8]) -> Result<IconDir> {
        if data.len() < HEADER_LEN {
            format_error!(
                "ICO data too short for header (was {} bytes, need {})",
                data.len(),
                HEADER_LEN
            );
        }
        let mut reader = data;
        let reserved = reader.read_u16::<LittleEndian>()?;
        if reserved != 0 {
            format_error!(
                "Invalid reserved field value in ICONDIR \
                 (was {}, but must be 0)",
                reserved
            );
        }
        let restype = reader.read_u16::<LittleEndian>()?;
        if restype != ICON_TYPE {
            format_error!(
                "Invalid resource type in ICONDIR (was {}, but must be {})",
                restype,
                ICON_TYPE
            );
        }
        let num_entries = reader.read_u16::<LittleEndian>()? as usize;
        if num_entries == 0 {
            return Err(IconError::EmptyContainer);
        }
        let directory_len = HEADER_LEN + ENTRY_LEN * num_entries;
        if data.len() < directory_len {
            format_error!(
                "ICO directory truncated ({} entries need {} bytes, have {})",
                num_entries,
                directory_len,
                data.len()
            );
        }
        let mut entries = Vec::with_capacity(num_entries);
        for _ in 0..num_entries {
            let width = normalize_dimension(reader.read_u8()?);
            let height = normalize_dimension(reader.read_u8()?);
            let color_count = reader.read_u8()?;
            let _reserved = reader.read_u8()?;
            let color_planes = reader.read_u16::<LittleEndian>()?;
            let bit_count = reader.read_u16::<LittleEndian>()?;
            let payload_size = reader.read_u32::<LittleEndian>()?;
            let payload_offset = reader.read_u32::<LittleEndian>()?;
            entries.push(IconDirEntry {
                width,
                height,
                color_count,
                color_planes,
                bit_count,
                payload_size,
                payload_offset,
                png: false,
            });
        }
        refine_png_dimensions(data, &mut entries);
        tracing::trace!(entries = entries.len(), "read ICO directory");
        Ok(IconDir { entries })
    }

    /// Returns the entries in directory order.
    pub fn entries(&self) -> &[IconDirEntry] {
        &self.entries
    }

    /// Returns the entry with exactly the given size.
    pub fn find(&self, width: u32, height: u32) -> Result<&IconDirEntry> {
        self.entries
            .iter()
            .find(|e| e.width == width && e.height == height)
            .ok_or(IconError::MissingResolution { width, height })
    }

    /// Returns the entry with the largest area, preferring higher bit counts
    /// among entries of equal area.
    pub fn largest(&self) -> &IconDirEntry {
        // `read` refuses empty directories, so there is always an entry.
        let mut best = &self.entries[0];
        for entry in &self.entries[1..] {
            if (entry.area(), entry.bit_count) > (best.area(), best.bit_count) {
                best = entry;
            }
        }
        best
    }
}

//===========================================================================//

/// One ICONDIRENTRY as read from an ICO file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IconDirEntry {
    width: u32,
    height: u32,
    color_count: u8,
    color_planes: u16,
    bit_count: u16,
    payload_size: u32,
    payload_offset: u32,
    png: bool,
}

impl IconDirEntry {
    /// Returns the width of the image, in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the image, in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the declared palette size (0 for true-color images).
    pub fn color_count(&self) -> u8 {
        self.color_count
    }

    /// Returns the color-plane field from the directory.
    pub fn color_planes(&self) -> u16 {
        self.color_planes
    }

    /// Returns the bits-per-pixel field from the directory.
    pub fn bit_count(&self) -> u16 {
        self.bit_count
    }

    /// Returns the declared payload size, in bytes.
    pub fn payload_size(&self) -> u32 {
        self.payload_size
    }

    /// Returns the payload offset from the start of the file.
    pub fn payload_offset(&self) -> u32 {
        self.payload_offset
    }

    /// Returns true if the payload carries a PNG signature.
    pub fn is_png(&self) -> bool {
        self.png
    }

    fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub(crate) fn set_dimensions(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub(crate) fn set_png(&mut self, png: bool) {
        self.png = png;
    }

    /// Slices this entry's payload out of the ICO file held in `data`.
    pub fn payload<'a>(&self, data: &'a [u8]) -> Result<&'a [u8]> {
        let start = self.payload_offset as u64;
        let end = start + self.payload_size as u64;
        if end > data.len() as u64 {
            size_error!(
                "Payload of {} bytes at offset {} exceeds {}-byte buffer",
                self.payload_size,
                self.payload_offset,
                data.len()
            );
        }
        Ok(&data[start as usize..end as usize])
    }

    /// Decodes this entry's payload into an image.  Returns an error if the
    /// payload is malformed or its size disagrees with the directory.
    pub fn decode(&self, data: &[u8]) -> Result<IconImage> {
        let payload = self.payload(data)?;
        let image = if is_png(payload) {
            IconImage::read_png(payload)?
        } else {
            IconImage::read_dib(payload)?
        };
        if image.width() != self.width || image.height() != self.height {
            format_error!(
                "Encoded image has wrong dimensions \
                 (was {}x{}, but should be {}x{})",
                image.width(),
                image.height(),
                self.width,
                self.height
            );
        }
        Ok(image)
    }
}

//===========================================================================//

/// An encoded frame ready to be written into an ICO file, together with the
/// directory fields describing it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IconImagePayload {
    width: u32,
    height: u32,
    color_count: u8,
    color_planes: u16,
    bit_count: u16,
    data: Vec<u8>,
}

impl IconImagePayload {
    /// A PNG frame.  Directory planes and bit count are written as 0.
    pub fn png(width: u32, height: u32, data: Vec<u8>) -> IconImagePayload {
        IconImagePayload::with_fields(width, height, 0, 0, 0, data)
    }

    /// A 32-bpp DIB frame.  Directory planes/bit count are written as 1/32.
    pub fn dib(width: u32, height: u32, data: Vec<u8>) -> IconImagePayload {
        IconImagePayload::with_fields(width, height, 0, 1, 32, data)
    }

    /// A frame whose directory fields are copied verbatim from elsewhere,
    /// such as a group-icon resource entry.
    pub fn with_fields(
        width: u32,
        height: u32,
        color_count: u8,
        color_planes: u16,
        bit_count: u16,
        data: Vec<u8>,
    ) -> IconImagePayload {
        IconImagePayload {
            width,
            height,
            color_count,
            color_planes,
            bit_count,
            data,
        }
    }

    /// Returns the width of the image, in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the image, in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the directory color-plane field.
    pub fn color_planes(&self) -> u16 {
        self.color_planes
    }

    /// Returns the directory bit-count field.
    pub fn bit_count(&self) -> u16 {
        self.bit_count
    }

    /// Returns true if the payload bytes are a PNG stream.
    pub fn is_png(&self) -> bool {
        is_png(&self.data)
    }

    /// Returns the encoded payload bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

//===========================================================================//

/// Assembles payloads into a complete ICO file.
#[derive(Clone, Debug, Default)]
pub struct IcoBuilder {
    payloads: Vec<IconImagePayload>,
}

impl IcoBuilder {
    /// Creates a builder with no frames.
    pub fn new() -> IcoBuilder {
        IcoBuilder::default()
    }

    /// Adds a frame.  Frames are written in ascending width order regardless
    /// of insertion order.
    pub fn add(&mut self, payload: IconImagePayload) {
        self.payloads.push(payload);
    }

    /// Returns the frames added so far.
    pub fn payloads(&self) -> &[IconImagePayload] {
        &self.payloads
    }

    /// Writes the ICO file.  Offsets start at `6 + 16 * N` and run
    /// contiguously through the payloads in the same order as the entries.
    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        if self.payloads.is_empty() {
            return Err(IconError::EmptyContainer);
        }
        if self.payloads.len() > u16::MAX as usize {
            size_error!(
                "Too many entries in icon (was {}, but max is {})",
                self.payloads.len(),
                u16::MAX
            );
        }
        let mut ordered: Vec<&IconImagePayload> = self.payloads.iter().collect();
        ordered.sort_by_key(|p| (p.width, p.height));

        writer.write_u16::<LittleEndian>(0)?; // reserved
        writer.write_u16::<LittleEndian>(ICON_TYPE)?;
        writer.write_u16::<LittleEndian>(ordered.len() as u16)?;
        let mut data_offset = (HEADER_LEN + ENTRY_LEN * ordered.len()) as u32;
        for payload in ordered.iter() {
            let data_size = match u32::try_from(payload.data.len()) {
                Ok(size) => size,
                Err(_) => size_error!(
                    "Payload of {} bytes does not fit a 32-bit size field",
                    payload.data.len()
                ),
            };
            writer.write_u8(dimension_byte(payload.width))?;
            writer.write_u8(dimension_byte(payload.height))?;
            writer.write_u8(payload.color_count)?;
            writer.write_u8(0)?; // reserved
            writer.write_u16::<LittleEndian>(payload.color_planes)?;
            writer.write_u16::<LittleEndian>(payload.bit_count)?;
            writer.write_u32::<LittleEndian>(data_size)?;
            writer.write_u32::<LittleEndian>(data_offset)?;
            data_offset = match data_offset.checked_add(data_size) {
                Some(offset) => offset,
                None => size_error!("ICO file would exceed 4 GiB"),
            };
        }
        for payload in ordered.iter() {
            writer.write_all(&payload.data)?;
        }
        Ok(())
    }

    /// Writes the ICO file into a new buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let total: usize = HEADER_LEN
            + self.payloads.iter().map(|p| ENTRY_LEN + p.data.len()).sum::<usize>();
        let mut output = Vec::with_capacity(total);
        self.write(&mut output)?;
        Ok(output)
    }
}

//===========================================================================//


//===========================================================================//
