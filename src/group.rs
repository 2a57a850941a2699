use crate::error::{IconError, Result};
use crate::icondir::{normalize_dimension, HEADER_LEN};
use byteorder::{LittleEndian, ReadBytesExt};

//===========================================================================//

/// Size of one GRPICONDIRENTRY, in bytes.  It mirrors an ICONDIRENTRY except
/// that the trailing 4-byte file offset is replaced by a 2-byte RT_ICON id.
pub const GROUP_ENTRY_LEN: usize = 14;

//===========================================================================//

/// One frame of an RT_GROUP_ICON resource.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GroupIconEntry {
    /// Width byte as stored (0 means 256 or more).
    pub width: u8,
    /// Height byte as stored (0 means 256 or more).
    pub height: u8,
    /// Palette size, or 0 for true-color frames.
    pub color_count: u8,
    /// Reserved byte, kept as found.
    pub reserved: u8,
    /// Color planes.
    pub color_planes: u16,
    /// Bits per pixel.
    pub bit_count: u16,
    /// Declared size of the RT_ICON payload.
    pub bytes_in_res: u32,
    /// Id of the RT_ICON resource holding this frame.
    pub resource_id: u16,
}

impl GroupIconEntry {
    /// Width in pixels with 0 read as 256.
    pub fn normalized_width(&self) -> u32 {
        normalize_dimension(self.width)
    }

    /// Height in pixels with 0 read as 256.
    pub fn normalized_height(&self) -> u32 {
        normalize_dimension(self.height)
    }

    /// Area in pixels with 0 read as 256.
    pub fn normalized_area(&self) -> u32 {
        self.normalized_width() * self.normalized_height()
    }
}

/// The parsed payload of an RT_GROUP_ICON resource, with entries ordered so
/// that the highest-fidelity frame comes first.
#[derive(Clone, Debug)]
pub struct GroupIconDir {
    entries: Vec<GroupIconEntry>,
}

impl GroupIconDir {
    /// Parses a group-icon directory.  The header follows the ICO convention
    /// (reserved 0, type 1, count > 0).
    pub fn parse(data: &[u8]) -> Result<GroupIconDir> {
        let mut reader = data;
        if data.len() < HEADER_LEN {
            format_error!(
                "Group icon too short for header (was {} bytes)",
                data.len()
            );
        }
        let reserved = reader.read_u16::<LittleEndian>()?;
        let restype = reader.read_u16::<LittleEndian>()?;
        if reserved != 0 || restype != 1 {
            format_error!(
                "Invalid group icon header (reserved {}, type {}; \
                 expected 0 and 1)",
                reserved,
                restype
            );
        }
        let count = reader.read_u16::<LittleEndian>()? as usize;
        if count == 0 {
            return Err(IconError::EmptyContainer);
        }
        if reader.len() < count * GROUP_ENTRY_LEN {
            format_error!(
                "Group icon truncated ({} entries need {} bytes, have {})",
                count,
                count * GROUP_ENTRY_LEN,
                reader.len()
            );
        }
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(GroupIconEntry {
                width: reader.read_u8()?,
                height: reader.read_u8()?,
                color_count: reader.read_u8()?,
                reserved: reader.read_u8()?,
                color_planes: reader.read_u16::<LittleEndian>()?,
                bit_count: reader.read_u16::<LittleEndian>()?,
                bytes_in_res: reader.read_u32::<LittleEndian>()?,
                resource_id: reader.read_u16::<LittleEndian>()?,
            });
        }
        entries.sort_by(|a, b| {
            (b.normalized_area(), b.bit_count)
                .cmp(&(a.normalized_area(), a.bit_count))
        });
        Ok(GroupIconDir { entries })
    }

    /// Returns the entries, primary frame first.
    pub fn entries(&self) -> &[GroupIconEntry] {
        &self.entries
    }

    /// Returns the highest-fidelity frame.
    pub fn primary(&self) -> &GroupIconEntry {
        &self.entries[0]
    }
}

//===========================================================================//


//===========================================================================//
