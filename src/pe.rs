//! Minimal portable-executable header parsing: just enough to find the
//! resource directory and translate RVAs to file offsets.

use crate::error::Result;
use byteorder::{LittleEndian, ReadBytesExt};

//===========================================================================//

const DOS_MAGIC: &[u8; 2] = b"MZ";
const PE_SIGNATURE: &[u8; 4] = b"PE\0\0";
const E_LFANEW_OFFSET: usize = 0x3C;
const COFF_HEADER_LEN: usize = 20;
const SECTION_HEADER_LEN: usize = 40;
const PE32_MAGIC: u16 = 0x10B;
const PE32_PLUS_MAGIC: u16 = 0x20B;
const RESOURCE_DIRECTORY_INDEX: u32 = 2;

//===========================================================================//

/// One entry of the section table.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SectionHeader {
    /// Section name, NUL-padded.
    pub name: [u8; 8],
    /// Size of the section once loaded.
    pub virtual_size: u32,
    /// RVA of the first byte of the section.
    pub virtual_address: u32,
    /// Size of the section's data in the file.
    pub size_of_raw_data: u32,
    /// File offset of the section's data.
    pub pointer_to_raw_data: u32,
}

impl SectionHeader {
    fn contains(&self, rva: u32) -> bool {
        let extent = self.virtual_size.max(self.size_of_raw_data);
        rva >= self.virtual_address
            && (rva as u64) < self.virtual_address as u64 + extent as u64
    }
}

/// The headers of a PE image held in a caller-owned buffer.
#[derive(Clone, Debug)]
pub struct PeImage<'a> {
    data: &'a [u8],
    sections: Vec<SectionHeader>,
    resource_directory: Option<(u32, u32)>,
}

impl<'a> PeImage<'a> {
    /// Parses the DOS stub, COFF header, optional header and section table.
    pub fn parse(data: &'a [u8]) -> Result<PeImage<'a>> {
        if !data.starts_with(DOS_MAGIC) {
            format_error!("Missing MZ signature; not a PE image");
        }
        let e_lfanew = read_u32_at(data, E_LFANEW_OFFSET)? as usize;
        match data.get(e_lfanew..e_lfanew.saturating_add(4)) {
            Some(sig) if sig == PE_SIGNATURE => {}
            _ => format_error!(
                "Missing PE signature at offset {:#x}",
                e_lfanew
            ),
        }
        let coff = e_lfanew + 4;
        let num_sections = read_u16_at(data, coff + 2)? as usize;
        let optional_len = read_u16_at(data, coff + 16)? as usize;
        let optional = coff + COFF_HEADER_LEN;

        let resource_directory = if optional_len == 0 {
            None
        } else {
            let magic = read_u16_at(data, optional)?;
            let (count_offset, directories_offset) = match magic {
                PE32_MAGIC => (92, 96),
                PE32_PLUS_MAGIC => (108, 112),
                _ => format_error!(
                    "Unknown optional header magic ({:#x})",
                    magic
                ),
            };
            let num_directories = read_u32_at(data, optional + count_offset)?;
            let entry = directories_offset + 8 * RESOURCE_DIRECTORY_INDEX as usize;
            if num_directories <= RESOURCE_DIRECTORY_INDEX
                || entry + 8 > optional_len
            {
                None
            } else {
                let rva = read_u32_at(data, optional + entry)?;
                let size = read_u32_at(data, optional + entry + 4)?;
                if rva == 0 || size == 0 {
                    None
                } else {
                    Some((rva, size))
                }
            }
        };

        let table = optional + optional_len;
        let mut sections = Vec::with_capacity(num_sections);
        for index in 0..num_sections {
            let start = table + index * SECTION_HEADER_LEN;
            let raw = match data.get(start..start + SECTION_HEADER_LEN) {
                Some(raw) => raw,
                None => format_error!(
                    "Section table truncated at section {} of {}",
                    index,
                    num_sections
                ),
            };
            let mut name = [0u8; 8];
            name.copy_from_slice(&raw[..8]);
            let mut fields = &raw[8..24];
            sections.push(SectionHeader {
                name,
                virtual_size: fields.read_u32::<LittleEndian>()?,
                virtual_address: fields.read_u32::<LittleEndian>()?,
                size_of_raw_data: fields.read_u32::<LittleEndian>()?,
                pointer_to_raw_data: fields.read_u32::<LittleEndian>()?,
            });
        }
        tracing::trace!(
            sections = sections.len(),
            has_resources = resource_directory.is_some(),
            "parsed PE headers"
        );
        Ok(PeImage { data, sections, resource_directory })
    }

    /// Returns the whole image buffer.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the section table.
    pub fn sections(&self) -> &[SectionHeader] {
        &self.sections
    }

    /// Returns the RVA and size of the resource directory, if the image has
    /// one.
    pub fn resource_directory(&self) -> Option<(u32, u32)> {
        self.resource_directory
    }

    /// Translates an RVA to a file offset through the section that contains
    /// it.
    pub fn rva_to_offset(&self, rva: u32) -> Option<u64> {
        self.sections.iter().find(|s| s.contains(rva)).map(|s| {
            s.pointer_to_raw_data as u64 + (rva - s.virtual_address) as u64
        })
    }
}

fn read_u16_at(data: &[u8], offset: usize) -> Result<u16> {
    match data.get(offset..offset.saturating_add(2)) {
        Some(mut bytes) => Ok(bytes.read_u16::<LittleEndian>()?),
        None => format_error!("PE headers truncated at offset {:#x}", offset),
    }
}

fn read_u32_at(data: &[u8], offset: usize) -> Result<u32> {
    match data.get(offset..offset.saturating_add(4)) {
        Some(mut bytes) => Ok(bytes.read_u32::<LittleEndian>()?),
        None => format_error!("PE headers truncated at offset {:#x}", offset),
    }
}

//===========================================================================//


//===========================================================================//
