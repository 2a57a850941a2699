//! Walking the PE resource directory tree.
//!
//! The tree has exactly three levels, type then name then language.  Every
//! node is a 16-byte `IMAGE_RESOURCE_DIRECTORY` header followed by 8-byte
//! entries (named entries first, then id entries); the high bit of an entry's
//! offset marks a subdirectory.  At the language level each entry points at a
//! 16-byte `IMAGE_RESOURCE_DATA_ENTRY` giving the RVA and size of the payload.
//! All offsets inside the tree are relative to the start of the resource
//! table, and every read is checked against the table's bounds.

use crate::error::{IconError, Result};
use crate::pe::PeImage;
use crate::restype::ResourceType;
use std::collections::HashSet;
use std::fmt;

//===========================================================================//

const DIRECTORY_HEADER_LEN: usize = 16;
const DIRECTORY_ENTRY_LEN: usize = 8;
const DATA_ENTRY_LEN: usize = 16;
const HIGH_BIT: u32 = 0x8000_0000;

//===========================================================================//

/// A resource type, name or language key: either a number or a string.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum ResourceId {
    /// Numeric identifier.
    Id(u16),
    /// String name.
    Name(String),
}

impl ResourceId {
    /// Returns the numeric identifier, or `None` for named resources.
    pub fn as_id(&self) -> Option<u16> {
        match *self {
            ResourceId::Id(id) => Some(id),
            ResourceId::Name(_) => None,
        }
    }

    /// Returns true if this is the numeric code of `restype`.
    pub fn is_type(&self, restype: ResourceType) -> bool {
        self.as_id() == Some(restype.number())
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Id(id) => write!(f, "#{}", id),
            ResourceId::Name(name) => f.write_str(name),
        }
    }
}

//===========================================================================//

/// One leaf of the resource tree with its payload copied out.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResourceRecord {
    /// Level-one key.
    pub resource_type: ResourceId,
    /// Level-two key.
    pub name: ResourceId,
    /// Level-three key (a Windows LANGID; 0 is language-neutral).
    pub language: u16,
    /// Payload bytes.
    pub data: Vec<u8>,
}

/// Every resource found in one PE image, in traversal order.
#[derive(Clone, Debug, Default)]
pub struct ResourceTable {
    records: Vec<ResourceRecord>,
}

impl ResourceTable {
    /// Walks the resource directory of the PE image in `data`, copying out
    /// every resource.  An image without a resource directory yields an empty
    /// table.
    pub fn parse(data: &[u8]) -> Result<ResourceTable> {
        ResourceTable::parse_with(data, |_| true)
    }

    /// Like `parse`, but only keeps the icon and group-icon resources.
    pub fn parse_icons(data: &[u8]) -> Result<ResourceTable> {
        ResourceTable::parse_with(data, |restype| {
            restype.is_type(ResourceType::Icon)
                || restype.is_type(ResourceType::GroupIcon)
        })
    }

    /// Walks the resource directory, descending only into resource types for
    /// which `wanted` returns true.
    pub fn parse_with<F>(data: &[u8], wanted: F) -> Result<ResourceTable>
    where
        F: Fn(&ResourceId) -> bool,
    {
        let image = PeImage::parse(data)?;
        let (rva, size) = match image.resource_directory() {
            Some(directory) => directory,
            None => {
                tracing::debug!("image has no resource directory");
                return Ok(ResourceTable::default());
            }
        };
        let mut walker = Walker::new(&image, rva, size)?;
        let mut records = Vec::new();
        walker.walk(Level::Type, 0, &mut Path::default(), &wanted, &mut records)?;
        tracing::debug!(records = records.len(), "walked resource directory");
        Ok(ResourceTable { records })
    }

    /// Returns every record in traversal order.
    pub fn records(&self) -> &[ResourceRecord] {
        &self.records
    }

    /// Returns the records of one standard resource type.
    pub fn of_type(
        &self,
        restype: ResourceType,
    ) -> impl Iterator<Item = &ResourceRecord> {
        self.records.iter().filter(move |r| r.resource_type.is_type(restype))
    }

    /// Returns the record with the given type, name and language.
    pub fn find(
        &self,
        restype: ResourceType,
        name: &ResourceId,
        language: u16,
    ) -> Option<&ResourceRecord> {
        self.of_type(restype)
            .find(|r| &r.name == name && r.language == language)
    }

    /// Returns true if the table holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

//===========================================================================//

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Level {
    Type,
    Name,
    Language,
}

#[derive(Default)]
struct Path {
    resource_type: Option<ResourceId>,
    name: Option<ResourceId>,
}

struct DirectoryEntry {
    raw_name: u32,
    raw_offset: u32,
}

impl DirectoryEntry {
    fn is_directory(&self) -> bool {
        self.raw_offset & HIGH_BIT != 0
    }

    fn offset(&self) -> u32 {
        self.raw_offset & !HIGH_BIT
    }
}

struct Walker<'i, 'a> {
    image: &'i PeImage<'a>,
    table: &'a [u8],
    rva: u32,
    // Directory and data-entry offsets already reached.  Each node of a
    // well-formed tree has exactly one parent.
    visited: HashSet<u32>,
    // Payload bytes copied so far.  Payloads of a well-formed image never
    // overlap, so together they fit in the file.
    copied: u64,
}

impl<'i, 'a> Walker<'i, 'a> {
    fn new(image: &'i PeImage<'a>, rva: u32, size: u32) -> Result<Walker<'i, 'a>> {
        let data = image.data();
        let bound = data.len() as u64;
        let start = match image.rva_to_offset(rva) {
            Some(start) => start,
            None => {
                tracing::debug!(rva, "resource directory RVA is not inside any section");
                return Err(IconError::CorruptResourceTable {
                    offset: rva as u64,
                    len: size as u64,
                    bound,
                });
            }
        };
        if start >= bound {
            return Err(IconError::CorruptResourceTable {
                offset: start,
                len: size as u64,
                bound,
            });
        }
        let end = (start + size as u64).min(bound);
        if end < start + size as u64 {
            tracing::warn!(
                declared = size,
                available = end - start,
                "resource directory extends past end of file"
            );
        }
        Ok(Walker {
            image,
            table: &data[start as usize..end as usize],
            rva,
            visited: HashSet::new(),
            copied: 0,
        })
    }

    fn corrupt(&self, offset: u64, len: usize) -> IconError {
        IconError::CorruptResourceTable {
            offset,
            len: len as u64,
            bound: self.table.len() as u64,
        }
    }

    fn slice(&self, offset: u32, len: usize) -> Result<&'a [u8]> {
        let start = offset as usize;
        match start.checked_add(len).and_then(|end| self.table.get(start..end)) {
            Some(bytes) => Ok(bytes),
            None => Err(self.corrupt(offset as u64, len)),
        }
    }

    fn u16_at(&self, offset: u32) -> Result<u16> {
        let bytes = self.slice(offset, 2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn u32_at(&self, offset: u32) -> Result<u32> {
        let bytes = self.slice(offset, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn directory(&self, offset: u32) -> Result<Vec<DirectoryEntry>> {
        let header = self.slice(offset, DIRECTORY_HEADER_LEN)?;
        let named = u16::from_le_bytes([header[12], header[13]]) as usize;
        let ids = u16::from_le_bytes([header[14], header[15]]) as usize;
        let count = named + ids;
        let first = offset as usize + DIRECTORY_HEADER_LEN;
        let entries = match first
            .checked_add(count * DIRECTORY_ENTRY_LEN)
            .and_then(|end| self.table.get(first..end))
        {
            Some(entries) => entries,
            None => {
                return Err(self.corrupt(first as u64, count * DIRECTORY_ENTRY_LEN))
            }
        };
        Ok(entries
            .chunks_exact(DIRECTORY_ENTRY_LEN)
            .map(|raw| DirectoryEntry {
                raw_name: u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
                raw_offset: u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]),
            })
            .collect())
    }

    fn resource_id(&self, raw_name: u32) -> Result<ResourceId> {
        if raw_name & HIGH_BIT == 0 {
            return Ok(ResourceId::Id(raw_name as u16));
        }
        // A length-prefixed, unterminated UTF-16LE string.
        let offset = raw_name & !HIGH_BIT;
        let len = self.u16_at(offset)? as usize;
        let bytes = self.slice(offset + 2, len * 2)?;
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Ok(ResourceId::Name(String::from_utf16_lossy(&units)))
    }

    fn visit(&mut self, offset: u32, len: usize) -> Result<()> {
        if !self.visited.insert(offset) {
            tracing::warn!(offset, "resource tree node reached twice");
            return Err(self.corrupt(offset as u64, len));
        }
        Ok(())
    }

    fn walk<F>(
        &mut self,
        level: Level,
        offset: u32,
        path: &mut Path,
        wanted: &F,
        out: &mut Vec<ResourceRecord>,
    ) -> Result<()>
    where
        F: Fn(&ResourceId) -> bool,
    {
        self.visit(offset, DIRECTORY_HEADER_LEN)?;
        for entry in self.directory(offset)? {
            let key = self.resource_id(entry.raw_name)?;
            match level {
                Level::Type | Level::Name if !entry.is_directory() => {
                    tracing::debug!(?level, %key, "skipping leaf above language level");
                }
                Level::Type => {
                    if !wanted(&key) {
                        continue;
                    }
                    path.resource_type = Some(key);
                    self.walk(Level::Name, entry.offset(), path, wanted, out)?;
                }
                Level::Name => {
                    path.name = Some(key);
                    self.walk(Level::Language, entry.offset(), path, wanted, out)?;
                }
                Level::Language => {
                    if entry.is_directory() {
                        return Err(self.corrupt(entry.offset() as u64, DATA_ENTRY_LEN));
                    }
                    self.visit(entry.offset(), DATA_ENTRY_LEN)?;
                    let data = self.read_data_entry(entry.offset())?;
                    let language = match key {
                        ResourceId::Id(language) => language,
                        ResourceId::Name(_) => (entry.raw_name & 0xFFFF) as u16,
                    };
                    let (resource_type, name) = match (&path.resource_type, &path.name) {
                        (Some(t), Some(n)) => (t.clone(), n.clone()),
                        _ => return Err(self.corrupt(offset as u64, DIRECTORY_HEADER_LEN)),
                    };
                    tracing::trace!(%resource_type, %name, language, bytes = data.len(), "resource");
                    out.push(ResourceRecord { resource_type, name, language, data });
                }
            }
        }
        Ok(())
    }

    fn read_data_entry(&mut self, offset: u32) -> Result<Vec<u8>> {
        self.slice(offset, DATA_ENTRY_LEN)?;
        let data_rva = self.u32_at(offset)?;
        let size = self.u32_at(offset + 4)?;
        let file_len = self.image.data().len() as u64;
        if self.copied + size as u64 > file_len {
            tracing::warn!(
                copied = self.copied,
                size,
                file_len,
                "resource payloads exceed file size"
            );
            return Err(IconError::CorruptResourceTable {
                offset: data_rva as u64,
                len: size as u64,
                bound: file_len,
            });
        }
        self.copied += size as u64;
        // Payloads normally live inside the resource table itself.
        if let Some(relative) = data_rva.checked_sub(self.rva) {
            if (relative as usize) < self.table.len() {
                return Ok(self.slice(relative, size as usize)?.to_vec());
            }
        }
        let data = self.image.data();
        let bound = data.len() as u64;
        let outside = IconError::CorruptResourceTable {
            offset: data_rva as u64,
            len: size as u64,
            bound,
        };
        let start = self.image.rva_to_offset(data_rva).ok_or(outside)?;
        let end = start + size as u64;
        if end > bound {
            return Err(IconError::CorruptResourceTable {
                offset: start,
                len: size as u64,
                bound,
            });
        }
        Ok(data[start as usize..end as usize].to_vec())
    }
}

//===========================================================================//


//===========================================================================//
