#![allow(dead_code)]

use icoforge::{encode_dib, encode_png, IconImage};

//===========================================================================//

pub const RT_ICON: u16 = 3;
pub const RT_GROUP_ICON: u16 = 14;
pub const RSRC_RVA: u32 = 0x1000;
pub const DATA_RVA: u32 = 0x8000;
const RSRC_FILE_OFFSET: usize = 0x200;
const FILE_ALIGNMENT: usize = 0x200;
const HIGH_BIT: u32 = 0x8000_0000;

#[derive(Clone, Debug, PartialEq)]
pub enum Key {
    Id(u16),
    Name(&'static str),
}

#[derive(Clone, Debug)]
pub struct Res {
    pub restype: u16,
    pub name: Key,
    pub lang: u16,
    pub data: Vec<u8>,
}

pub fn res(restype: u16, name: Key, lang: u16, data: Vec<u8>) -> Res {
    Res { restype, name, lang, data }
}

//===========================================================================//

/// A square, opaque test image whose pixels encode `seed`.
pub fn solid_image(size: u32, seed: u8) -> IconImage {
    let mut rgba = Vec::with_capacity((size * size * 4) as usize);
    for index in 0..(size * size) {
        rgba.extend_from_slice(&[seed, (index % 251) as u8, 0x40, 0xff]);
    }
    IconImage::from_rgba_data(size, size, rgba).unwrap()
}

/// An RT_ICON payload: a 32-bpp DIB, or a PNG from 512 pixels up.
pub fn icon_payload(size: u32, seed: u8) -> Vec<u8> {
    let image = solid_image(size, seed);
    let payload = if size >= 512 {
        encode_png(&image).unwrap()
    } else {
        encode_dib(&image).unwrap()
    };
    payload.data().to_vec()
}

/// An RT_GROUP_ICON payload listing `(size, bit_count, icon_id, bytes)`.
pub fn group_payload(frames: &[(u32, u16, u16, usize)]) -> Vec<u8> {
    let mut data = vec![0, 0, 1, 0];
    data.extend_from_slice(&(frames.len() as u16).to_le_bytes());
    for &(size, bit_count, icon_id, bytes) in frames {
        let byte = if size > 255 { 0 } else { size as u8 };
        data.extend_from_slice(&[byte, byte, 0, 0]);
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&bit_count.to_le_bytes());
        data.extend_from_slice(&(bytes as u32).to_le_bytes());
        data.extend_from_slice(&icon_id.to_le_bytes());
    }
    data
}

//===========================================================================//

/// Builds a minimal PE32 image with a single `.rsrc` section holding
/// `resources`.  An empty list produces an image with no resource directory.
pub fn build_pe(resources: &[Res]) -> Vec<u8> {
    build_image(resources, false)
}

/// Like `build_pe`, but the payloads live in a second `.data` section at
/// `DATA_RVA`, outside the resource table.
pub fn build_pe_with_data_section(resources: &[Res]) -> Vec<u8> {
    build_image(resources, true)
}

fn build_image(resources: &[Res], data_section: bool) -> Vec<u8> {
    let external = if data_section { Some(DATA_RVA) } else { None };
    let (rsrc, data) = build_rsrc(resources, RSRC_RVA, external);
    let mut pe = vec![0u8; RSRC_FILE_OFFSET];
    pe[0..2].copy_from_slice(b"MZ");
    put_u32(&mut pe, 0x3C, 0x40);
    pe[0x40..0x44].copy_from_slice(b"PE\0\0");
    let coff = 0x44;
    put_u16(&mut pe, coff, 0x14C); // i386
    put_u16(&mut pe, coff + 2, if data_section { 2 } else { 1 });
    put_u16(&mut pe, coff + 16, 0xE0); // optional header size
    put_u16(&mut pe, coff + 18, 0x0102);
    let optional = coff + 20;
    put_u16(&mut pe, optional, 0x10B);
    put_u32(&mut pe, optional + 92, 16);
    if !resources.is_empty() {
        put_u32(&mut pe, optional + 112, RSRC_RVA);
        put_u32(&mut pe, optional + 116, rsrc.len() as u32);
    }
    let section = optional + 0xE0;
    pe[section..section + 8].copy_from_slice(b".rsrc\0\0\0");
    put_u32(&mut pe, section + 8, rsrc.len() as u32);
    put_u32(&mut pe, section + 12, RSRC_RVA);
    put_u32(&mut pe, section + 16, rsrc.len() as u32);
    put_u32(&mut pe, section + 20, RSRC_FILE_OFFSET as u32);
    pe.extend_from_slice(&rsrc);
    if data_section {
        let raw_offset = pe.len().div_ceil(FILE_ALIGNMENT) * FILE_ALIGNMENT;
        let section = section + 40;
        pe[section..section + 8].copy_from_slice(b".data\0\0\0");
        put_u32(&mut pe, section + 8, data.len() as u32);
        put_u32(&mut pe, section + 12, DATA_RVA);
        put_u32(&mut pe, section + 16, data.len() as u32);
        put_u32(&mut pe, section + 20, raw_offset as u32);
        pe.resize(raw_offset, 0);
        pe.extend_from_slice(&data);
    }
    pe
}

/// File offset of the resource table inside images from `build_pe`.
pub fn rsrc_offset() -> usize {
    RSRC_FILE_OFFSET
}

// Returns the resource table and, when `external` is set, the payload blob
// that the data entries point into at that RVA.
fn build_rsrc(
    resources: &[Res],
    rva: u32,
    external: Option<u32>,
) -> (Vec<u8>, Vec<u8>) {
    // types -> names -> indices into `resources`, in first-seen order.
    let mut types: Vec<(u16, Vec<(Key, Vec<usize>)>)> = Vec::new();
    for (index, r) in resources.iter().enumerate() {
        let t = match types.iter().position(|(t, _)| *t == r.restype) {
            Some(t) => t,
            None => {
                types.push((r.restype, Vec::new()));
                types.len() - 1
            }
        };
        let names = &mut types[t].1;
        let n = match names.iter().position(|(k, _)| *k == r.name) {
            Some(n) => n,
            None => {
                names.push((r.name.clone(), Vec::new()));
                names.len() - 1
            }
        };
        names[n].1.push(index);
    }
    for (_, names) in types.iter_mut() {
        names.sort_by_key(|(key, _)| matches!(key, Key::Id(_)));
    }

    let mut offset = 16 + 8 * types.len();
    let mut type_offsets = Vec::new();
    for (_, names) in &types {
        type_offsets.push(offset);
        offset += 16 + 8 * names.len();
    }
    let mut name_offsets = Vec::new();
    for (_, names) in &types {
        let mut offsets = Vec::new();
        for (_, langs) in names {
            offsets.push(offset);
            offset += 16 + 8 * langs.len();
        }
        name_offsets.push(offsets);
    }
    let mut entry_offsets = vec![0; resources.len()];
    for (_, names) in &types {
        for (_, langs) in names {
            for &index in langs {
                entry_offsets[index] = offset;
                offset += 16;
            }
        }
    }
    let mut string_offsets = Vec::new();
    for (_, names) in &types {
        let mut offsets = Vec::new();
        for (key, _) in names {
            if let Key::Name(name) = key {
                offsets.push(offset);
                offset += 2 + 2 * name.encode_utf16().count();
            } else {
                offsets.push(0);
            }
        }
        string_offsets.push(offsets);
    }
    let mut data_offsets = vec![0; resources.len()];
    let mut data_end = if external.is_some() { 0 } else { offset };
    for (index, r) in resources.iter().enumerate() {
        data_end = (data_end + 3) & !3;
        data_offsets[index] = data_end;
        data_end += r.data.len();
    }
    let (table_len, data_rva) = match external {
        Some(data_rva) => (offset, data_rva),
        None => (data_end, rva),
    };
    let mut buf = vec![0u8; (table_len + 3) & !3];
    let mut data = vec![0u8; if external.is_some() { data_end } else { 0 }];

    let named = |names: &Vec<(Key, Vec<usize>)>| {
        names.iter().filter(|(k, _)| matches!(k, Key::Name(_))).count()
    };
    put_u16(&mut buf, 14, types.len() as u16);
    for (t, (restype, names)) in types.iter().enumerate() {
        let root_entry = 16 + 8 * t;
        put_u32(&mut buf, root_entry, *restype as u32);
        put_u32(&mut buf, root_entry + 4, HIGH_BIT | type_offsets[t] as u32);

        let type_dir = type_offsets[t];
        put_u16(&mut buf, type_dir + 12, named(names) as u16);
        put_u16(&mut buf, type_dir + 14, (names.len() - named(names)) as u16);
        for (n, (key, langs)) in names.iter().enumerate() {
            let entry = type_dir + 16 + 8 * n;
            let raw_name = match key {
                Key::Id(id) => *id as u32,
                Key::Name(name) => {
                    let at = string_offsets[t][n];
                    let units: Vec<u16> = name.encode_utf16().collect();
                    put_u16(&mut buf, at, units.len() as u16);
                    for (i, unit) in units.iter().enumerate() {
                        put_u16(&mut buf, at + 2 + 2 * i, *unit);
                    }
                    HIGH_BIT | at as u32
                }
            };
            put_u32(&mut buf, entry, raw_name);
            put_u32(&mut buf, entry + 4, HIGH_BIT | name_offsets[t][n] as u32);

            let name_dir = name_offsets[t][n];
            put_u16(&mut buf, name_dir + 14, langs.len() as u16);
            for (l, &index) in langs.iter().enumerate() {
                let lang_entry = name_dir + 16 + 8 * l;
                put_u32(&mut buf, lang_entry, resources[index].lang as u32);
                put_u32(&mut buf, lang_entry + 4, entry_offsets[index] as u32);

                let data_entry = entry_offsets[index];
                put_u32(&mut buf, data_entry, data_rva + data_offsets[index] as u32);
                put_u32(&mut buf, data_entry + 4, resources[index].data.len() as u32);
                let start = data_offsets[index];
                let payload = &resources[index].data;
                let target = if external.is_some() { &mut data } else { &mut buf };
                target[start..start + payload.len()].copy_from_slice(payload);
            }
        }
    }
    (buf, data)
}

pub fn put_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

pub fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

//===========================================================================//
