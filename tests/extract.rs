mod common;

use common::{
    build_pe, build_pe_with_data_section, group_payload, icon_payload, put_u32,
    res, rsrc_offset, solid_image, Key, RSRC_RVA, RT_GROUP_ICON, RT_ICON,
};
use icoforge::{
    extract_icons, CancellationToken, CandidateAssembler, IconDir, IconError,
    IconFrameInfo, ResourceId, ResourceTable, ResourceType,
};

//===========================================================================//

const EN_US: u16 = 0x0409;
const DE_DE: u16 = 0x0407;
const JA_JP: u16 = 0x0411;

fn icon(id: u16, lang: u16, size: u32, seed: u8) -> common::Res {
    res(RT_ICON, Key::Id(id), lang, icon_payload(size, seed))
}

fn group(name: Key, lang: u16, frames: &[(u32, u16)]) -> common::Res {
    let entries: Vec<(u32, u16, u16, usize)> = frames
        .iter()
        .map(|&(size, icon_id)| {
            let bit_count = if size >= 512 { 0 } else { 32 };
            (size, bit_count, icon_id, icon_payload(size, 0).len())
        })
        .collect();
    res(RT_GROUP_ICON, name, lang, group_payload(&entries))
}

fn extract(pe: &[u8]) -> Vec<icoforge::ExecutableIconCandidate> {
    extract_icons(pe, &CancellationToken::new()).unwrap()
}

//===========================================================================//

#[test]
fn table_lists_every_resource() {
    let pe = build_pe(&[
        icon(1, EN_US, 16, 1),
        res(24, Key::Id(1), EN_US, b"<assembly/>".to_vec()),
        group(Key::Id(100), EN_US, &[(16, 1)]),
    ]);
    let table = ResourceTable::parse(&pe).unwrap();
    assert_eq!(table.records().len(), 3);
    let manifest = table
        .find(ResourceType::Manifest, &ResourceId::Id(1), EN_US)
        .unwrap();
    assert_eq!(manifest.data, b"<assembly/>");

    let icons_only = ResourceTable::parse_icons(&pe).unwrap();
    assert_eq!(icons_only.records().len(), 2);
    assert_eq!(icons_only.of_type(ResourceType::Icon).count(), 1);
    assert_eq!(icons_only.of_type(ResourceType::GroupIcon).count(), 1);
}

#[test]
fn single_group_is_rebuilt_as_ico() {
    let pe = build_pe(&[
        icon(1, EN_US, 16, 1),
        icon(2, EN_US, 32, 2),
        group(Key::Id(100), EN_US, &[(16, 1), (32, 2)]),
    ]);
    let candidates = extract(&pe);
    assert_eq!(candidates.len(), 1);
    let candidate = &candidates[0];
    assert_eq!(candidate.name(), "#100");
    assert_eq!(candidate.group_id(), &ResourceId::Id(100));
    assert_eq!(candidate.language(), EN_US);
    assert_eq!(
        candidate.frames(),
        &[
            IconFrameInfo { width: 32, height: 32, bit_count: 32 },
            IconFrameInfo { width: 16, height: 16, bit_count: 32 },
        ]
    );
    assert_eq!(candidate.score(), 32 * 32 * 1000 + 32);

    let ico = candidate.ico_data();
    let icondir = IconDir::read(ico).unwrap();
    assert_eq!(icondir.entries().len(), 2);
    let entry = icondir.find(32, 32).unwrap();
    assert_eq!(entry.decode(ico).unwrap(), solid_image(32, 2));
    let entry = icondir.find(16, 16).unwrap();
    assert_eq!(entry.payload(ico).unwrap(), &icon_payload(16, 1)[..]);
}

#[test]
fn neutral_language_fallback() {
    // The group is localized but its frames are language-neutral.
    let pe = build_pe(&[
        icon(1, 0, 16, 1),
        icon(2, 0, 32, 2),
        group(Key::Id(1), EN_US, &[(16, 1), (32, 2)]),
    ]);
    let candidates = extract(&pe);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].frames().len(), 2);
}

#[test]
fn exact_language_preferred_over_neutral() {
    let pe = build_pe(&[
        icon(1, 0, 16, 10),
        icon(1, EN_US, 16, 20),
        group(Key::Id(1), EN_US, &[(16, 1)]),
        group(Key::Id(2), DE_DE, &[(16, 1)]),
    ]);
    let table = ResourceTable::parse_icons(&pe).unwrap();
    let mut assembler = CandidateAssembler::new(&table);
    assert_eq!(assembler.resolve(1, EN_US), Some(&icon_payload(16, 20)[..]));
    assert_eq!(assembler.resolve(1, DE_DE), Some(&icon_payload(16, 10)[..]));
    assert_eq!(assembler.resolve(7, EN_US), None);

    let candidates = assembler.assemble(&CancellationToken::new()).unwrap();
    assert_eq!(candidates.len(), 2);
    for candidate in &candidates {
        let ico = candidate.ico_data();
        let image = IconDir::read(ico).unwrap().entries()[0].decode(ico).unwrap();
        let expected = if candidate.language() == EN_US { 20 } else { 10 };
        assert_eq!(image, solid_image(16, expected));
    }
}

#[test]
fn any_language_fallback() {
    let pe = build_pe(&[
        icon(5, JA_JP, 48, 3),
        group(Key::Id(1), EN_US, &[(48, 5)]),
    ]);
    let candidates = extract(&pe);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].frames()[0].width, 48);
}

#[test]
fn unresolved_group_is_dropped() {
    let pe = build_pe(&[
        icon(1, EN_US, 16, 1),
        group(Key::Id(1), EN_US, &[(16, 1)]),
        group(Key::Id(2), EN_US, &[(16, 1), (32, 99)]),
    ]);
    let table = ResourceTable::parse_icons(&pe).unwrap();
    let mut assembler = CandidateAssembler::new(&table);
    let groups = assembler.groups();
    assert_eq!(groups.len(), 2);
    match assembler.assemble_group(&groups[1]) {
        Err(IconError::UnresolvedFrame { group, icon_id }) => {
            assert_eq!(group, "#2");
            assert_eq!(icon_id, 99);
        }
        other => panic!("unexpected result: {:?}", other),
    }

    let candidates = extract(&pe);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].group_id(), &ResourceId::Id(1));
}

#[test]
fn named_group() {
    let pe = build_pe(&[
        icon(1, EN_US, 32, 1),
        group(Key::Name("MAINICON"), EN_US, &[(32, 1)]),
        group(Key::Id(7), EN_US, &[(32, 1)]),
    ]);
    let candidates = extract(&pe);
    let names: Vec<&str> = candidates.iter().map(|c| c.name()).collect();
    assert!(names.contains(&"MAINICON"));
    assert!(names.contains(&"#7"));
}

#[test]
fn candidates_ranked_by_score() {
    let pe = build_pe(&[
        icon(1, EN_US, 16, 1),
        icon(2, EN_US, 48, 2),
        icon(3, EN_US, 32, 3),
        group(Key::Id(1), EN_US, &[(16, 1)]),
        group(Key::Id(2), EN_US, &[(16, 1), (48, 2)]),
        group(Key::Id(3), EN_US, &[(32, 3)]),
    ]);
    let candidates = extract(&pe);
    let ids: Vec<&ResourceId> = candidates.iter().map(|c| c.group_id()).collect();
    assert_eq!(
        ids,
        vec![&ResourceId::Id(2), &ResourceId::Id(3), &ResourceId::Id(1)]
    );
    assert!(candidates.windows(2).all(|w| w[0].score() >= w[1].score()));
}

#[test]
fn png_frame_size_comes_from_header() {
    // The group directory can only say "256 or more" for a 512 frame.
    let pe = build_pe(&[
        icon(1, EN_US, 32, 1),
        icon(2, EN_US, 512, 2),
        group(Key::Id(1), EN_US, &[(32, 1), (512, 2)]),
    ]);
    let candidates = extract(&pe);
    let candidate = &candidates[0];
    assert_eq!(
        candidate.frames()[0],
        IconFrameInfo { width: 512, height: 512, bit_count: 32 }
    );
    assert_eq!(candidate.score(), 512 * 512 * 1000 + 32);

    let ico = candidate.ico_data();
    let icondir = IconDir::read(ico).unwrap();
    let entry = icondir.largest();
    assert!(entry.is_png());
    assert_eq!((entry.width(), entry.height()), (512, 512));
    assert_eq!(entry.bit_count(), 0);
}

#[test]
fn no_resource_directory_yields_nothing() {
    let pe = build_pe(&[]);
    assert!(ResourceTable::parse(&pe).unwrap().is_empty());
    assert!(extract(&pe).is_empty());
}

#[test]
fn not_a_pe_image() {
    let result = extract_icons(b"this is not an executable", &CancellationToken::new());
    assert!(matches!(result, Err(IconError::Format(_))));

    let mut pe = build_pe(&[]);
    pe[0x40] = b'X';
    let result = ResourceTable::parse(&pe);
    assert!(matches!(result, Err(IconError::Format(_))));
}

#[test]
fn corrupt_directory_offset() {
    let mut pe = build_pe(&[
        icon(1, EN_US, 16, 1),
        group(Key::Id(1), EN_US, &[(16, 1)]),
    ]);
    // Point the first type entry far past the end of the table.
    let entry = rsrc_offset() + 16 + 4;
    pe[entry..entry + 4].copy_from_slice(&0x8fff_0000u32.to_le_bytes());
    let result = ResourceTable::parse(&pe);
    assert!(matches!(result, Err(IconError::CorruptResourceTable { .. })));
}

#[test]
fn corrupt_entry_count() {
    let mut pe = build_pe(&[
        icon(1, EN_US, 16, 1),
        group(Key::Id(1), EN_US, &[(16, 1)]),
    ]);
    let count = rsrc_offset() + 14;
    pe[count..count + 2].copy_from_slice(&0x7fffu16.to_le_bytes());
    match extract_icons(&pe, &CancellationToken::new()) {
        Err(IconError::CorruptResourceTable { offset, len, bound }) => {
            assert_eq!(offset, 16);
            assert_eq!(len, 0x7fff * 8);
            assert!(bound < offset + len);
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn oversized_png_header_falls_back_to_group_size() {
    // A PNG signature and IHDR claiming 0xffffffff x 0xffffffff pixels.
    let mut fake_png = b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR".to_vec();
    fake_png.extend_from_slice(&[0xff; 8]);
    fake_png.extend_from_slice(&[8, 6, 0, 0, 0]);
    let pe = build_pe(&[
        res(RT_ICON, Key::Id(1), EN_US, fake_png.clone()),
        res(
            RT_GROUP_ICON,
            Key::Id(1),
            EN_US,
            group_payload(&[(256, 0, 1, fake_png.len())]),
        ),
    ]);
    let candidates = extract(&pe);
    assert_eq!(candidates.len(), 1);
    assert_eq!(
        candidates[0].frames(),
        &[IconFrameInfo { width: 256, height: 256, bit_count: 32 }]
    );
    assert_eq!(candidates[0].score(), 256 * 256 * 1000 + 32);
}

#[test]
fn payloads_outside_resource_table() {
    let resources = [
        icon(1, EN_US, 16, 1),
        icon(2, EN_US, 32, 2),
        group(Key::Id(1), EN_US, &[(16, 1), (32, 2)]),
    ];
    let inline = extract(&build_pe(&resources));
    let split = extract(&build_pe_with_data_section(&resources));
    assert_eq!(split.len(), 1);
    assert_eq!(split[0].frames(), inline[0].frames());
    assert_eq!(split[0].ico_data(), inline[0].ico_data());
}

#[test]
fn payload_past_end_of_file() {
    let mut pe = build_pe_with_data_section(&[
        icon(1, EN_US, 16, 1),
        group(Key::Id(1), EN_US, &[(16, 1)]),
    ]);
    // Cut into the group payload, the last bytes of the data section.
    pe.truncate(pe.len() - 16);
    let result = extract_icons(&pe, &CancellationToken::new());
    assert!(matches!(result, Err(IconError::CorruptResourceTable { .. })));
}

#[test]
fn resource_directory_outside_every_section() {
    let mut pe = build_pe(&[icon(1, EN_US, 16, 1)]);
    // Optional header data directory 2 (resources) holds the RVA.
    let rva_field = 0x44 + 20 + 112;
    assert_eq!(&pe[rva_field..rva_field + 4], &RSRC_RVA.to_le_bytes());
    put_u32(&mut pe, rva_field, 0x0010_0000);
    let result = ResourceTable::parse(&pe);
    assert!(matches!(result, Err(IconError::CorruptResourceTable { .. })));
}

// Table layout for one type holding two single-language names:
// root at 0 (24 bytes), type directory at 24 (entries at 40 and 48),
// language directories at 56 and 80 (entries at 72 and 96), data entries
// at 104 and 120.
fn two_icon_table() -> Vec<u8> {
    build_pe(&[icon(1, EN_US, 16, 1), icon(2, EN_US, 16, 2)])
}

#[test]
fn shared_subdirectory_is_corrupt() {
    let mut pe = two_icon_table();
    assert!(ResourceTable::parse(&pe).is_ok());
    put_u32(&mut pe, rsrc_offset() + 48 + 4, 0x8000_0000 | 56);
    let result = ResourceTable::parse(&pe);
    assert!(matches!(result, Err(IconError::CorruptResourceTable { .. })));
}

#[test]
fn shared_data_entry_is_corrupt() {
    let mut pe = two_icon_table();
    put_u32(&mut pe, rsrc_offset() + 96 + 4, 104);
    let result = ResourceTable::parse(&pe);
    assert!(matches!(result, Err(IconError::CorruptResourceTable { .. })));
}

#[test]
fn overlapping_payloads_cannot_exceed_file() {
    // One large payload and three one-byte ones; pointing every data entry
    // at the large payload would copy it four times.
    let mut pe = build_pe(&[
        icon(1, EN_US, 128, 1),
        res(RT_ICON, Key::Id(2), EN_US, vec![2]),
        res(RT_ICON, Key::Id(3), EN_US, vec![3]),
        res(RT_ICON, Key::Id(4), EN_US, vec![4]),
    ]);
    assert_eq!(ResourceTable::parse(&pe).unwrap().records().len(), 4);
    // Root (24) + type directory (16 + 4 * 8) + four language directories
    // (24 each) puts the data entries at 168, 184, 200 and 216.
    let first = rsrc_offset() + 168;
    let entry: Vec<u8> = pe[first..first + 8].to_vec();
    for data_entry in [184, 200, 216] {
        let at = rsrc_offset() + data_entry;
        pe[at..at + 8].copy_from_slice(&entry);
    }
    let result = ResourceTable::parse(&pe);
    assert!(matches!(result, Err(IconError::CorruptResourceTable { .. })));
}

#[test]
fn cancelled_extraction() {
    let pe = build_pe(&[
        icon(1, EN_US, 16, 1),
        group(Key::Id(1), EN_US, &[(16, 1)]),
    ]);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = extract_icons(&pe, &cancel);
    assert!(matches!(result, Err(IconError::Cancelled)));
}

//===========================================================================//
