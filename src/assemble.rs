//! Joining group-icon resources to their frames and rebuilding standalone ICO
//! files from them.

use crate::cancel::CancellationToken;
use crate::error::{IconError, Result};
use crate::group::GroupIconDir;
use crate::icondir::{IcoBuilder, IconImagePayload};
use crate::resource::{ResourceId, ResourceRecord, ResourceTable};
use crate::restype::ResourceType;
use crate::sniff::png_dimensions;
use std::collections::HashMap;

//===========================================================================//

/// Language id of language-neutral resources.
pub const NEUTRAL_LANGUAGE: u16 = 0;

const MAX_SCORED_DEPTH: u16 = 999;

// Largest frame side accepted from an embedded PNG header.
const MAX_FRAME_SIDE: u32 = 65535;

//===========================================================================//

/// Size and depth of one frame of a candidate, for display.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IconFrameInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bits per pixel.
    pub bit_count: u16,
}

impl IconFrameInfo {
    fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// An icon group recovered from an executable, rebuilt as a standalone ICO
/// file.
#[derive(Clone, Debug)]
pub struct ExecutableIconCandidate {
    name: String,
    group_id: ResourceId,
    language: u16,
    frames: Vec<IconFrameInfo>,
    ico_data: Vec<u8>,
    score: u64,
}

impl ExecutableIconCandidate {
    /// Returns a display name for the group (`#<id>` or the resource name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the RT_GROUP_ICON identifier.
    pub fn group_id(&self) -> &ResourceId {
        &self.group_id
    }

    /// Returns the language the group was found under.
    pub fn language(&self) -> u16 {
        self.language
    }

    /// Returns the frames, highest fidelity first.
    pub fn frames(&self) -> &[IconFrameInfo] {
        &self.frames
    }

    /// Returns the rebuilt ICO file.
    pub fn ico_data(&self) -> &[u8] {
        &self.ico_data
    }

    /// Consumes the candidate, returning the rebuilt ICO file.
    pub fn into_ico_data(self) -> Vec<u8> {
        self.ico_data
    }

    /// Returns the ranking score, `max_area * 1000 + max_bit_depth`.
    pub fn score(&self) -> u64 {
        self.score
    }

    fn max_area(&self) -> u64 {
        self.frames.iter().map(IconFrameInfo::area).max().unwrap_or(0)
    }
}

/// Computes `max_area * 1000 + max_bit_depth` over a set of frames.  The
/// depth term is capped at 999 so it never outweighs a larger area, and the
/// result saturates instead of overflowing.
pub fn quality_score(frames: &[IconFrameInfo]) -> u64 {
    let max_area = frames.iter().map(IconFrameInfo::area).max().unwrap_or(0);
    let max_bits = frames.iter().map(|f| f.bit_count).max().unwrap_or(0);
    max_area
        .saturating_mul(1000)
        .saturating_add(max_bits.min(MAX_SCORED_DEPTH) as u64)
}

//===========================================================================//

/// One RT_GROUP_ICON resource as found in the resource table.
#[derive(Clone, Copy, Debug)]
pub struct GroupResourceRecord<'t> {
    /// The group's name or id.
    pub id: &'t ResourceId,
    /// The group's language.
    pub language: u16,
    /// The undecoded group directory.
    pub data: &'t [u8],
}

impl<'t> GroupResourceRecord<'t> {
    fn from_record(record: &'t ResourceRecord) -> GroupResourceRecord<'t> {
        GroupResourceRecord {
            id: &record.name,
            language: record.language,
            data: &record.data,
        }
    }
}

/// Resolves group-icon frames against the RT_ICON resources of one table.
/// Holds a per-pass cache, so one assembler must not be shared between
/// threads; build a new one for each table.
pub struct CandidateAssembler<'t> {
    table: &'t ResourceTable,
    icons: HashMap<u16, Vec<(u16, &'t [u8])>>,
    resolved: HashMap<(u16, u16), Option<&'t [u8]>>,
}

impl<'t> CandidateAssembler<'t> {
    /// Indexes the RT_ICON resources of `table` by numeric id.  Named RT_ICON
    /// resources cannot be referenced from a group and are ignored.
    pub fn new(table: &'t ResourceTable) -> CandidateAssembler<'t> {
        let mut icons: HashMap<u16, Vec<(u16, &'t [u8])>> = HashMap::new();
        for record in table.of_type(ResourceType::Icon) {
            if let Some(id) = record.name.as_id() {
                icons.entry(id).or_default().push((record.language, &record.data));
            }
        }
        CandidateAssembler { table, icons, resolved: HashMap::new() }
    }

    /// Returns the RT_GROUP_ICON resources of the table in traversal order.
    pub fn groups(&self) -> Vec<GroupResourceRecord<'t>> {
        self.table
            .of_type(ResourceType::GroupIcon)
            .map(GroupResourceRecord::from_record)
            .collect()
    }

    /// Finds the RT_ICON payload for `icon_id`, preferring the exact
    /// language, then the neutral language, then any language.
    pub fn resolve(&mut self, icon_id: u16, language: u16) -> Option<&'t [u8]> {
        if let Some(&cached) = self.resolved.get(&(language, icon_id)) {
            return cached;
        }
        let found = self.icons.get(&icon_id).and_then(|variants| {
            let pick = |wanted: u16| variants.iter().find(|(lang, _)| *lang == wanted);
            let (found_language, bytes) =
                *pick(language).or_else(|| pick(NEUTRAL_LANGUAGE)).or(variants.first())?;
            if found_language != language {
                tracing::debug!(
                    icon_id,
                    requested = language,
                    found = found_language,
                    "icon resolved through language fallback"
                );
            }
            Some(bytes)
        });
        self.resolved.insert((language, icon_id), found);
        found
    }

    /// Builds a candidate from one group.  Fails with `UnresolvedFrame` if
    /// any frame has no RT_ICON resource in any language.
    pub fn assemble_group(
        &mut self,
        group: &GroupResourceRecord<'t>,
    ) -> Result<ExecutableIconCandidate> {
        let dir = GroupIconDir::parse(group.data)?;
        let mut builder = IcoBuilder::new();
        let mut frames = Vec::with_capacity(dir.entries().len());
        for entry in dir.entries() {
            let bytes = match self.resolve(entry.resource_id, group.language) {
                Some(bytes) => bytes,
                None => {
                    return Err(IconError::UnresolvedFrame {
                        group: group.id.to_string(),
                        icon_id: entry.resource_id,
                    })
                }
            };
            let (width, height) = match png_dimensions(bytes) {
                Some((w, h)) if (1..=MAX_FRAME_SIDE).contains(&w)
                    && (1..=MAX_FRAME_SIDE).contains(&h) =>
                {
                    (w, h)
                }
                Some((w, h)) => {
                    tracing::debug!(
                        icon_id = entry.resource_id,
                        width = w,
                        height = h,
                        "ignoring implausible PNG frame size"
                    );
                    (entry.normalized_width(), entry.normalized_height())
                }
                None => (entry.normalized_width(), entry.normalized_height()),
            };
            if entry.bytes_in_res as usize != bytes.len() {
                tracing::trace!(
                    icon_id = entry.resource_id,
                    declared = entry.bytes_in_res,
                    actual = bytes.len(),
                    "group entry size disagrees with icon resource"
                );
            }
            // PNG frames often declare a bit count of 0; they are 32-bit.
            let depth = if entry.bit_count == 0 && png_dimensions(bytes).is_some() {
                32
            } else {
                entry.bit_count
            };
            frames.push(IconFrameInfo { width, height, bit_count: depth });
            builder.add(IconImagePayload::with_fields(
                width,
                height,
                entry.color_count,
                entry.color_planes,
                entry.bit_count,
                bytes.to_vec(),
            ));
        }
        let ico_data = builder.to_bytes()?;
        let score = quality_score(&frames);
        Ok(ExecutableIconCandidate {
            name: group.id.to_string(),
            group_id: group.id.clone(),
            language: group.language,
            frames,
            ico_data,
            score,
        })
    }

    /// Builds a candidate for every usable group, best first.  Groups with
    /// unresolved frames or malformed directories are skipped.
    pub fn assemble(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Vec<ExecutableIconCandidate>> {
        let mut candidates = Vec::new();
        for group in self.groups() {
            cancel.check()?;
            match self.assemble_group(&group) {
                Ok(candidate) => candidates.push(candidate),
                Err(error @ IconError::UnresolvedFrame { .. }) => {
                    tracing::debug!(group = %group.id, %error, "dropping icon group");
                }
                Err(error @ (IconError::Format(_) | IconError::EmptyContainer)) => {
                    tracing::warn!(group = %group.id, %error, "skipping malformed icon group");
                }
                Err(error) => return Err(error),
            }
        }
        candidates.sort_by(|a, b| {
            b.score.cmp(&a.score).then_with(|| b.max_area().cmp(&a.max_area()))
        });
        Ok(candidates)
    }
}

//===========================================================================//


//===========================================================================//
