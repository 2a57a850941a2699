//! A library for building ICO files and recovering icons from Windows
//! executables.
//!
//! The encode path resamples one source image to each requested size and
//! stores every frame either as a 32-bpp DIB or, from 512 pixels up, as a
//! PNG.  The decode path reads an ICO directory, recovers the true size of
//! PNG frames from their headers, and decodes individual frames.  The
//! extraction path walks the resource directory of a PE image, joins each
//! RT_GROUP_ICON to its RT_ICON frames and rebuilds a standalone ICO file per
//! group, probing `.mui`/`.mun` satellite files when the binary itself has no
//! icons.
//!
//! All parsing works on caller-owned byte buffers and is bounds-checked; no
//! platform loader is involved, so executables can be inspected on any OS.
//!
//! # Example
//!
//! ```no_run
//! use icoforge::{encode_ico, CancellationToken, EncodeOptions, IconDir, IconImage};
//!
//! let source = IconImage::from_rgba_data(64, 64, vec![255; 64 * 64 * 4])?;
//! let options = EncodeOptions::with_sizes(&[16, 32, 64]);
//! let ico = encode_ico(&source, &options, &CancellationToken::new())?;
//! let icondir = IconDir::read(&ico)?;
//! assert_eq!(icondir.entries().len(), 3);
//! # Ok::<(), icoforge::IconError>(())
//! ```

#![warn(missing_docs)]

#[macro_use]
mod macros;

mod assemble;
mod bmpdepth;
mod cancel;
mod convert;
mod encode;
mod error;
mod group;
mod icondir;
mod image;
mod options;
mod pe;
mod probe;
mod resource;
mod restype;
mod sniff;

pub use crate::assemble::{
    quality_score, CandidateAssembler, ExecutableIconCandidate,
    GroupResourceRecord, IconFrameInfo, NEUTRAL_LANGUAGE,
};
pub use crate::cancel::CancellationToken;
pub use crate::convert::{convert_file, extract_resolution, write_ico_file};
pub use crate::encode::{encode_dib, encode_ico, encode_payload, encode_png};
pub use crate::error::{IconError, Result};
pub use crate::group::{GroupIconDir, GroupIconEntry, GROUP_ENTRY_LEN};
pub use crate::icondir::{
    dimension_byte, normalize_dimension, IcoBuilder, IconDir, IconDirEntry,
    IconImagePayload, ENTRY_LEN, HEADER_LEN,
};
pub use crate::image::IconImage;
pub use crate::options::{
    EncodeOptions, ProbeOptions, ResizeFilter, DEFAULT_SIZES, PNG_THRESHOLD,
};
pub use crate::pe::{PeImage, SectionHeader};
pub use crate::probe::{extract_from_path, extract_icons, probe_paths, ProbeHit};
pub use crate::resource::{ResourceId, ResourceRecord, ResourceTable};
pub use crate::restype::ResourceType;
pub use crate::sniff::{is_png, png_dimensions, refine_png_dimensions, PNG_SIGNATURE};
