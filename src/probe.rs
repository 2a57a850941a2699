//! Locating the files that may carry a binary's icon resources.
//!
//! Under resource redirection a binary can ship without its own icons and
//! rely on satellite files: `<name>.mui` / `<name>.mun` beside it or in a
//! system resource directory, locale-suffixed variants such as
//! `<name>.en-US.mui`, and copies inside locale subdirectories such as
//! `en-US/<name>.mui`.

use crate::assemble::{CandidateAssembler, ExecutableIconCandidate};
use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::options::ProbeOptions;
use crate::resource::ResourceTable;
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

//===========================================================================//

const SATELLITE_EXTENSIONS: &[&str] = &["mui", "mun"];

//===========================================================================//

/// Builds the ordered, de-duplicated list of files to try for `binary`: the
/// binary itself, then for its own directory and each system directory the
/// plain, locale-suffixed and locale-subdirectory satellite files.
pub fn probe_paths(binary: &Path, options: &ProbeOptions) -> Vec<PathBuf> {
    let mut paths = vec![binary.to_path_buf()];
    let file_name = match binary.file_name() {
        Some(name) => name.to_os_string(),
        None => return paths,
    };
    let own_dir = binary.parent().map(Path::to_path_buf).unwrap_or_default();
    let dirs = std::iter::once(own_dir).chain(options.system_dirs.iter().cloned());
    for dir in dirs {
        for &ext in SATELLITE_EXTENSIONS {
            paths.push(dir.join(suffixed(&file_name, &[ext])));
        }
        for locale in &options.locales {
            for &ext in SATELLITE_EXTENSIONS {
                paths.push(dir.join(suffixed(&file_name, &[locale.as_str(), ext])));
            }
        }
        for locale_dir in locale_dirs(&dir, options) {
            for &ext in SATELLITE_EXTENSIONS {
                paths.push(locale_dir.join(suffixed(&file_name, &[ext])));
            }
        }
    }
    let mut seen = HashSet::new();
    paths.retain(|path| seen.insert(path.clone()));
    paths
}

/// Tries each probe path in order and returns the first file that yields at
/// least one icon candidate.  Failures for individual paths are logged and
/// skipped; only cancellation is returned as an error.
pub fn extract_from_path(
    binary: &Path,
    options: &ProbeOptions,
    cancel: &CancellationToken,
) -> Result<Option<ProbeHit>> {
    for path in probe_paths(binary, options) {
        cancel.check()?;
        if !path.is_file() {
            tracing::trace!(path = %path.display(), "probe path absent");
            continue;
        }
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(error) => {
                tracing::debug!(path = %path.display(), %error, "cannot read probe path");
                continue;
            }
        };
        match extract_icons(&data, cancel) {
            Ok(candidates) if !candidates.is_empty() => {
                tracing::info!(
                    path = %path.display(),
                    candidates = candidates.len(),
                    "found icon resources"
                );
                return Ok(Some(ProbeHit { path, candidates }));
            }
            Ok(_) => {
                tracing::debug!(path = %path.display(), "no icon groups");
            }
            Err(error) if error.is_cancelled() => return Err(error),
            Err(error) => {
                tracing::debug!(path = %path.display(), %error, "skipping probe path");
            }
        }
    }
    tracing::info!(binary = %binary.display(), "no icon resources in any probe path");
    Ok(None)
}

/// Walks the resources of one PE image and assembles its icon candidates,
/// best first.
pub fn extract_icons(
    data: &[u8],
    cancel: &CancellationToken,
) -> Result<Vec<ExecutableIconCandidate>> {
    let table = ResourceTable::parse_icons(data)?;
    CandidateAssembler::new(&table).assemble(cancel)
}

/// The file that supplied icons and the candidates found in it.
#[derive(Clone, Debug)]
pub struct ProbeHit {
    /// The probe path that yielded candidates.
    pub path: PathBuf,
    /// Candidates, best first.
    pub candidates: Vec<ExecutableIconCandidate>,
}

//===========================================================================//

fn suffixed(name: &OsString, suffixes: &[&str]) -> OsString {
    let mut out = name.clone();
    for suffix in suffixes {
        out.push(".");
        out.push(suffix);
    }
    out
}

fn locale_dirs(dir: &Path, options: &ProbeOptions) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> =
        options.locales.iter().map(|locale| dir.join(locale)).collect();
    if options.scan_locale_dirs {
        let listing = if dir.as_os_str().is_empty() {
            fs::read_dir(".")
        } else {
            fs::read_dir(dir)
        };
        match listing {
            Ok(listing) => {
                let mut found: Vec<PathBuf> = listing
                    .filter_map(|entry| entry.ok())
                    .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
                    .filter(|entry| entry.file_name().to_str().is_some_and(looks_like_locale))
                    .map(|entry| dir.join(entry.file_name()))
                    .collect();
                found.sort();
                dirs.extend(found);
            }
            Err(error) => {
                tracing::trace!(dir = %dir.display(), %error, "cannot list directory");
            }
        }
    }
    dirs
}

/// Returns true for names like `de`, `en-US`, `zh-Hans-CN` or `qps-ploc`.
fn looks_like_locale(name: &str) -> bool {
    let mut parts = name.split('-');
    let language = parts.next().unwrap_or("");
    let subtags: Vec<&str> = parts.collect();
    let alpha = |s: &str| s.chars().all(|c| c.is_ascii_alphabetic());
    let language_ok = match language.len() {
        2 => alpha(language),
        3 => alpha(language) && !subtags.is_empty(),
        _ => false,
    };
    language_ok
        && subtags.iter().all(|tag| {
            (2..=8).contains(&tag.len()) && tag.chars().all(|c| c.is_ascii_alphanumeric())
        })
}

//===========================================================================//


//===========================================================================//
