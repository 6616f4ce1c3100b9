//! ZIP handling for mailed price lists.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use zip::ZipArchive;

use crate::error::{Result, SyncError};

/// True for a `.zip` name or content starting with the ZIP local header magic.
pub fn is_zip(path: &Path) -> Result<bool> {
    if path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"))
    {
        return Ok(true);
    }
    let mut magic = [0u8; 4];
    let mut file = File::open(path)?;
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(&magic == b"PK\x03\x04"),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Extracts `archive` into a freshly emptied `dest` and returns the extracted
/// files. Entries whose names would escape `dest` are skipped.
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<Vec<PathBuf>> {
    if dest.exists() {
        debug!("Clearing {}", dest.display());
        fs::remove_dir_all(dest)?;
    }
    fs::create_dir_all(dest)?;

    let mut zip = ZipArchive::new(File::open(archive)?)?;
    let mut extracted = Vec::new();
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let Some(relative) = entry.enclosed_name() else {
            warn!("Skipping unsafe archive entry '{}'", entry.name());
            continue;
        };
        let out_path = dest.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
        debug!("Extracted {}", out_path.display());
        extracted.push(out_path);
    }
    extracted.sort();
    info!(
        "Extracted {} file(s) from {}",
        extracted.len(),
        archive.display()
    );
    Ok(extracted)
}

/// Chooses the price table among extracted files: text tables first, then
/// spreadsheets, each in file-name order.
pub fn pick_price_file(files: &[PathBuf]) -> Result<PathBuf> {
    let with_ext = |wanted: &[&str]| {
        let mut matching: Vec<&PathBuf> = files
            .iter()
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| wanted.iter().any(|w| e.eq_ignore_ascii_case(w)))
            })
            .collect();
        matching.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));
        matching.first().map(|p| (*p).clone())
    };

    with_ext(&["csv", "txt"])
        .or_else(|| with_ext(&["xlsx", "xls"]))
        .ok_or_else(|| {
            SyncError::data(
                "archive",
                format!(
                    "no .csv, .txt, .xlsx or .xls file among {} extracted file(s)",
                    files.len()
                ),
            )
        })
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
