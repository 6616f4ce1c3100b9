//! Cross-reference between manufacturer article numbers, barcodes and
//! marketplace card IDs (`nmID`), built from the seller's exported
//! "Articles" and "Barcodes" spreadsheets.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::config::PathSettings;
use crate::error::{Result, SyncError};
use crate::pricelist::table::{read_table, Row};

const ARTICLE_COL: usize = 1; // B
const NM_ID_COL: usize = 2; // C
const BARCODE_COL: usize = 6; // G
/// Barcodes this short are placeholders, not real EAN codes.
const MIN_BARCODE_LEN: usize = 6;
const MIN_LOOKUP_BARCODE_DIGITS: usize = 13;

const ARTICLES_KEYWORDS: &[&str] = &["артикулы", "articles"];
const BARCODES_KEYWORDS: &[&str] = &["баркоды", "barcodes"];
const MAPPING_EXTENSIONS: &[&str] = &["xlsx", "xls", "ods", "csv"];

/// A successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub nm_id: u64,
    /// Primary barcode of the card, when the barcode file lists one
    pub barcode: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct CatalogMapping {
    by_article: HashMap<String, u64>,
    by_barcode: HashMap<String, u64>,
    barcode_by_nm: HashMap<u64, String>,
}

impl CatalogMapping {
    /// Builds the mapping from raw sheet rows. Only rows whose nmID column
    /// holds a number are used, which skips preambles and header rows.
    pub fn from_rows(articles: &[Row], barcodes: &[Row]) -> Self {
        let mut mapping = Self::default();
        let mut conflicts = 0usize;

        for row in articles {
            let Some(nm_id) = cell(row, NM_ID_COL).and_then(parse_nm_id) else {
                continue;
            };
            if mapping.add_article(cell(row, ARTICLE_COL), nm_id) {
                conflicts += 1;
            }
        }

        for row in barcodes {
            let Some(nm_id) = cell(row, NM_ID_COL).and_then(parse_nm_id) else {
                continue;
            };
            if mapping.add_article(cell(row, ARTICLE_COL), nm_id) {
                conflicts += 1;
            }
            let Some(barcode) = cell(row, BARCODE_COL).map(clean_barcode) else {
                continue;
            };
            if barcode.chars().count() < MIN_BARCODE_LEN {
                continue;
            }
            mapping.barcode_by_nm.entry(nm_id).or_insert_with(|| barcode.clone());
            mapping.by_barcode.entry(barcode).or_insert(nm_id);
        }

        if conflicts > 0 {
            warn!("{conflicts} article(s) map to more than one nmID; the first one is used");
        }
        mapping
    }

    /// Returns true when the article was already mapped to another nmID.
    fn add_article(&mut self, article: Option<&str>, nm_id: u64) -> bool {
        let Some(key) = article.map(normalize_article).filter(|k| !k.is_empty()) else {
            return false;
        };
        match self.by_article.get(&key) {
            Some(&existing) if existing != nm_id => {
                debug!("Article {key}: nmID {nm_id} ignored, already mapped to {existing}");
                true
            }
            Some(_) => false,
            None => {
                self.by_article.insert(key, nm_id);
                false
            }
        }
    }

    /// Loads the mapping files named in the settings or found in `BASE_DIR`.
    /// `Ok(None)` when neither file exists.
    pub fn load(paths: &PathSettings) -> Result<Option<Self>> {
        let articles = locate(
            paths.articles_file.as_deref(),
            &paths.base_dir,
            ARTICLES_KEYWORDS,
            "ARTICLES_FILE",
        )?;
        let barcodes = locate(
            paths.barcodes_file.as_deref(),
            &paths.base_dir,
            BARCODES_KEYWORDS,
            "BARCODES_FILE",
        )?;
        if articles.is_none() && barcodes.is_none() {
            warn!(
                "No Articles or Barcodes cross-reference file found in {}",
                paths.base_dir.display()
            );
            return Ok(None);
        }

        let read = |path: &Option<PathBuf>| -> Result<Vec<Row>> {
            match path {
                Some(p) => {
                    info!("Loading cross-reference file {}", p.display());
                    read_table(p)
                }
                None => Ok(Vec::new()),
            }
        };
        let mapping = Self::from_rows(&read(&articles)?, &read(&barcodes)?);
        info!(
            "Catalog mapping: {} articles, {} barcodes",
            mapping.by_article.len(),
            mapping.by_barcode.len()
        );
        Ok(Some(mapping))
    }

    pub fn is_empty(&self) -> bool {
        self.by_article.is_empty() && self.by_barcode.is_empty()
    }

    pub fn article_count(&self) -> usize {
        self.by_article.len()
    }

    /// Looks up by normalized article first, then by the identifier when it
    /// looks like a barcode.
    pub fn resolve(&self, article: &str, identifier: &str) -> Option<Resolved> {
        let key = normalize_article(article);
        let nm_id = self
            .by_article
            .get(&key)
            .copied()
            .or_else(|| {
                let barcode = clean_barcode(identifier);
                looks_like_barcode(&barcode)
                    .then(|| self.by_barcode.get(&barcode).copied())
                    .flatten()
            })?;
        Some(Resolved {
            nm_id,
            barcode: self.barcode_by_nm.get(&nm_id).cloned(),
        })
    }

    /// Primary barcode for an article, if both are known.
    pub fn barcode_for_article(&self, article: &str) -> Option<&str> {
        let nm_id = self.by_article.get(&normalize_article(article))?;
        self.barcode_by_nm.get(nm_id).map(String::as_str)
    }

    /// All known barcodes, sorted.
    pub fn barcodes(&self) -> Vec<String> {
        self.by_barcode
            .keys()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

fn cell(row: &Row, index: usize) -> Option<&str> {
    row.get(index).map(|c| c.trim()).filter(|c| !c.is_empty())
}

/// Article lookup key: quotes and all whitespace removed, upper-cased.
pub fn normalize_article(article: &str) -> String {
    article
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '"' && *c != '\'')
        .flat_map(char::to_uppercase)
        .collect()
}

fn clean_barcode(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

/// At least 13 digits after removing dashes and spaces.
pub fn looks_like_barcode(identifier: &str) -> bool {
    let cleaned = clean_barcode(identifier);
    cleaned.len() >= MIN_LOOKUP_BARCODE_DIGITS && cleaned.chars().all(|c| c.is_ascii_digit())
}

/// Accepts `12345678` and spreadsheet renderings like `12345678.0`.
fn parse_nm_id(raw: &str) -> Option<u64> {
    let integral = match raw.trim().split_once('.') {
        Some((int, frac)) if frac.chars().all(|c| c == '0') => int,
        Some(_) => return None,
        None => raw.trim(),
    };
    integral.parse().ok().filter(|&n| n > 0)
}

fn locate(
    explicit: Option<&Path>,
    base_dir: &Path,
    keywords: &[&str],
    key: &str,
) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(SyncError::config(
                key,
                format!("file {} does not exist", path.display()),
            ));
        }
        return Ok(Some(path.to_path_buf()));
    }
    Ok(discover(base_dir, keywords))
}

/// First file (by name) in `dir` whose name contains one of `keywords`.
pub fn discover(dir: &Path, keywords: &[&str]) -> Option<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot list {}: {e}", dir.display());
            return None;
        }
    };
    let mut found: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                return false;
            };
            let name = name.to_lowercase();
            let ext_ok = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| MAPPING_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
            // "~$" marks an office lock file
            ext_ok && !name.starts_with("~$") && keywords.iter().any(|k| name.contains(k))
        })
        .collect();
    found.sort();
    if found.len() > 1 {
        warn!(
            "Several files match {keywords:?} in {}, using {}",
            dir.display(),
            found[0].display()
        );
    }
    found.into_iter().next()
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
