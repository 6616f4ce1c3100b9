//! Splits the combined supplier price table into one file per brand.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, WriterBuilder};
use log::{debug, info, warn};
use tempfile::NamedTempFile;

use super::brand::{brand_file_name, normalize_brand};
use super::table::{read_table, Row};
use crate::catalog::CatalogMapping;
use crate::error::{Result, SyncError};

pub const OUTPUT_HEADER: [&str; 5] = ["brand", "article", "identifier", "price", "quantity"];

const BRAND_COL: usize = 0; // A
const ARTICLE_COL: usize = 1; // B
const IDENTIFIER_COL: usize = 2; // C
const PRICE_COL: usize = 3; // D
const QUANTITY_COL: usize = 4; // E

/// One row of a per-brand file. Price and quantity stay as the supplier
/// wrote them; they are parsed by the updater.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRecord {
    pub brand: String,
    pub article: String,
    pub identifier: String,
    pub price: String,
    pub quantity: String,
}

impl PriceRecord {
    fn fields(&self) -> [&str; 5] {
        [
            &self.brand,
            &self.article,
            &self.identifier,
            &self.price,
            &self.quantity,
        ]
    }

    fn from_row(row: &Row) -> Self {
        let cell = |i: usize| row.get(i).map(|c| c.trim().to_string()).unwrap_or_default();
        Self {
            brand: cell(BRAND_COL),
            article: cell(ARTICLE_COL),
            identifier: cell(IDENTIFIER_COL),
            price: cell(PRICE_COL),
            quantity: cell(QUANTITY_COL),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BrandSplit {
    pub brand: String,
    pub path: PathBuf,
    pub rows: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SplitSummary {
    pub total_rows: usize,
    pub matched_rows: usize,
    pub other_rows: usize,
    pub files: Vec<BrandSplit>,
}

/// Article as written to brand files: quotes and whitespace removed.
pub fn clean_article(article: &str) -> String {
    article
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '"' && *c != '\'')
        .collect()
}

/// Writes `TARGET_DIR/brand_<name>.csv` for every configured brand from the
/// combined table `rows`, whose first row is the header. Rows of other brands
/// are counted and dropped. With a mapping, the identifier column is
/// replaced by the card's barcode where the article is known.
pub fn split_by_brand(
    rows: &[Row],
    brands: &[String],
    mapping: Option<&CatalogMapping>,
    target_dir: &Path,
) -> Result<SplitSummary> {
    let Some((header, data)) = rows.split_first() else {
        return Err(SyncError::data("price table", "no header row, the table is empty"));
    };
    if header.len() <= QUANTITY_COL {
        return Err(SyncError::data(
            "price table",
            format!(
                "header has {} column(s), expected brand, article, identifier, price, quantity",
                header.len()
            ),
        ));
    }
    debug!("Price table header: {header:?}");
    if mapping.is_none() {
        warn!("No catalog mapping available, identifiers are copied unchanged");
    }

    let index: HashMap<String, usize> = brands
        .iter()
        .enumerate()
        .map(|(i, b)| (normalize_brand(b), i))
        .collect();
    let mut per_brand: Vec<Vec<PriceRecord>> = vec![Vec::new(); brands.len()];
    let mut summary = SplitSummary {
        total_rows: data.len(),
        ..SplitSummary::default()
    };

    for row in data {
        let source = PriceRecord::from_row(row);
        let Some(&slot) = index.get(&normalize_brand(&source.brand)) else {
            summary.other_rows += 1;
            continue;
        };
        let article = clean_article(&source.article);
        let identifier = mapping
            .and_then(|m| m.barcode_for_article(&article))
            .map(str::to_string)
            .unwrap_or(source.identifier);
        per_brand[slot].push(PriceRecord {
            brand: brands[slot].clone(),
            article,
            identifier,
            price: source.price,
            quantity: source.quantity,
        });
        summary.matched_rows += 1;
    }

    fs::create_dir_all(target_dir)?;
    for (brand, records) in brands.iter().zip(&per_brand) {
        let path = target_dir.join(brand_file_name(brand));
        write_brand_file(&path, records)?;
        if records.is_empty() {
            warn!("No rows for brand {brand}, wrote header-only {}", path.display());
        } else {
            info!("Wrote {} row(s) for brand {brand} to {}", records.len(), path.display());
        }
        summary.files.push(BrandSplit {
            brand: brand.clone(),
            path,
            rows: records.len(),
        });
    }

    info!(
        "Split {} row(s): {} matched configured brands, {} other",
        summary.total_rows, summary.matched_rows, summary.other_rows
    );
    Ok(summary)
}

/// Replaces `path` atomically with a `;`-separated, fully quoted UTF-8 file.
pub fn write_brand_file(path: &Path, records: &[PriceRecord]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = WriterBuilder::new()
            .delimiter(b';')
            .quote_style(QuoteStyle::Always)
            .from_writer(tmp.as_file_mut());
        writer.write_record(OUTPUT_HEADER)?;
        for record in records {
            writer.write_record(record.fields())?;
        }
        writer.flush()?;
    }
    tmp.persist(path)?;
    Ok(())
}

/// Reads a per-brand file back. The first row must be the header written
/// by [`write_brand_file`].
pub fn read_brand_file(path: &Path) -> Result<Vec<PriceRecord>> {
    let rows = read_table(path)?;
    let Some(header) = rows.first() else {
        return Ok(Vec::new());
    };
    let matches = header.len() >= OUTPUT_HEADER.len()
        && header
            .iter()
            .zip(OUTPUT_HEADER)
            .all(|(cell, name)| cell.eq_ignore_ascii_case(name));
    if !matches {
        return Err(SyncError::data(
            path.display(),
            format!("unexpected header {header:?}"),
        ));
    }
    Ok(rows.iter().skip(1).map(PriceRecord::from_row).collect())
}

#[cfg(test)]
#[path = "split_tests.rs"]
mod tests;
