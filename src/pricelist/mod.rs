//! Supplier price list handling: reading tables, unpacking archives and
//! splitting the combined list into per-brand files.

pub mod archive;
mod brand;
pub mod split;
pub mod table;

pub use brand::{brand_file_name, normalize_brand, sanitize_filename};
pub use split::{read_brand_file, split_by_brand, BrandSplit, PriceRecord, SplitSummary};
pub use table::read_table;
