//! Parts Catalog Common Library
//!
//! CLIと将来のフロントエンドで共有される型と、I/Oを伴わないロジック

pub mod types;
pub mod table;
pub mod alias;
pub mod error;
pub mod supplier;

pub use types::{AttributeMap, CategoryNode, PartRecord};
pub use table::{CatalogTable, empty_record, format_header_line, format_record_line};
pub use alias::{AliasTable, merge_into_record, normalize, reconcile};
pub use error::{Error, Result};
pub use supplier::{first_mouser_part, mouser_part_attributes};
